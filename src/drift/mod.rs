//! Drift banner subsystem
//!
//! Animates a horizontally looping strip of duplicated content and pauses it
//! while the user interacts with the banner.
//!
//! 1. [`controller`] - Lifecycle typestates and event dispatch
//! 2. [`engine`] - Fallback frame loop with elapsed-time integration
//! 3. [`mechanism`] - Native vs fallback detection and pause/resume
//! 4. [`readiness`] - Barrier over images that still have to load
//! 5. [`banner_handle`] - Runs a banner inside a tokio task
//!
//! # Architecture
//!
//! ```text
//! Host events ──► BannerHandle ──► DriftBanner ──► Track
//!                      ▲               │
//!                 FrameClock ◄── FrameScheduler
//! ```

pub mod banner_handle;
pub mod controller;
pub mod engine;
pub mod error;
pub mod interaction;
pub mod mechanism;
pub mod readiness;

pub use banner_handle::{BannerCommand, BannerHandle};
pub use controller::{DriftBanner, DriftController};
pub use engine::{DriftState, EngineSettings, FallbackEngine, DEFAULT_DURATION_SECS};
pub use error::DriftError;
pub use interaction::InteractionState;
pub use mechanism::AnimationMechanism;
pub use readiness::ReadinessGate;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::host::{FrameHandle, ImageId, ImageOutcome, InteractionKind};

/// Everything the host can deliver to a mounted banner
#[derive(Debug, Clone, PartialEq)]
pub enum BannerEvent {
    /// Hover, focus or touch on the container
    Interaction(InteractionKind),

    /// An image inside the track loaded or failed
    ImageSettled { image: ImageId, outcome: ImageOutcome },

    /// A requested display frame fired
    Frame { handle: FrameHandle, timestamp_ms: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BannerStatus {
    /// Container or track missing
    Disabled,
    /// Reduced motion requested
    Reduced,
    AwaitingImages,
    Live,
}

impl fmt::Display for BannerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BannerStatus::Disabled => write!(f, "disabled"),
            BannerStatus::Reduced => write!(f, "reduced"),
            BannerStatus::AwaitingImages => write!(f, "awaiting-images"),
            BannerStatus::Live => write!(f, "live"),
        }
    }
}

/// Point-in-time view of a banner, published by [`BannerHandle`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftSnapshot {
    pub status: BannerStatus,
    pub interaction: InteractionState,
    pub mechanism: Option<AnimationMechanism>,
    pub running: bool,
    pub offset: f64,
    pub loop_width: f64,
    pub speed: f64,
    pub frame_pending: bool,
}

impl DriftSnapshot {
    pub fn disabled() -> Self {
        Self {
            status: BannerStatus::Disabled,
            interaction: InteractionState::Paused,
            mechanism: None,
            running: false,
            offset: 0.0,
            loop_width: 0.0,
            speed: 0.0,
            frame_pending: false,
        }
    }
}
