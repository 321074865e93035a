//! Host seam for the drift banner
//!
//! The controller never touches a page directly. Everything it needs from the
//! surrounding environment goes through the traits in this module:
//!
//! ```text
//! Container ──► interaction events ──┐
//!                                    ▼
//! MotionPreference ──► DriftController ──► Track (transform, play state)
//!                                    ▲          │
//! FrameScheduler ──► frame events ───┘          └─► images (readiness)
//! ```
//!
//! [`sim`] provides an in-process implementation used by the simulator binary
//! and the tests; [`clock`] fires its frame requests at a fixed cadence.

pub mod clock;
pub mod sim;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Play state of a native (declarative) animation on the track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayState {
    Running,
    Paused,
}

impl fmt::Display for PlayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayState::Running => write!(f, "running"),
            PlayState::Paused => write!(f, "paused"),
        }
    }
}

/// Interaction channels the container can forward to the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    PointerEnter,
    PointerLeave,
    FocusIn,
    FocusOut,
    TouchStart,
    TouchEnd,
}

impl InteractionKind {
    pub const ALL: [InteractionKind; 6] = [
        InteractionKind::PointerEnter,
        InteractionKind::PointerLeave,
        InteractionKind::FocusIn,
        InteractionKind::FocusOut,
        InteractionKind::TouchStart,
        InteractionKind::TouchEnd,
    ];
}

/// Opaque handle for a requested display frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameHandle(pub u64);

/// Identifier of an image inside the track
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ImageId(pub String);

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ImageId {
    fn from(value: &str) -> Self {
        ImageId(value.to_string())
    }
}

/// An image found in the track at mount time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageStatus {
    pub id: ImageId,
    /// Synchronous "already complete" flag
    pub complete: bool,
}

/// How an image finished loading. Both outcomes settle the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageOutcome {
    Loaded,
    Failed,
}

/// The interactive element wrapping the track
pub trait Container: Send {
    /// Registers the interaction channels the host has to forward
    fn subscribe(&mut self, kinds: &[InteractionKind]);
}

/// The scrolling strip of duplicated content
pub trait Track: Send {
    /// Total scrollable content width in pixels
    fn scroll_width(&self) -> f64;

    /// Computed animation name, `None` when the host reports nothing
    fn animation_name(&self) -> Option<String>;

    fn set_play_state(&mut self, state: PlayState);

    /// Raw duration property, e.g. `"28s"`
    fn duration_property(&self) -> Option<String>;

    fn set_duration_property(&mut self, value: &str);

    /// Applies a horizontal translation in pixels
    fn set_translate_x(&mut self, px: f64);

    /// Sets the rendering hint for upcoming property changes
    fn set_will_change(&mut self, hint: &str);

    /// Images inside the track; ids may repeat across the duplicated halves
    fn images(&self) -> Vec<ImageStatus>;
}

/// Source of the user's reduced-motion preference
pub trait MotionPreference: Send {
    /// `None` when the environment cannot answer
    fn prefers_reduced_motion(&self) -> Option<bool>;
}

/// Display-refresh scheduling primitive
///
/// A requested frame fires once. The host delivers it back to the controller
/// as a frame event carrying the same handle.
pub trait FrameScheduler: Send {
    fn request_frame(&mut self) -> FrameHandle;

    fn cancel_frame(&mut self, handle: FrameHandle);
}

/// Everything the host hands over when mounting a banner
///
/// Container and track are optional; a banner missing either one mounts
/// disabled.
pub struct BannerParts {
    pub container: Option<Box<dyn Container>>,
    pub track: Option<Box<dyn Track>>,
    pub motion: Box<dyn MotionPreference>,
    pub scheduler: Box<dyn FrameScheduler>,
}
