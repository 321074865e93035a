//! Native vs fallback animation
//!
//! The mechanism is detected from the track on every resume instead of being
//! cached, so a stylesheet change between interactions is picked up.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::drift::engine::FallbackEngine;
use crate::host::{PlayState, Track};

/// Returns true iff the track reports a real animation name
pub fn has_native_animation(track: &dyn Track) -> bool {
    track
        .animation_name()
        .map(|name| {
            let name = name.trim();
            !name.is_empty() && !name.eq_ignore_ascii_case("none")
        })
        .unwrap_or(false)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnimationMechanism {
    /// Declarative animation; pause/resume are play-state writes
    Native,
    /// Manual frame loop; pause/resume cancel or schedule frames
    Fallback,
}

impl AnimationMechanism {
    pub fn detect(track: &dyn Track) -> Self {
        if has_native_animation(track) {
            AnimationMechanism::Native
        } else {
            AnimationMechanism::Fallback
        }
    }

    /// Pauses both paths. Only one of them is ever live, the other write is a
    /// no-op.
    pub fn pause(track: &mut dyn Track, engine: &mut FallbackEngine) {
        track.set_play_state(PlayState::Paused);
        engine.stop();
    }

    /// Resumes the detected mechanism and returns it
    pub fn resume(track: &mut dyn Track, engine: &mut FallbackEngine) -> Self {
        track.set_play_state(PlayState::Running);
        let mechanism = Self::detect(track);
        debug!("Resuming {:?} animation", mechanism);
        if mechanism == AnimationMechanism::Fallback {
            engine.start(track);
        }
        mechanism
    }
}
