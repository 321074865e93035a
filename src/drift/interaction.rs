//! Interaction state machine: hover, focus and touch map to pause/resume

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::host::InteractionKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionState {
    #[default]
    Running,
    Paused,
}

impl fmt::Display for InteractionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InteractionState::Running => write!(f, "RUNNING"),
            InteractionState::Paused => write!(f, "PAUSED"),
        }
    }
}

impl InteractionState {
    /// State an interaction asserts, whatever the current state is
    ///
    /// Overlapping reasons (hovered and focused at once) are not tracked; the
    /// latest event wins.
    pub fn target_for(kind: InteractionKind) -> InteractionState {
        match kind {
            InteractionKind::PointerEnter
            | InteractionKind::FocusIn
            | InteractionKind::TouchStart => InteractionState::Paused,
            InteractionKind::PointerLeave
            | InteractionKind::FocusOut
            | InteractionKind::TouchEnd => InteractionState::Running,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entering_channels_pause_and_leaving_channels_resume() {
        use InteractionKind::*;
        for kind in [PointerEnter, FocusIn, TouchStart] {
            assert_eq!(InteractionState::target_for(kind), InteractionState::Paused);
        }
        for kind in [PointerLeave, FocusOut, TouchEnd] {
            assert_eq!(InteractionState::target_for(kind), InteractionState::Running);
        }
    }
}
