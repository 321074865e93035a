//! Banner description for the simulator
//!
//! A TOML file describes the simulated track, the environment and a timed
//! interaction script:
//!
//! ```toml
//! default_duration_secs = 28.0
//! frame_interval_ms = 16
//! run_for_ms = 3000
//!
//! [track]
//! scroll_width = 2400.0
//! duration = "12s"
//! images = [{ id = "hero", complete = false }]
//!
//! [[script]]
//! at_ms = 200
//! action = "settle_image"
//! image = "hero"
//! outcome = "loaded"
//!
//! [[script]]
//! at_ms = 1000
//! action = "interact"
//! kind = "pointer_enter"
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::drift::engine::{EngineSettings, DEFAULT_DURATION_SECS};
use crate::host::clock::ClockSettings;
use crate::host::sim::SimTrack;
use crate::host::{ImageId, ImageOutcome, ImageStatus, InteractionKind};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse banner config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid banner config: {0}")]
    Invalid(String),
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(default)]
pub struct BannerConfig {
    /// Used when the track carries no usable duration property
    pub default_duration_secs: f64,
    pub frame_interval_ms: u64,
    /// `None` simulates an environment without the preference query
    pub reduced_motion: Option<bool>,
    /// Simulate a page without the banner markup
    pub missing_track: bool,
    pub run_for_ms: u64,
    pub track: TrackConfig,
    pub script: Vec<ScriptStep>,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(default)]
pub struct TrackConfig {
    pub scroll_width: f64,
    /// Computed animation name; anything but `none` means native animation
    pub animation_name: Option<String>,
    pub duration: Option<String>,
    pub images: Vec<ImageStatus>,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct ScriptStep {
    pub at_ms: u64,
    #[serde(flatten)]
    pub action: ScriptAction,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ScriptAction {
    Interact { kind: InteractionKind },
    SetSpeed { seconds: f64 },
    SettleImage { image: ImageId, outcome: ImageOutcome },
}

impl Default for TrackConfig {
    fn default() -> Self {
        Self {
            scroll_width: 2400.0,
            animation_name: None,
            duration: None,
            images: Vec::new(),
        }
    }
}

impl Default for BannerConfig {
    fn default() -> Self {
        Self {
            default_duration_secs: DEFAULT_DURATION_SECS,
            frame_interval_ms: ClockSettings::default().frame_interval_ms,
            reduced_motion: None,
            missing_track: false,
            run_for_ms: 3_000,
            track: TrackConfig::default(),
            script: vec![
                ScriptStep {
                    at_ms: 1_000,
                    action: ScriptAction::Interact {
                        kind: InteractionKind::PointerEnter,
                    },
                },
                ScriptStep {
                    at_ms: 1_500,
                    action: ScriptAction::Interact {
                        kind: InteractionKind::PointerLeave,
                    },
                },
                ScriptStep {
                    at_ms: 2_000,
                    action: ScriptAction::SetSpeed { seconds: 10.0 },
                },
            ],
        }
    }
}

impl BannerConfig {
    /// `<config_dir>/driftbanner/banner.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("driftbanner").join("banner.toml"))
    }

    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        let config: BannerConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        info!("Loading banner config from {}", path.display());
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&raw)
    }

    /// Loads `path` if it exists, otherwise falls back to defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) if path.exists() => Self::load(path),
            Some(path) => {
                info!("No banner config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            None => {
                debug!("No config directory available, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.default_duration_secs.is_finite() || self.default_duration_secs <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "default_duration_secs must be positive, got {}",
                self.default_duration_secs
            )));
        }
        if self.frame_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "frame_interval_ms must be at least 1".to_string(),
            ));
        }
        if !self.track.scroll_width.is_finite() || self.track.scroll_width < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "track.scroll_width must be a non-negative number, got {}",
                self.track.scroll_width
            )));
        }
        Ok(())
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            default_duration_secs: self.default_duration_secs,
        }
    }

    pub fn clock_settings(&self) -> ClockSettings {
        ClockSettings {
            frame_interval_ms: self.frame_interval_ms,
        }
    }

    /// Script steps ordered by time, ties kept in file order
    pub fn sorted_script(&self) -> Vec<ScriptStep> {
        let mut steps = self.script.clone();
        steps.sort_by_key(|step| step.at_ms);
        steps
    }
}

impl TrackConfig {
    pub fn build(&self) -> SimTrack {
        let mut track = SimTrack::new(self.scroll_width);
        if let Some(name) = &self.animation_name {
            track = track.with_native_animation(name.clone());
        }
        if let Some(duration) = &self.duration {
            track = track.with_duration_property(duration.clone());
        }
        for image in &self.images {
            track = track.with_image(image.id.0.clone(), image.complete);
        }
        track
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = BannerConfig::from_toml("").unwrap();
        assert_eq!(config.default_duration_secs, 28.0);
        assert_eq!(config.frame_interval_ms, 16);
        assert!(config.reduced_motion.is_none());
        assert_eq!(config.script.len(), 3);
    }

    #[test]
    fn parses_track_and_script() {
        let config = BannerConfig::from_toml(
            r#"
            reduced_motion = false
            run_for_ms = 500

            [track]
            scroll_width = 1200.0
            duration = "12s"
            images = [
                { id = "logo", complete = true },
                { id = "hero", complete = false },
            ]

            [[script]]
            at_ms = 300
            action = "interact"
            kind = "touch_start"

            [[script]]
            at_ms = 100
            action = "settle_image"
            image = "hero"
            outcome = "failed"

            [[script]]
            at_ms = 400
            action = "set_speed"
            seconds = 4.5
            "#,
        )
        .unwrap();

        assert_eq!(config.reduced_motion, Some(false));
        assert_eq!(config.track.images.len(), 2);

        let script = config.sorted_script();
        assert_eq!(
            script[0].action,
            ScriptAction::SettleImage {
                image: ImageId::from("hero"),
                outcome: ImageOutcome::Failed,
            }
        );
        assert_eq!(
            script[1].action,
            ScriptAction::Interact {
                kind: InteractionKind::TouchStart
            }
        );
        assert_eq!(script[2].action, ScriptAction::SetSpeed { seconds: 4.5 });

        let track = config.track.build().snapshot();
        assert_eq!(track.scroll_width, 1200.0);
        assert_eq!(track.duration_property.as_deref(), Some("12s"));
        assert!(!track.images[1].complete);
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(matches!(
            BannerConfig::from_toml("default_duration_secs = 0.0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            BannerConfig::from_toml("frame_interval_ms = 0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            BannerConfig::from_toml("run_for_ms = \"soon\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let path = std::env::temp_dir().join("driftbanner-does-not-exist.toml");
        let config = BannerConfig::load_or_default(Some(&path)).unwrap();
        assert_eq!(config.track.scroll_width, 2400.0);
    }
}
