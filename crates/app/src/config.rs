use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use neurocue_foundation::{RecorderConfig, SessionError};

use crate::schedule::ScheduleConfig;

/// Synthetic headset layout used until a real acquisition backend is wired
/// in. Discovery of networked sources is a separate collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub channels: usize,
    pub rate_hz: f64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            channels: 14,
            rate_hz: 128.0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub recorder: RecorderConfig,
    pub schedule: ScheduleConfig,
    pub source: SourceConfig,
    /// Directory for the exported session table.
    pub output_dir: PathBuf,
}

impl AppConfig {
    /// Defaults, optionally overlaid with a TOML file. Missing keys fall
    /// back to defaults section by section.
    pub fn load(path: Option<&Path>) -> Result<Self, SessionError> {
        let config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|e| {
                    SessionError::Config(format!("reading {}: {e}", path.display()))
                })?;
                toml::from_str(&text).map_err(|e| {
                    SessionError::Config(format!("parsing {}: {e}", path.display()))
                })?
            }
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SessionError> {
        self.recorder.validate()?;
        self.schedule.validate()?;
        if self.source.channels == 0 || self.source.channels > self.recorder.max_channels {
            return Err(SessionError::Config(format!(
                "source channel count {} outside 1..={}",
                self.source.channels, self.recorder.max_channels
            )));
        }
        if self.source.rate_hz <= 0.0 {
            return Err(SessionError::Config(format!(
                "source rate must be positive, got {}",
                self.source.rate_hz
            )));
        }
        Ok(())
    }
}
