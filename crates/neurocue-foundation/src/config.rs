use serde::{Deserialize, Serialize};

use crate::error::SessionError;

/// Numeric knobs for the recording engine. All durations are plain seconds
/// or milliseconds so the surface stays flat for TOML and CLI overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    /// Delay between terminal-marker detection and the actual stop, so
    /// trailing in-flight samples are still captured.
    pub grace_period_secs: f64,

    /// Bounded wait for a single sample poll.
    pub poll_timeout_ms: u64,

    /// Yield between iterations when a poll came back empty.
    pub idle_sleep_ms: u64,

    /// Upper bound on the channel count a source may report.
    pub max_channels: usize,

    /// Rejected-sample count at which a channel mismatch escalates to a
    /// lost source.
    pub mismatch_threshold: u32,

    /// Consecutive read failures from one source before it is declared lost.
    pub read_failure_threshold: u32,

    /// Marker labels (contains-match) that end the session.
    pub terminal_labels: Vec<String>,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            grace_period_secs: 3.0,
            poll_timeout_ms: 50,
            idle_sleep_ms: 5,
            max_channels: 256,
            mismatch_threshold: 10,
            read_failure_threshold: 3,
            terminal_labels: vec!["session_stop".into(), "session_complete".into()],
        }
    }
}

impl RecorderConfig {
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.grace_period_secs < 0.0 {
            return Err(SessionError::Config(format!(
                "grace_period_secs must be non-negative, got {}",
                self.grace_period_secs
            )));
        }
        if self.max_channels == 0 {
            return Err(SessionError::Config("max_channels must be at least 1".into()));
        }
        if self.read_failure_threshold == 0 {
            return Err(SessionError::Config(
                "read_failure_threshold must be at least 1".into(),
            ));
        }
        if self.terminal_labels.is_empty() {
            return Err(SessionError::Config(
                "terminal_labels must name at least one session-ending label".into(),
            ));
        }
        Ok(())
    }
}
