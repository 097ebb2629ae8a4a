use std::time::{Duration, Instant};

use neurocue_foundation::SharedClock;

use crate::types::MarkerEvent;

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Contains-match wildcards; a marker whose label contains any of these
    /// is terminal and arms the stop timer.
    pub terminal_labels: Vec<String>,
    /// How long after arming trailing samples are still captured.
    pub grace_period: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            terminal_labels: vec!["session_stop".into(), "session_complete".into()],
            grace_period: Duration::from_secs(3),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Watching,
    ArmedForStop { armed_at: Instant },
    Stopped,
}

/// Decides when a session should end without an external stop signal.
///
/// Driven entirely by markers the aligner has already drained; it never
/// reads from a source itself. The first terminal marker arms the stop
/// timer; duplicates cannot re-arm it, so repeated end markers cannot
/// postpone the stop indefinitely.
pub struct SessionMonitor {
    config: MonitorConfig,
    clock: SharedClock,
    state: MonitorState,
}

impl SessionMonitor {
    pub fn new(config: MonitorConfig, clock: SharedClock) -> Self {
        Self {
            config,
            clock,
            state: MonitorState::Watching,
        }
    }

    pub fn is_terminal(&self, label: &str) -> bool {
        self.config
            .terminal_labels
            .iter()
            .any(|needle| label.contains(needle.as_str()))
    }

    /// Feed one drained marker. Returns true when this marker newly armed
    /// the stop timer.
    pub fn observe(&mut self, marker: &MarkerEvent) -> bool {
        if !self.is_terminal(&marker.label) {
            return false;
        }
        match self.state {
            MonitorState::Watching => {
                let armed_at = self.clock.now();
                self.state = MonitorState::ArmedForStop { armed_at };
                tracing::info!(
                    label = %marker.label,
                    grace_secs = self.config.grace_period.as_secs_f64(),
                    "terminal marker observed, stop armed"
                );
                true
            }
            // First terminal marker wins; duplicates do not reset the timer.
            MonitorState::ArmedForStop { .. } | MonitorState::Stopped => {
                tracing::debug!(label = %marker.label, "duplicate terminal marker ignored");
                false
            }
        }
    }

    /// Timer check, run once per aligner iteration. Latches `Stopped` once
    /// the grace period has elapsed.
    pub fn should_stop(&mut self) -> bool {
        match self.state {
            MonitorState::Watching => false,
            MonitorState::Stopped => true,
            MonitorState::ArmedForStop { armed_at } => {
                if self.clock.now().duration_since(armed_at) >= self.config.grace_period {
                    self.state = MonitorState::Stopped;
                    tracing::info!("grace period elapsed, stopping session");
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }
}
