use serde::{Deserialize, Serialize};

/// Lifecycle of one recording session.
///
/// `Stopping` covers the grace window between terminal-marker detection and
/// the actual stop; trailing samples are still appended in that state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Idle,
    Recording,
    Stopping,
    Stopped,
}

impl Default for SessionState {
    fn default() -> Self {
        SessionState::Idle
    }
}

impl SessionState {
    pub fn is_active(&self) -> bool {
        matches!(self, SessionState::Recording | SessionState::Stopping)
    }

    /// Validate a lifecycle transition. `Stopped -> Recording` is allowed so
    /// a buffer can be reused for a fresh session.
    pub fn can_transition(&self, to: SessionState) -> bool {
        matches!(
            (self, to),
            (SessionState::Idle, SessionState::Recording)
                | (SessionState::Stopped, SessionState::Recording)
                | (SessionState::Recording, SessionState::Stopping)
                | (SessionState::Recording, SessionState::Stopped)
                | (SessionState::Stopping, SessionState::Stopped)
        )
    }
}

/// Why a session ended. Every shutdown path records one of these through the
/// same `stop()` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// External stop request from the controller.
    Requested,
    /// SessionMonitor grace period expired after a terminal marker.
    AutoStop,
    /// A source stopped responding mid-session.
    SourceLost(String),
}
