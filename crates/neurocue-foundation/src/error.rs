use std::path::PathBuf;
use thiserror::Error;

use crate::state::SessionState;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Session is {actual:?}, operation requires {required:?}")]
    InvalidState {
        required: SessionState,
        actual: SessionState,
    },

    #[error("Channel count mismatch: session has {expected}, sample has {got}")]
    ChannelMismatch { expected: usize, got: usize },

    #[error("No samples recorded, nothing to export")]
    NoData,

    #[error("Export to {path} failed: {reason}")]
    ExportFailed { path: PathBuf, reason: String },
}

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Connection to {source_name} failed: {reason}")]
    ConnectionFailed { source_name: String, reason: String },

    #[error("Source {source_name} lost: {reason}")]
    SourceLost { source_name: String, reason: String },

    #[error("Transient read failure: {0}")]
    ReadFailed(String),
}

impl SourceError {
    /// Transient failures are retried by the polling loop; everything else
    /// ends the session.
    pub fn is_transient(&self) -> bool {
        matches!(self, SourceError::ReadFailed(_))
    }
}
