//! Domain-specific error types for the simulation core
//!
//! Every fallible core operation returns [`SimResult`]. The variants mirror how callers
//! are expected to react:
//! - `TapeFormat` / `TapeIo`: fatal to session creation, never retried
//! - `InvalidOrder` / `OrderNotFound`: rejected synchronously, the session continues
//! - `SessionNotFound`: surfaced to the caller, a session is never created implicitly
//! - `Artifact`: a save failed and must not be treated as complete
//! - `Invariant`: a programming error; callers must not swallow it

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the core
pub type SimResult<T> = Result<T, SimError>;

#[derive(Debug, Error)]
pub enum SimError {
    /// Tape line could not be parsed into an event
    #[error("malformed tape {path}:{line}: {reason}")]
    TapeFormat {
        path: String,
        line: usize,
        reason: String,
    },

    /// Tape file could not be read
    #[error("failed to read tape {path}: {source}")]
    TapeIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Order rejected before it reached the book
    #[error("invalid order: {0}")]
    InvalidOrder(String),

    /// Cancel referenced an order this session never issued
    #[error("order {0} not found")]
    OrderNotFound(String),

    /// Registry lookup for an unknown session id
    #[error("session {0} not found")]
    SessionNotFound(String),

    /// Artifact save failed; nothing from this save may be treated as complete
    #[error("artifact write failed for {path}: {reason}")]
    Artifact { path: PathBuf, reason: String },

    /// Configuration rejected by validation
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Internal consistency check failed
    #[error("invariant violated: {0}")]
    Invariant(String),
}

impl SimError {
    pub fn tape_format(path: impl Into<String>, line: usize, reason: impl Into<String>) -> Self {
        SimError::TapeFormat {
            path: path.into(),
            line,
            reason: reason.into(),
        }
    }

    pub fn artifact(path: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        SimError::Artifact {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// True for errors the session survives (the call is rejected, state is untouched)
    pub fn is_recoverable(&self) -> bool {
        matches!(self, SimError::InvalidOrder(_) | SimError::OrderNotFound(_))
    }
}
