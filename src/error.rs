//! Error types for sync operations.
//!
//! Cancellation is deliberately part of the taxonomy: callers must be able to
//! tell an interrupted run from a failed one without string matching.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SyncError>;

#[derive(Debug, Error)]
pub enum SyncError {
    /// TCP connect, SSH handshake or channel setup failed.
    #[error("connection to {host} failed: {reason}")]
    Connection { host: String, reason: String },

    /// The device refused our credentials.
    #[error("authentication rejected by {host}")]
    Auth { host: String },

    /// A directory enumeration failed. Callers treat a failed top-level
    /// listing as "no tree available", never as an empty tree.
    #[error("listing {path} failed: {reason}")]
    Listing { path: String, reason: String },

    /// An upload, mkdir or rename was rejected mid-run. Files already
    /// renamed stay committed; recovery is a fresh list + plan cycle.
    #[error("transfer of {path} failed: {reason}")]
    Transfer { path: String, reason: String },

    /// Local storage access failed.
    #[error("local I/O error: {0}")]
    Local(#[from] std::io::Error),

    /// The operation was cancelled before it could complete.
    #[error("operation cancelled")]
    Cancelled,
}

impl SyncError {
    pub(crate) fn connection(host: impl Into<String>, err: impl std::fmt::Display) -> Self {
        SyncError::Connection {
            host: host.into(),
            reason: err.to_string(),
        }
    }

    pub(crate) fn listing(path: impl Into<String>, err: impl std::fmt::Display) -> Self {
        SyncError::Listing {
            path: path.into(),
            reason: err.to_string(),
        }
    }

    pub(crate) fn transfer(path: impl Into<String>, err: impl std::fmt::Display) -> Self {
        SyncError::Transfer {
            path: path.into(),
            reason: err.to_string(),
        }
    }

    /// True if the error came from the cooperative cancellation path rather
    /// than a real fault.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SyncError::Cancelled)
    }
}
