//! Transfer session abstraction.
//!
//! One session owns one authenticated connection plus one file-transfer
//! channel to a single host, released on every exit path. The capability
//! surface is deliberately minimal: relative navigation plus the handful
//! of operations the listing, planner and executor layers need. The ssh2
//! implementation lives in [`sftp`]; tests drive the same trait with an
//! in-memory fake.

pub mod sftp;

use std::io::Read;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::DEFAULT_TIMEOUT;

/// Connection parameters for a device session.
///
/// The device ships with a fixed privileged account and lives on a trusted
/// local network, so host-key verification defaults to off. That is a
/// deliberate, visible tradeoff: integrators who want it turn on
/// `verify_host_key` and the key is checked against `~/.ssh/known_hosts`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub host: String,
    pub username: String,
    pub password: String,
    pub timeout: Duration,
    pub verify_host_key: bool,
}

impl SessionConfig {
    pub fn new(host: impl Into<String>) -> Self {
        SessionConfig {
            host: host.into(),
            username: "root".to_string(),
            password: String::new(),
            timeout: DEFAULT_TIMEOUT,
            verify_host_key: false,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// A directory entry as reported by the remote, before tree assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry {
    pub name: String,
    pub is_dir: bool,
}

/// Outcome of one upload attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStatus {
    /// The full stream was written.
    Completed,
    /// The progress callback asked to stop; the staging file is partial.
    Cancelled,
}

/// The file-transfer capability surface.
///
/// Navigation is relative, one path segment at a time: `enter` before
/// touching a subdirectory's contents, `leave` exactly once after. Every
/// other operation applies to the current directory.
pub trait TransferChannel {
    /// List the current directory.
    fn list(&mut self) -> Result<Vec<RawEntry>>;

    /// Descend into a child directory.
    fn enter(&mut self, name: &str) -> Result<()>;

    /// Return to the parent directory.
    fn leave(&mut self) -> Result<()>;

    /// Create a child directory.
    fn make_dir(&mut self, name: &str) -> Result<()>;

    /// Stream `reader` (of known `len`) into `staging_name` in the current
    /// directory. `progress` is called with the cumulative byte count after
    /// every chunk; returning `false` stops the upload cooperatively.
    fn upload(
        &mut self,
        staging_name: &str,
        reader: &mut dyn Read,
        len: u64,
        progress: &mut dyn FnMut(u64) -> bool,
    ) -> Result<UploadStatus>;

    /// Atomically rename within the current directory.
    fn rename(&mut self, from: &str, to: &str) -> Result<()>;
}
