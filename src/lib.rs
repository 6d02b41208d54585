//! xcsync - sync engine for pushing flight data to XCSoar devices.
//!
//! Synchronizes a local directory of maps (`.xcm`), tasks (`.tsk`) and
//! waypoint files (`.cup`) into the `.xcsoar` directory of an embedded
//! device over SFTP, discovering the device on the local /24 when its
//! address is unknown.
//!
//! The crate is a library driven by a GUI shell. The shell owns rendering,
//! preference persistence and document access; this crate owns the tree
//! diff, the transfer execution and the network probe:
//!
//! 1. List the local tree ([`listing::LocalSource`]) and, through an open
//!    [`session::sftp::SftpSession`], the remote one ([`listing::list_remote`]).
//!    A failed listing is "no tree", distinguishable from an empty one.
//! 2. Diff both with [`planner::make_plan`] into a [`model::SyncPlan`];
//!    the shell may flip individual entries to [`model::SyncAction::Skip`].
//! 3. Hand the plan to [`executor::execute`], which stages, uploads and
//!    atomically renames each pushed file with chunk-level progress and
//!    cooperative cancellation.
//! 4. Re-list and re-plan; successfully pushed files reconcile to
//!    [`model::SyncAction::Ignore`].
//!
//! Long-running work goes through [`job::JobSlot`], which guarantees at
//! most one active session to the device.

pub mod discovery;
pub mod error;
pub mod executor;
pub mod job;
pub mod listing;
pub mod logging;
pub mod model;
pub mod planner;
pub mod progress;
pub mod session;

pub use error::{Result, SyncError};
pub use executor::{execute, Outcome};
pub use listing::{list_remote, FsSource, LocalSource};
pub use model::{DocKey, Document, Locator, SyncAction, SyncPlan};
pub use planner::make_plan;
pub use progress::{progress_channel, ProgressReceiver, ProgressReporter, ProgressState};
pub use session::{RawEntry, SessionConfig, TransferChannel, UploadStatus};
