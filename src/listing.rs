//! Tree listing, local and remote.
//!
//! Both sides produce the same [`Document`] snapshot shape. The local side
//! goes through the [`LocalSource`] trait so a GUI shell can substitute its
//! own document provider; [`FsSource`] is the built-in filesystem
//! implementation. The remote side walks the transfer channel depth-first
//! with strict enter/leave nesting.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{Result, SyncError};
use crate::model::{Document, Locator, REMOTE_ROOT};
use crate::session::TransferChannel;

/// Local storage access, as granted by the embedding shell.
pub trait LocalSource {
    /// Snapshot the whole tree under the source root.
    fn list_tree(&self) -> Result<Vec<Document>>;

    /// Open a byte stream of known length for a document produced by
    /// `list_tree`.
    fn open_read(&self, locator: &Locator) -> Result<(Box<dyn Read>, u64)>;
}

/// Filesystem-backed local source rooted at one directory.
pub struct FsSource {
    root: PathBuf,
}

impl FsSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FsSource { root: root.into() }
    }

    fn list_dir(&self, dir: &Path) -> Result<Vec<Document>> {
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(_) => continue, // non-UTF-8 names cannot exist remotely
            };
            let path = entry.path();
            let is_dir = entry.file_type()?.is_dir();
            let children = if is_dir {
                self.list_dir(&path)?
            } else {
                Vec::new()
            };
            entries.push(Document {
                name,
                is_dir,
                children,
                locator: Some(Locator(path)),
            });
        }
        // Deterministic sibling order keeps plans stable across refreshes.
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }
}

impl LocalSource for FsSource {
    fn list_tree(&self) -> Result<Vec<Document>> {
        self.list_dir(&self.root)
    }

    fn open_read(&self, locator: &Locator) -> Result<(Box<dyn Read>, u64)> {
        let file = File::open(&locator.0)?;
        let len = file.metadata()?.len();
        Ok((Box::new(file), len))
    }
}

/// List the device's data root through an open transfer channel.
///
/// Dotfiles are skipped; the staging leftovers of an interrupted run live
/// under such a name and must never show up as syncable content. An
/// enumeration failure anywhere surfaces as `Err` for the whole subtree so
/// the caller can distinguish "no tree" from an empty one.
pub fn list_remote(
    chan: &mut dyn TransferChannel,
    cancel: &CancellationToken,
) -> Result<Vec<Document>> {
    chan.enter(REMOTE_ROOT)?;
    let result = list_remote_dir(chan, cancel);
    let left = chan.leave();
    let tree = result?;
    left?;
    debug!(entries = tree.len(), "remote root listed");
    Ok(tree)
}

fn list_remote_dir(
    chan: &mut dyn TransferChannel,
    cancel: &CancellationToken,
) -> Result<Vec<Document>> {
    let mut result = Vec::new();
    for entry in chan.list()? {
        if cancel.is_cancelled() {
            return Err(SyncError::Cancelled);
        }
        if entry.name.starts_with('.') {
            continue;
        }

        let children = if entry.is_dir {
            chan.enter(&entry.name)?;
            let listed = list_remote_dir(chan, cancel);
            // Leave even when the recursion failed, to keep the channel's
            // working directory consistent.
            let left = chan.leave();
            let children = listed?;
            left?;
            children
        } else {
            Vec::new()
        };

        result.push(Document {
            name: entry.name,
            is_dir: entry.is_dir,
            children,
            locator: None,
        });
    }
    Ok(result)
}
