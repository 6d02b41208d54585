//! Value model for filesystem trees and sync plans.
//!
//! Documents are immutable snapshots produced by one listing pass, local or
//! remote. A fresh listing always produces a fresh set of documents, so the
//! plan never keys on the documents themselves: it keys on the path from the
//! root ([`DocKey`]), which is stable across snapshots even when incidental
//! fields like the storage locator differ.

use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;
use std::time::Duration;

/// Remote directory everything is synced into.
pub const REMOTE_ROOT: &str = ".xcsoar";

/// Temporary upload target, renamed to the real name once complete.
pub const STAGING_NAME: &str = ".xcsync.staging";

/// File extensions the device cares about (case-insensitive).
pub const SYNCED_EXTENSIONS: [&str; 3] = ["xcm", "tsk", "cup"];

/// Timeout for normal session operations.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// Upload chunk size; each chunk boundary is a progress/cancellation point.
pub const UPLOAD_CHUNK_SIZE: usize = 32 * 1024;

/// Opaque handle used by the local storage layer to open a byte stream for
/// a document. Remote-origin documents never carry one. Excluded from
/// document equality.
#[derive(Debug, Clone)]
pub struct Locator(pub PathBuf);

/// One node of a filesystem tree snapshot.
#[derive(Debug, Clone)]
pub struct Document {
    pub name: String,
    pub is_dir: bool,
    pub children: Vec<Document>,
    pub locator: Option<Locator>,
}

impl Document {
    pub fn file(name: impl Into<String>) -> Self {
        Document {
            name: name.into(),
            is_dir: false,
            children: Vec::new(),
            locator: None,
        }
    }

    pub fn dir(name: impl Into<String>, children: Vec<Document>) -> Self {
        Document {
            name: name.into(),
            is_dir: true,
            children,
            locator: None,
        }
    }

    pub fn with_locator(mut self, locator: Locator) -> Self {
        self.locator = Some(locator);
        self
    }

    /// Whether this document's name carries one of the synced extensions.
    pub fn has_synced_extension(&self) -> bool {
        let name = self.name.to_ascii_lowercase();
        SYNCED_EXTENSIONS
            .iter()
            .any(|ext| name.ends_with(ext))
    }
}

// Structural equality over name, kind and children. The locator is a storage
// artifact and must not make two snapshots of the same file unequal.
impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.is_dir == other.is_dir && self.children == other.children
    }
}

impl Eq for Document {}

impl Hash for Document {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.is_dir.hash(state);
        self.children.hash(state);
    }
}

/// Stable identity of a document across independent listings: the
/// `/`-joined path of names from the tree root.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocKey(String);

impl DocKey {
    pub fn root(name: &str) -> Self {
        DocKey(name.to_string())
    }

    pub fn child(&self, name: &str) -> Self {
        DocKey(format!("{}/{}", self.0, name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What the executor should do with one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    /// Already present on the remote, nothing to transfer.
    Ignore,
    /// Missing on the remote, create/upload it.
    Push,
    /// User deselected this entry for the current session. Never produced
    /// by the planner, only by an explicit edit.
    Skip,
}

/// A per-node action plan over one local tree snapshot.
///
/// Only sync-relevant documents appear in the map; everything else is
/// invisible to both display and execution. Produced wholesale by
/// [`crate::planner::make_plan`] and immutable apart from single-entry
/// action replacement.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncPlan {
    pub local_files: Vec<Document>,
    pub actions: BTreeMap<DocKey, SyncAction>,
}

impl SyncPlan {
    pub fn action(&self, key: &DocKey) -> Option<SyncAction> {
        self.actions.get(key).copied()
    }

    /// Replace the action for one document, leaving every other entry
    /// untouched. Keys not already in the plan are rejected: an entry that
    /// was never sync-relevant cannot be toggled into the session.
    pub fn with_action(mut self, key: &DocKey, action: SyncAction) -> Self {
        if let Some(slot) = self.actions.get_mut(key) {
            *slot = action;
        }
        self
    }

    /// Number of files (not directories) the executor will report progress
    /// over. Fixed for a whole run.
    pub fn file_count(&self) -> usize {
        fn walk(
            docs: &[Document],
            parent: Option<&DocKey>,
            actions: &BTreeMap<DocKey, SyncAction>,
            count: &mut usize,
        ) {
            for doc in docs {
                let key = match parent {
                    Some(p) => p.child(&doc.name),
                    None => DocKey::root(&doc.name),
                };
                if !doc.is_dir && actions.contains_key(&key) {
                    *count += 1;
                }
                walk(&doc.children, Some(&key), actions, count);
            }
        }
        let mut count = 0;
        walk(&self.local_files, None, &self.actions, &mut count);
        count
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}
