//! Shared test fixtures: an in-memory remote filesystem speaking
//! `TransferChannel` and an in-memory local source.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::io::{Cursor, Read};
use std::path::PathBuf;

use xcsync::error::{Result, SyncError};
use xcsync::listing::LocalSource;
use xcsync::model::{Document, Locator, REMOTE_ROOT};
use xcsync::session::{RawEntry, TransferChannel, UploadStatus};

/// Upload chunk size of the fake; small so a single file produces several
/// progress callbacks.
const FAKE_CHUNK: usize = 4;

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Dir(BTreeMap<String, Node>),
    File(Vec<u8>),
}

impl Node {
    pub fn dir() -> Node {
        Node::Dir(BTreeMap::new())
    }

    fn children_mut(&mut self) -> Option<&mut BTreeMap<String, Node>> {
        match self {
            Node::Dir(children) => Some(children),
            Node::File(_) => None,
        }
    }

    fn children(&self) -> Option<&BTreeMap<String, Node>> {
        match self {
            Node::Dir(children) => Some(children),
            Node::File(_) => None,
        }
    }
}

/// In-memory remote. The root is the connection root; a fresh instance
/// holds an empty `.xcsoar` inside it. Every operation is appended to
/// `ops` so tests can assert ordering and enter/leave symmetry.
pub struct MemoryRemote {
    root: Node,
    cwd: Vec<String>,
    pub ops: Vec<String>,
    /// When set, renaming *to* this name fails, to simulate a mid-run
    /// transfer fault.
    pub fail_rename_to: Option<String>,
}

impl MemoryRemote {
    pub fn new() -> Self {
        let mut top = BTreeMap::new();
        top.insert(REMOTE_ROOT.to_string(), Node::dir());
        MemoryRemote {
            root: Node::Dir(top),
            cwd: Vec::new(),
            ops: Vec::new(),
            fail_rename_to: None,
        }
    }

    /// A device without the data root directory; listing it must fail.
    pub fn without_root() -> Self {
        MemoryRemote {
            root: Node::dir(),
            cwd: Vec::new(),
            ops: Vec::new(),
            fail_rename_to: None,
        }
    }

    /// Build a remote with pre-existing content under `.xcsoar`, given as
    /// `path -> bytes` pairs (directories created implicitly).
    pub fn with_files(files: &[(&str, &[u8])]) -> Self {
        let mut remote = Self::new();
        for (path, bytes) in files {
            let full = format!("{REMOTE_ROOT}/{path}");
            let mut parts: Vec<&str> = full.split('/').collect();
            let file_name = parts.pop().unwrap();
            let mut node = &mut remote.root;
            for part in parts {
                let children = node.children_mut().unwrap();
                node = children
                    .entry(part.to_string())
                    .or_insert_with(Node::dir);
            }
            node.children_mut()
                .unwrap()
                .insert(file_name.to_string(), Node::File(bytes.to_vec()));
        }
        remote
    }

    fn cwd_children(&mut self) -> Result<&mut BTreeMap<String, Node>> {
        let mut node = &mut self.root;
        for part in &self.cwd {
            node = node
                .children_mut()
                .and_then(|c| c.get_mut(part))
                .ok_or_else(|| SyncError::Listing {
                    path: part.clone(),
                    reason: "no such directory".into(),
                })?;
        }
        node.children_mut().ok_or_else(|| SyncError::Listing {
            path: self.cwd.join("/"),
            reason: "not a directory".into(),
        })
    }

    /// Look up a node by `/`-joined path from the connection root.
    pub fn node_at(&self, path: &str) -> Option<&Node> {
        let mut node = &self.root;
        for part in path.split('/') {
            node = node.children()?.get(part)?;
        }
        Some(node)
    }

    pub fn file_at(&self, path: &str) -> Option<&[u8]> {
        match self.node_at(path)? {
            Node::File(bytes) => Some(bytes),
            Node::Dir(_) => None,
        }
    }

    pub fn dir_at(&self, path: &str) -> bool {
        matches!(self.node_at(path), Some(Node::Dir(_)))
    }

    /// Enter/leave calls must pair up exactly over a whole run.
    pub fn assert_balanced(&self) {
        let enters = self.ops.iter().filter(|op| op.starts_with("enter ")).count();
        let leaves = self.ops.iter().filter(|op| op.as_str() == "leave").count();
        assert_eq!(enters, leaves, "unbalanced enter/leave: {:?}", self.ops);
        assert!(self.cwd.is_empty(), "channel left inside {:?}", self.cwd);
    }
}

impl TransferChannel for MemoryRemote {
    fn list(&mut self) -> Result<Vec<RawEntry>> {
        self.ops.push("list".into());
        let children = self.cwd_children()?;
        Ok(children
            .iter()
            .map(|(name, node)| RawEntry {
                name: name.clone(),
                is_dir: matches!(node, Node::Dir(_)),
            })
            .collect())
    }

    fn enter(&mut self, name: &str) -> Result<()> {
        self.ops.push(format!("enter {name}"));
        let is_dir = matches!(self.cwd_children()?.get(name), Some(Node::Dir(_)));
        if is_dir {
            self.cwd.push(name.to_string());
            Ok(())
        } else {
            Err(SyncError::Listing {
                path: name.to_string(),
                reason: "no such directory".into(),
            })
        }
    }

    fn leave(&mut self) -> Result<()> {
        self.ops.push("leave".into());
        self.cwd.pop().map(|_| ()).ok_or(SyncError::Transfer {
            path: "/".into(),
            reason: "left the connection root".into(),
        })
    }

    fn make_dir(&mut self, name: &str) -> Result<()> {
        self.ops.push(format!("mkdir {name}"));
        let children = self.cwd_children()?;
        if children.contains_key(name) {
            return Err(SyncError::Transfer {
                path: name.to_string(),
                reason: "already exists".into(),
            });
        }
        children.insert(name.to_string(), Node::dir());
        Ok(())
    }

    fn upload(
        &mut self,
        staging_name: &str,
        reader: &mut dyn Read,
        _len: u64,
        progress: &mut dyn FnMut(u64) -> bool,
    ) -> Result<UploadStatus> {
        self.ops.push(format!("upload {staging_name}"));
        let mut written = Vec::new();
        let mut buf = [0u8; FAKE_CHUNK];
        let mut cancelled = false;
        loop {
            let n = reader.read(&mut buf).map_err(SyncError::Local)?;
            if n == 0 {
                break;
            }
            written.extend_from_slice(&buf[..n]);
            if !progress(written.len() as u64) {
                cancelled = true;
                break;
            }
        }
        // Partial or complete, the staging file reflects what was sent.
        self.cwd_children()?
            .insert(staging_name.to_string(), Node::File(written));
        Ok(if cancelled {
            UploadStatus::Cancelled
        } else {
            UploadStatus::Completed
        })
    }

    fn rename(&mut self, from: &str, to: &str) -> Result<()> {
        self.ops.push(format!("rename {from} {to}"));
        if self.fail_rename_to.as_deref() == Some(to) {
            return Err(SyncError::Transfer {
                path: to.to_string(),
                reason: "injected rename failure".into(),
            });
        }
        let children = self.cwd_children()?;
        let node = children.remove(from).ok_or_else(|| SyncError::Transfer {
            path: from.to_string(),
            reason: "no such file".into(),
        })?;
        children.insert(to.to_string(), node);
        Ok(())
    }
}

/// In-memory local source: a document tree plus contents keyed by locator.
pub struct MemorySource {
    tree: Vec<Document>,
    contents: HashMap<PathBuf, Vec<u8>>,
}

impl MemorySource {
    /// Build from `path -> bytes` pairs; directories are created
    /// implicitly and siblings are kept name-sorted like a real listing.
    pub fn from_files(files: &[(&str, &[u8])]) -> Self {
        let mut root: BTreeMap<String, Entry> = BTreeMap::new();
        let mut contents = HashMap::new();
        for (path, bytes) in files {
            contents.insert(PathBuf::from(path), bytes.to_vec());
            insert(&mut root, path, path);
        }
        MemorySource {
            tree: to_documents(&root),
            contents,
        }
    }

    pub fn tree(&self) -> Vec<Document> {
        self.tree.clone()
    }
}

enum Entry {
    Dir(BTreeMap<String, Entry>),
    File(PathBuf),
}

fn insert(dir: &mut BTreeMap<String, Entry>, rest: &str, full: &str) {
    match rest.split_once('/') {
        Some((head, tail)) => {
            let entry = dir
                .entry(head.to_string())
                .or_insert_with(|| Entry::Dir(BTreeMap::new()));
            if let Entry::Dir(children) = entry {
                insert(children, tail, full);
            }
        }
        None => {
            dir.insert(rest.to_string(), Entry::File(PathBuf::from(full)));
        }
    }
}

fn to_documents(dir: &BTreeMap<String, Entry>) -> Vec<Document> {
    dir.iter()
        .map(|(name, entry)| match entry {
            Entry::Dir(children) => Document::dir(name.clone(), to_documents(children)),
            Entry::File(path) => {
                Document::file(name.clone()).with_locator(Locator(path.clone()))
            }
        })
        .collect()
}

impl LocalSource for MemorySource {
    fn list_tree(&self) -> Result<Vec<Document>> {
        Ok(self.tree.clone())
    }

    fn open_read(&self, locator: &Locator) -> Result<(Box<dyn Read>, u64)> {
        let bytes = self
            .contents
            .get(&locator.0)
            .cloned()
            .ok_or_else(|| SyncError::Listing {
                path: locator.0.display().to_string(),
                reason: "unknown locator".into(),
            })?;
        let len = bytes.len() as u64;
        Ok((Box::new(Cursor::new(bytes)), len))
    }
}
