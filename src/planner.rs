//! Tree-diff planner.
//!
//! Compares a local tree snapshot against a remote one and decides, per
//! node, whether anything needs to be transferred. Pure: no I/O, no shared
//! state, fresh plan every call. Re-planning after a refresh recomputes
//! `Ignore`/`Push` from scratch and has no memory of prior user `Skip`
//! choices; skips are a per-session override, not policy.

use std::collections::{BTreeMap, HashMap};

use crate::model::{DocKey, Document, SyncAction, SyncPlan};

/// Diff `local` against `remote` and produce the action plan.
///
/// A local entry gets a plan entry iff it is sync-relevant: a file with a
/// recognized extension, or a directory with at least one sync-relevant
/// descendant. Relevant entries present by name on the remote side map to
/// [`SyncAction::Ignore`], missing ones to [`SyncAction::Push`]. A
/// directory's `Push` means "create this directory"; its contents are
/// governed by their own entries.
pub fn make_plan(local: Vec<Document>, remote: &[Document]) -> SyncPlan {
    let mut actions = BTreeMap::new();
    compare(&local, remote, None, &mut actions);
    SyncPlan {
        local_files: local,
        actions,
    }
}

/// Post-order recursion over one directory level. Descendants are decided
/// first so directory relevance can be read straight out of the map.
fn compare(
    local: &[Document],
    remote: &[Document],
    parent: Option<&DocKey>,
    actions: &mut BTreeMap<DocKey, SyncAction>,
) {
    // Remote listings are assumed name-unique; last entry wins otherwise.
    let remote_by_name: HashMap<&str, &Document> =
        remote.iter().map(|doc| (doc.name.as_str(), doc)).collect();

    for doc in local {
        if !doc.is_dir || doc.children.is_empty() {
            continue;
        }
        let key = key_for(parent, doc);
        let remote_children = remote_by_name
            .get(doc.name.as_str())
            .map(|r| r.children.as_slice())
            .unwrap_or(&[]);
        compare(&doc.children, remote_children, Some(&key), actions);
    }

    for doc in local {
        let key = key_for(parent, doc);
        let relevant = if doc.is_dir {
            doc.children
                .iter()
                .any(|child| actions.contains_key(&key.child(&child.name)))
        } else {
            doc.has_synced_extension()
        };
        if !relevant {
            continue;
        }
        let action = if remote_by_name.contains_key(doc.name.as_str()) {
            SyncAction::Ignore
        } else {
            SyncAction::Push
        };
        actions.insert(key, action);
    }
}

fn key_for(parent: Option<&DocKey>, doc: &Document) -> DocKey {
    match parent {
        Some(p) => p.child(&doc.name),
        None => DocKey::root(&doc.name),
    }
}
