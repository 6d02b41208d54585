//! Plan executor.
//!
//! Walks a [`SyncPlan`] over an open transfer channel, creating remote
//! directories and uploading files. Uploads go to a fixed staging name and
//! are renamed into place only once complete, so an observer of the remote
//! tree never sees a truncated file under its final name. Cancellation is
//! cooperative: the per-chunk progress callback doubles as the checkpoint,
//! and a cancelled run ends with [`Outcome::Cancelled`] rather than an
//! error.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{Result, SyncError};
use crate::listing::LocalSource;
use crate::model::{DocKey, Document, SyncAction, SyncPlan, REMOTE_ROOT, STAGING_NAME};
use crate::session::{TransferChannel, UploadStatus};

/// How an executor run ended. Faults are `Err`; these two are not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    Cancelled,
}

/// Apply `plan` through `chan`, reading file contents from `source`.
///
/// The channel is expected to sit at the connection root; the fixed remote
/// root is entered first and every path below it is navigated relative,
/// one segment at a time, mirroring the local tree shape. Progress runs
/// over a denominator fixed up front: the number of planned files.
pub fn execute(
    chan: &mut dyn TransferChannel,
    source: &dyn LocalSource,
    plan: &SyncPlan,
    cancel: &CancellationToken,
    on_progress: &mut dyn FnMut(f32, &str),
) -> Result<Outcome> {
    let total = plan.file_count();
    info!(total, "executing plan");

    chan.enter(REMOTE_ROOT)?;
    let mut run = Run {
        chan,
        source,
        plan,
        cancel,
        on_progress,
        total,
        completed: 0,
    };
    let result = run.walk(&plan.local_files, None);
    let left = run.chan.leave();
    let outcome = result?;
    left?;

    info!(?outcome, completed = run.completed, "plan finished");
    Ok(outcome)
}

struct Run<'a> {
    chan: &'a mut dyn TransferChannel,
    source: &'a dyn LocalSource,
    plan: &'a SyncPlan,
    cancel: &'a CancellationToken,
    on_progress: &'a mut dyn FnMut(f32, &str),
    total: usize,
    completed: usize,
}

impl Run<'_> {
    fn walk(&mut self, docs: &[Document], parent: Option<&DocKey>) -> Result<Outcome> {
        for doc in docs {
            if self.cancel.is_cancelled() {
                return Ok(Outcome::Cancelled);
            }

            let key = match parent {
                Some(p) => p.child(&doc.name),
                None => DocKey::root(&doc.name),
            };
            let Some(action) = self.plan.action(&key) else {
                continue;
            };

            if doc.is_dir {
                // Directories are entered regardless of their own action:
                // an already-present directory may still hold un-pushed
                // descendants.
                if action == SyncAction::Push {
                    if let Err(e) = self.chan.make_dir(&doc.name) {
                        // Racing an out-of-band mkdir is possible; the
                        // enter below fails if the directory truly does
                        // not exist.
                        warn!(key = %key, error = %e, "mkdir failed, continuing");
                    }
                }
                self.chan.enter(&doc.name)?;
                let result = self.walk(&doc.children, Some(&key));
                let left = self.chan.leave();
                let outcome = result?;
                left?;
                if outcome == Outcome::Cancelled {
                    return Ok(Outcome::Cancelled);
                }
            } else if action == SyncAction::Push {
                if self.push_file(doc, &key)? == Outcome::Cancelled {
                    return Ok(Outcome::Cancelled);
                }
            }
            // Files marked Ignore or Skip are omitted entirely.
        }
        Ok(Outcome::Completed)
    }

    fn push_file(&mut self, doc: &Document, key: &DocKey) -> Result<Outcome> {
        let locator = doc
            .locator
            .as_ref()
            .ok_or_else(|| SyncError::transfer(key.as_str(), "document has no locator"))?;
        let (mut reader, len) = self.source.open_read(locator)?;
        debug!(key = %key, len, "pushing");

        let completed = self.completed;
        let total = self.total.max(1) as f32;
        let cancel = self.cancel;
        let on_progress = &mut *self.on_progress;
        let status = self.chan.upload(
            STAGING_NAME,
            reader.as_mut(),
            len,
            &mut |sent| {
                let within = sent as f32 / len.max(1) as f32;
                on_progress((completed as f32 + within) / total, &doc.name);
                !cancel.is_cancelled()
            },
        )?;

        // Skipping the rename on cancellation may orphan the staging
        // artifact; the next full run simply overwrites it.
        if status == UploadStatus::Completed {
            self.chan.rename(STAGING_NAME, &doc.name)?;
        }

        self.completed += 1;
        (self.on_progress)(self.completed as f32 / total, &doc.name);

        Ok(match status {
            UploadStatus::Completed => Outcome::Completed,
            UploadStatus::Cancelled => Outcome::Cancelled,
        })
    }
}
