//! Single-slot background job handle.
//!
//! The shell runs at most one long-running operation at a time (discovery,
//! refresh or execution). Starting a new job first cancels and awaits the
//! old one, so no two jobs ever hold a transfer session to the device
//! concurrently. Work runs on the blocking pool since the underlying SSH
//! I/O is synchronous; cancellation stays cooperative through the token.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Owner of the single active job.
#[derive(Debug, Default)]
pub struct JobSlot {
    current: Option<Job>,
}

#[derive(Debug)]
struct Job {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl JobSlot {
    pub fn new() -> Self {
        JobSlot::default()
    }

    /// Start `work` on the blocking pool, first cancelling and awaiting
    /// any job still occupying the slot. The returned token mirrors the
    /// one handed to `work` and can be used to request cancellation
    /// without taking the slot.
    pub async fn start<F>(&mut self, work: F) -> CancellationToken
    where
        F: FnOnce(CancellationToken) + Send + 'static,
    {
        self.cancel().await;

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let handle = tokio::task::spawn_blocking(move || work(token));
        self.current = Some(Job { cancel: cancel.clone(), handle });
        cancel
    }

    /// Request cancellation of the active job and wait for it to drain.
    /// No-op when the slot is empty.
    pub async fn cancel(&mut self) {
        if let Some(job) = self.current.take() {
            debug!("cancelling previous job");
            job.cancel.cancel();
            // The job observes the token at its next checkpoint; a panic
            // inside the job is not ours to propagate.
            let _ = job.handle.await;
        }
    }

    /// Ask the active job to stop without waiting for it.
    pub fn request_cancel(&self) {
        if let Some(job) = &self.current {
            job.cancel.cancel();
        }
    }

    /// Whether a job is still running in the slot.
    pub fn is_active(&self) -> bool {
        self.current
            .as_ref()
            .is_some_and(|job| !job.handle.is_finished())
    }
}
