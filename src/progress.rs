//! Progress reporting for long-running jobs.
//!
//! One watch channel carries the latest state to a single presentation
//! consumer; intermediate states may be skipped, only the most recent one
//! matters. `None` means no job is active.

use tokio::sync::watch;

/// Most recent status of a long-running operation. An absent fraction is
/// the indeterminate/startup phase.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressState {
    pub fraction: Option<f32>,
    pub message: Option<String>,
}

impl ProgressState {
    pub fn indeterminate() -> Self {
        ProgressState::default()
    }

    pub fn at(fraction: f32, message: impl Into<String>) -> Self {
        ProgressState {
            fraction: Some(fraction),
            message: Some(message.into()),
        }
    }
}

/// Receiving side handed to the presentation layer.
pub type ProgressReceiver = watch::Receiver<Option<ProgressState>>;

/// Publishing side threaded through jobs.
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    tx: watch::Sender<Option<ProgressState>>,
}

impl ProgressReporter {
    pub fn report(&self, fraction: f32, message: impl Into<String>) {
        let _ = self.tx.send(Some(ProgressState::at(fraction, message)));
    }

    pub fn indeterminate(&self) {
        let _ = self.tx.send(Some(ProgressState::indeterminate()));
    }

    /// Marks the job as finished; the presentation layer drops its
    /// progress affordance on `None`.
    pub fn clear(&self) {
        let _ = self.tx.send(None);
    }
}

/// Create a reporter/receiver pair with no job active.
pub fn progress_channel() -> (ProgressReporter, ProgressReceiver) {
    let (tx, rx) = watch::channel(None);
    (ProgressReporter { tx }, rx)
}
