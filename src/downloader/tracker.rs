//! Completion tracking for admitted work items.
//!
//! Every admitted item holds an [`Obligation`] registered with a
//! [`CompletionTracker`]. The tracker counts outstanding obligations and
//! releases [`CompletionTracker::wait`] once the producer has finished and the
//! count has returned to zero.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::warn;

use crate::metrics;

#[derive(Debug, Default)]
struct TrackerState {
    outstanding: AtomicUsize,
    registered: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    producer_done: AtomicBool,
    notify: Notify,
}

/// Shared outstanding-obligation counter used as the termination gate.
#[derive(Debug, Clone, Default)]
pub struct CompletionTracker {
    state: Arc<TrackerState>,
}

/// Point-in-time view of tracker counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TrackerSnapshot {
    /// Obligations not yet completed
    pub outstanding: usize,
    /// Obligations ever registered
    pub registered: u64,
    /// Obligations completed successfully
    pub succeeded: u64,
    /// Obligations completed as failed
    pub failed: u64,
}

impl CompletionTracker {
    /// Create a tracker with nothing outstanding
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one obligation.
    ///
    /// Call this before the matching item is submitted so the count can never
    /// be observed at zero while the item is queued.
    pub fn register(&self) -> Obligation {
        let outstanding = self.state.outstanding.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.registered.fetch_add(1, Ordering::SeqCst);
        metrics::record_outstanding(outstanding);
        Obligation {
            tracker: self.clone(),
            released: false,
        }
    }

    /// Mark the producer as finished; no further obligations will be registered
    pub fn finish_producing(&self) {
        if !self.state.producer_done.swap(true, Ordering::SeqCst) {
            self.state.notify.notify_waiters();
        }
    }

    /// Whether the producer has finished
    pub fn is_producing(&self) -> bool {
        !self.state.producer_done.load(Ordering::SeqCst)
    }

    /// Obligations not yet completed
    pub fn outstanding(&self) -> usize {
        self.state.outstanding.load(Ordering::SeqCst)
    }

    /// Whether the producer is done and nothing is outstanding
    pub fn is_settled(&self) -> bool {
        !self.is_producing() && self.outstanding() == 0
    }

    /// Snapshot of all counters
    pub fn snapshot(&self) -> TrackerSnapshot {
        TrackerSnapshot {
            outstanding: self.outstanding(),
            registered: self.state.registered.load(Ordering::SeqCst),
            succeeded: self.state.succeeded.load(Ordering::SeqCst),
            failed: self.state.failed.load(Ordering::SeqCst),
        }
    }

    /// Wait until the producer has finished and every obligation is complete
    pub async fn wait(&self) {
        loop {
            let notified = self.state.notify.notified();
            tokio::pin!(notified);
            // Register interest before checking, so a release between the
            // check and the await is not missed.
            notified.as_mut().enable();

            if self.is_settled() {
                return;
            }
            notified.await;
        }
    }

    fn release(&self, success: bool) {
        if success {
            self.state.succeeded.fetch_add(1, Ordering::SeqCst);
        } else {
            self.state.failed.fetch_add(1, Ordering::SeqCst);
        }

        let previous = self.state.outstanding.fetch_sub(1, Ordering::SeqCst);
        metrics::record_outstanding(previous - 1);
        if previous == 1 {
            self.state.notify.notify_waiters();
        }
    }
}

/// One outstanding download obligation.
///
/// Completed exactly once: explicitly through [`Obligation::complete`], or as
/// a failure when dropped without completing.
#[derive(Debug)]
#[must_use = "an obligation is released as failed when dropped"]
pub struct Obligation {
    tracker: CompletionTracker,
    released: bool,
}

impl Obligation {
    /// Complete the obligation with the attempt's outcome
    pub fn complete(mut self, success: bool) {
        self.released = true;
        self.tracker.release(success);
    }
}

impl Drop for Obligation {
    fn drop(&mut self) {
        if !self.released {
            warn!("Work item dropped before completion; counting it as failed");
            self.tracker.release(false);
        }
    }
}
