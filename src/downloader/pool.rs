//! Fixed-size worker pool draining a bounded multi-consumer queue.
//!
//! [`WorkerPool::start`] spawns the workers and returns the pool together with
//! the queue's only [`Submitter`]. Closing or dropping the submitter is the
//! end-of-input signal: workers finish the items still queued, then exit.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::downloader::job::{DownloadReport, WorkItem};

/// Processes one work item per call
#[async_trait]
pub trait WorkHandler: Send + Sync + 'static {
    /// Perform the attempt for `item`. Must not panic on expected failures;
    /// failures are reported through the returned outcome.
    async fn handle(&self, item: &WorkItem) -> DownloadReport;

    /// Observe a report before its item is marked complete
    fn on_report(&self, _report: &DownloadReport) {}
}

/// The queue was closed before the item could be submitted
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("work queue is closed")]
pub struct QueueClosed;

/// Producer side of the work queue
#[derive(Debug)]
pub struct Submitter {
    tx: async_channel::Sender<WorkItem>,
}

impl Submitter {
    /// Submit an item, waiting while the queue is full
    ///
    /// If the queue is closed the item is dropped, which releases its
    /// obligation as failed.
    pub async fn submit(&self, item: WorkItem) -> Result<(), QueueClosed> {
        self.tx.send(item).await.map_err(|rejected| {
            warn!(
                seq = rejected.0.seq,
                slug = %rejected.0.entry.slug,
                "Work queue closed; dropping item"
            );
            QueueClosed
        })
    }

    /// Items currently waiting in the queue
    pub fn queued(&self) -> usize {
        self.tx.len()
    }

    /// Queue capacity
    pub fn capacity(&self) -> usize {
        self.tx.capacity().unwrap_or(usize::MAX)
    }

    /// Close the queue; workers exit once it is drained
    pub fn close(self) {
        self.tx.close();
    }
}

/// Statistics returned by [`WorkerPool::drain`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Items processed by each worker, by worker id
    pub processed_per_worker: Vec<u64>,
    /// Workers that ended abnormally
    pub crashed_workers: usize,
}

impl PoolStats {
    /// Items processed across all workers
    pub fn total_processed(&self) -> u64 {
        self.processed_per_worker.iter().sum()
    }
}

/// Fixed pool of queue-draining workers
#[derive(Debug)]
pub struct WorkerPool {
    workers: Vec<JoinHandle<u64>>,
}

impl WorkerPool {
    /// Spawn `size` workers over a queue holding at most `capacity` items
    ///
    /// # Panics
    /// Panics if `capacity` is zero
    pub fn start<H: WorkHandler>(size: usize, capacity: usize, handler: Arc<H>) -> (Self, Submitter) {
        let (tx, rx) = async_channel::bounded(capacity);

        let workers = (0..size.max(1))
            .map(|id| {
                let rx = rx.clone();
                let handler = Arc::clone(&handler);
                tokio::spawn(run_worker(id, rx, handler))
            })
            .collect();

        debug!(workers = size.max(1), capacity, "Worker pool started");
        (Self { workers }, Submitter { tx })
    }

    /// Number of workers
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Wait for every worker to exit; requires the submitter to be closed
    pub async fn drain(self) -> PoolStats {
        let mut stats = PoolStats::default();

        for (id, worker) in self.workers.into_iter().enumerate() {
            match worker.await {
                Ok(processed) => stats.processed_per_worker.push(processed),
                Err(e) => {
                    error!(worker = id, error = %e, "Download worker ended abnormally");
                    stats.processed_per_worker.push(0);
                    stats.crashed_workers += 1;
                }
            }
        }

        stats
    }
}

async fn run_worker<H: WorkHandler>(
    id: usize,
    rx: async_channel::Receiver<WorkItem>,
    handler: Arc<H>,
) -> u64 {
    let mut processed = 0;

    while let Ok(item) = rx.recv().await {
        debug!(worker = id, seq = item.seq, slug = %item.entry.slug, "Dequeued work item");

        let report = handler.handle(&item).await;
        handler.on_report(&report);
        item.complete(report.is_success());
        processed += 1;
    }

    debug!(worker = id, processed, "Work queue closed; worker exiting");
    processed
}
