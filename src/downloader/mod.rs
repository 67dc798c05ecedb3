//! Download pipeline orchestration
//!
//! This module holds the consumer half of the harvest pipeline and the
//! executor that wires both halves together.
//!
//! # Overview
//!
//! 1. **Admission**: the pagination driver acquires a [`rate_limit::RateLimiter`]
//!    permit, registers an obligation with the [`tracker::CompletionTracker`],
//!    and submits a [`job::WorkItem`]
//! 2. **Queueing**: items wait in a bounded queue; a full queue blocks the producer
//! 3. **Download**: a [`pool::WorkerPool`] of fixed size drains the queue, one
//!    [`worker::ArtifactDownloader`] attempt per item
//! 4. **Completion**: each item's obligation is released after its attempt,
//!    success or failure
//! 5. **Termination**: [`executor::Harvester`] returns once the producer is done
//!    and nothing is outstanding
//!
//! # Quick Start
//!
//! ```no_run
//! use catalog_harvester::downloader::{HarvestConfig, Harvester};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let harvester = Harvester::from_config(HarvestConfig::default())?;
//! let summary = harvester.run().await;
//! println!("{} ok, {} failed", summary.succeeded, summary.failed);
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! Download failures never propagate: each one is reported as a
//! [`DownloadError`], counted complete, and has no effect on sibling items.

pub mod config;
pub mod executor;
pub mod job;
pub mod pool;
pub mod rate_limit;
pub mod tracker;
pub mod worker;

pub use config::{ConfigError, HarvestConfig};
pub use executor::{HarvestError, HarvestSummary, Harvester};
pub use job::{DownloadOutcome, DownloadReport, WorkItem};
pub use pool::{PoolStats, QueueClosed, Submitter, WorkHandler, WorkerPool};
pub use rate_limit::{IntervalTicker, ManualTicker, RateLimitError, RateLimiter, TickHandle, Ticker};
pub use tracker::{CompletionTracker, Obligation, TrackerSnapshot};
pub use worker::{ArtifactDownloader, ArtifactTransport, ByteStream, HttpTransport, ReportObserver};

use std::path::PathBuf;

/// Failure of one artifact download
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// Request could not be sent or the connection failed
    #[error("transport error for {location}: {reason}")]
    Transport {
        /// Artifact location
        location: String,
        /// Underlying error
        reason: String,
    },

    /// Server answered with a non-success status
    #[error("HTTP status {status} for {location}")]
    Status {
        /// Artifact location
        location: String,
        /// Status code received
        status: u16,
    },

    /// Body stream failed part-way
    #[error("stream error for {location}: {reason}")]
    Stream {
        /// Artifact location
        location: String,
        /// Underlying error
        reason: String,
    },

    /// Output file could not be created
    #[error("failed to create {}: {source}", path.display())]
    Create {
        /// Target path
        path: PathBuf,
        /// IO error
        #[source]
        source: std::io::Error,
    },

    /// Output file could not be written or flushed
    #[error("failed to write {}: {source}", path.display())]
    Write {
        /// Target path
        path: PathBuf,
        /// IO error
        #[source]
        source: std::io::Error,
    },
}

impl DownloadError {
    /// Short machine-friendly label, used as a metrics dimension
    pub fn kind(&self) -> &'static str {
        match self {
            DownloadError::Transport { .. } => "transport",
            DownloadError::Status { .. } => "status",
            DownloadError::Stream { .. } => "stream",
            DownloadError::Create { .. } => "create",
            DownloadError::Write { .. } => "write",
        }
    }
}
