//! # Catalog Harvester Library
//!
//! Pages through a remote artifact catalog, keeps the entries whose popularity
//! reaches a threshold, and downloads the matching artifacts concurrently.
//!
//! ## Features
//!
//! - **Paginated Enumeration**: Walks catalog pages from index 1 until an empty page
//! - **Retrying Fetches**: Transient page failures are retried a bounded number of times
//! - **Admission Rate Limit**: A single ticking limiter caps how fast work enters the queue
//! - **Bounded Queue**: Backpressure on the producer when workers fall behind
//! - **Fixed Worker Pool**: A configurable number of concurrent downloaders
//! - **Completion Tracking**: The run ends only after every admitted item is resolved
//!
//! ## Quick Start
//!
//! ```no_run
//! use catalog_harvester::downloader::{HarvestConfig, Harvester};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = HarvestConfig::default()
//!     .with_threshold(1000)
//!     .with_workers(5)
//!     .with_output_dir("./artifacts");
//!
//! let harvester = Harvester::from_config(config)?;
//! let summary = harvester.run().await;
//! println!("downloaded {} artifacts", summary.succeeded);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`fetcher`] - Catalog page fetching, decoding, retry, and the pagination driver
//! - [`downloader`] - Rate limiter, worker pool, completion tracker, and the pipeline executor
//! - [`output`] - Deterministic artifact file naming
//! - [`shutdown`] - Cooperative cancellation shared across tasks
//! - [`metrics`] - Pipeline counters with an optional Prometheus endpoint
//!
//! ## Data Types
//!
//! - [`CatalogEntry`] - One record of the remote catalog
//! - [`CatalogPage`] - The ordered entries of one page; empty means end of catalog

#![warn(missing_docs)]
#![warn(clippy::all)]

use serde::{Deserialize, Serialize};

/// CLI command implementations
pub mod cli;

/// Download pipeline orchestration
pub mod downloader;

/// Catalog fetchers and pagination
pub mod fetcher;

/// Pipeline metrics
pub mod metrics;

/// Artifact output naming
pub mod output;

/// Graceful shutdown coordination shared across modules
pub mod shutdown;

/// One record of the remote catalog.
///
/// Entries are produced by the fetcher and never mutated afterwards; the
/// pipeline only moves or clones them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct CatalogEntry {
    /// Identifier, unique within the catalog (e.g., "akismet")
    pub slug: String,
    /// Version label (e.g., "5.3.1")
    pub version: String,
    /// Direct download URI for the artifact
    pub download_link: String,
    /// Popularity metric (e.g., active installs)
    pub popularity: u64,
}

impl CatalogEntry {
    /// Create a new entry
    pub fn new(
        slug: impl Into<String>,
        version: impl Into<String>,
        download_link: impl Into<String>,
        popularity: u64,
    ) -> Self {
        Self {
            slug: slug.into(),
            version: version.into(),
            download_link: download_link.into(),
            popularity,
        }
    }

    /// Whether this entry qualifies for download under `threshold`.
    ///
    /// The comparison is inclusive: an entry exactly at the threshold qualifies.
    pub fn meets_threshold(&self, threshold: u64) -> bool {
        self.popularity >= threshold
    }

    /// Shallow integrity check; the catalog schema is otherwise trusted.
    ///
    /// An empty download link is accepted here and reported by the download
    /// attempt instead.
    pub fn validate(&self) -> Result<(), String> {
        if self.slug.trim().is_empty() {
            return Err("Slug cannot be empty".to_string());
        }

        Ok(())
    }

    /// Whether the entry names somewhere to download from
    pub fn has_download_link(&self) -> bool {
        !self.download_link.trim().is_empty()
    }
}

impl std::fmt::Display for CatalogEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.slug, self.version)
    }
}

/// The ordered entries returned for one page index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogPage {
    /// 1-based page index this page was fetched for
    pub index: u32,
    /// Entries in catalog order
    pub entries: Vec<CatalogEntry>,
    /// Records present in the response that could not be decoded
    pub skipped: usize,
}

impl CatalogPage {
    /// Create a page
    pub fn new(index: u32, entries: Vec<CatalogEntry>) -> Self {
        Self {
            index,
            entries,
            skipped: 0,
        }
    }

    /// Note records dropped while decoding this page
    pub fn with_skipped(mut self, skipped: usize) -> Self {
        self.skipped = skipped;
        self
    }

    /// Whether the page carries no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether the response held no records at all, which terminates pagination.
    ///
    /// A page whose records were all skipped is not the end of the catalog.
    pub fn is_end_of_catalog(&self) -> bool {
        self.entries.is_empty() && self.skipped == 0
    }

    /// Number of entries on the page
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Entries meeting `threshold`, in page order
    pub fn qualifying(&self, threshold: u64) -> impl Iterator<Item = &CatalogEntry> {
        self.entries
            .iter()
            .filter(move |entry| entry.meets_threshold(threshold))
    }
}
