//! Work items and download reports

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::downloader::tracker::Obligation;
use crate::downloader::DownloadError;
use crate::CatalogEntry;

/// A catalog entry accepted for download.
///
/// Created by the pagination driver at admission, consumed by exactly one
/// worker. Not `Clone`: the item carries its completion obligation, so it can
/// only be resolved once.
#[derive(Debug)]
pub struct WorkItem {
    /// Admission sequence number, in catalog order (starting at 1)
    pub seq: u64,
    /// Page the entry was found on
    pub page: u32,
    /// The admitted entry
    pub entry: CatalogEntry,
    obligation: Obligation,
}

impl WorkItem {
    /// Create an item holding a registered obligation
    pub fn new(seq: u64, page: u32, entry: CatalogEntry, obligation: Obligation) -> Self {
        Self {
            seq,
            page,
            entry,
            obligation,
        }
    }

    /// Resolve the item, releasing its obligation
    pub fn complete(self, success: bool) -> CatalogEntry {
        self.obligation.complete(success);
        self.entry
    }
}

/// Result of one download attempt
#[derive(Debug)]
pub enum DownloadOutcome {
    /// Artifact written and flushed to disk
    Downloaded {
        /// File written
        path: PathBuf,
        /// Bytes written
        bytes: u64,
    },
    /// Attempt failed; the item is still complete
    Failed(DownloadError),
}

impl DownloadOutcome {
    /// Whether the artifact was stored
    pub fn is_success(&self) -> bool {
        matches!(self, DownloadOutcome::Downloaded { .. })
    }
}

/// Report of one resolved work item
#[derive(Debug)]
pub struct DownloadReport {
    /// Admission sequence number
    pub seq: u64,
    /// Identifier of the entry
    pub slug: String,
    /// Version of the entry
    pub version: String,
    /// Artifact location requested
    pub location: String,
    /// What happened
    pub outcome: DownloadOutcome,
    /// Time spent on the attempt
    pub elapsed: Duration,
}

impl DownloadReport {
    /// Whether the artifact was stored
    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }

    /// File the artifact was written to, if stored
    pub fn stored_path(&self) -> Option<&Path> {
        match &self.outcome {
            DownloadOutcome::Downloaded { path, .. } => Some(path),
            DownloadOutcome::Failed(_) => None,
        }
    }
}
