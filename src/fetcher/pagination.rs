//! Catalog pagination
//!
//! [`CatalogPager`] walks pages 1, 2, 3, ... until a page comes back empty or
//! a fetch exhausts its retries. [`PaginationDriver`] is the producer half of
//! the harvest pipeline: it runs the pager, filters entries by popularity, and
//! admits each qualifying entry through the rate limiter into the work queue.
//!
//! Safety properties:
//! - Entries are submitted in catalog order (page order, then position)
//! - An obligation is registered before its item is submitted
//! - The queue is closed exactly once, whatever ends the loop

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::downloader::job::WorkItem;
use crate::downloader::pool::Submitter;
use crate::downloader::rate_limit::RateLimiter;
use crate::downloader::tracker::CompletionTracker;
use crate::fetcher::{CatalogSource, FetcherError};
use crate::metrics;
use crate::shutdown::SharedShutdown;
use crate::CatalogPage;

/// First page index of every catalog
pub const FIRST_PAGE: u32 = 1;

/// Result of advancing a [`CatalogPager`]
#[derive(Debug)]
pub enum PageStep {
    /// A page that held at least one record
    Entries(CatalogPage),
    /// The catalog is exhausted, or the pager already stopped
    End,
    /// The page could not be fetched; the pager has stopped
    Failed(FetcherError),
}

/// Sequential page cursor over a [`CatalogSource`]
pub struct CatalogPager {
    source: Arc<dyn CatalogSource>,
    next_index: u32,
    finished: bool,
}

impl CatalogPager {
    /// Start at page 1
    pub fn new(source: Arc<dyn CatalogSource>) -> Self {
        Self {
            source,
            next_index: FIRST_PAGE,
            finished: false,
        }
    }

    /// Index the next call will request
    pub fn next_index(&self) -> u32 {
        self.next_index
    }

    /// Whether the pager has stopped
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Fetch the next page
    pub async fn next_page(&mut self) -> PageStep {
        if self.finished {
            return PageStep::End;
        }

        let index = self.next_index;
        match self.source.fetch_page(index).await {
            Ok(page) if page.is_end_of_catalog() => {
                debug!(page = index, "Empty page; end of catalog");
                self.finished = true;
                PageStep::End
            }
            Ok(page) => {
                debug!(
                    page = index,
                    entries = page.len(),
                    skipped = page.skipped,
                    "Fetched catalog page"
                );
                self.next_index += 1;
                PageStep::Entries(page)
            }
            Err(e) => {
                self.finished = true;
                PageStep::Failed(e)
            }
        }
    }
}

/// Why the pagination loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum EndReason {
    /// An empty page was returned
    EndOfCatalog,
    /// A page failed after every retry
    FetchExhausted {
        /// Page that could not be fetched
        page: u32,
    },
    /// Shutdown was requested
    Cancelled,
    /// The rate limiter stopped issuing permits
    RateLimiterClosed,
    /// Every worker went away before the catalog was exhausted
    QueueClosed,
}

impl std::fmt::Display for EndReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EndReason::EndOfCatalog => write!(f, "end of catalog"),
            EndReason::FetchExhausted { page } => write!(f, "page {page} could not be fetched"),
            EndReason::Cancelled => write!(f, "cancelled"),
            EndReason::RateLimiterClosed => write!(f, "rate limiter closed"),
            EndReason::QueueClosed => write!(f, "work queue closed"),
        }
    }
}

/// Counters from one pagination run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PaginationOutcome {
    /// Pages fetched successfully, including the terminating empty page
    pub pages_fetched: u32,
    /// Entries seen across all pages
    pub entries_seen: u64,
    /// Entries admitted into the queue
    pub admitted: u64,
    /// Why the loop stopped
    pub end: EndReason,
}

/// Producer loop: paginate, filter, admit
pub struct PaginationDriver {
    pager: CatalogPager,
    threshold: u64,
    limiter: RateLimiter,
    tracker: CompletionTracker,
    shutdown: Option<SharedShutdown>,
}

impl PaginationDriver {
    /// Create a driver admitting entries with popularity `>= threshold`
    pub fn new(
        source: Arc<dyn CatalogSource>,
        threshold: u64,
        limiter: RateLimiter,
        tracker: CompletionTracker,
    ) -> Self {
        Self {
            pager: CatalogPager::new(source),
            threshold,
            limiter,
            tracker,
            shutdown: None,
        }
    }

    /// Stop admitting once `shutdown` is requested
    pub fn with_shutdown(mut self, shutdown: SharedShutdown) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Run to completion
    ///
    /// Consumes `submitter` and closes the queue before returning, then marks
    /// the tracker's producer as finished.
    pub async fn run(mut self, submitter: Submitter) -> PaginationOutcome {
        let outcome = self.drive(&submitter).await;

        submitter.close();
        self.tracker.finish_producing();

        info!(
            end = %outcome.end,
            pages_fetched = outcome.pages_fetched,
            entries_seen = outcome.entries_seen,
            admitted = outcome.admitted,
            "Catalog enumeration finished"
        );

        outcome
    }

    async fn drive(&mut self, submitter: &Submitter) -> PaginationOutcome {
        let shutdown = self.shutdown.clone();
        let mut outcome = PaginationOutcome {
            pages_fetched: 0,
            entries_seen: 0,
            admitted: 0,
            end: EndReason::EndOfCatalog,
        };
        let mut seq = 0u64;

        loop {
            if is_cancelled(&shutdown) {
                outcome.end = EndReason::Cancelled;
                return outcome;
            }

            let step = tokio::select! {
                biased;
                _ = cancelled(&shutdown) => {
                    outcome.end = EndReason::Cancelled;
                    return outcome;
                }
                step = self.pager.next_page() => step,
            };

            let page = match step {
                PageStep::Entries(page) => page,
                PageStep::End => {
                    outcome.pages_fetched += 1;
                    outcome.end = EndReason::EndOfCatalog;
                    return outcome;
                }
                PageStep::Failed(e) => {
                    let page = match &e {
                        FetcherError::Exhausted { page, .. } => *page,
                        _ => self.pager.next_index(),
                    };
                    error!(page, error = %e, "Failed to fetch catalog page");
                    outcome.end = EndReason::FetchExhausted { page };
                    return outcome;
                }
            };

            outcome.pages_fetched += 1;
            outcome.entries_seen += page.len() as u64;
            let mut admitted_here = 0u64;

            for entry in page.qualifying(self.threshold) {
                let permit = tokio::select! {
                    biased;
                    _ = cancelled(&shutdown) => {
                        outcome.end = EndReason::Cancelled;
                        return outcome;
                    }
                    permit = self.limiter.acquire() => permit,
                };
                if let Err(e) = permit {
                    warn!(page = page.index, error = %e, "No further admissions possible");
                    outcome.end = EndReason::RateLimiterClosed;
                    return outcome;
                }

                seq += 1;
                let item = WorkItem::new(seq, page.index, entry.clone(), self.tracker.register());
                debug!(seq, page = page.index, slug = %entry.slug, version = %entry.version, "Admitting entry");

                if submitter.submit(item).await.is_err() {
                    outcome.end = EndReason::QueueClosed;
                    return outcome;
                }
                metrics::record_admitted();
                outcome.admitted += 1;
                admitted_here += 1;
            }

            info!(
                page = page.index,
                entries = page.len(),
                admitted = admitted_here,
                "Processed catalog page"
            );
        }
    }
}

fn is_cancelled(shutdown: &Option<SharedShutdown>) -> bool {
    shutdown
        .as_ref()
        .is_some_and(|s| s.is_shutdown_requested())
}

async fn cancelled(shutdown: &Option<SharedShutdown>) {
    match shutdown {
        Some(s) => s.wait_for_shutdown().await,
        None => std::future::pending().await,
    }
}
