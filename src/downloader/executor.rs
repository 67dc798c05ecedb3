//! Harvest executor
//!
//! Wires the pagination driver (one producer task) to the worker pool through
//! the bounded queue, then blocks on the completion tracker until every
//! admitted item has been resolved.

use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

use crate::downloader::config::{ConfigError, HarvestConfig};
use crate::downloader::pool::WorkerPool;
use crate::downloader::rate_limit::RateLimiter;
use crate::downloader::tracker::CompletionTracker;
use crate::downloader::worker::{ArtifactDownloader, ArtifactTransport, HttpTransport, ReportObserver};
use crate::fetcher::pagination::{EndReason, PaginationDriver, PaginationOutcome};
use crate::fetcher::shared_resources::http_client_for;
use crate::fetcher::{CatalogHttpClient, CatalogSource};
use crate::output::{OutputError, OutputPathBuilder};
use crate::shutdown::SharedShutdown;

/// Errors that prevent a harvest from starting
#[derive(Debug, thiserror::Error)]
pub enum HarvestError {
    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// HTTP client could not be built
    #[error("HTTP client: {0}")]
    Client(String),

    /// Output directory could not be prepared
    #[error("output: {0}")]
    Output(#[from] OutputError),
}

/// Final counts of a harvest run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HarvestSummary {
    /// Pages fetched, including the terminating empty page
    pub pages_fetched: u32,
    /// Entries seen across fetched pages
    pub entries_seen: u64,
    /// Entries admitted for download
    pub admitted: u64,
    /// Artifacts stored
    pub succeeded: u64,
    /// Download attempts that failed
    pub failed: u64,
    /// Why enumeration stopped
    pub end: EndReason,
}

impl HarvestSummary {
    /// Catalog fully enumerated and every admitted artifact stored
    pub fn is_complete(&self) -> bool {
        self.end == EndReason::EndOfCatalog && self.failed == 0
    }
}

/// One configured harvest run
pub struct Harvester {
    config: HarvestConfig,
    source: Arc<dyn CatalogSource>,
    transport: Arc<dyn ArtifactTransport>,
    limiter: Option<RateLimiter>,
    shutdown: Option<SharedShutdown>,
    observer: Option<ReportObserver>,
}

impl Harvester {
    /// Create a harvester over explicit catalog and artifact backends
    ///
    /// Validates `config` and creates the output directory. No timer is
    /// started here; the admission clock begins when [`Harvester::run`] starts.
    pub fn new(
        config: HarvestConfig,
        source: Arc<dyn CatalogSource>,
        transport: Arc<dyn ArtifactTransport>,
    ) -> Result<Self, HarvestError> {
        config.validate()?;
        OutputPathBuilder::new(config.output_dir.clone()).ensure_directories()?;

        Ok(Self {
            config,
            source,
            transport,
            limiter: None,
            shutdown: None,
            observer: None,
        })
    }

    /// Create a harvester backed by HTTP for both catalog and artifacts
    pub fn from_config(config: HarvestConfig) -> Result<Self, HarvestError> {
        config.validate()?;
        let client = http_client_for(config.request_timeout)
            .map_err(|e| HarvestError::Client(e.to_string()))?;

        let source = Arc::new(CatalogHttpClient::from_config(&config, Arc::clone(&client)));
        let transport = Arc::new(HttpTransport::new(client));
        Self::new(config, source, transport)
    }

    /// Stop admitting entries once `shutdown` is requested
    pub fn with_shutdown(mut self, shutdown: SharedShutdown) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Replace the admission rate limiter
    pub fn with_limiter(mut self, limiter: RateLimiter) -> Self {
        self.limiter = Some(limiter);
        self
    }

    /// Observe every download report
    pub fn with_observer(mut self, observer: ReportObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Configuration in use
    pub fn config(&self) -> &HarvestConfig {
        &self.config
    }

    /// Run until the catalog ends (or enumeration halts) and every admitted
    /// item is resolved
    ///
    /// Fetch exhaustion and download failures are reported in the summary,
    /// never as errors.
    pub async fn run(self) -> HarvestSummary {
        let config = self.config;
        info!(
            catalog = %self.source.endpoint(),
            threshold = config.threshold,
            workers = config.workers,
            queue_capacity = config.queue_capacity,
            output_dir = %config.output_dir.display(),
            "Starting harvest"
        );

        let limiter = match self.limiter {
            Some(limiter) => limiter,
            None => match RateLimiter::new(config.rate_interval) {
                Ok(limiter) => limiter,
                Err(e) => {
                    error!(error = %e, "Rate limiter could not be started");
                    return HarvestSummary {
                        pages_fetched: 0,
                        entries_seen: 0,
                        admitted: 0,
                        succeeded: 0,
                        failed: 0,
                        end: EndReason::RateLimiterClosed,
                    };
                }
            },
        };

        let paths = OutputPathBuilder::new(config.output_dir.clone())
            .with_extension(&config.file_extension);
        let mut downloader = ArtifactDownloader::new(self.transport, paths);
        if let Some(observer) = self.observer {
            downloader = downloader.with_observer(observer);
        }

        let tracker = CompletionTracker::new();
        let (pool, submitter) =
            WorkerPool::start(config.workers, config.queue_capacity, Arc::new(downloader));

        let mut driver =
            PaginationDriver::new(self.source, config.threshold, limiter, tracker.clone());
        if let Some(shutdown) = self.shutdown {
            driver = driver.with_shutdown(shutdown);
        }

        let producer = tokio::spawn(driver.run(submitter));
        let pagination = match producer.await {
            Ok(outcome) => outcome,
            Err(e) => {
                // The submitter was dropped with the task, so the queue is closed.
                error!(error = %e, "Pagination task ended abnormally");
                tracker.finish_producing();
                PaginationOutcome {
                    pages_fetched: 0,
                    entries_seen: 0,
                    admitted: tracker.snapshot().registered,
                    end: EndReason::Cancelled,
                }
            }
        };

        tracker.wait().await;
        let stats = pool.drain().await;
        let snapshot = tracker.snapshot();

        let summary = HarvestSummary {
            pages_fetched: pagination.pages_fetched,
            entries_seen: pagination.entries_seen,
            admitted: pagination.admitted,
            succeeded: snapshot.succeeded,
            failed: snapshot.failed,
            end: pagination.end,
        };

        info!(
            end = %summary.end,
            pages_fetched = summary.pages_fetched,
            admitted = summary.admitted,
            succeeded = summary.succeeded,
            failed = summary.failed,
            crashed_workers = stats.crashed_workers,
            "Harvest finished"
        );
        summary
    }
}
