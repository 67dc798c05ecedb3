//! Harvest configuration and defaults

use std::path::PathBuf;
use std::time::Duration;

use crate::fetcher::parser::CatalogFormat;

/// Minimum popularity an entry needs to be admitted for download.
pub const DEFAULT_POPULARITY_THRESHOLD: u64 = 1000;

/// Number of concurrent download workers.
pub const DEFAULT_WORKERS: usize = 5;

/// Total attempts per catalog page before the fetch is considered exhausted.
pub const DEFAULT_FETCH_ATTEMPTS: u32 = 3;

/// Admission interval: one work item enters the queue per tick (2 per second).
/// Failed page fetches wait the same interval before the next attempt.
pub const DEFAULT_RATE_INTERVAL: Duration = Duration::from_millis(500);

/// Work queue capacity, twice the default worker count.
pub const DEFAULT_QUEUE_CAPACITY: usize = DEFAULT_WORKERS * 2;

/// Extension appended to `<slug>-<version>` when naming artifacts.
pub const DEFAULT_FILE_EXTENSION: &str = "zip";

/// Placeholder replaced with the page index in catalog URL templates.
pub const PAGE_PLACEHOLDER: &str = "{page}";

/// WordPress plugin directory query, the catalog this tool was first pointed at.
pub const DEFAULT_CATALOG_URL: &str =
    "https://api.wordpress.org/plugins/info/1.2/?action=query_plugins&request[page]={page}";

/// Overall timeout for one HTTP request, artifact bodies included.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Configuration errors
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Worker count must be positive
    #[error("worker count must be at least 1")]
    ZeroWorkers,

    /// Queue capacity must be positive
    #[error("queue capacity must be at least 1")]
    ZeroQueueCapacity,

    /// At least one fetch attempt is required
    #[error("fetch attempts must be at least 1")]
    ZeroFetchAttempts,

    /// The rate limiter needs a non-zero period
    #[error("rate interval must be greater than zero")]
    ZeroRateInterval,

    /// A zero HTTP timeout fails every request immediately
    #[error("request timeout must be greater than zero")]
    ZeroRequestTimeout,

    /// Catalog URL template is unusable
    #[error("invalid catalog URL template '{0}': must be http(s) and contain {PAGE_PLACEHOLDER}")]
    InvalidCatalogUrl(String),

    /// File extension is unusable
    #[error("invalid file extension '{0}'")]
    InvalidExtension(String),
}

/// Tunables for one harvest run.
#[derive(Debug, Clone)]
pub struct HarvestConfig {
    /// Catalog URL template containing [`PAGE_PLACEHOLDER`]
    pub catalog_url: String,
    /// Field names of the catalog wire format
    pub catalog_format: CatalogFormat,
    /// Minimum popularity to admit an entry (inclusive)
    pub threshold: u64,
    /// Number of download workers
    pub workers: usize,
    /// Attempts per catalog page
    pub fetch_attempts: u32,
    /// Admission interval, also the pause between failed page attempts
    pub rate_interval: Duration,
    /// Bounded work queue capacity
    pub queue_capacity: usize,
    /// Directory artifacts are written to
    pub output_dir: PathBuf,
    /// Artifact file extension, without the dot
    pub file_extension: String,
    /// Per-request HTTP timeout
    pub request_timeout: Duration,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            catalog_url: DEFAULT_CATALOG_URL.to_string(),
            catalog_format: CatalogFormat::default(),
            threshold: DEFAULT_POPULARITY_THRESHOLD,
            workers: DEFAULT_WORKERS,
            fetch_attempts: DEFAULT_FETCH_ATTEMPTS,
            rate_interval: DEFAULT_RATE_INTERVAL,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            output_dir: PathBuf::from("."),
            file_extension: DEFAULT_FILE_EXTENSION.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl HarvestConfig {
    /// Set the catalog URL template
    pub fn with_catalog_url(mut self, url: impl Into<String>) -> Self {
        self.catalog_url = url.into();
        self
    }

    /// Set the catalog wire format
    pub fn with_catalog_format(mut self, format: CatalogFormat) -> Self {
        self.catalog_format = format;
        self
    }

    /// Set the popularity threshold
    pub fn with_threshold(mut self, threshold: u64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Set the worker count
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Set attempts per catalog page
    pub fn with_fetch_attempts(mut self, attempts: u32) -> Self {
        self.fetch_attempts = attempts;
        self
    }

    /// Set the admission interval
    pub fn with_rate_interval(mut self, interval: Duration) -> Self {
        self.rate_interval = interval;
        self
    }

    /// Set the work queue capacity
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Set the output directory
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Set the artifact file extension
    pub fn with_file_extension(mut self, ext: impl Into<String>) -> Self {
        self.file_extension = ext.into();
        self
    }

    /// Set the per-request timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Build the catalog URL for one page
    pub fn page_url(&self, page: u32) -> String {
        self.catalog_url.replace(PAGE_PLACEHOLDER, &page.to_string())
    }

    /// Check every tunable before any task is started
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::ZeroWorkers);
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::ZeroQueueCapacity);
        }
        if self.fetch_attempts == 0 {
            return Err(ConfigError::ZeroFetchAttempts);
        }
        if self.rate_interval.is_zero() {
            return Err(ConfigError::ZeroRateInterval);
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::ZeroRequestTimeout);
        }

        let url = self.catalog_url.trim();
        let http = url.starts_with("http://") || url.starts_with("https://");
        if !http || !url.contains(PAGE_PLACEHOLDER) {
            return Err(ConfigError::InvalidCatalogUrl(self.catalog_url.clone()));
        }

        let ext = self.file_extension.trim_start_matches('.');
        if ext.contains(['/', '\\']) || ext.contains("..") {
            return Err(ConfigError::InvalidExtension(self.file_extension.clone()));
        }

        Ok(())
    }
}
