//! Harvest observability metrics
//!
//! Recording functions are always safe to call: without an installed
//! recorder the `metrics` macros are no-ops.
//!
//! ## Exported series
//!
//! - `catalog_pages_fetched_total` / `catalog_fetch_retries_total`
//! - `catalog_fetch_attempts` (attempts needed per successful page)
//! - `rate_limit_wait_seconds`
//! - `work_items_admitted_total` / `work_items_outstanding`
//! - `downloads_total{outcome}` / `download_duration_seconds{outcome}`
//! - `download_bytes_total`

use metrics::{
    counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit,
};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::Lazy;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Whether the Prometheus exporter has been installed
static METRICS_INITIALIZED: Lazy<Arc<RwLock<bool>>> = Lazy::new(|| Arc::new(RwLock::new(false)));

/// Outcome label for a stored artifact
pub const OUTCOME_SUCCESS: &str = "success";

/// Initialize the Prometheus exporter on `addr`
///
/// Idempotent; must run inside a tokio runtime.
pub async fn init_metrics(addr: SocketAddr) -> Result<(), Box<dyn std::error::Error>> {
    let mut initialized = METRICS_INITIALIZED.write().await;
    if *initialized {
        debug!("Metrics already initialized, skipping");
        return Ok(());
    }

    info!("Initializing metrics system on {}", addr);

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {e}"))?;

    describe_counter!(
        "catalog_pages_fetched_total",
        Unit::Count,
        "Catalog pages fetched successfully"
    );
    describe_counter!(
        "catalog_fetch_retries_total",
        Unit::Count,
        "Catalog page fetch attempts that failed and were retried"
    );
    describe_histogram!(
        "catalog_fetch_attempts",
        Unit::Count,
        "Attempts needed per successfully fetched page"
    );
    describe_histogram!(
        "rate_limit_wait_seconds",
        Unit::Seconds,
        "Time spent waiting for an admission permit"
    );
    describe_counter!(
        "work_items_admitted_total",
        Unit::Count,
        "Entries admitted into the download queue"
    );
    describe_gauge!(
        "work_items_outstanding",
        Unit::Count,
        "Admitted items not yet completed"
    );
    describe_counter!(
        "downloads_total",
        Unit::Count,
        "Download attempts by outcome"
    );
    describe_histogram!(
        "download_duration_seconds",
        Unit::Seconds,
        "Download attempt duration in seconds"
    );
    describe_counter!(
        "download_bytes_total",
        Unit::Bytes,
        "Artifact bytes written to disk"
    );

    *initialized = true;
    info!("Metrics system initialized successfully");
    Ok(())
}

/// Check if the metrics system is initialized
pub async fn is_initialized() -> bool {
    *METRICS_INITIALIZED.read().await
}

/// A page was fetched on attempt number `attempt` (1-based)
pub fn record_page_fetched(attempt: u32) {
    counter!("catalog_pages_fetched_total").increment(1);
    histogram!("catalog_fetch_attempts").record(attempt as f64);
}

/// A page fetch attempt failed and will be retried
pub fn record_fetch_retry() {
    counter!("catalog_fetch_retries_total").increment(1);
}

/// Time a caller waited for an admission permit
pub fn record_admission_wait(waited: Duration) {
    histogram!("rate_limit_wait_seconds").record(waited.as_secs_f64());
}

/// An entry entered the queue
pub fn record_admitted() {
    counter!("work_items_admitted_total").increment(1);
}

/// Current outstanding obligation count
pub fn record_outstanding(outstanding: usize) {
    gauge!("work_items_outstanding").set(outstanding as f64);
}

/// Times one download attempt
pub struct DownloadTimer {
    start_time: Instant,
}

impl DownloadTimer {
    /// Start timing
    pub fn start() -> Self {
        Self {
            start_time: Instant::now(),
        }
    }

    /// Time since start
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Record a stored artifact; returns the elapsed time
    pub fn record_success(&self, bytes: u64) -> Duration {
        let duration = self.elapsed();
        counter!("downloads_total", "outcome" => OUTCOME_SUCCESS).increment(1);
        counter!("download_bytes_total").increment(bytes);
        histogram!("download_duration_seconds", "outcome" => OUTCOME_SUCCESS)
            .record(duration.as_secs_f64());
        duration
    }

    /// Record a failed attempt labelled with `kind`; returns the elapsed time
    pub fn record_failure(&self, kind: &'static str) -> Duration {
        let duration = self.elapsed();
        counter!("downloads_total", "outcome" => kind).increment(1);
        histogram!("download_duration_seconds", "outcome" => kind).record(duration.as_secs_f64());
        duration
    }
}
