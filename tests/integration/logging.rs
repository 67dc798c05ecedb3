//! Integration tests for logging and tracing

use catalog_harvester::downloader::CompletionTracker;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[test]
fn test_tracing_subscriber_initialization() {
    let result = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("catalog_harvester=debug")),
        )
        .with_test_writer()
        .try_init();

    // Another test may have installed the global subscriber first.
    assert!(result.is_ok() || result.is_err());
}

#[test]
fn test_tracing_json_format() {
    let result = tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::new("catalog_harvester=info"))
        .with_test_writer()
        .try_init();

    assert!(result.is_ok() || result.is_err());
}

#[test]
fn test_env_filter_parsing() {
    for directive in ["info", "catalog_harvester=debug", "warn,catalog_harvester=trace"] {
        assert!(EnvFilter::try_new(directive).is_ok(), "{directive}");
    }
}

#[test]
fn test_structured_fields_and_dropped_obligation_warning() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("catalog_harvester=debug"))
        .with_test_writer()
        .try_init();

    info!(page = 1, slug = "akismet", version = "5.3", "Downloaded artifact");
    warn!(slug = "broken", location = "https://d.example/broken.zip", error = "refused", "Download failed");
    error!(page = 7, "Failed to fetch catalog page");

    // Dropping an unresolved obligation logs a warning and counts as failed.
    let tracker = CompletionTracker::new();
    drop(tracker.register());
    assert_eq!(tracker.snapshot().failed, 1);
}
