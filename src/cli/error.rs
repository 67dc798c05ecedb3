//! CLI error types and conversions

use crate::downloader::{ConfigError, HarvestError};
use crate::fetcher::FetcherError;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Invalid tunables
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Harvest could not start
    #[error("harvest error: {0}")]
    Harvest(#[from] HarvestError),

    /// Fetcher error
    #[error("fetcher error: {0}")]
    FetcherError(#[from] FetcherError),

    /// Result serialization failed
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Runtime setup failed
    #[error("configuration error: {0}")]
    ConfigurationError(String),
}
