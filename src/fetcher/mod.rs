//! Catalog fetcher implementations

use crate::CatalogPage;
use async_trait::async_trait;

pub mod http;
pub mod pagination;
pub mod parser;
pub mod retry_formatter;
pub mod shared_resources;

pub use http::CatalogHttpClient;
pub use pagination::{CatalogPager, EndReason, PageStep, PaginationDriver, PaginationOutcome};
pub use parser::CatalogFormat;

/// Fetcher errors
///
/// Every variant except [`FetcherError::Exhausted`] describes a single failed
/// attempt and is retried locally by the fetcher. `Exhausted` is what callers
/// see once all attempts for a page have failed.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum FetcherError {
    /// Transport-level failure (connect, timeout, body read)
    #[error("network error: {0}")]
    NetworkError(String),

    /// Non-success HTTP status
    #[error("HTTP status {status} for page {page}")]
    HttpStatus {
        /// Page index requested
        page: u32,
        /// Status code received
        status: u16,
    },

    /// Response body could not be decoded into a page
    #[error("decode error: {0}")]
    Decode(String),

    /// All attempts for a page failed
    #[error("failed to fetch page {page} after {attempts} attempts: {last_error}")]
    Exhausted {
        /// Page index that could not be fetched
        page: u32,
        /// Attempts made
        attempts: u32,
        /// Message of the final attempt's error
        last_error: String,
    },
}

impl FetcherError {
    /// Whether this error ends enumeration
    pub fn is_exhausted(&self) -> bool {
        matches!(self, FetcherError::Exhausted { .. })
    }
}

/// Result type for fetcher operations
pub type FetcherResult<T> = Result<T, FetcherError>;

/// Source of catalog pages.
///
/// Implementations own their retry policy: a returned error is final for that
/// page and is expected to be [`FetcherError::Exhausted`].
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Fetch and decode one page; an empty page marks the end of the catalog
    ///
    /// # Arguments
    /// * `page` - 1-based page index
    async fn fetch_page(&self, page: u32) -> FetcherResult<CatalogPage>;

    /// Human-readable endpoint description for diagnostics
    fn endpoint(&self) -> &str;
}
