//! Catalog HTTP client
//!
//! Fetches one catalog page per call with:
//! - URL templating (`{page}` placeholder)
//! - Bounded retries on any failure (transport, non-success status, decode)
//! - A fixed pause between attempts

use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::downloader::config::{HarvestConfig, PAGE_PLACEHOLDER};
use crate::fetcher::parser::CatalogFormat;
use crate::fetcher::retry_formatter::{extract_error_type, RetryContext, RetryErrorType};
use crate::fetcher::{CatalogSource, FetcherError, FetcherResult};
use crate::metrics;
use crate::CatalogPage;

/// HTTP-backed [`CatalogSource`]
pub struct CatalogHttpClient {
    client: Arc<Client>,
    url_template: String,
    format: CatalogFormat,
    max_attempts: u32,
    retry_interval: Duration,
}

impl CatalogHttpClient {
    /// Create new catalog client
    ///
    /// # Arguments
    /// * `client` - Shared HTTP client
    /// * `url_template` - Catalog URL containing `{page}`
    /// * `format` - Wire format field names
    /// * `max_attempts` - Total attempts per page (at least 1)
    /// * `retry_interval` - Pause between attempts
    pub fn new(
        client: Arc<Client>,
        url_template: impl Into<String>,
        format: CatalogFormat,
        max_attempts: u32,
        retry_interval: Duration,
    ) -> Self {
        Self {
            client,
            url_template: url_template.into(),
            format,
            max_attempts: max_attempts.max(1),
            retry_interval,
        }
    }

    /// Create a client from harvest configuration
    pub fn from_config(config: &HarvestConfig, client: Arc<Client>) -> Self {
        Self::new(
            client,
            config.catalog_url.clone(),
            config.catalog_format.clone(),
            config.fetch_attempts,
            config.rate_interval,
        )
    }

    /// Total attempts per page
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Pause between attempts
    pub fn retry_interval(&self) -> Duration {
        self.retry_interval
    }

    /// URL requested for `page`
    pub fn page_url(&self, page: u32) -> String {
        self.url_template.replace(PAGE_PLACEHOLDER, &page.to_string())
    }

    /// One request/decode attempt, with the failure classified for logging
    async fn attempt(
        &self,
        page: u32,
        url: &str,
    ) -> Result<CatalogPage, (FetcherError, RetryErrorType)> {
        let response = self.client.get(url).send().await.map_err(|e| {
            let kind = extract_error_type(None, Some(&e));
            (FetcherError::NetworkError(e.to_string()), kind)
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err((
                FetcherError::HttpStatus {
                    page,
                    status: status.as_u16(),
                },
                extract_error_type(Some(status), None),
            ));
        }

        let body = response.bytes().await.map_err(|e| {
            let kind = extract_error_type(None, Some(&e));
            (FetcherError::NetworkError(e.to_string()), kind)
        })?;

        self.format
            .decode(page, &body)
            .map_err(|e| (e, RetryErrorType::Decode))
    }
}

#[async_trait]
impl CatalogSource for CatalogHttpClient {
    async fn fetch_page(&self, page: u32) -> FetcherResult<CatalogPage> {
        let url = self.page_url(page);
        let mut last_error = String::from("no attempt made");

        for attempt in 1..=self.max_attempts {
            debug!(page, attempt, url = %url, "Fetching catalog page");

            match self.attempt(page, &url).await {
                Ok(catalog_page) => {
                    if attempt > 1 {
                        let ctx = RetryContext::new(
                            attempt,
                            self.max_attempts,
                            RetryErrorType::NetworkGeneric,
                            Duration::ZERO,
                            page,
                            "",
                            &url,
                        );
                        info!("{}", ctx.format_success());
                    }
                    debug!(page, entries = catalog_page.len(), "Catalog page decoded");
                    metrics::record_page_fetched(attempt);
                    return Ok(catalog_page);
                }
                Err((err, kind)) => {
                    let ctx = RetryContext::new(
                        attempt,
                        self.max_attempts,
                        kind,
                        self.retry_interval,
                        page,
                        err.to_string(),
                        &url,
                    );
                    last_error = err.to_string();

                    if ctx.has_next_attempt() {
                        warn!(page, attempt, error = %err, "{}", ctx.format_retry());
                        metrics::record_fetch_retry();
                        tokio::time::sleep(self.retry_interval).await;
                    } else {
                        warn!(page, "{}", ctx.format_failure());
                    }
                }
            }
        }

        Err(FetcherError::Exhausted {
            page,
            attempts: self.max_attempts,
            last_error,
        })
    }

    fn endpoint(&self) -> &str {
        &self.url_template
    }
}
