//! Shared HTTP client for catalog and artifact requests
//!
//! The catalog fetcher and every download worker issue requests through one
//! `reqwest::Client` so they share a connection pool.

use once_cell::sync::Lazy;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

use crate::downloader::config::DEFAULT_REQUEST_TIMEOUT;

/// HTTP connect timeout (seconds) - time to establish TCP connection
const HTTP_CONNECT_TIMEOUT_SECS: u64 = 10;

/// User agent sent with every request
pub const USER_AGENT: &str = concat!("catalog-harvester/", env!("CARGO_PKG_VERSION"));

/// Global HTTP client with the default request timeout
pub static GLOBAL_HTTP_CLIENT: Lazy<Arc<Client>> = Lazy::new(|| {
    Arc::new(build_http_client(DEFAULT_REQUEST_TIMEOUT).unwrap_or_else(|e| {
        panic!("FATAL: Failed to build HTTP client: {e}. Check system TLS configuration.");
    }))
});

/// Get the global HTTP client
///
/// Returns a clone of the Arc, which is cheap (just increments ref count)
pub fn global_http_client() -> Arc<Client> {
    GLOBAL_HTTP_CLIENT.clone()
}

/// Build a client with a custom overall request timeout
pub fn build_http_client(request_timeout: Duration) -> reqwest::Result<Client> {
    Client::builder()
        .connect_timeout(Duration::from_secs(HTTP_CONNECT_TIMEOUT_SECS))
        .timeout(request_timeout)
        .user_agent(USER_AGENT)
        .build()
}

/// Shared client for `request_timeout`, reusing the global one for the default
pub fn http_client_for(request_timeout: Duration) -> reqwest::Result<Arc<Client>> {
    if request_timeout == DEFAULT_REQUEST_TIMEOUT {
        return Ok(global_http_client());
    }
    build_http_client(request_timeout).map(Arc::new)
}
