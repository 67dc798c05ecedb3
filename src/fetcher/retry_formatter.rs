//! Retry message formatting for catalog page fetches.
//!
//! Classifies a failed attempt and renders the one-line retry notice and the
//! multi-line failure summary logged when a page is given up on.

use reqwest::{Error as ReqwestError, StatusCode};
use std::time::Duration;

/// Classification of a failed page attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryErrorType {
    /// Request or body read timed out
    NetworkTimeout,
    /// Connection refused, DNS failure, or host unreachable
    NetworkOffline,
    /// HTTP 429
    RateLimit,
    /// HTTP 5xx
    ServerError(u16),
    /// HTTP 4xx other than 429
    ClientError(u16),
    /// Body arrived but was not a catalog page
    Decode,
    /// Anything else
    NetworkGeneric,
}

impl RetryErrorType {
    /// Short description used inside log lines
    pub fn description(&self) -> &'static str {
        match self {
            Self::NetworkTimeout => "network timeout",
            Self::NetworkOffline => "connection failed",
            Self::RateLimit => "rate limit exceeded",
            Self::ServerError(code) => match code {
                500 => "internal server error",
                502 => "bad gateway",
                503 => "service unavailable",
                504 => "gateway timeout",
                _ => "server error",
            },
            Self::ClientError(code) => match code {
                404 => "page not found",
                _ => "client error",
            },
            Self::Decode => "undecodable response",
            Self::NetworkGeneric => "network error",
        }
    }

    /// Remediation hint shown with the failure summary
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::NetworkTimeout => "Check your network connection or raise --request-timeout-secs",
            Self::NetworkOffline => "Verify internet connectivity and DNS resolution",
            Self::RateLimit => "Raise --rate-interval-ms to slow down admissions",
            Self::ServerError(_) => "The catalog may be experiencing issues, try again later",
            Self::ClientError(_) => "Check the --catalog-url template and its {page} placeholder",
            Self::Decode => "Check that the catalog format keys match the response",
            Self::NetworkGeneric => "Check network connectivity and try again",
        }
    }
}

/// Context for one failed page attempt.
#[derive(Debug, Clone)]
pub struct RetryContext {
    /// Current attempt number (1-based)
    pub attempt: u32,
    /// Attempts allowed for the page
    pub max_attempts: u32,
    /// Classification of the failure
    pub error_type: RetryErrorType,
    /// Pause before the next attempt
    pub pause: Duration,
    /// Page index being fetched
    pub page: u32,
    /// Original error message
    pub error_message: String,
    /// URL that failed
    pub endpoint: String,
}

impl RetryContext {
    /// Build a context for a failed attempt
    pub fn new(
        attempt: u32,
        max_attempts: u32,
        error_type: RetryErrorType,
        pause: Duration,
        page: u32,
        error_message: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            attempt,
            max_attempts,
            error_type,
            pause,
            page,
            error_message: error_message.into(),
            endpoint: endpoint.into(),
        }
    }

    /// Whether another attempt follows this one
    pub fn has_next_attempt(&self) -> bool {
        self.attempt < self.max_attempts
    }

    /// One-line retry notice
    pub fn format_retry(&self) -> String {
        format!(
            "Retrying page {} (attempt {}/{}) after {} - waiting {:.1} seconds...",
            self.page,
            self.attempt + 1,
            self.max_attempts,
            self.error_type.description(),
            self.pause.as_secs_f64()
        )
    }

    /// Notice logged when a retried page finally succeeds
    pub fn format_success(&self) -> String {
        format!(
            "Page {} fetched on attempt {}/{}",
            self.page, self.attempt, self.max_attempts
        )
    }

    /// Multi-line summary logged when the page is given up on
    pub fn format_failure(&self) -> String {
        let mut lines = vec![
            format!(
                "[FAILED] Page {} could not be fetched after {} attempts",
                self.page, self.max_attempts
            ),
            format!("  Last error: {}", self.error_message),
            format!("  Endpoint: {}", self.endpoint),
            "  Suggestions:".to_string(),
        ];

        for suggestion in self.format_suggestions() {
            lines.push(format!("    - {suggestion}"));
        }

        lines.join("\n")
    }

    /// Suggestions for the failure summary
    pub fn format_suggestions(&self) -> Vec<String> {
        vec![
            self.error_type.suggestion().to_string(),
            format!(
                "Try increasing --fetch-attempts (current: {})",
                self.max_attempts
            ),
        ]
    }
}

/// Classify a failed attempt from its HTTP status or reqwest error.
pub fn extract_error_type(
    status: Option<StatusCode>,
    err: Option<&ReqwestError>,
) -> RetryErrorType {
    if let Some(status) = status {
        if status == StatusCode::TOO_MANY_REQUESTS {
            return RetryErrorType::RateLimit;
        }
        if status.is_server_error() {
            return RetryErrorType::ServerError(status.as_u16());
        }
        if status.is_client_error() {
            return RetryErrorType::ClientError(status.as_u16());
        }
    }

    if let Some(err) = err {
        if err.is_timeout() {
            return RetryErrorType::NetworkTimeout;
        }
        if err.is_connect() {
            return RetryErrorType::NetworkOffline;
        }
        if err.is_decode() {
            return RetryErrorType::Decode;
        }
    }

    RetryErrorType::NetworkGeneric
}
