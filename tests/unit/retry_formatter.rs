use std::time::Duration;

use catalog_harvester::fetcher::retry_formatter::{
    extract_error_type, RetryContext, RetryErrorType,
};
use reqwest::StatusCode;

fn sample_context(error_type: RetryErrorType) -> RetryContext {
    RetryContext::new(
        2,
        3,
        error_type,
        Duration::from_millis(500),
        7,
        "HTTP 503 for page 7",
        "https://api.example/catalog?page=7",
    )
}

#[test]
fn format_retry_captures_attempt_and_wait() {
    let message = sample_context(RetryErrorType::ServerError(503)).format_retry();
    assert!(message.contains("page 7"));
    assert!(message.contains("attempt 3/3"));
    assert!(message.contains("service unavailable"));
    assert!(message.contains("0.5 seconds"));
}

#[test]
fn format_failure_includes_endpoint_and_hints() {
    let message = sample_context(RetryErrorType::RateLimit).format_failure();
    assert!(message.starts_with("[FAILED] Page 7 could not be fetched after 3 attempts"));
    assert!(message.contains("Endpoint: https://api.example/catalog?page=7"));
    assert!(message.contains("--rate-interval-ms"));
    assert!(message.contains("--fetch-attempts (current: 3)"));
}

#[test]
fn status_codes_are_classified() {
    assert_eq!(
        extract_error_type(Some(StatusCode::TOO_MANY_REQUESTS), None),
        RetryErrorType::RateLimit
    );
    assert_eq!(
        extract_error_type(Some(StatusCode::BAD_GATEWAY), None),
        RetryErrorType::ServerError(502)
    );
    assert_eq!(
        extract_error_type(Some(StatusCode::NOT_FOUND), None),
        RetryErrorType::ClientError(404)
    );
    assert_eq!(extract_error_type(None, None), RetryErrorType::NetworkGeneric);
}
