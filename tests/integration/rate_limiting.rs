//! Integration tests for admission rate limiting

use catalog_harvester::downloader::{ManualTicker, RateLimitError, RateLimiter};
use std::time::Duration;
use tokio::time::Instant;

#[tokio::test(start_paused = true)]
async fn test_burst_of_callers_is_spread_over_ticks() {
    let interval = Duration::from_millis(500);
    let limiter = RateLimiter::new(interval).unwrap();
    let start = Instant::now();

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let limiter = limiter.clone();
            tokio::spawn(async move { limiter.acquire().await.unwrap() })
        })
        .collect();

    let mut granted = Vec::new();
    for handle in handles {
        granted.push(handle.await.unwrap());
    }
    granted.sort();

    for (i, at) in granted.iter().enumerate() {
        assert_eq!(*at - start, interval * (i as u32 + 1));
    }
}

#[tokio::test(start_paused = true)]
async fn test_no_permit_before_first_interval() {
    let limiter = RateLimiter::new(Duration::from_secs(1)).unwrap();

    let early = tokio::time::timeout(Duration::from_millis(999), limiter.acquire()).await;
    assert!(early.is_err());
}

#[tokio::test]
async fn test_closed_ticker_is_reported() {
    let (ticker, handle) = ManualTicker::channel();
    let limiter = RateLimiter::with_ticker(ticker);
    assert_eq!(limiter.interval(), None);

    drop(handle);
    assert_eq!(limiter.acquire().await, Err(RateLimitError::TickerClosed));
}

#[test]
fn test_zero_interval_is_invalid() {
    assert!(matches!(
        RateLimiter::new(Duration::ZERO),
        Err(RateLimitError::InvalidInterval)
    ));
}
