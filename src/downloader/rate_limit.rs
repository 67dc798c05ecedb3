//! Admission rate limiting
//!
//! A single [`RateLimiter`] hands out one permit per tick of its [`Ticker`].
//! The production ticker is a tokio interval; tests substitute a
//! [`ManualTicker`] so admissions can be driven deterministically.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::trace;

use crate::metrics;

/// Source of ticks for a [`RateLimiter`]
#[async_trait]
pub trait Ticker: Send {
    /// Wait for the next tick; `None` once the source is exhausted
    async fn tick(&mut self) -> Option<Instant>;
}

/// Ticker backed by a tokio interval.
///
/// The first tick fires one period after creation. Missed ticks collapse into
/// a single pending tick, so a limiter left idle grants at most one immediate
/// permit before returning to the fixed cadence.
pub struct IntervalTicker {
    interval: Interval,
}

impl IntervalTicker {
    /// Create a ticker with the given period
    ///
    /// # Panics
    /// Panics if `period` is zero
    pub fn new(period: Duration) -> Self {
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval }
    }

    /// Tick period
    pub fn period(&self) -> Duration {
        self.interval.period()
    }
}

#[async_trait]
impl Ticker for IntervalTicker {
    async fn tick(&mut self) -> Option<Instant> {
        Some(self.interval.tick().await)
    }
}

/// Ticker driven by a [`TickHandle`]
pub struct ManualTicker {
    rx: mpsc::Receiver<()>,
}

/// Sending side of a [`ManualTicker`]; dropping it closes the ticker
#[derive(Clone)]
pub struct TickHandle {
    tx: mpsc::Sender<()>,
}

impl ManualTicker {
    /// Create a ticker and its handle. At most one tick can be pending.
    pub fn channel() -> (Self, TickHandle) {
        let (tx, rx) = mpsc::channel(1);
        (Self { rx }, TickHandle { tx })
    }
}

#[async_trait]
impl Ticker for ManualTicker {
    async fn tick(&mut self) -> Option<Instant> {
        self.rx.recv().await.map(|()| Instant::now())
    }
}

impl TickHandle {
    /// Release one tick; returns `false` if a tick is already pending or the
    /// ticker is gone
    pub fn tick(&self) -> bool {
        self.tx.try_send(()).is_ok()
    }
}

/// Rate limiter issuing one permit per tick
#[derive(Clone)]
pub struct RateLimiter {
    ticker: Arc<Mutex<Box<dyn Ticker>>>,
    interval: Option<Duration>,
}

impl RateLimiter {
    /// Create a limiter granting one permit per `interval`
    ///
    /// # Errors
    /// Returns [`RateLimitError::InvalidInterval`] for a zero interval
    pub fn new(interval: Duration) -> Result<Self, RateLimitError> {
        if interval.is_zero() {
            return Err(RateLimitError::InvalidInterval);
        }
        Ok(Self {
            ticker: Arc::new(Mutex::new(Box::new(IntervalTicker::new(interval)))),
            interval: Some(interval),
        })
    }

    /// Create a limiter over a custom tick source
    pub fn with_ticker(ticker: impl Ticker + 'static) -> Self {
        Self {
            ticker: Arc::new(Mutex::new(Box::new(ticker))),
            interval: None,
        }
    }

    /// Fixed interval, if this limiter was built from one
    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    /// Wait for the next permit
    ///
    /// Concurrent callers queue on the ticker and each consume their own tick.
    ///
    /// # Returns
    /// The instant the permit was granted
    pub async fn acquire(&self) -> Result<Instant, RateLimitError> {
        let started = Instant::now();
        let mut ticker = self.ticker.lock().await;
        ticker.tick().await.ok_or(RateLimitError::TickerClosed)?;

        let granted = Instant::now();
        let waited = granted.duration_since(started);
        trace!(waited_ms = waited.as_millis() as u64, "Rate limit permit granted");
        metrics::record_admission_wait(waited);
        Ok(granted)
    }
}

/// Rate limiter errors
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RateLimitError {
    /// Zero-length interval
    #[error("rate limit interval must be greater than zero")]
    InvalidInterval,

    /// Tick source ended
    #[error("rate limiter tick source closed")]
    TickerClosed,
}
