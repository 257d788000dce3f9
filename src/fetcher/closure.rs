//! Candle closure poller
//!
//! Binance publishes the running candle alongside closed ones, and the most
//! recent bar may still change. The only reliable sign that the bar ending at
//! `run_time` is final is seeing a bar that opens at or after `run_time`, so
//! the poller re-fetches recent candles until one shows up or a timeout
//! elapses.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use super::retry::RetryingMarketApi;
use super::{CandleQuery, FetcherResult};
use crate::config::{CLOSURE_LOOKBACK_CANDLES, CLOSURE_POLL_INTERVAL};
use crate::{Candle, Interval};

/// Source of wall-clock time for timeout checks
pub trait Clock: Send + Sync {
    /// Current instant
    fn now(&self) -> DateTime<Utc>;
}

/// [`Clock`] backed by the system time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Outcome of a closure poll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClosureState {
    /// A candle opening at or after `run_time` was observed
    Closed,
    /// The timeout elapsed first; the candles may still be provisional
    TimedOut,
}

/// Candles opened before `run_time`, plus whether closure was confirmed
#[derive(Debug, Clone, Serialize)]
pub struct ClosedCandles {
    /// Candles with open time strictly before `run_time`, oldest first
    pub candles: Vec<Candle>,
    /// How polling ended
    pub state: ClosureState,
}

impl ClosedCandles {
    /// True only when closure was observed; the one authoritative signal
    pub fn is_closed(&self) -> bool {
        self.state == ClosureState::Closed
    }
}

/// Polls recent candles until the bar before `run_time` is known to be closed
#[derive(Clone)]
pub struct CandleClosurePoller {
    timeout: Duration,
    poll_interval: Duration,
    lookback: u32,
    clock: Arc<dyn Clock>,
}

impl CandleClosurePoller {
    /// Poller with the default 1s poll interval, 5-candle look-back and system clock
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            poll_interval: CLOSURE_POLL_INTERVAL,
            lookback: CLOSURE_LOOKBACK_CANDLES,
            clock: Arc::new(SystemClock),
        }
    }

    /// Override the pause between polls
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Override how many recent candles each poll fetches
    pub fn with_lookback(mut self, lookback: u32) -> Self {
        self.lookback = lookback;
        self
    }

    /// Override the clock used for timeout checks
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Poll until the bar before `run_time` closes or the timeout elapses
    ///
    /// Each fetch goes through the retry policy of `api`; a fetch that
    /// exhausts its retries ends polling with that error. A timeout is not
    /// an error: the result comes back with [`ClosureState::TimedOut`].
    pub async fn poll(
        &self,
        api: &RetryingMarketApi,
        symbol: &str,
        interval: Interval,
        run_time: DateTime<Utc>,
    ) -> FetcherResult<ClosedCandles> {
        let query = CandleQuery::recent(self.lookback);
        let mut polls = 0u32;

        let (mut candles, state) = loop {
            let candles = api.candles(symbol, interval, &query).await?;
            polls += 1;

            let latest_open = candles
                .iter()
                .map(|c| c.open_time.with_timezone(&Utc))
                .max();

            if latest_open.is_some_and(|open| open >= run_time) {
                break (candles, ClosureState::Closed);
            }

            if self.timed_out(run_time) {
                break (candles, ClosureState::TimedOut);
            }

            debug!(symbol, %interval, polls, ?latest_open, "Candle not closed yet");
            sleep(self.poll_interval).await;
        };

        candles.retain(|c| c.opens_before(run_time));

        match state {
            ClosureState::Closed => info!(
                symbol,
                %interval,
                %run_time,
                polls,
                candles = candles.len(),
                "Candle closed"
            ),
            ClosureState::TimedOut => warn!(
                symbol,
                %interval,
                %run_time,
                polls,
                timeout_secs = self.timeout.as_secs(),
                "Candle closure not confirmed before timeout"
            ),
        }

        Ok(ClosedCandles { candles, state })
    }

    fn timed_out(&self, run_time: DateTime<Utc>) -> bool {
        // negative elapsed means run_time is still ahead
        (self.clock.now() - run_time)
            .to_std()
            .map(|elapsed| elapsed > self.timeout)
            .unwrap_or(false)
    }
}
