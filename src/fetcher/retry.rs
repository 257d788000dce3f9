//! Retry executor
//!
//! Every network call in this crate goes through [`retry_with_backoff`]. The
//! market APIs themselves make exactly one attempt per call; retry policy
//! lives here only.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

use super::{CandleQuery, FetcherResult, MarketApi};
use crate::config::{BACKOFF_MULTIPLIER, DEFAULT_MAX_ATTEMPTS, INITIAL_BACKOFF_MS, MAX_BACKOFF_MS};
use crate::{Candle, FundingRates, Interval, MarketType, SymbolRule, TimestampWeight};

/// Configuration for exponential backoff retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, the first call included. Zero behaves as one.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_backoff: Duration,
    /// Maximum backoff duration.
    pub max_backoff: Duration,
    /// Multiplier applied after each failed attempt.
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_backoff: Duration::from_millis(INITIAL_BACKOFF_MS),
            max_backoff: Duration::from_millis(MAX_BACKOFF_MS),
            multiplier: BACKOFF_MULTIPLIER,
        }
    }
}

impl RetryPolicy {
    /// Policy with a constant delay between attempts
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            initial_backoff: delay,
            max_backoff: delay,
            multiplier: 1,
        }
    }

    /// Default backoff with a different attempt cap
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    /// Delay slept after the failed attempt numbered `retry` (0-based)
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = self.multiplier.checked_pow(retry).unwrap_or(u32::MAX);
        self.initial_backoff
            .checked_mul(factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Execute a future-producing closure with exponential backoff retry.
///
/// Every error is treated as retryable. Returns the first success, or the
/// last error once `policy.max_attempts` attempts have failed.
pub async fn retry_with_backoff<F, Fut, T, E>(
    policy: &RetryPolicy,
    operation_name: &str,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let attempts = policy.attempts();

    for retry in 0..attempts - 1 {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                let delay = policy.backoff(retry);
                warn!(
                    operation = operation_name,
                    attempt = retry + 1,
                    max_attempts = attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Attempt failed, retrying"
                );
                sleep(delay).await;
            }
        }
    }

    // Final attempt; its error is surfaced as-is.
    operation().await
}

/// Market API whose every call is wrapped in [`retry_with_backoff`]
///
/// Deliberately not a [`MarketApi`] itself so retries cannot be stacked.
#[derive(Clone)]
pub struct RetryingMarketApi {
    api: Arc<dyn MarketApi>,
    policy: RetryPolicy,
}

impl RetryingMarketApi {
    /// Wrap `api` with `policy`
    pub fn new(api: Arc<dyn MarketApi>, policy: RetryPolicy) -> Self {
        Self { api, policy }
    }

    /// Market variant of the wrapped API
    pub fn market_type(&self) -> MarketType {
        self.api.market_type()
    }

    /// [`MarketApi::timestamp_and_weight`] with retries
    pub async fn timestamp_and_weight(&self) -> FetcherResult<TimestampWeight> {
        retry_with_backoff(&self.policy, "timestamp_and_weight", || {
            self.api.timestamp_and_weight()
        })
        .await
    }

    /// [`MarketApi::candles`] with retries
    pub async fn candles(
        &self,
        symbol: &str,
        interval: Interval,
        query: &CandleQuery,
    ) -> FetcherResult<Vec<Candle>> {
        retry_with_backoff(&self.policy, "candles", || {
            self.api.candles(symbol, interval, query)
        })
        .await
    }

    /// [`MarketApi::exchange_rules`] with retries
    pub async fn exchange_rules(&self) -> FetcherResult<BTreeMap<String, SymbolRule>> {
        retry_with_backoff(&self.policy, "exchange_rules", || self.api.exchange_rules()).await
    }

    /// [`MarketApi::funding_rate`] with retries
    pub async fn funding_rate(&self) -> FetcherResult<FundingRates> {
        retry_with_backoff(&self.policy, "funding_rate", || self.api.funding_rate()).await
    }
}
