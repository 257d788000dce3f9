//! Market API implementations

use crate::{Candle, FundingRates, Interval, MarketType, SymbolRule, TimestampWeight};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Offset, Utc};
use std::collections::BTreeMap;

pub mod binance_base;
pub mod binance_config;
pub mod binance_futures_coin;
pub mod binance_futures_usdt;
pub mod binance_http;
pub mod binance_parser;
pub mod binance_spot;
pub mod closure;
pub mod retry;
pub mod shared_resources;

/// Fetcher errors
#[derive(Debug, thiserror::Error)]
pub enum FetcherError {
    /// HTTP request error (non-success status)
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Response parse error
    #[error("parse error: {0}")]
    ParseError(String),

    /// Invalid response
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Request rejected before it was sent
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Network error
    #[error("network error: {0}")]
    NetworkError(String),

    /// Archive error
    #[error("archive error: {0}")]
    ArchiveError(String),

    /// Checksum validation failed
    #[error("checksum validation failed: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// Hash from the CHECKSUM sidecar
        expected: String,
        /// Hash computed over the downloaded file
        actual: String,
    },
}

/// Result type for fetcher operations
pub type FetcherResult<T> = Result<T, FetcherError>;

/// Optional bounds for a klines request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandleQuery {
    /// Earliest open time to return
    pub start_time: Option<DateTime<Utc>>,
    /// Latest open time to return
    pub end_time: Option<DateTime<Utc>>,
    /// Number of candles; defaults to the weight-efficient page size
    pub limit: Option<u32>,
}

impl CandleQuery {
    /// Query for the `limit` most recent candles
    pub fn recent(limit: u32) -> Self {
        Self {
            limit: Some(limit),
            ..Self::default()
        }
    }
}

/// Exchange market API shared by every Binance market variant
///
/// Every method performs exactly one network attempt. Retries are layered on
/// top by [`retry::RetryingMarketApi`].
#[async_trait]
pub trait MarketApi: Send + Sync {
    /// Market variant served by this implementation
    fn market_type(&self) -> MarketType;

    /// Base URL for REST requests
    fn base_url(&self) -> &str;

    /// Server time and the weight consumed in the trailing minute
    async fn timestamp_and_weight(&self) -> FetcherResult<TimestampWeight>;

    /// Candles for `symbol` ordered by open time
    ///
    /// # Arguments
    /// * `symbol` - Trading symbol (e.g., "BTCUSDT")
    /// * `interval` - Bar interval
    /// * `query` - Optional start/end bounds and limit
    ///
    /// # Errors
    /// Returns `InvalidRequest` without touching the network when the limit is
    /// zero or above the variant maximum.
    async fn candles(
        &self,
        symbol: &str,
        interval: Interval,
        query: &CandleQuery,
    ) -> FetcherResult<Vec<Candle>>;

    /// Trading rules keyed by symbol
    async fn exchange_rules(&self) -> FetcherResult<BTreeMap<String, SymbolRule>>;

    /// Latest funding rate keyed by symbol (empty for spot)
    async fn funding_rate(&self) -> FetcherResult<FundingRates>;
}

/// Create the market API for a market variant, reporting times in UTC
///
/// Routes:
/// - spot → api.binance.com (`/api/v3`)
/// - usdt_futures → fapi.binance.com (`/fapi/v1`)
/// - coin_futures → dapi.binance.com (`/dapi/v1`)
pub fn create_market_api(market_type: MarketType) -> Box<dyn MarketApi> {
    create_market_api_with_offset(market_type, Utc.fix())
}

/// Create the market API for a market variant with a display offset for candle times
pub fn create_market_api_with_offset(
    market_type: MarketType,
    display_offset: FixedOffset,
) -> Box<dyn MarketApi> {
    match market_type {
        MarketType::Spot => Box::new(
            binance_spot::BinanceSpotMarketApi::new().with_display_offset(display_offset),
        ),
        MarketType::UsdtFutures => Box::new(
            binance_futures_usdt::BinanceFuturesUsdtMarketApi::new()
                .with_display_offset(display_offset),
        ),
        MarketType::CoinFutures => Box::new(
            binance_futures_coin::BinanceFuturesCoinMarketApi::new()
                .with_display_offset(display_offset),
        ),
    }
}
