//! Binance Futures USDT-margined market API

use async_trait::async_trait;
use chrono::FixedOffset;
use std::collections::BTreeMap;

use super::binance_base::BinanceMarketBase;
use super::binance_config::USDT_FUTURES_CONFIG;
use super::{CandleQuery, FetcherResult, MarketApi};
use crate::{Candle, FundingRates, Interval, MarketType, SymbolRule, TimestampWeight};

/// Binance Futures USDT-margined market API (`/fapi/v1`)
#[derive(Clone)]
pub struct BinanceFuturesUsdtMarketApi {
    base: BinanceMarketBase,
}

impl BinanceFuturesUsdtMarketApi {
    /// Create a new USDT-margined futures market API against fapi.binance.com
    pub fn new() -> Self {
        Self {
            base: BinanceMarketBase::new(&USDT_FUTURES_CONFIG),
        }
    }

    /// Create with custom base URL (for testing)
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base: BinanceMarketBase::with_base_url(&USDT_FUTURES_CONFIG, base_url),
        }
    }

    /// Report candle and server times in `offset`
    pub fn with_display_offset(self, offset: FixedOffset) -> Self {
        Self {
            base: self.base.with_display_offset(offset),
        }
    }
}

impl Default for BinanceFuturesUsdtMarketApi {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MarketApi for BinanceFuturesUsdtMarketApi {
    fn market_type(&self) -> MarketType {
        MarketType::UsdtFutures
    }

    fn base_url(&self) -> &str {
        self.base.http_client.base_url()
    }

    async fn timestamp_and_weight(&self) -> FetcherResult<TimestampWeight> {
        self.base.timestamp_and_weight().await
    }

    async fn candles(
        &self,
        symbol: &str,
        interval: Interval,
        query: &CandleQuery,
    ) -> FetcherResult<Vec<Candle>> {
        self.base.candles(symbol, interval, query).await
    }

    /// Rules carry `MIN_NOTIONAL.notional` as the minimum notional
    async fn exchange_rules(&self) -> FetcherResult<BTreeMap<String, SymbolRule>> {
        self.base.exchange_rules().await
    }

    async fn funding_rate(&self) -> FetcherResult<FundingRates> {
        self.base.funding_rate().await
    }
}
