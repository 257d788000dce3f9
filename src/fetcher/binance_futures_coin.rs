//! Binance Futures COIN-margined market API

use async_trait::async_trait;
use chrono::FixedOffset;
use std::collections::BTreeMap;

use super::binance_base::BinanceMarketBase;
use super::binance_config::COIN_FUTURES_CONFIG;
use super::{CandleQuery, FetcherResult, MarketApi};
use crate::{Candle, FundingRates, Interval, MarketType, SymbolRule, TimestampWeight};

/// Binance Futures COIN-margined market API (`/dapi/v1`)
#[derive(Clone)]
pub struct BinanceFuturesCoinMarketApi {
    base: BinanceMarketBase,
}

impl BinanceFuturesCoinMarketApi {
    /// Create a new COIN-margined futures market API against dapi.binance.com
    pub fn new() -> Self {
        Self {
            base: BinanceMarketBase::new(&COIN_FUTURES_CONFIG),
        }
    }

    /// Create with custom base URL (for testing)
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base: BinanceMarketBase::with_base_url(&COIN_FUTURES_CONFIG, base_url),
        }
    }

    /// Report candle and server times in `offset`
    pub fn with_display_offset(self, offset: FixedOffset) -> Self {
        Self {
            base: self.base.with_display_offset(offset),
        }
    }
}

impl Default for BinanceFuturesCoinMarketApi {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MarketApi for BinanceFuturesCoinMarketApi {
    fn market_type(&self) -> MarketType {
        MarketType::CoinFutures
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

    /// Status comes from `contractStatus`; rules have no minimum notional
    async fn exchange_rules(&self) -> FetcherResult<BTreeMap<String, SymbolRule>> {
        self.base.exchange_rules().await
    }

    async fn funding_rate(&self) -> FetcherResult<FundingRates> {
        self.base.funding_rate().await
    }
}
