//! Shared base implementation for Binance market APIs
//!
//! Contains all logic common to spot, USDT-margined and COIN-margined markets.
//! Each concrete market API wraps a `BinanceMarketBase` and delegates to it;
//! the differences live in the [`BinanceMarketConfig`] it is built with.

use chrono::{FixedOffset, Offset, Utc};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use super::binance_config::BinanceMarketConfig;
use super::binance_http::BinanceHttpClient;
use super::binance_parser::BinanceParser;
use super::shared_resources::global_http_client;
use super::{CandleQuery, FetcherError, FetcherResult};
use crate::config::WEIGHT_EFFICIENT_CANDLE_LIMIT;
use crate::{Candle, FundingRates, Interval, SymbolRule, TimestampWeight};

/// Shared base for Binance market APIs
#[derive(Clone)]
pub struct BinanceMarketBase {
    /// HTTP client for API requests
    pub http_client: BinanceHttpClient,
    /// Market-specific configuration
    pub config: &'static BinanceMarketConfig,
    /// Offset applied to every returned instant
    pub display_offset: FixedOffset,
}

impl BinanceMarketBase {
    /// Create a new base using the shared HTTP client and the config's base URL
    pub fn new(config: &'static BinanceMarketConfig) -> Self {
        Self::with_base_url(config, config.base_url)
    }

    /// Create with custom base URL (for testing against a mock server)
    pub fn with_base_url(
        config: &'static BinanceMarketConfig,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            http_client: BinanceHttpClient::new(global_http_client(), base_url),
            config,
            display_offset: Utc.fix(),
        }
    }

    /// Report instants in `offset` instead of UTC
    pub fn with_display_offset(mut self, offset: FixedOffset) -> Self {
        self.display_offset = offset;
        self
    }

    /// Resolve the klines limit, rejecting values the endpoint would refuse
    pub fn resolve_limit(&self, query: &CandleQuery) -> FetcherResult<u32> {
        let limit = query.limit.unwrap_or(WEIGHT_EFFICIENT_CANDLE_LIMIT);
        if limit == 0 || limit > self.config.max_candle_limit {
            return Err(FetcherError::InvalidRequest(format!(
                "candle limit {limit} outside 1..={} for {}",
                self.config.max_candle_limit, self.config.market_type
            )));
        }
        Ok(limit)
    }

    /// Fetch server time and the used-weight header
    pub async fn timestamp_and_weight(&self) -> FetcherResult<TimestampWeight> {
        let params: Vec<(&str, String)> = vec![];
        let (body, weight): (Value, Option<u32>) = self
            .http_client
            .get_with_weight(self.config.time_endpoint, &params)
            .await?;

        let server_time = BinanceParser::parse_server_time(&body, &self.display_offset)?;
        let used_weight_1m = weight.ok_or_else(|| {
            FetcherError::InvalidResponse("Missing X-MBX-USED-WEIGHT-1M header".to_string())
        })?;

        debug!(%server_time, used_weight_1m, "Fetched server time");
        Ok(TimestampWeight {
            server_time,
            used_weight_1m,
        })
    }

    /// Fetch one page of klines
    pub async fn candles(
        &self,
        symbol: &str,
        interval: Interval,
        query: &CandleQuery,
    ) -> FetcherResult<Vec<Candle>> {
        let limit = self.resolve_limit(query)?;

        debug!(
            "Fetching klines: symbol={}, interval={}, start={:?}, end={:?}, limit={}",
            symbol, interval, query.start_time, query.end_time, limit
        );

        let mut params = vec![
            ("symbol", symbol.to_string()),
            ("interval", interval.to_string()),
            ("limit", limit.to_string()),
        ];
        if let Some(start) = query.start_time {
            params.push(("startTime", start.timestamp_millis().to_string()));
        }
        if let Some(end) = query.end_time {
            params.push(("endTime", end.timestamp_millis().to_string()));
        }

        let klines: Vec<Value> = self
            .http_client
            .get(self.config.klines_endpoint, &params)
            .await?;

        let candles = BinanceParser::parse_klines(klines, &self.display_offset)?;
        check_candle_order(&candles)?;

        debug!("Fetched {} candles", candles.len());
        Ok(candles)
    }

    /// Fetch and parse exchangeInfo into rules keyed by symbol
    pub async fn exchange_rules(&self) -> FetcherResult<BTreeMap<String, SymbolRule>> {
        info!(market = %self.config.market_type, "Fetching exchange info from API");

        let params: Vec<(&str, String)> = vec![];
        let body: Value = self
            .http_client
            .get(self.config.exchange_info_endpoint, &params)
            .await?;

        let symbols_array = body
            .get("symbols")
            .and_then(|v| v.as_array())
            .ok_or_else(|| FetcherError::InvalidResponse("Missing symbols array".to_string()))?;

        debug!("Received {} symbols from API", symbols_array.len());

        let mut rules = BTreeMap::new();
        let mut parse_errors = 0;
        for symbol_data in symbols_array {
            match BinanceParser::parse_symbol_rule(self.config, symbol_data) {
                Ok(rule) => {
                    rules.insert(rule.symbol.clone(), rule);
                }
                Err(e) => {
                    parse_errors += 1;
                    let symbol = symbol_data
                        .get("symbol")
                        .and_then(|v| v.as_str())
                        .unwrap_or("<unknown>");
                    debug!(symbol, "Failed to parse symbol rule: {}", e);
                }
            }
        }

        if parse_errors > 0 {
            warn!(parse_errors = parse_errors, "Some symbols failed to parse");
        }

        info!(symbols = rules.len(), "Parsed symbol rules");
        Ok(rules)
    }

    /// Fetch the latest funding rate per symbol; empty for markets without one
    pub async fn funding_rate(&self) -> FetcherResult<FundingRates> {
        let Some(endpoint) = self.config.premium_index_endpoint else {
            debug!(market = %self.config.market_type, "Market has no funding rate");
            return Ok(FundingRates::new());
        };

        let params: Vec<(&str, String)> = vec![];
        let entries: Vec<Value> = self.http_client.get(endpoint, &params).await?;
        let rates = BinanceParser::parse_premium_index(entries)?;

        debug!("Fetched {} funding rates", rates.len());
        Ok(rates)
    }
}

/// Open times must be non-decreasing and each candle must close after it opens
fn check_candle_order(candles: &[Candle]) -> FetcherResult<()> {
    for candle in candles {
        if candle.close_time <= candle.open_time {
            return Err(FetcherError::InvalidResponse(format!(
                "candle closing at {} does not close after its open {}",
                candle.close_time, candle.open_time
            )));
        }
    }

    for pair in candles.windows(2) {
        if pair[1].open_time < pair[0].open_time {
            return Err(FetcherError::InvalidResponse(format!(
                "candles out of order: {} after {}",
                pair[1].open_time, pair[0].open_time
            )));
        }
    }

    Ok(())
}
