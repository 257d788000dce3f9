//! Binance response parser
//!
//! Stateless parsing functions for converting Binance API JSON responses into
//! typed data structures. All three market variants share these; the
//! per-variant differences arrive through [`BinanceMarketConfig`].

use crate::fetcher::binance_config::BinanceMarketConfig;
use crate::fetcher::{FetcherError, FetcherResult};
use crate::{Candle, FundingRates, SymbolRule};
use chrono::{DateTime, FixedOffset, TimeZone};
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;

/// Stateless parser for Binance API responses
pub struct BinanceParser;

impl BinanceParser {
    /// Parse Binance klines JSON array to Candle structs
    ///
    /// # Arguments
    /// * `klines` - Vector of JSON values representing klines from Binance API
    /// * `offset` - Display offset applied to open and close times
    ///
    /// # Errors
    /// Returns FetcherError::ParseError if JSON structure is invalid or fields cannot be parsed
    ///
    /// # Format
    /// Binance klines format: `[open_time, open, high, low, close, volume, close_time, quote_volume, trades, taker_buy_base, taker_buy_quote, ignore]`
    pub fn parse_klines(klines: Vec<Value>, offset: &FixedOffset) -> FetcherResult<Vec<Candle>> {
        let mut candles = Vec::with_capacity(klines.len());

        for kline in klines {
            let arr = kline
                .as_array()
                .ok_or_else(|| FetcherError::ParseError("Kline is not an array".to_string()))?;

            if arr.len() != 12 {
                return Err(FetcherError::ParseError(format!(
                    "Expected 12 elements in kline, got {}",
                    arr.len()
                )));
            }

            let open_time = arr[0]
                .as_i64()
                .ok_or_else(|| FetcherError::ParseError("Invalid open_time".to_string()))?;

            let close_time = arr[6]
                .as_i64()
                .ok_or_else(|| FetcherError::ParseError("Invalid close_time".to_string()))?;

            let trade_count = arr[8]
                .as_u64()
                .ok_or_else(|| FetcherError::ParseError("Invalid trades count".to_string()))?;

            candles.push(Candle {
                open_time: Self::parse_millis(open_time, offset)?,
                open: Self::parse_decimal(&arr[1], "open")?,
                high: Self::parse_decimal(&arr[2], "high")?,
                low: Self::parse_decimal(&arr[3], "low")?,
                close: Self::parse_decimal(&arr[4], "close")?,
                volume: Self::parse_decimal(&arr[5], "volume")?,
                close_time: Self::parse_millis(close_time, offset)?,
                quote_volume: Self::parse_decimal(&arr[7], "quote_volume")?,
                trade_count,
                taker_buy_base_volume: Self::parse_decimal(&arr[9], "taker_buy_base_volume")?,
                taker_buy_quote_volume: Self::parse_decimal(&arr[10], "taker_buy_quote_volume")?,
            });
        }

        Ok(candles)
    }

    /// Parse one entry of the exchangeInfo `symbols` array
    ///
    /// Every decimal field must parse exactly; any failure rejects the whole
    /// rule so that no partially populated rule escapes.
    pub fn parse_symbol_rule(
        config: &BinanceMarketConfig,
        symbol_data: &Value,
    ) -> FetcherResult<SymbolRule> {
        let symbol = Self::required_str(symbol_data, "symbol")?;
        let status = Self::required_str(symbol_data, config.status_field_name)?;
        let base_asset = Self::required_str(symbol_data, "baseAsset")?;
        let quote_asset = Self::required_str(symbol_data, "quoteAsset")?;

        let (margin_asset, contract_type) = if config.has_contract_fields {
            (
                Some(Self::required_str(symbol_data, "marginAsset")?),
                Some(Self::required_str(symbol_data, "contractType")?),
            )
        } else {
            (None, None)
        };

        let filters = symbol_data
            .get("filters")
            .and_then(|v| v.as_array())
            .ok_or_else(|| FetcherError::ParseError("Missing or invalid filters".to_string()))?;

        let price_tick = Self::filter_decimal(filters, "PRICE_FILTER", "tickSize")?;
        let lot_step = Self::filter_decimal(filters, "LOT_SIZE", "stepSize")?;
        let min_notional = match config.min_notional_filter {
            Some(filter) => Some(Self::filter_decimal(filters, filter.filter_type, filter.field)?),
            None => None,
        };

        Ok(SymbolRule {
            symbol,
            status,
            base_asset,
            quote_asset,
            margin_asset,
            contract_type,
            price_tick,
            lot_step,
            min_notional,
        })
    }

    /// Parse the premiumIndex array into funding rates keyed by symbol
    ///
    /// A `lastFundingRate` that is missing, empty or not a decimal maps to
    /// `None` rather than failing the whole response.
    pub fn parse_premium_index(entries: Vec<Value>) -> FetcherResult<FundingRates> {
        let mut rates = FundingRates::new();

        for entry in entries {
            let symbol = Self::required_str(&entry, "symbol")?;
            let rate = entry
                .get("lastFundingRate")
                .and_then(|v| v.as_str())
                .and_then(|s| Decimal::from_str(s).ok());
            rates.insert(symbol, rate);
        }

        Ok(rates)
    }

    /// Parse the `serverTime` field of a /time response
    pub fn parse_server_time(
        body: &Value,
        offset: &FixedOffset,
    ) -> FetcherResult<DateTime<FixedOffset>> {
        let millis = body
            .get("serverTime")
            .and_then(|v| v.as_i64())
            .ok_or_else(|| FetcherError::ParseError("Missing or invalid serverTime".to_string()))?;
        Self::parse_millis(millis, offset)
    }

    /// Convert epoch milliseconds into an instant in `offset`
    pub fn parse_millis(
        millis: i64,
        offset: &FixedOffset,
    ) -> FetcherResult<DateTime<FixedOffset>> {
        offset
            .timestamp_millis_opt(millis)
            .single()
            .ok_or_else(|| FetcherError::ParseError(format!("Timestamp out of range: {millis}")))
    }

    fn required_str(value: &Value, field: &str) -> FetcherResult<String> {
        value
            .get(field)
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| FetcherError::ParseError(format!("Missing or invalid {field}")))
    }

    fn filter_decimal(filters: &[Value], filter_type: &str, field: &str) -> FetcherResult<Decimal> {
        let filter = filters
            .iter()
            .find(|f| f.get("filterType").and_then(|v| v.as_str()) == Some(filter_type))
            .ok_or_else(|| FetcherError::ParseError(format!("Missing {filter_type} filter")))?;

        let value = filter
            .get(field)
            .ok_or_else(|| FetcherError::ParseError(format!("Missing {field} in {filter_type}")))?;

        Self::parse_decimal(value, field)
    }

    /// Helper to parse decimal from JSON value
    fn parse_decimal(value: &Value, field_name: &str) -> FetcherResult<Decimal> {
        let s = value
            .as_str()
            .ok_or_else(|| FetcherError::ParseError(format!("{field_name} is not a string")))?;

        Decimal::from_str(s)
            .map_err(|e| FetcherError::ParseError(format!("Failed to parse {field_name}: {e}")))
    }
}
