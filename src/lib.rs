//! # Binance Market Data
//!
//! Closure-verified candlestick acquisition for Binance spot, USDT-margined and
//! COIN-margined futures markets, from two sources:
//!
//! - the live REST API, polled until a candle period is known to be closed;
//! - the `data.binance.vision` historical archive, listed page by page and
//!   bulk-downloaded through an external transfer tool.
//!
//! ## Quick Start
//!
//! ```no_run
//! use binance_market_data::fetcher::closure::CandleClosurePoller;
//! use binance_market_data::fetcher::retry::{RetryPolicy, RetryingMarketApi};
//! use binance_market_data::fetcher::create_market_api;
//! use binance_market_data::{Interval, MarketType};
//! use chrono::Utc;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let api = RetryingMarketApi::new(
//!     create_market_api(MarketType::UsdtFutures).into(),
//!     RetryPolicy::default(),
//! );
//!
//! let run_time = Interval::OneMinute.next_boundary(Utc::now());
//! let poller = CandleClosurePoller::new(Duration::from_secs(10));
//! let result = poller
//!     .poll(&api, "BTCUSDT", Interval::OneMinute, run_time)
//!     .await?;
//!
//! if result.is_closed() {
//!     println!("{} closed candles", result.candles.len());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`fetcher`] - Market API trait, the three Binance variants, retry executor
//!   and candle closure poller
//! - [`archive`] - Archive listing pagination, path helpers and checksum verification
//! - [`downloader`] - Bulk download work lists delegated to `aria2c`
//! - [`config`] - Default timeouts, retry policy and endpoint constants
//! - [`cli`] - The `bmd` command-line surface

#![warn(missing_docs)]
#![warn(clippy::all)]

use chrono::{DateTime, FixedOffset, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Historical archive listing, paths and verification
pub mod archive;

/// CLI command implementations
pub mod cli;

/// Default configuration values
pub mod config;

/// Bulk archive downloads
pub mod downloader;

/// Market API implementations, retry and closure polling
pub mod fetcher;

/// Funding rate per symbol; `None` when the exchange reports no parsable rate
pub type FundingRates = BTreeMap<String, Option<Decimal>>;

/// Binance market variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketType {
    /// Spot market (api.binance.com)
    Spot,
    /// USDT-margined futures (fapi.binance.com)
    UsdtFutures,
    /// COIN-margined futures (dapi.binance.com)
    CoinFutures,
}

impl MarketType {
    /// All supported market variants
    pub const ALL: [MarketType; 3] = [
        MarketType::Spot,
        MarketType::UsdtFutures,
        MarketType::CoinFutures,
    ];
}

impl std::fmt::Display for MarketType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MarketType::Spot => "spot",
            MarketType::UsdtFutures => "usdt_futures",
            MarketType::CoinFutures => "coin_futures",
        };
        write!(f, "{s}")
    }
}

impl FromStr for MarketType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "spot" => Ok(MarketType::Spot),
            "usdt_futures" => Ok(MarketType::UsdtFutures),
            "coin_futures" => Ok(MarketType::CoinFutures),
            _ => Err(format!(
                "Invalid market type: {s}. Valid options: spot, usdt_futures, coin_futures"
            )),
        }
    }
}

/// OHLCV candle
///
/// Open and close times are UTC instants carried in the display offset the
/// market API was configured with.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Candle {
    /// Open time
    pub open_time: DateTime<FixedOffset>,
    /// Open price
    pub open: Decimal,
    /// High price
    pub high: Decimal,
    /// Low price
    pub low: Decimal,
    /// Close price
    pub close: Decimal,
    /// Volume (base asset)
    pub volume: Decimal,
    /// Close time
    pub close_time: DateTime<FixedOffset>,
    /// Quote asset volume
    pub quote_volume: Decimal,
    /// Number of trades
    pub trade_count: u64,
    /// Taker buy base asset volume
    pub taker_buy_base_volume: Decimal,
    /// Taker buy quote asset volume
    pub taker_buy_quote_volume: Decimal,
}

impl Candle {
    /// Whether this candle opened strictly before `instant`
    pub fn opens_before(&self, instant: DateTime<Utc>) -> bool {
        self.open_time.with_timezone(&Utc) < instant
    }

    /// Validate candle data integrity
    pub fn validate(&self) -> Result<(), String> {
        if self.close_time <= self.open_time {
            return Err(format!(
                "Close time ({}) must be after open time ({})",
                self.close_time, self.open_time
            ));
        }

        if self.high < self.low {
            return Err(format!(
                "High ({}) must be >= low ({})",
                self.high, self.low
            ));
        }

        if self.volume < Decimal::ZERO {
            return Err(format!("Volume must be non-negative, got {}", self.volume));
        }

        Ok(())
    }
}

/// Time interval for OHLCV candles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interval {
    /// 1 minute
    #[serde(rename = "1m")]
    OneMinute,
    /// 3 minutes
    #[serde(rename = "3m")]
    ThreeMinutes,
    /// 5 minutes
    #[serde(rename = "5m")]
    FiveMinutes,
    /// 15 minutes
    #[serde(rename = "15m")]
    FifteenMinutes,
    /// 30 minutes
    #[serde(rename = "30m")]
    ThirtyMinutes,
    /// 1 hour
    #[serde(rename = "1h")]
    OneHour,
    /// 2 hours
    #[serde(rename = "2h")]
    TwoHours,
    /// 4 hours
    #[serde(rename = "4h")]
    FourHours,
    /// 6 hours
    #[serde(rename = "6h")]
    SixHours,
    /// 8 hours
    #[serde(rename = "8h")]
    EightHours,
    /// 12 hours
    #[serde(rename = "12h")]
    TwelveHours,
    /// 1 day
    #[serde(rename = "1d")]
    OneDay,
    /// 3 days
    #[serde(rename = "3d")]
    ThreeDays,
    /// 1 week
    #[serde(rename = "1w")]
    OneWeek,
    /// 1 month
    #[serde(rename = "1M")]
    OneMonth,
}

impl Interval {
    /// Convert interval to milliseconds
    pub fn to_milliseconds(&self) -> i64 {
        match self {
            Interval::OneMinute => 60_000,
            Interval::ThreeMinutes => 180_000,
            Interval::FiveMinutes => 300_000,
            Interval::FifteenMinutes => 900_000,
            Interval::ThirtyMinutes => 1_800_000,
            Interval::OneHour => 3_600_000,
            Interval::TwoHours => 7_200_000,
            Interval::FourHours => 14_400_000,
            Interval::SixHours => 21_600_000,
            Interval::EightHours => 28_800_000,
            Interval::TwelveHours => 43_200_000,
            Interval::OneDay => 86_400_000,
            Interval::ThreeDays => 259_200_000,
            Interval::OneWeek => 604_800_000,
            Interval::OneMonth => 2_592_000_000, // Approximate: 30 days
        }
    }

    /// First bar boundary strictly after `now`
    ///
    /// Boundaries are aligned to the Unix epoch, which matches Binance for
    /// intervals up to one day. Weekly and monthly bars are not epoch aligned
    /// and callers should compute their `run_time` explicitly.
    pub fn next_boundary(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let step = self.to_milliseconds();
        let next = (now.timestamp_millis().div_euclid(step) + 1) * step;
        DateTime::from_timestamp_millis(next).unwrap_or(now)
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Interval::OneMinute => "1m",
            Interval::ThreeMinutes => "3m",
            Interval::FiveMinutes => "5m",
            Interval::FifteenMinutes => "15m",
            Interval::ThirtyMinutes => "30m",
            Interval::OneHour => "1h",
            Interval::TwoHours => "2h",
            Interval::FourHours => "4h",
            Interval::SixHours => "6h",
            Interval::EightHours => "8h",
            Interval::TwelveHours => "12h",
            Interval::OneDay => "1d",
            Interval::ThreeDays => "3d",
            Interval::OneWeek => "1w",
            Interval::OneMonth => "1M",
        };
        write!(f, "{s}")
    }
}

impl FromStr for Interval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1m" => Ok(Interval::OneMinute),
            "3m" => Ok(Interval::ThreeMinutes),
            "5m" => Ok(Interval::FiveMinutes),
            "15m" => Ok(Interval::FifteenMinutes),
            "30m" => Ok(Interval::ThirtyMinutes),
            "1h" => Ok(Interval::OneHour),
            "2h" => Ok(Interval::TwoHours),
            "4h" => Ok(Interval::FourHours),
            "6h" => Ok(Interval::SixHours),
            "8h" => Ok(Interval::EightHours),
            "12h" => Ok(Interval::TwelveHours),
            "1d" => Ok(Interval::OneDay),
            "3d" => Ok(Interval::ThreeDays),
            "1w" => Ok(Interval::OneWeek),
            "1M" => Ok(Interval::OneMonth),
            _ => Err(format!("Invalid interval: {s}")),
        }
    }
}

/// Per-symbol trading rules from exchangeInfo
///
/// Tick, step and notional values are parsed straight from the exchange's
/// decimal strings and keep their original scale.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SymbolRule {
    /// Trading symbol name (e.g., "BTCUSDT", "BTCUSD_PERP")
    pub symbol: String,
    /// Trading status as reported by the exchange (e.g., "TRADING")
    pub status: String,
    /// Base asset (e.g., "BTC")
    pub base_asset: String,
    /// Quote asset (e.g., "USDT", "USD")
    pub quote_asset: String,
    /// Margin asset, futures only
    pub margin_asset: Option<String>,
    /// Contract type (e.g., "PERPETUAL"), futures only
    pub contract_type: Option<String>,
    /// Minimum price increment (PRICE_FILTER.tickSize)
    pub price_tick: Decimal,
    /// Minimum quantity increment (LOT_SIZE.stepSize)
    pub lot_step: Decimal,
    /// Minimum order notional; absent for COIN-margined futures
    pub min_notional: Option<Decimal>,
}

impl SymbolRule {
    /// Validate rule integrity
    pub fn validate(&self) -> Result<(), String> {
        if self.symbol.is_empty() {
            return Err("Symbol name cannot be empty".to_string());
        }

        if self.price_tick <= Decimal::ZERO {
            return Err(format!(
                "Price tick must be positive, got {}",
                self.price_tick
            ));
        }

        if self.lot_step <= Decimal::ZERO {
            return Err(format!("Lot step must be positive, got {}", self.lot_step));
        }

        if let Some(notional) = self.min_notional {
            if notional < Decimal::ZERO {
                return Err(format!(
                    "Min notional must be non-negative, got {notional}"
                ));
            }
        }

        Ok(())
    }
}

/// Server time plus the weight consumed in the trailing minute
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimestampWeight {
    /// Server time
    pub server_time: DateTime<FixedOffset>,
    /// Value of the `X-MBX-USED-WEIGHT-1M` response header
    pub used_weight_1m: u32,
}

impl TimestampWeight {
    /// Weight left in the current minute under `limit`
    pub fn remaining_weight(&self, limit: u32) -> u32 {
        limit.saturating_sub(self.used_weight_1m)
    }
}
