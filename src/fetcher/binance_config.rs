//! Binance market configuration
//!
//! Keeps the differences between spot, USDT-margined and COIN-margined markets
//! in data rather than code. One [`BinanceMarketConfig`] per market drives the
//! shared [`BinanceMarketBase`](super::binance_base::BinanceMarketBase).
//!
//! # Market Types
//!
//! - **Spot**: <https://api.binance.com> with /api/v3/* endpoints
//! - **USDT-margined futures (FAPI)**: <https://fapi.binance.com> with /fapi/v1/* endpoints
//! - **COIN-margined futures (DAPI)**: <https://dapi.binance.com> with /dapi/v1/* endpoints

use crate::MarketType;

/// Location of the minimum order notional inside the exchangeInfo filters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotionalFilter {
    /// `filterType` value (e.g., "NOTIONAL")
    pub filter_type: &'static str,
    /// Field inside that filter (e.g., "minNotional")
    pub field: &'static str,
}

/// Configuration for a Binance market type
///
/// Encapsulates every market-specific constant: endpoint paths, the JSON
/// field names that differ in exchangeInfo, and the klines page limit.
#[derive(Debug, Clone)]
pub struct BinanceMarketConfig {
    /// Market variant described by this config
    pub market_type: MarketType,

    /// Base URL for API (e.g., <https://fapi.binance.com>)
    pub base_url: &'static str,

    /// Server time endpoint path (e.g., /fapi/v1/time)
    pub time_endpoint: &'static str,

    /// Klines endpoint path (e.g., /fapi/v1/klines)
    pub klines_endpoint: &'static str,

    /// Exchange info endpoint path (e.g., /fapi/v1/exchangeInfo)
    pub exchange_info_endpoint: &'static str,

    /// Premium index endpoint path; spot has none
    pub premium_index_endpoint: Option<&'static str>,

    /// JSON field name for symbol trading status in exchangeInfo response
    /// Spot and USDT use "status", COIN uses "contractStatus"
    pub status_field_name: &'static str,

    /// Where the minimum notional lives; COIN-margined contracts have none
    pub min_notional_filter: Option<NotionalFilter>,

    /// Whether exchangeInfo carries `marginAsset` and `contractType`
    pub has_contract_fields: bool,

    /// Largest `limit` accepted by the klines endpoint
    pub max_candle_limit: u32,
}

/// Spot configuration
///
/// - Base URL: <https://api.binance.com>
/// - Endpoints: /api/v3/*
/// - Min notional: `NOTIONAL.minNotional`
/// - Klines limit: 1000
pub const SPOT_CONFIG: BinanceMarketConfig = BinanceMarketConfig {
    market_type: MarketType::Spot,
    base_url: "https://api.binance.com",
    time_endpoint: "/api/v3/time",
    klines_endpoint: "/api/v3/klines",
    exchange_info_endpoint: "/api/v3/exchangeInfo",
    premium_index_endpoint: None,
    status_field_name: "status",
    min_notional_filter: Some(NotionalFilter {
        filter_type: "NOTIONAL",
        field: "minNotional",
    }),
    has_contract_fields: false,
    max_candle_limit: 1000,
};

/// USDT-margined futures configuration (FAPI)
///
/// - Base URL: <https://fapi.binance.com>
/// - Endpoints: /fapi/v1/*
/// - Min notional: `MIN_NOTIONAL.notional`
/// - Klines limit: 1500
pub const USDT_FUTURES_CONFIG: BinanceMarketConfig = BinanceMarketConfig {
    market_type: MarketType::UsdtFutures,
    base_url: "https://fapi.binance.com",
    time_endpoint: "/fapi/v1/time",
    klines_endpoint: "/fapi/v1/klines",
    exchange_info_endpoint: "/fapi/v1/exchangeInfo",
    premium_index_endpoint: Some("/fapi/v1/premiumIndex"),
    status_field_name: "status",
    min_notional_filter: Some(NotionalFilter {
        filter_type: "MIN_NOTIONAL",
        field: "notional",
    }),
    has_contract_fields: true,
    max_candle_limit: 1500,
};

/// COIN-margined futures configuration (DAPI)
///
/// - Base URL: <https://dapi.binance.com>
/// - Endpoints: /dapi/v1/*
/// - Status field: `contractStatus`
/// - Klines limit: 1500
pub const COIN_FUTURES_CONFIG: BinanceMarketConfig = BinanceMarketConfig {
    market_type: MarketType::CoinFutures,
    base_url: "https://dapi.binance.com",
    time_endpoint: "/dapi/v1/time",
    klines_endpoint: "/dapi/v1/klines",
    exchange_info_endpoint: "/dapi/v1/exchangeInfo",
    premium_index_endpoint: Some("/dapi/v1/premiumIndex"),
    status_field_name: "contractStatus",
    min_notional_filter: None,
    has_contract_fields: true,
    max_candle_limit: 1500,
};

impl BinanceMarketConfig {
    /// Static config for a market variant
    pub fn for_market(market_type: MarketType) -> &'static BinanceMarketConfig {
        match market_type {
            MarketType::Spot => &SPOT_CONFIG,
            MarketType::UsdtFutures => &USDT_FUTURES_CONFIG,
            MarketType::CoinFutures => &COIN_FUTURES_CONFIG,
        }
    }
}
