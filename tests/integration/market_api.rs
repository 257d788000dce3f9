//! Market API tests against a mock Binance server

use binance_market_data::fetcher::binance_futures_coin::BinanceFuturesCoinMarketApi;
use binance_market_data::fetcher::binance_futures_usdt::BinanceFuturesUsdtMarketApi;
use binance_market_data::fetcher::binance_spot::BinanceSpotMarketApi;
use binance_market_data::fetcher::retry::{RetryPolicy, RetryingMarketApi};
use binance_market_data::fetcher::{CandleQuery, FetcherError, MarketApi};
use binance_market_data::Interval;
use chrono::{FixedOffset, TimeZone, Utc};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const WEIGHT_HEADER: &str = "X-MBX-USED-WEIGHT-1M";

fn kline(open_ms: i64, close: &str) -> Value {
    json!([
        open_ms,
        "42000.10",
        "42100.00",
        "41950.00",
        close,
        "12.345",
        open_ms + 59_999,
        "518400.50",
        321,
        "6.100",
        "256000.00",
        "0"
    ])
}

fn price_filters() -> Value {
    json!([
        {"filterType": "PRICE_FILTER", "tickSize": "0.10"},
        {"filterType": "LOT_SIZE", "stepSize": "0.001"},
        {"filterType": "MIN_NOTIONAL", "notional": "5"},
        {"filterType": "NOTIONAL", "minNotional": "5.00000000"}
    ])
}

#[tokio::test]
async fn test_time_reports_server_time_and_weight() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/fapi/v1/time"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"serverTime": 1_709_251_260_123_i64}))
                .insert_header(WEIGHT_HEADER, "37"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let api = BinanceFuturesUsdtMarketApi::with_base_url(server.uri());
    let tw = api.timestamp_and_weight().await.unwrap();

    assert_eq!(tw.server_time.timestamp_millis(), 1_709_251_260_123);
    assert_eq!(tw.used_weight_1m, 37);
    assert_eq!(tw.remaining_weight(2400), 2363);
}

#[tokio::test]
async fn test_time_without_weight_header_is_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/time"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"serverTime": 0})))
        .mount(&server)
        .await;

    let api = BinanceSpotMarketApi::with_base_url(server.uri());
    assert!(matches!(
        api.timestamp_and_weight().await,
        Err(FetcherError::InvalidResponse(_))
    ));
}

#[tokio::test]
async fn test_candles_sends_window_and_parses_exact_decimals() {
    let server = MockServer::start().await;
    let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
    let end = Utc.with_ymd_and_hms(2024, 3, 1, 0, 2, 0).unwrap();

    Mock::given(method("GET"))
        .and(path("/fapi/v1/klines"))
        .and(query_param("symbol", "BTCUSDT"))
        .and(query_param("interval", "1m"))
        .and(query_param("limit", "499"))
        .and(query_param("startTime", start.timestamp_millis().to_string()))
        .and(query_param("endTime", end.timestamp_millis().to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            kline(start.timestamp_millis(), "42010.50"),
            kline(start.timestamp_millis() + 60_000, "42020.00")
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let api = BinanceFuturesUsdtMarketApi::with_base_url(server.uri());
    let query = CandleQuery {
        start_time: Some(start),
        end_time: Some(end),
        limit: None,
    };
    let candles = api
        .candles("BTCUSDT", Interval::OneMinute, &query)
        .await
        .unwrap();

    assert_eq!(candles.len(), 2);
    assert_eq!(candles[0].open_time, start);
    assert_eq!(candles[0].close.to_string(), "42010.50");
    assert_eq!(candles[1].close, Decimal::from_str("42020.00").unwrap());
    assert_eq!(candles[0].trade_count, 321);
    assert!(candles.iter().all(|c| c.validate().is_ok()));
}

#[tokio::test]
async fn test_candles_use_display_offset() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/klines"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([kline(0, "1.0")])))
        .mount(&server)
        .await;

    let tokyo = FixedOffset::east_opt(9 * 3600).unwrap();
    let api = BinanceSpotMarketApi::with_base_url(server.uri()).with_display_offset(tokyo);
    let candles = api
        .candles("BTCUSDT", Interval::OneMinute, &CandleQuery::recent(1))
        .await
        .unwrap();

    assert_eq!(candles[0].open_time.offset(), &tokyo);
    assert_eq!(candles[0].open_time.timestamp_millis(), 0);
}

#[tokio::test]
async fn test_oversized_limit_is_rejected_before_any_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/klines"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let api = BinanceSpotMarketApi::with_base_url(server.uri());
    let result = api
        .candles("BTCUSDT", Interval::OneMinute, &CandleQuery::recent(1001))
        .await;

    assert!(matches!(result, Err(FetcherError::InvalidRequest(_))));
}

#[tokio::test]
async fn test_out_of_order_candles_are_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/dapi/v1/klines"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([kline(120_000, "1.0"), kline(60_000, "1.0")])),
        )
        .mount(&server)
        .await;

    let api = BinanceFuturesCoinMarketApi::with_base_url(server.uri());
    let result = api
        .candles("BTCUSD_PERP", Interval::OneMinute, &CandleQuery::default())
        .await;

    assert!(matches!(result, Err(FetcherError::InvalidResponse(_))));
}

#[tokio::test]
async fn test_spot_exchange_rules_skip_unparseable_symbols() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/exchangeInfo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "symbols": [
                {
                    "symbol": "BTCUSDT",
                    "status": "TRADING",
                    "baseAsset": "BTC",
                    "quoteAsset": "USDT",
                    "filters": price_filters()
                },
                {
                    "symbol": "BROKEN",
                    "status": "TRADING",
                    "baseAsset": "BRO",
                    "quoteAsset": "USDT",
                    "filters": [{"filterType": "PRICE_FILTER", "tickSize": "not-a-number"}]
                }
            ]
        })))
        .mount(&server)
        .await;

    let api = BinanceSpotMarketApi::with_base_url(server.uri());
    let rules = api.exchange_rules().await.unwrap();

    assert_eq!(rules.len(), 1);
    let btc = &rules["BTCUSDT"];
    assert_eq!(btc.status, "TRADING");
    assert_eq!(btc.price_tick.to_string(), "0.10");
    assert_eq!(btc.lot_step.to_string(), "0.001");
    assert_eq!(btc.min_notional.unwrap().to_string(), "5.00000000");
    assert_eq!(btc.margin_asset, None);
    assert_eq!(btc.contract_type, None);
}

#[tokio::test]
async fn test_usdt_futures_exchange_rules_carry_contract_fields() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/fapi/v1/exchangeInfo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "symbols": [{
                "symbol": "ETHUSDT",
                "status": "TRADING",
                "baseAsset": "ETH",
                "quoteAsset": "USDT",
                "marginAsset": "USDT",
                "contractType": "PERPETUAL",
                "filters": price_filters()
            }]
        })))
        .mount(&server)
        .await;

    let api = BinanceFuturesUsdtMarketApi::with_base_url(server.uri());
    let rules = api.exchange_rules().await.unwrap();

    let eth = &rules["ETHUSDT"];
    assert_eq!(eth.margin_asset.as_deref(), Some("USDT"));
    assert_eq!(eth.contract_type.as_deref(), Some("PERPETUAL"));
    assert_eq!(eth.min_notional.unwrap().to_string(), "5");
}

#[tokio::test]
async fn test_coin_futures_exchange_rules_use_contract_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/dapi/v1/exchangeInfo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "symbols": [{
                "symbol": "BTCUSD_PERP",
                "contractStatus": "TRADING",
                "baseAsset": "BTC",
                "quoteAsset": "USD",
                "marginAsset": "BTC",
                "contractType": "PERPETUAL",
                "filters": [
                    {"filterType": "PRICE_FILTER", "tickSize": "0.1"},
                    {"filterType": "LOT_SIZE", "stepSize": "1"}
                ]
            }]
        })))
        .mount(&server)
        .await;

    let api = BinanceFuturesCoinMarketApi::with_base_url(server.uri());
    let rules = api.exchange_rules().await.unwrap();

    let perp = &rules["BTCUSD_PERP"];
    assert_eq!(perp.status, "TRADING");
    assert_eq!(perp.margin_asset.as_deref(), Some("BTC"));
    assert_eq!(perp.min_notional, None);
}

#[tokio::test]
async fn test_exchange_info_without_symbols_is_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/fapi/v1/exchangeInfo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"timezone": "UTC"})))
        .mount(&server)
        .await;

    let api = BinanceFuturesUsdtMarketApi::with_base_url(server.uri());
    assert!(matches!(
        api.exchange_rules().await,
        Err(FetcherError::InvalidResponse(_))
    ));
}

#[tokio::test]
async fn test_funding_rate_maps_blank_rates_to_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/fapi/v1/premiumIndex"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"symbol": "BTCUSDT", "markPrice": "42000.0", "lastFundingRate": "0.00010000"},
            {"symbol": "NEWUSDT", "markPrice": "1.0", "lastFundingRate": ""}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let api = BinanceFuturesUsdtMarketApi::with_base_url(server.uri());
    let rates = api.funding_rate().await.unwrap();

    assert_eq!(rates.len(), 2);
    assert_eq!(rates["BTCUSDT"].unwrap().to_string(), "0.00010000");
    assert_eq!(rates["NEWUSDT"], None);
}

#[tokio::test]
async fn test_spot_funding_rate_is_empty_without_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let api = BinanceSpotMarketApi::with_base_url(server.uri());
    assert!(api.funding_rate().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_retrying_api_recovers_from_server_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/fapi/v1/time"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/fapi/v1/time"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"serverTime": 1_000}))
                .insert_header(WEIGHT_HEADER, "1"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let api = RetryingMarketApi::new(
        Arc::new(BinanceFuturesUsdtMarketApi::with_base_url(server.uri())),
        RetryPolicy::fixed(3, Duration::ZERO),
    );
    let tw = api.timestamp_and_weight().await.unwrap();

    assert_eq!(tw.used_weight_1m, 1);
}

#[tokio::test]
async fn test_retrying_api_surfaces_last_error_after_cap() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/fapi/v1/premiumIndex"))
        .respond_with(ResponseTemplate::new(500))
        .expect(4)
        .mount(&server)
        .await;

    let api = RetryingMarketApi::new(
        Arc::new(BinanceFuturesUsdtMarketApi::with_base_url(server.uri())),
        RetryPolicy::fixed(4, Duration::ZERO),
    );

    assert!(matches!(
        api.funding_rate().await,
        Err(FetcherError::HttpError(_))
    ));
}
