//! Candle closure polling end to end

use async_trait::async_trait;
use binance_market_data::fetcher::binance_futures_usdt::BinanceFuturesUsdtMarketApi;
use binance_market_data::fetcher::closure::{CandleClosurePoller, ClosureState, Clock};
use binance_market_data::fetcher::retry::{RetryPolicy, RetryingMarketApi};
use binance_market_data::fetcher::{CandleQuery, FetcherError, FetcherResult, MarketApi};
use binance_market_data::{
    Candle, FundingRates, Interval, MarketType, SymbolRule, TimestampWeight,
};
use chrono::{DateTime, Offset, TimeZone, Utc};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Wall clock driven by tokio's pausable clock
struct TokioClock {
    origin: DateTime<Utc>,
    started: tokio::time::Instant,
}

impl Clock for TokioClock {
    fn now(&self) -> DateTime<Utc> {
        self.origin + chrono::Duration::from_std(self.started.elapsed()).unwrap()
    }
}

/// Minute feed that publishes a bar only once its open time has passed,
/// with a settlement lag on top
struct LaggingMinuteFeed {
    clock: Arc<TokioClock>,
    lag: chrono::Duration,
}

impl LaggingMinuteFeed {
    fn candle(open: DateTime<Utc>) -> Candle {
        let tz = Utc.fix();
        Candle {
            open_time: open.with_timezone(&tz),
            open: Decimal::new(420_001, 1),
            high: Decimal::new(420_500, 1),
            low: Decimal::new(419_900, 1),
            close: Decimal::new(420_250, 1),
            volume: Decimal::new(1_234, 3),
            close_time: (open + chrono::Duration::milliseconds(59_999)).with_timezone(&tz),
            quote_volume: Decimal::new(51_840, 0),
            trade_count: 42,
            taker_buy_base_volume: Decimal::new(600, 3),
            taker_buy_quote_volume: Decimal::new(25_200, 0),
        }
    }
}

#[async_trait]
impl MarketApi for LaggingMinuteFeed {
    fn market_type(&self) -> MarketType {
        MarketType::UsdtFutures
    }

    fn base_url(&self) -> &str {
        "lagging-feed"
    }

    async fn timestamp_and_weight(&self) -> FetcherResult<TimestampWeight> {
        Err(FetcherError::InvalidRequest("unsupported".to_string()))
    }

    async fn candles(
        &self,
        _symbol: &str,
        interval: Interval,
        query: &CandleQuery,
    ) -> FetcherResult<Vec<Candle>> {
        let visible = self.clock.now() - self.lag;
        let newest = interval.next_boundary(visible) - chrono::Duration::minutes(1);
        let limit = i64::from(query.limit.unwrap_or(5));
        Ok((0..limit)
            .rev()
            .map(|back| Self::candle(newest - chrono::Duration::minutes(back)))
            .collect())
    }

    async fn exchange_rules(&self) -> FetcherResult<BTreeMap<String, SymbolRule>> {
        Ok(BTreeMap::new())
    }

    async fn funding_rate(&self) -> FetcherResult<FundingRates> {
        Ok(FundingRates::new())
    }
}

#[tokio::test(start_paused = true)]
async fn test_minute_bar_closes_within_lag_after_run_time() {
    let origin = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 30).unwrap();
    let clock = Arc::new(TokioClock {
        origin,
        started: tokio::time::Instant::now(),
    });
    let feed = Arc::new(LaggingMinuteFeed {
        clock: clock.clone(),
        lag: chrono::Duration::seconds(2),
    });
    let api = RetryingMarketApi::new(feed, RetryPolicy::fixed(1, Duration::ZERO));

    let run_time = Interval::OneMinute.next_boundary(origin);
    assert_eq!(run_time, Utc.with_ymd_and_hms(2024, 3, 1, 12, 1, 0).unwrap());

    tokio::time::sleep((run_time - clock.now()).to_std().unwrap()).await;

    let started = tokio::time::Instant::now();
    let result = CandleClosurePoller::new(Duration::from_secs(10))
        .with_clock(clock.clone())
        .poll(&api, "BTCUSDT", Interval::OneMinute, run_time)
        .await
        .unwrap();

    assert_eq!(result.state, ClosureState::Closed);
    assert!(started.elapsed() <= Duration::from_secs(3));
    assert!(result.candles.iter().all(|c| c.opens_before(run_time)));
    let last = result.candles.last().unwrap();
    assert_eq!(last.open_time, run_time - chrono::Duration::minutes(1));
}

fn kline(open_ms: i64) -> Value {
    json!([
        open_ms, "1.0", "1.0", "1.0", "1.0", "1.0",
        open_ms + 59_999, "1.0", 1, "0.5", "0.5", "0"
    ])
}

fn window(last_open_ms: i64) -> Value {
    Value::Array((0..5).rev().map(|b| kline(last_open_ms - b * 60_000)).collect())
}

#[tokio::test]
async fn test_poller_over_http_closes_on_second_response() {
    let server = MockServer::start().await;
    let run_time = Interval::OneMinute.next_boundary(Utc::now()) - chrono::Duration::minutes(1);
    let run_ms = run_time.timestamp_millis();

    Mock::given(method("GET"))
        .and(path("/fapi/v1/klines"))
        .and(query_param("limit", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(window(run_ms - 60_000)))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/fapi/v1/klines"))
        .and(query_param("limit", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(window(run_ms)))
        .expect(1)
        .mount(&server)
        .await;

    let api = RetryingMarketApi::new(
        Arc::new(BinanceFuturesUsdtMarketApi::with_base_url(server.uri())),
        RetryPolicy::fixed(2, Duration::ZERO),
    );
    let result = CandleClosurePoller::new(Duration::from_secs(120))
        .with_poll_interval(Duration::from_millis(20))
        .poll(&api, "BTCUSDT", Interval::OneMinute, run_time)
        .await
        .unwrap();

    assert!(result.is_closed());
    assert_eq!(result.candles.len(), 4);
    assert!(result.candles.iter().all(|c| c.opens_before(run_time)));
}

#[tokio::test]
async fn test_poller_surfaces_error_once_retries_are_spent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/fapi/v1/klines"))
        .respond_with(ResponseTemplate::new(502))
        .expect(2)
        .mount(&server)
        .await;

    let api = RetryingMarketApi::new(
        Arc::new(BinanceFuturesUsdtMarketApi::with_base_url(server.uri())),
        RetryPolicy::fixed(2, Duration::ZERO),
    );
    let result = CandleClosurePoller::new(Duration::from_secs(10))
        .poll(&api, "BTCUSDT", Interval::OneMinute, Utc::now())
        .await;

    assert!(matches!(result, Err(FetcherError::HttpError(_))));
}
