//! Logging setup as the binary configures it

use binance_market_data::fetcher::retry::{retry_with_backoff, RetryPolicy};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

/// In-memory log sink
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[test]
fn test_env_filter_drops_levels_below_directive() {
    let captured = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("warn"))
        .with_ansi(false)
        .with_writer(captured.clone())
        .finish();

    tracing::subscriber::with_default(subscriber, || {
        info!(symbol = "BTCUSDT", "Candle closed");
        warn!(symbol = "ETHUSDT", polls = 15, "Candle closure not confirmed before timeout");
    });

    let logs = captured.contents();
    assert!(!logs.contains("Candle closed"));
    assert!(logs.contains("Candle closure not confirmed before timeout"));
    assert!(logs.contains("symbol=\"ETHUSDT\""));
    assert!(logs.contains("polls=15"));
}

#[test]
fn test_json_format_emits_one_object_per_event() {
    let captured = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::new("info"))
        .with_writer(captured.clone())
        .finish();

    tracing::subscriber::with_default(subscriber, || {
        info!(symbol = "BTCUSDT", interval = "1m", candles = 4, "Candle closed");
    });

    let logs = captured.contents();
    let line = logs.lines().next().unwrap();
    let event: serde_json::Value = serde_json::from_str(line).unwrap();
    assert_eq!(event["level"], "INFO");
    assert_eq!(event["fields"]["message"], "Candle closed");
    assert_eq!(event["fields"]["symbol"], "BTCUSDT");
    assert_eq!(event["fields"]["candles"], 4);
}

#[test]
fn test_env_filter_parsing() {
    for directive in [
        "info",
        "binance_market_data=debug",
        "warn,binance_market_data=trace",
        "binance_market_data::fetcher::retry=warn",
    ] {
        assert!(EnvFilter::try_new(directive).is_ok(), "{directive}");
    }
}

#[tokio::test]
async fn test_each_retry_logs_a_warning() {
    let captured = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("binance_market_data=warn"))
        .with_ansi(false)
        .with_writer(captured.clone())
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let policy = RetryPolicy::fixed(3, Duration::ZERO);
    let result: Result<(), String> =
        retry_with_backoff(&policy, "logging_test", || async { Err("boom".to_string()) }).await;

    assert_eq!(result, Err("boom".to_string()));
    let logs = captured.contents();
    assert_eq!(logs.matches("Attempt failed, retrying").count(), 2);
    assert!(logs.contains("operation=\"logging_test\""));
    assert!(logs.contains("attempt=1"));
    assert!(logs.contains("max_attempts=3"));
    assert!(logs.contains("error=boom"));
}
