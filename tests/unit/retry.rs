//! Retry executor behaviour through the public API

use binance_market_data::fetcher::retry::{retry_with_backoff, RetryPolicy};
use binance_market_data::fetcher::FetcherError;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_succeeds_after_cap_minus_one_failures() {
    for cap in 1..=5u32 {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let result = retry_with_backoff(&RetryPolicy::fixed(cap, Duration::ZERO), "cap", || {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n < cap {
                    Err(FetcherError::NetworkError(format!("attempt {n}")))
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), cap);
        assert_eq!(calls.load(Ordering::SeqCst), cap);
    }
}

#[tokio::test]
async fn test_parse_errors_are_retried_too() {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&calls);

    let result: Result<(), FetcherError> =
        retry_with_backoff(&RetryPolicy::fixed(3, Duration::ZERO), "parse", || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Err(FetcherError::ParseError("bad body".to_string())) }
        })
        .await;

    assert!(matches!(result, Err(FetcherError::ParseError(_))));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn test_default_policy_backoff_is_capped() {
    let policy = RetryPolicy {
        max_attempts: 8,
        ..RetryPolicy::default()
    };

    let started = tokio::time::Instant::now();
    let result: Result<(), &str> =
        retry_with_backoff(&policy, "capped", || async { Err("down") }).await;

    assert!(result.is_err());
    // 1 + 2 + 4 + 8 + 16 + 30 + 30 seconds of backoff
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(91));
    assert!(elapsed < Duration::from_secs(92));
}
