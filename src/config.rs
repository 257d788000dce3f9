//! Default configuration constants

use std::time::Duration;

/// Maximum attempts (initial call included) for any network operation.
/// Matches five tries with exponential backoff, enough to ride out transient
/// network issues without looping on persistent failures.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Initial backoff delay in milliseconds.
pub const INITIAL_BACKOFF_MS: u64 = 1000; // 1 second

/// Maximum backoff delay in milliseconds.
pub const MAX_BACKOFF_MS: u64 = 30000; // 30 seconds

/// Backoff multiplier applied after each failed attempt.
pub const BACKOFF_MULTIPLIER: u32 = 2;

/// Exchange weight budget per minute.
pub const MAX_MINUTE_WEIGHT: u32 = 2400;

/// Klines page size with the lowest weight cost per call.
pub const WEIGHT_EFFICIENT_CANDLE_LIMIT: u32 = 499;

/// Number of most recent candles fetched on each closure poll.
pub const CLOSURE_LOOKBACK_CANDLES: u32 = 5;

/// Pause between closure polls.
pub const CLOSURE_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Default candle closure timeout in seconds.
pub const DEFAULT_CANDLE_CLOSE_TIMEOUT_SECS: u64 = 15;

/// HTTP connect timeout in seconds.
pub const HTTP_CONNECT_TIMEOUT_SECS: u64 = 10;

/// HTTP request timeout in seconds (also bounds archive listing pages).
pub const HTTP_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Archive bucket endpoint used for listings.
pub const ARCHIVE_LISTING_BASE_URL: &str =
    "https://s3-ap-northeast-1.amazonaws.com/data.binance.vision";

/// Archive base URL that object keys are appended to for download.
pub const ARCHIVE_DOWNLOAD_BASE_URL: &str =
    "https://s3-ap-northeast-1.amazonaws.com/data.binance.vision/";

/// Upper bound on listing pages walked for one prefix.
pub const MAX_LISTING_PAGES: usize = 10_000;

/// Parallel downloads handed to aria2c.
pub const DEFAULT_TRANSFER_PARALLELISM: usize = 5;

/// Maximum allowed concurrency for per-symbol acquisition tasks.
pub const MAX_CONCURRENCY: usize = 32;
