//! CLI command implementations

pub mod archive;
pub mod error;
pub mod market;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::sync::Arc;

use crate::config::MAX_CONCURRENCY;
use crate::fetcher::create_market_api_with_offset;
use crate::fetcher::retry::{RetryPolicy, RetryingMarketApi};
use crate::MarketType;

pub use archive::ArchiveCommand;
pub use error::CliError;
pub use market::{CandlesArgs, ClosedCandlesArgs, RulesArgs};

/// Binance market data CLI
#[derive(Parser, Debug)]
#[command(name = "bmd")]
#[command(about = "Fetch closure-verified Binance candles and archive data", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Market: spot, usdt_futures or coin_futures
    #[arg(long, global = true, default_value = "usdt_futures")]
    pub market: MarketType,

    /// Maximum attempts per request, first try included (default: 5, range: 1-20)
    #[arg(
        long,
        global = true,
        default_value = "5",
        value_parser = clap::value_parser!(u32).range(1..=20)
    )]
    pub max_retries: u32,

    /// Hours east of UTC used when printing candle times
    #[arg(
        long,
        global = true,
        default_value = "0",
        allow_hyphen_values = true,
        value_parser = clap::value_parser!(i32).range(-12..=14)
    )]
    pub utc_offset_hours: i32,

    /// Number of symbols processed concurrently (default: 4, max: 32)
    #[arg(long, global = true, default_value = "4", value_parser = parse_concurrency)]
    pub concurrency: usize,
}

/// CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Server time and request weight used in the current minute
    Time,

    /// Fetch one page of candles
    Candles(CandlesArgs),

    /// Poll until the candle before a bar boundary has closed
    ClosedCandles(ClosedCandlesArgs),

    /// Trading rules per symbol
    Rules(RulesArgs),

    /// Latest funding rate per symbol (empty for spot)
    Funding,

    /// Historical archive listing, download and verification
    Archive(ArchiveCommand),
}

impl Cli {
    /// Retry policy built from `--max-retries`
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::with_max_attempts(self.max_retries)
    }

    /// Offset built from `--utc-offset-hours`
    pub fn display_offset(&self) -> Result<FixedOffset, CliError> {
        FixedOffset::east_opt(self.utc_offset_hours * 3600).ok_or_else(|| {
            CliError::InvalidArgument(format!("Invalid UTC offset: {}", self.utc_offset_hours))
        })
    }

    /// Market API for `--market`, wrapped in the retry policy
    pub fn market_api(&self) -> Result<RetryingMarketApi, CliError> {
        let api = create_market_api_with_offset(self.market, self.display_offset()?);
        Ok(RetryingMarketApi::new(Arc::from(api), self.retry_policy()))
    }

    /// Run the selected command
    pub async fn execute(&self) -> Result<(), CliError> {
        match &self.command {
            Commands::Time => market::execute_time(self).await,
            Commands::Candles(args) => args.execute(self).await,
            Commands::ClosedCandles(args) => args.execute(self).await,
            Commands::Rules(args) => args.execute(self).await,
            Commands::Funding => market::execute_funding(self).await,
            Commands::Archive(cmd) => cmd.execute(self).await,
        }
    }
}

/// Print `value` to stdout as pretty JSON
pub fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Parse and validate concurrency value
fn parse_concurrency(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;

    if value == 0 {
        return Err("concurrency must be at least 1".to_string());
    }
    if value > MAX_CONCURRENCY {
        return Err(format!(
            "concurrency {value} exceeds maximum of {MAX_CONCURRENCY}"
        ));
    }
    Ok(value)
}

/// Parse a time from YYYY-MM-DD or RFC3339 datetime format
///
/// Handles both inputs with and without timezone designators:
/// - "2024-01-01" - start of day, UTC
/// - "2024-01-01T00:00:00Z" - explicit UTC
/// - "2024-01-01T00:00:00+08:00" - explicit offset
/// - "2024-01-01T00:00:00" - no timezone, assumed UTC
pub fn parse_time_flexible(input: &str) -> Result<DateTime<Utc>, String> {
    let input = input.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(&format!("{input}Z")) {
        return Ok(dt.with_timezone(&Utc));
    }

    let date = NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .map_err(|e| format!("Invalid time '{input}': {e}"))?;
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc())
        .ok_or_else(|| format!("Invalid time '{input}'"))
}
