//! Live market commands: time, candles, closed-candles, rules, funding

use chrono::{DateTime, Utc};
use clap::Args;
use futures::stream::{self, StreamExt};
use serde_json::json;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::info;

use super::{parse_time_flexible, print_json, Cli, CliError};
use crate::config::{DEFAULT_CANDLE_CLOSE_TIMEOUT_SECS, MAX_MINUTE_WEIGHT};
use crate::fetcher::closure::{CandleClosurePoller, ClosedCandles};
use crate::fetcher::CandleQuery;
use crate::Interval;

/// `bmd time`
pub async fn execute_time(cli: &Cli) -> Result<(), CliError> {
    let api = cli.market_api()?;
    let tw = api.timestamp_and_weight().await?;

    print_json(&json!({
        "market": cli.market,
        "server_time": tw.server_time,
        "used_weight_1m": tw.used_weight_1m,
        "remaining_weight_1m": tw.remaining_weight(MAX_MINUTE_WEIGHT),
    }))
}

/// `bmd funding`
pub async fn execute_funding(cli: &Cli) -> Result<(), CliError> {
    let api = cli.market_api()?;
    let rates = api.funding_rate().await?;
    print_json(&rates)
}

/// Candles command arguments
#[derive(Args, Debug)]
pub struct CandlesArgs {
    /// Trading symbol (e.g., BTCUSDT)
    pub symbol: String,

    /// Bar interval (e.g., 1m, 1h, 1d)
    #[arg(short, long, default_value = "1m")]
    pub interval: Interval,

    /// Earliest open time (YYYY-MM-DD or RFC3339)
    #[arg(long, value_parser = parse_time_flexible)]
    pub start: Option<DateTime<Utc>>,

    /// Latest open time (YYYY-MM-DD or RFC3339)
    #[arg(long, value_parser = parse_time_flexible)]
    pub end: Option<DateTime<Utc>>,

    /// Number of candles (default 499; max 1000 spot, 1500 futures)
    #[arg(long)]
    pub limit: Option<u32>,
}

impl CandlesArgs {
    /// Execute candles command
    pub async fn execute(&self, cli: &Cli) -> Result<(), CliError> {
        if let (Some(start), Some(end)) = (self.start, self.end) {
            if start > end {
                return Err(CliError::InvalidArgument(format!(
                    "start {start} is after end {end}"
                )));
            }
        }

        let api = cli.market_api()?;
        let query = CandleQuery {
            start_time: self.start,
            end_time: self.end,
            limit: self.limit,
        };
        let candles = api.candles(&self.symbol, self.interval, &query).await?;
        print_json(&candles)
    }
}

/// Closed-candles command arguments
#[derive(Args, Debug)]
pub struct ClosedCandlesArgs {
    /// Trading symbols (e.g., BTCUSDT ETHUSDT)
    #[arg(required = true, num_args = 1..)]
    pub symbols: Vec<String>,

    /// Bar interval (e.g., 1m, 1h, 1d)
    #[arg(short, long, default_value = "1m")]
    pub interval: Interval,

    /// Bar boundary to confirm (default: the next boundary of the interval)
    #[arg(long, value_parser = parse_time_flexible)]
    pub run_time: Option<DateTime<Utc>>,

    /// Seconds past the boundary to keep polling before giving up
    #[arg(long, default_value_t = DEFAULT_CANDLE_CLOSE_TIMEOUT_SECS)]
    pub timeout_secs: u64,
}

impl ClosedCandlesArgs {
    /// Execute closed-candles command
    pub async fn execute(&self, cli: &Cli) -> Result<(), CliError> {
        let api = cli.market_api()?;
        let run_time = self
            .run_time
            .unwrap_or_else(|| self.interval.next_boundary(Utc::now()));

        // Nothing can close before the boundary itself
        if let Ok(wait) = (run_time - Utc::now()).to_std() {
            info!(%run_time, wait_secs = wait.as_secs(), "Waiting for bar boundary");
            tokio::time::sleep(wait).await;
        }

        let poller = CandleClosurePoller::new(Duration::from_secs(self.timeout_secs));
        let interval = self.interval;

        let results: Vec<Result<(String, ClosedCandles), CliError>> =
            stream::iter(self.symbols.clone())
                .map(|symbol| {
                    let api = api.clone();
                    let poller = poller.clone();
                    async move {
                        let closed = poller.poll(&api, &symbol, interval, run_time).await?;
                        Ok::<_, CliError>((symbol, closed))
                    }
                })
                .buffer_unordered(cli.concurrency)
                .collect()
                .await;

        let mut by_symbol = BTreeMap::new();
        for result in results {
            let (symbol, closed) = result?;
            by_symbol.insert(symbol, closed);
        }

        print_json(&json!({
            "run_time": run_time,
            "interval": interval,
            "results": by_symbol,
        }))
    }
}

/// Rules command arguments
#[derive(Args, Debug)]
pub struct RulesArgs {
    /// Only print these symbols
    #[arg(long = "symbol")]
    pub symbols: Vec<String>,
}

impl RulesArgs {
    /// Execute rules command
    pub async fn execute(&self, cli: &Cli) -> Result<(), CliError> {
        let api = cli.market_api()?;
        let mut rules = api.exchange_rules().await?;

        if !self.symbols.is_empty() {
            rules.retain(|symbol, _| self.symbols.contains(symbol));
        }

        print_json(&rules)
    }
}
