//! Archive subcommands: list, symbols, sync, verify

use clap::{Args, Subcommand};
use futures::stream::{self, StreamExt};
use serde_json::json;
use std::collections::BTreeMap;
use std::path::PathBuf;

use super::{print_json, Cli, CliError};
use crate::archive::checksum::verify_candle_dir;
use crate::archive::path::local_candle_dir;
use crate::archive::ArchiveService;
use crate::Interval;

/// Archive subcommand
#[derive(Debug, Args)]
pub struct ArchiveCommand {
    #[command(subcommand)]
    action: ArchiveAction,
}

/// Archive actions
#[derive(Debug, Subcommand)]
enum ArchiveAction {
    /// List the entries directly under an archive prefix
    List {
        /// Archive prefix (e.g., data/spot/daily/klines/)
        prefix: String,
    },

    /// List symbols with daily candle archives for --market
    Symbols,

    /// Download daily candle archives for one or more symbols
    Sync {
        /// Trading symbols (e.g., BTCUSDT ETHUSDT)
        #[arg(required = true, num_args = 1..)]
        symbols: Vec<String>,

        /// Bar interval (e.g., 1m, 1h, 1d)
        #[arg(short, long, default_value = "1m")]
        interval: Interval,

        /// Local root the archive layout is mirrored under
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,
    },

    /// Verify downloaded archives against their CHECKSUM files
    Verify {
        /// Trading symbols (e.g., BTCUSDT ETHUSDT)
        #[arg(required = true, num_args = 1..)]
        symbols: Vec<String>,

        /// Bar interval (e.g., 1m, 1h, 1d)
        #[arg(short, long, default_value = "1m")]
        interval: Interval,

        /// Local root the archive layout is mirrored under
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,
    },
}

impl ArchiveCommand {
    /// Execute the archive command
    pub async fn execute(&self, cli: &Cli) -> Result<(), CliError> {
        let service = ArchiveService::new(cli.retry_policy());

        match &self.action {
            ArchiveAction::List { prefix } => {
                let entries = service.lister().list_dir(prefix).await?;
                print_json(&entries)
            }
            ArchiveAction::Symbols => {
                let symbols = service.list_candle_symbols(cli.market).await?;
                print_json(&symbols)
            }
            ArchiveAction::Sync {
                symbols,
                interval,
                output_dir,
            } => {
                let interval = *interval;
                let results: Vec<Result<(String, usize), CliError>> =
                    stream::iter(symbols.clone())
                        .map(|symbol| {
                            let service = service.clone();
                            async move {
                                let keys = service
                                    .sync_candles(cli.market, &symbol, interval, output_dir)
                                    .await?;
                                Ok::<_, CliError>((symbol, keys.len()))
                            }
                        })
                        .buffer_unordered(cli.concurrency)
                        .collect()
                        .await;

                let mut files = BTreeMap::new();
                for result in results {
                    let (symbol, count) = result?;
                    files.insert(symbol, count);
                }
                print_json(&json!({ "market": cli.market, "interval": interval, "files": files }))
            }
            ArchiveAction::Verify {
                symbols,
                interval,
                output_dir,
            } => {
                let mut reports = BTreeMap::new();
                for symbol in symbols {
                    let dir = local_candle_dir(output_dir, cli.market, symbol, *interval);
                    reports.insert(symbol.clone(), verify_candle_dir(&dir)?);
                }
                print_json(&reports)
            }
        }
    }
}
