//! Archive key layout on data.binance.vision
//!
//! Daily candle archives live under
//! `data/<market>/daily/klines/<SYMBOL>/<interval>/<SYMBOL>-<interval>-<YYYY-MM-DD>.zip`,
//! each with a `.CHECKSUM` sidecar.

use chrono::NaiveDate;
use std::path::{Path, PathBuf};

use crate::{Interval, MarketType};

/// Path tokens of a market's data root
///
/// - spot → `data/spot`
/// - usdt_futures → `data/futures/um`
/// - coin_futures → `data/futures/cm`
pub fn archive_path_tokens(market: MarketType) -> &'static [&'static str] {
    match market {
        MarketType::Spot => &["data", "spot"],
        MarketType::UsdtFutures => &["data", "futures", "um"],
        MarketType::CoinFutures => &["data", "futures", "cm"],
    }
}

/// Listing prefix whose sub-prefixes are the market's symbols
pub fn candle_root_dir(market: MarketType) -> String {
    let mut tokens = archive_path_tokens(market).to_vec();
    tokens.extend(["daily", "klines"]);
    format!("{}/", tokens.join("/"))
}

/// Listing prefix holding one symbol's daily candle archives
///
/// # Examples
/// ```
/// use binance_market_data::archive::path::candle_dir;
/// use binance_market_data::{Interval, MarketType};
///
/// assert_eq!(
///     candle_dir(MarketType::UsdtFutures, "BTCUSDT", Interval::OneMinute),
///     "data/futures/um/daily/klines/BTCUSDT/1m/"
/// );
/// ```
pub fn candle_dir(market: MarketType, symbol: &str, interval: Interval) -> String {
    format!("{}{}/{}/", candle_root_dir(market), symbol, interval)
}

/// Local mirror of [`candle_dir`] under `root`
pub fn local_candle_dir(
    root: &Path,
    market: MarketType,
    symbol: &str,
    interval: Interval,
) -> PathBuf {
    let mut path = root.to_path_buf();
    path.extend(archive_path_tokens(market));
    path.push("daily");
    path.push("klines");
    path.push(symbol);
    path.push(interval.to_string());
    path
}

/// Date embedded in an archive key or file name
///
/// Accepts `SYMBOL-INTERVAL-YYYY-MM-DD.zip` and its `.CHECKSUM` sidecar, with
/// or without leading directories.
pub fn parse_archive_date(key: &str) -> Option<NaiveDate> {
    let file_name = key.rsplit('/').next()?;
    let stem = file_name.split('.').next()?;
    let date = stem.splitn(3, '-').nth(2)?;
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}

/// Last path segment of a directory-style prefix (`…/BTCUSDT/` → `BTCUSDT`)
pub fn prefix_name(prefix: &str) -> Option<&str> {
    prefix.trim_end_matches('/').rsplit('/').next().filter(|s| !s.is_empty())
}
