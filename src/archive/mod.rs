//! Historical archive access (data.binance.vision)
//!
//! - [`listing`] - paginated bucket listing
//! - [`path`] - key layout and date parsing
//! - [`checksum`] - SHA-256 verification of downloaded archives
//!
//! [`ArchiveService`] ties the lister and the bulk downloader together for
//! daily candle archives.

pub mod checksum;
pub mod listing;
pub mod path;

use std::path::Path;
use tracing::info;

use crate::downloader::{BulkDownloader, DownloadError};
use crate::fetcher::retry::RetryPolicy;
use crate::fetcher::FetcherResult;
use crate::{Interval, MarketType};
use listing::ArchiveLister;

/// Lists and mirrors daily candle archives
#[derive(Clone)]
pub struct ArchiveService {
    lister: ArchiveLister,
    downloader: BulkDownloader,
}

impl ArchiveService {
    /// Service against data.binance.vision using aria2c for transfers
    pub fn new(policy: RetryPolicy) -> Self {
        Self::with_parts(ArchiveLister::new(policy), BulkDownloader::new())
    }

    /// Service from an explicit lister and downloader
    pub fn with_parts(lister: ArchiveLister, downloader: BulkDownloader) -> Self {
        Self { lister, downloader }
    }

    /// Lister used for all listings
    pub fn lister(&self) -> &ArchiveLister {
        &self.lister
    }

    /// Symbols that have daily candle archives in `market`
    pub async fn list_candle_symbols(&self, market: MarketType) -> FetcherResult<Vec<String>> {
        let prefixes = self.lister.list_dir(&path::candle_root_dir(market)).await?;
        Ok(prefixes
            .iter()
            .filter_map(|p| path::prefix_name(p))
            .map(str::to_string)
            .collect())
    }

    /// Archive keys (zips and sidecars) for one symbol and interval
    pub async fn list_candle_files(
        &self,
        market: MarketType,
        symbol: &str,
        interval: Interval,
    ) -> FetcherResult<Vec<String>> {
        self.lister
            .list_dir(&path::candle_dir(market, symbol, interval))
            .await
    }

    /// Mirror one symbol's daily candle archives under `root`
    ///
    /// Files land in [`path::local_candle_dir`]. Returns the keys fetched.
    pub async fn sync_candles(
        &self,
        market: MarketType,
        symbol: &str,
        interval: Interval,
        root: &Path,
    ) -> Result<Vec<String>, DownloadError> {
        let keys = self.list_candle_files(market, symbol, interval).await?;
        let output_dir = path::local_candle_dir(root, market, symbol, interval);

        self.downloader.download(&keys, &output_dir).await?;

        info!(
            %market,
            symbol,
            %interval,
            files = keys.len(),
            dir = %output_dir.display(),
            "Synced candle archives"
        );
        Ok(keys)
    }
}
