//! Bulk archive downloads
//!
//! Resumable parallel HTTP transfer is delegated to an external tool behind
//! the [`transfer::TransferTool`] seam. This module only turns archive keys
//! into a deduplicated work list of URLs and a destination directory.
//!
//! # Quick Start
//!
//! ```no_run
//! use binance_market_data::downloader::BulkDownloader;
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let downloader = BulkDownloader::new();
//! let keys = vec![
//!     "data/spot/daily/klines/BTCUSDT/1m/BTCUSDT-1m-2024-01-01.zip".to_string(),
//!     "data/spot/daily/klines/BTCUSDT/1m/BTCUSDT-1m-2024-01-01.zip.CHECKSUM".to_string(),
//! ];
//! downloader.download(&keys, Path::new("./archive/BTCUSDT/1m")).await?;
//! # Ok(())
//! # }
//! ```

pub mod transfer;

use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::config::{ARCHIVE_DOWNLOAD_BASE_URL, DEFAULT_TRANSFER_PARALLELISM};
use crate::fetcher::FetcherError;
use transfer::{Aria2cTransfer, TransferTool};

/// Download errors
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Transfer tool could not be started
    #[error("failed to start transfer tool: {0}")]
    TransferSpawn(String),

    /// Transfer tool ran but reported failure
    #[error("transfer failed: {0}")]
    TransferFailed(String),

    /// Fetcher error (e.g., listing the keys to download)
    #[error("fetcher error: {0}")]
    Fetcher(#[from] FetcherError),
}

/// Maps archive keys to download URLs and hands them to a [`TransferTool`]
#[derive(Clone)]
pub struct BulkDownloader {
    base_url: String,
    transfer: Arc<dyn TransferTool>,
}

impl BulkDownloader {
    /// Downloader for data.binance.vision using aria2c
    pub fn new() -> Self {
        Self::with_transfer(
            ARCHIVE_DOWNLOAD_BASE_URL,
            Arc::new(Aria2cTransfer::new(DEFAULT_TRANSFER_PARALLELISM)),
        )
    }

    /// Downloader with a custom base URL and transfer tool
    pub fn with_transfer(base_url: impl Into<String>, transfer: Arc<dyn TransferTool>) -> Self {
        Self {
            base_url: base_url.into(),
            transfer,
        }
    }

    /// Sorted, deduplicated download URLs for `keys`
    pub fn work_list(&self, keys: &[String]) -> Vec<String> {
        let mut keys: Vec<&str> = keys.iter().map(String::as_str).collect();
        keys.sort_unstable();
        keys.dedup();

        let base = self.base_url.trim_end_matches('/');
        keys.into_iter()
            .map(|key| format!("{}/{}", base, key.trim_start_matches('/')))
            .collect()
    }

    /// Fetch every key into `output_dir`, resuming partial files
    ///
    /// Returns the URLs handed to the transfer tool.
    pub async fn download(
        &self,
        keys: &[String],
        output_dir: &Path,
    ) -> Result<Vec<String>, DownloadError> {
        tokio::fs::create_dir_all(output_dir).await?;

        let urls = self.work_list(keys);
        if urls.is_empty() {
            info!(dir = %output_dir.display(), "Nothing to download");
            return Ok(urls);
        }

        info!(
            files = urls.len(),
            dir = %output_dir.display(),
            "Starting bulk download"
        );
        self.transfer.transfer(&urls, output_dir).await?;
        Ok(urls)
    }
}

impl Default for BulkDownloader {
    fn default() -> Self {
        Self::new()
    }
}
