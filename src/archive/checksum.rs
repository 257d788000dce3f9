//! Archive integrity verification
//!
//! Every archive on data.binance.vision ships with a `<name>.CHECKSUM` sidecar
//! of the form `<sha256>  <name>`. Verification hashes the local zip and
//! removes it (with its sidecar) on mismatch so the next sync fetches it again.

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::fetcher::{FetcherError, FetcherResult};

/// Suffix of checksum sidecar files
pub const CHECKSUM_SUFFIX: &str = ".CHECKSUM";

/// Outcome of verifying one directory
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct VerifyReport {
    /// Archives whose hash matched their sidecar
    pub verified: Vec<PathBuf>,
    /// Archives that did not match and were deleted
    pub corrupted: Vec<PathBuf>,
    /// Archives with no sidecar; left in place
    pub missing_checksum: Vec<PathBuf>,
}

impl VerifyReport {
    /// True when nothing was corrupted or unverifiable
    pub fn is_clean(&self) -> bool {
        self.corrupted.is_empty() && self.missing_checksum.is_empty()
    }
}

/// Compute SHA-256 hash of data
pub fn compute_sha256(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// SHA-256 of a file, streamed in fixed-size chunks
pub fn compute_file_sha256(path: &Path) -> io::Result<String> {
    let mut file = fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Expected hash from sidecar contents (format: "hash  filename" or just "hash")
pub fn parse_checksum(content: &str) -> FetcherResult<String> {
    content
        .split_whitespace()
        .next()
        .map(str::to_lowercase)
        .ok_or_else(|| FetcherError::ArchiveError("Empty CHECKSUM file".to_string()))
}

/// Check `archive` against the hash in `checksum_file`
pub fn verify_file(archive: &Path, checksum_file: &Path) -> FetcherResult<()> {
    let content = fs::read_to_string(checksum_file).map_err(|e| {
        FetcherError::ArchiveError(format!("Failed to read {}: {e}", checksum_file.display()))
    })?;
    let expected = parse_checksum(&content)?;
    let actual = compute_file_sha256(archive).map_err(|e| {
        FetcherError::ArchiveError(format!("Failed to hash {}: {e}", archive.display()))
    })?;

    if actual != expected {
        return Err(FetcherError::ChecksumMismatch { expected, actual });
    }

    Ok(())
}

/// Verify every `*.zip` in `dir` against its sidecar
///
/// Mismatching archives are deleted together with their sidecar. Archives
/// without a sidecar are only reported.
pub fn verify_candle_dir(dir: &Path) -> FetcherResult<VerifyReport> {
    let read_dir = fs::read_dir(dir).map_err(|e| {
        FetcherError::ArchiveError(format!("Failed to read {}: {e}", dir.display()))
    })?;

    let mut archives = Vec::new();
    for entry in read_dir {
        let path = entry
            .map_err(|e| FetcherError::ArchiveError(e.to_string()))?
            .path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "zip") {
            archives.push(path);
        }
    }
    archives.sort();

    let mut report = VerifyReport::default();
    for archive in archives {
        let checksum_file = sidecar_path(&archive);
        if !checksum_file.is_file() {
            debug!(archive = %archive.display(), "No CHECKSUM sidecar");
            report.missing_checksum.push(archive);
            continue;
        }

        match verify_file(&archive, &checksum_file) {
            Ok(()) => report.verified.push(archive),
            Err(FetcherError::ChecksumMismatch { expected, actual }) => {
                warn!(
                    archive = %archive.display(),
                    %expected,
                    %actual,
                    "Checksum mismatch, deleting archive"
                );
                remove(&archive)?;
                remove(&checksum_file)?;
                report.corrupted.push(archive);
            }
            Err(e) => return Err(e),
        }
    }

    info!(
        dir = %dir.display(),
        verified = report.verified.len(),
        corrupted = report.corrupted.len(),
        missing_checksum = report.missing_checksum.len(),
        "Verified archives"
    );
    Ok(report)
}

fn sidecar_path(archive: &Path) -> PathBuf {
    let mut name = archive.as_os_str().to_owned();
    name.push(CHECKSUM_SUFFIX);
    PathBuf::from(name)
}

fn remove(path: &Path) -> FetcherResult<()> {
    fs::remove_file(path).map_err(|e| {
        FetcherError::ArchiveError(format!("Failed to delete {}: {e}", path.display()))
    })
}
