//! Archive listing pagination
//!
//! The archive bucket answers S3-style `ListBucketResult` documents of at most
//! 1000 entries. A truncated page is continued by repeating the request with
//! `marker` set to the page's `NextMarker` (or, when the bucket omits it, the
//! last entry seen).

use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::{ARCHIVE_LISTING_BASE_URL, MAX_LISTING_PAGES};
use crate::fetcher::retry::{retry_with_backoff, RetryPolicy};
use crate::fetcher::shared_resources::global_http_client;
use crate::fetcher::{FetcherError, FetcherResult};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListBucketResult {
    // required: anything without Name and IsTruncated is not a listing
    name: String,
    is_truncated: bool,
    #[serde(default)]
    next_marker: Option<String>,
    #[serde(default)]
    common_prefixes: Vec<CommonPrefix>,
    #[serde(default)]
    contents: Vec<ObjectEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CommonPrefix {
    prefix: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ObjectEntry {
    key: String,
}

/// One page of a listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingPage {
    /// Sub-prefixes, or object keys when the prefix holds no sub-prefixes
    pub entries: Vec<String>,
    /// Whether more pages follow
    pub is_truncated: bool,
    /// Continuation marker reported by the bucket
    pub next_marker: Option<String>,
}

impl ListingPage {
    /// Parse a `ListBucketResult` XML document
    ///
    /// `Name` and `IsTruncated` are required; a body without them is a
    /// `ParseError`, which the lister retries and then gives up on.
    pub fn parse(xml: &str) -> FetcherResult<Self> {
        let result: ListBucketResult = quick_xml::de::from_str(xml)
            .map_err(|e| FetcherError::ParseError(format!("Invalid bucket listing: {e}")))?;
        if result.name.is_empty() {
            return Err(FetcherError::ParseError(
                "Bucket listing has an empty Name".to_string(),
            ));
        }

        let entries = if !result.common_prefixes.is_empty() {
            result.common_prefixes.into_iter().map(|p| p.prefix).collect()
        } else {
            result.contents.into_iter().map(|c| c.key).collect()
        };

        Ok(Self {
            entries,
            is_truncated: result.is_truncated,
            next_marker: result.next_marker.filter(|m| !m.is_empty()),
        })
    }

    /// Marker for the following page: `NextMarker`, else the last entry
    pub fn cursor(&self) -> Option<&str> {
        self.next_marker
            .as_deref()
            .or_else(|| self.entries.last().map(String::as_str))
    }
}

/// Walks every page under an archive prefix
#[derive(Clone)]
pub struct ArchiveLister {
    client: Arc<Client>,
    base_url: String,
    policy: RetryPolicy,
}

impl ArchiveLister {
    /// Lister against the public data.binance.vision bucket
    pub fn new(policy: RetryPolicy) -> Self {
        Self::with_base_url(ARCHIVE_LISTING_BASE_URL, policy)
    }

    /// Create with custom base URL (for testing)
    pub fn with_base_url(base_url: impl Into<String>, policy: RetryPolicy) -> Self {
        Self {
            client: global_http_client(),
            base_url: base_url.into(),
            policy,
        }
    }

    /// List the immediate entries under `prefix`, sorted and deduplicated
    ///
    /// Each page is retried on its own. A page that still fails once the
    /// retries are spent aborts the listing, as does a truncated page that
    /// gives no way to continue.
    pub async fn list_dir(&self, prefix: &str) -> FetcherResult<Vec<String>> {
        let mut entries = Vec::new();
        let mut marker: Option<String> = None;

        for page_no in 1..=MAX_LISTING_PAGES {
            let page = retry_with_backoff(&self.policy, "archive_list_page", || {
                self.fetch_page(prefix, marker.as_deref())
            })
            .await?;

            debug!(
                prefix,
                page_no,
                entries = page.entries.len(),
                truncated = page.is_truncated,
                "Fetched listing page"
            );

            if !page.is_truncated {
                entries.extend(page.entries);
                entries.sort();
                entries.dedup();
                info!(prefix, pages = page_no, entries = entries.len(), "Listed archive prefix");
                return Ok(entries);
            }

            let next = page.cursor().map(str::to_string).ok_or_else(|| {
                FetcherError::ArchiveError(format!(
                    "truncated listing page {page_no} for {prefix} has no marker"
                ))
            })?;
            if marker.as_deref() == Some(next.as_str()) {
                return Err(FetcherError::ArchiveError(format!(
                    "listing marker for {prefix} did not advance past {next}"
                )));
            }

            entries.extend(page.entries);
            marker = Some(next);
        }

        Err(FetcherError::ArchiveError(format!(
            "listing for {prefix} exceeded {MAX_LISTING_PAGES} pages"
        )))
    }

    async fn fetch_page(&self, prefix: &str, marker: Option<&str>) -> FetcherResult<ListingPage> {
        let mut params = vec![("delimiter", "/"), ("prefix", prefix)];
        if let Some(marker) = marker {
            params.push(("marker", marker));
        }

        let response = self
            .client
            .get(&self.base_url)
            .query(&params)
            .send()
            .await
            .map_err(|e| FetcherError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetcherError::HttpError(format!(
                "Archive listing failed: HTTP {status}"
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetcherError::NetworkError(e.to_string()))?;

        ListingPage::parse(&body)
    }
}
