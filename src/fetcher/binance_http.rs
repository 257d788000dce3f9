//! Binance HTTP client helper module
//!
//! Provides the single-attempt HTTP layer used by every Binance market API:
//! - Generic request/response handling
//! - Status classification into [`FetcherError`]
//! - Weight header parsing
//!
//! Retries are not performed here; see [`crate::fetcher::retry`].

use reqwest::header::HeaderMap;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::fetcher::{FetcherError, FetcherResult};

/// Response header carrying the weight consumed in the trailing minute
pub const USED_WEIGHT_HEADER: &str = "X-MBX-USED-WEIGHT-1M";

/// Unified HTTP client for all Binance API interactions
#[derive(Clone)]
pub struct BinanceHttpClient {
    client: Arc<Client>,
    base_url: String,
}

impl BinanceHttpClient {
    /// Create new HTTP client
    ///
    /// # Arguments
    /// * `client` - Shared HTTP client (Arc for cheap cloning)
    /// * `base_url` - Base URL for API endpoints (e.g., "<https://fapi.binance.com>")
    pub fn new(client: Arc<Client>, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Base URL requests are sent to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Execute one GET request with generic deserialization
    ///
    /// # Arguments
    /// * `endpoint` - API endpoint path (e.g., "/fapi/v1/klines")
    /// * `params` - Query parameters as key-value pairs
    ///
    /// # Errors
    /// Returns `NetworkError` when the request cannot be sent, `HttpError` on a
    /// non-success status and `ParseError` when the body does not deserialize.
    pub async fn get<T>(&self, endpoint: &str, params: &[(&str, String)]) -> FetcherResult<T>
    where
        T: DeserializeOwned,
    {
        let (body, _) = self.get_with_weight(endpoint, params).await?;
        Ok(body)
    }

    /// Execute one GET request and also return the used-weight header
    pub async fn get_with_weight<T>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> FetcherResult<(T, Option<u32>)>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!("Making GET request to: {} with {} params", url, params.len());

        let response = self
            .client
            .get(&url)
            .query(params)
            .send()
            .await
            .map_err(|e| FetcherError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(FetcherError::HttpError(format!("{status}: {error_text}")));
        }

        let weight = parse_weight_header(response.headers());
        if let Some(weight) = weight {
            debug!("Response weight: {}", weight);
        }

        let body = response.json::<T>().await.map_err(|e| {
            FetcherError::ParseError(format!("Failed to deserialize response: {e}"))
        })?;

        Ok((body, weight))
    }
}

/// Parse the `X-MBX-USED-WEIGHT-1M` header
///
/// # Returns
/// Some(weight) if header is present and valid, None otherwise
pub fn parse_weight_header(headers: &HeaderMap) -> Option<u32> {
    let weight_str = headers.get(USED_WEIGHT_HEADER)?.to_str().ok()?;

    match weight_str.parse::<u32>() {
        Ok(weight) => Some(weight),
        Err(e) => {
            warn!("Failed to parse weight header '{}': {}", weight_str, e);
            None
        }
    }
}
