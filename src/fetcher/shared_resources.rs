//! Shared resources for all market API instances
//!
//! Binance counts request weight per IP, so every market API and the archive
//! lister share one connection pool instead of building their own clients.

use once_cell::sync::Lazy;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{HTTP_CONNECT_TIMEOUT_SECS, HTTP_REQUEST_TIMEOUT_SECS};

/// Global HTTP client shared by all market API and archive instances
///
/// Timeouts: 10 s to connect, 30 s for the whole request. The archive
/// listing goes through the same client, so a stuck S3 page is bounded too.
pub static GLOBAL_HTTP_CLIENT: Lazy<Arc<Client>> = Lazy::new(|| {
    Arc::new(
        Client::builder()
            .user_agent(concat!("binance-market-data/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(HTTP_CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(HTTP_REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|e| {
                panic!("FATAL: Failed to build HTTP client: {e}. Check system TLS configuration.");
            }),
    )
});

/// Get the global HTTP client
pub fn global_http_client() -> Arc<Client> {
    GLOBAL_HTTP_CLIENT.clone()
}
