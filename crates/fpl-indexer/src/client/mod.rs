//! HTTP clients for the upstream FPL API and the search store.

use thiserror::Error;

pub mod fpl;
pub mod search;

pub use fpl::FplClient;
pub use search::SearchClient;

/// Errors raised by the upstream clients.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport-level failure (connect, timeout, body decode).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Upstream answered with a status the caller cannot interpret.
    #[error("Unexpected status {status} from {url}")]
    Status { status: u16, url: String },

    /// Upstream answered but the payload made no sense.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

pub(crate) fn build_http_client(timeout: std::time::Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("fpl-indexer/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_default()
}
