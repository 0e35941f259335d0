//! Search/analytics store client.
//!
//! Speaks the Elasticsearch/OpenSearch document API: one `PUT` per
//! document, keyed so that re-indexing a unit overwrites it.

use std::time::Duration;

use tracing::warn;

use super::{build_http_client, ClientError};

/// HTTP client writing documents into one index.
#[derive(Clone)]
pub struct SearchClient {
    client: reqwest::Client,
    base_url: String,
    index: String,
}

impl SearchClient {
    /// Create a new search client.
    pub fn new(base_url: &str, index: &str, timeout: Duration) -> Self {
        Self {
            client: build_http_client(timeout),
            base_url: base_url.trim_end_matches('/').to_string(),
            index: index.to_string(),
        }
    }

    fn document_url(&self, document_id: &str) -> String {
        format!("{}/{}/_doc/{}", self.base_url, self.index, document_id)
    }

    /// Write a document.
    ///
    /// Returns `Ok(false)` if the store rejected the document; transport
    /// failures are errors.
    pub async fn index_document(
        &self,
        document_id: &str,
        document: &serde_json::Value,
    ) -> Result<bool, ClientError> {
        let response = self
            .client
            .put(self.document_url(document_id))
            .json(document)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(
                document_id,
                status = status.as_u16(),
                body = %body,
                "Search store rejected document"
            );
            return Ok(false);
        }

        Ok(true)
    }
}
