//! HTTP client for the vector search service.
//!
//! The retrieval step of a chat turn is best-effort and must not hold
//! up the response, so this client uses a deliberately short timeout
//! (5 s) compared to the general 30 s used elsewhere.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const SEARCH_TIMEOUT: Duration = Duration::from_secs(5);

/// One scored document from the search service.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchHit {
    pub document_id: String,
    pub score: f64,
    pub content: String,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

#[derive(Clone)]
pub struct SearchClient {
    base_url: String,
    client: reqwest::Client,
}

impl SearchClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(SEARCH_TIMEOUT).build()?;
        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }

    /// Query the search service, returning scored documents verbatim.
    pub async fn query(&self, q: &str, limit: usize) -> Result<Vec<SearchHit>> {
        debug!(query = q, limit, "querying search service");
        let limit = limit.to_string();
        let response = self
            .client
            .get(format!("{}/api/v1/search", self.base_url))
            .query(&[("q", q), ("limit", limit.as_str())])
            .send()
            .await
            .context("Search request failed")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Search service returned {}", status);
        }

        let body: SearchResponse = response
            .json()
            .await
            .context("Invalid JSON from search service")?;

        Ok(body.results)
    }
}
