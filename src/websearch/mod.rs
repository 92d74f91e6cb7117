//! Web-search collaborator.
//!
//! Best-effort by contract: any failure (transport, status, decode) yields an
//! empty result list, logged and forgotten. Corroboration quality degrades
//! gracefully; the pipeline never stalls on search.

#[cfg(any(test, feature = "mock"))]
pub mod mock;

#[cfg(any(test, feature = "mock"))]
pub use mock::MockSearchClient;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

const SEARCH_TIMEOUT: Duration = Duration::from_secs(10);

/// One web search result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub snippet: String,
    #[serde(default)]
    pub link: String,
}

/// Narrow web-search contract. Implementations return an empty list on
/// failure rather than an error.
#[async_trait]
pub trait WebSearchClient: Send + Sync {
    async fn search(&self, query: &str, limit: usize) -> Vec<SearchHit>;
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchHit>,
}

/// HTTP-backed [`WebSearchClient`] (Custom Search compatible endpoint).
pub struct HttpSearchClient {
    http: reqwest::Client,
    url: String,
    api_key: String,
    cx: String,
}

impl HttpSearchClient {
    pub fn new(
        url: impl Into<String>,
        api_key: impl Into<String>,
        cx: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(SEARCH_TIMEOUT)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            url: url.into(),
            api_key: api_key.into(),
            cx: cx.into(),
        }
    }

    async fn search_inner(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, String> {
        let response = self
            .http
            .get(&self.url)
            .query(&[
                ("key", self.api_key.as_str()),
                ("cx", self.cx.as_str()),
                ("q", query),
                ("num", &limit.to_string()),
            ])
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            return Err(format!("status {}", response.status()));
        }

        let body: SearchResponse = response.json().await.map_err(|e| e.to_string())?;
        Ok(body.items.into_iter().take(limit).collect())
    }
}

#[async_trait]
impl WebSearchClient for HttpSearchClient {
    async fn search(&self, query: &str, limit: usize) -> Vec<SearchHit> {
        match self.search_inner(query, limit).await {
            Ok(hits) => hits,
            Err(message) => {
                warn!(message, "web search failed, returning no hits");
                Vec::new()
            }
        }
    }
}

/// Stand-in used when no search endpoint is configured.
pub struct DisabledSearchClient;

#[async_trait]
impl WebSearchClient for DisabledSearchClient {
    async fn search(&self, _query: &str, _limit: usize) -> Vec<SearchHit> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_client_returns_nothing() {
        let client = DisabledSearchClient;
        assert!(client.search("anything", 10).await.is_empty());
    }
}
