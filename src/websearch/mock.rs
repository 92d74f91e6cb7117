//! Canned web-search client for tests.

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{SearchHit, WebSearchClient};

/// Replays canned hits keyed by a query substring; unmatched queries get the
/// default hit set (initially empty).
#[derive(Default)]
pub struct MockSearchClient {
    rules: Mutex<Vec<(String, Vec<SearchHit>)>>,
    default_hits: Mutex<Vec<SearchHit>>,
    queries: Mutex<Vec<String>>,
}

impl MockSearchClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond_with(&self, needle: impl Into<String>, hits: Vec<SearchHit>) {
        self.rules.lock().push((needle.into(), hits));
    }

    pub fn set_default(&self, hits: Vec<SearchHit>) {
        *self.default_hits.lock() = hits;
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().clone()
    }

    /// Builds a hit in one line.
    pub fn hit(title: &str, snippet: &str, link: &str) -> SearchHit {
        SearchHit {
            title: title.to_string(),
            snippet: snippet.to_string(),
            link: link.to_string(),
        }
    }
}

#[async_trait]
impl WebSearchClient for MockSearchClient {
    async fn search(&self, query: &str, limit: usize) -> Vec<SearchHit> {
        self.queries.lock().push(query.to_string());

        let hits = self
            .rules
            .lock()
            .iter()
            .find(|(needle, _)| query.contains(needle.as_str()))
            .map(|(_, hits)| hits.clone())
            .unwrap_or_else(|| self.default_hits.lock().clone());

        hits.into_iter().take(limit).collect()
    }
}
