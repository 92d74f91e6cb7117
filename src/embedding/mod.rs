//! Sentence embeddings: external collaborator plus a process-wide cache.
//!
//! Embeddings come from an HTTP service ([`HttpEmbedder`]) or, when no
//! endpoint is configured, from a deterministic hashing-trick stub
//! ([`StubEmbedder`]) that still yields meaningful cosine overlap for texts
//! sharing vocabulary. [`CachedEmbedder`] wraps either and memoizes vectors
//! so repeated texts (claims, snippets, cache probes) embed once.

pub mod error;

pub use error::EmbeddingError;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::sync::Cache;
use serde::Deserialize;
use tracing::debug;

use crate::constants::{DEFAULT_EMBEDDING_DIM, EMBEDDING_CACHE_CAPACITY};
use crate::hashing::hash_to_u64;

const EMBED_TIMEOUT: Duration = Duration::from_secs(10);

/// Narrow embedding contract.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embeds `text` into a unit-scale vector.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Dimension of produced vectors.
    fn dim(&self) -> usize;
}

/// Cosine similarity between two vectors (0.0 when either is degenerate).
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

/// HTTP-backed embedder (`POST {"text": ...}` → `{"embedding": [...]}`).
pub struct HttpEmbedder {
    http: reqwest::Client,
    url: String,
    dim: usize,
}

impl HttpEmbedder {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(EMBED_TIMEOUT)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            url: url.into(),
            dim: DEFAULT_EMBEDDING_DIM,
        }
    }

    pub fn with_dim(mut self, dim: usize) -> Self {
        self.dim = dim;
        self
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::EmptyInput);
        }

        let response = self
            .http
            .post(&self.url)
            .json(&serde_json::json!({ "text": text }))
            .send()
            .await
            .map_err(|e| EmbeddingError::RequestFailed {
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(EmbeddingError::RequestFailed {
                message: format!("status {}", response.status()),
            });
        }

        let body: EmbedResponse =
            response
                .json()
                .await
                .map_err(|e| EmbeddingError::BadResponse {
                    message: e.to_string(),
                })?;

        if body.embedding.is_empty() {
            return Err(EmbeddingError::BadResponse {
                message: "empty vector".to_string(),
            });
        }

        Ok(body.embedding)
    }

    fn dim(&self) -> usize {
        self.dim
    }
}

/// Deterministic hashing-trick embedder used when no endpoint is configured.
///
/// Each whitespace token is hashed into one of `dim` buckets; the bucket
/// counts are L2-normalized. Texts sharing vocabulary overlap in cosine
/// space, which is enough for exact-duplicate and near-duplicate detection.
pub struct StubEmbedder {
    dim: usize,
}

impl StubEmbedder {
    pub fn new() -> Self {
        Self {
            dim: DEFAULT_EMBEDDING_DIM,
        }
    }

    pub fn with_dim(dim: usize) -> Self {
        Self { dim }
    }
}

impl Default for StubEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Embedder for StubEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::EmptyInput);
        }

        let mut vector = vec![0.0f32; self.dim];
        for token in text.to_lowercase().split_whitespace() {
            let bucket = (hash_to_u64(token.as_bytes()) % self.dim as u64) as usize;
            vector[bucket] += 1.0;
        }

        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }

        Ok(vector)
    }

    fn dim(&self) -> usize {
        self.dim
    }
}

/// Memoizing wrapper around any [`Embedder`].
///
/// Text is casefolded and trimmed before embedding so the cache key matches
/// how lookups are issued across the cache tiers.
pub struct CachedEmbedder {
    inner: Arc<dyn Embedder>,
    cache: Cache<u64, Arc<Vec<f32>>>,
}

impl CachedEmbedder {
    pub fn new(inner: Arc<dyn Embedder>) -> Self {
        Self {
            inner,
            cache: Cache::builder()
                .max_capacity(EMBEDDING_CACHE_CAPACITY)
                .build(),
        }
    }

    /// Number of memoized vectors.
    pub fn cached_len(&self) -> u64 {
        self.cache.entry_count()
    }
}

#[async_trait]
impl Embedder for CachedEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let normalized = text.trim().to_lowercase();
        if normalized.is_empty() {
            return Err(EmbeddingError::EmptyInput);
        }

        let key = hash_to_u64(normalized.as_bytes());
        if let Some(vector) = self.cache.get(&key) {
            return Ok(vector.as_ref().clone());
        }

        debug!(text_len = normalized.len(), "embedding cache miss");
        let vector = self.inner.embed(&normalized).await?;
        self.cache.insert(key, Arc::new(vector.clone()));
        Ok(vector)
    }

    fn dim(&self) -> usize {
        self.inner.dim()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stub_is_deterministic() {
        let embedder = StubEmbedder::new();
        let a = embedder.embed("water boils at one hundred degrees").await.unwrap();
        let b = embedder.embed("water boils at one hundred degrees").await.unwrap();
        assert_eq!(a, b);
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn stub_overlap_tracks_shared_vocabulary() {
        let embedder = StubEmbedder::new();
        let a = embedder.embed("water boils at sea level").await.unwrap();
        let b = embedder.embed("water freezes at sea level").await.unwrap();
        let c = embedder.embed("entirely unrelated gardening topics").await.unwrap();

        assert!(cosine_similarity(&a, &b) > cosine_similarity(&a, &c));
    }

    #[tokio::test]
    async fn stub_rejects_empty_input() {
        let embedder = StubEmbedder::new();
        assert!(matches!(
            embedder.embed("   ").await,
            Err(EmbeddingError::EmptyInput)
        ));
    }

    #[tokio::test]
    async fn cache_serves_repeat_lookups() {
        let cached = CachedEmbedder::new(Arc::new(StubEmbedder::new()));
        let first = cached.embed("Some Claim Text").await.unwrap();
        // casefolded variant must hit the same entry
        let second = cached.embed("some claim text  ").await.unwrap();

        assert_eq!(first, second);
        cached.cache.run_pending_tasks();
        assert_eq!(cached.cached_len(), 1);
    }

    #[test]
    fn cosine_handles_degenerate_inputs() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }
}
