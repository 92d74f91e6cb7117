//! In-memory vector index for tests.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use super::error::VectorDbError;
use super::model::{FeedbackEntry, FeedbackPoint, Namespace, SearchMatch};
use crate::embedding::cosine_similarity;

#[derive(Default)]
struct MockCollection {
    dim: u64,
    points: HashMap<String, FeedbackPoint>,
}

/// Deterministic in-memory [`super::VectorIndexClient`] with exact cosine
/// scoring.
#[derive(Default)]
pub struct MockVectorIndex {
    collections: RwLock<HashMap<&'static str, MockCollection>>,
}

impl MockVectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of points in a namespace.
    pub fn point_count(&self, ns: Namespace) -> usize {
        self.collections
            .read()
            .get(ns.collection())
            .map(|c| c.points.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl super::VectorIndexClient for MockVectorIndex {
    async fn ensure_collection(&self, ns: Namespace, dim: u64) -> Result<(), VectorDbError> {
        self.collections
            .write()
            .entry(ns.collection())
            .or_insert(MockCollection {
                dim,
                points: HashMap::new(),
            });
        Ok(())
    }

    async fn upsert(&self, ns: Namespace, point: FeedbackPoint) -> Result<(), VectorDbError> {
        let mut collections = self.collections.write();
        let coll = collections.entry(ns.collection()).or_default();

        if coll.dim != 0 && point.vector.len() as u64 != coll.dim {
            return Err(VectorDbError::InvalidDimension {
                expected: coll.dim as usize,
                actual: point.vector.len(),
            });
        }

        coll.points.insert(point.id.clone(), point);
        Ok(())
    }

    async fn fetch(&self, ns: Namespace, id: &str) -> Result<Option<FeedbackEntry>, VectorDbError> {
        Ok(self
            .collections
            .read()
            .get(ns.collection())
            .and_then(|c| c.points.get(id))
            .map(|p| p.entry.clone()))
    }

    async fn query(
        &self,
        ns: Namespace,
        vector: Vec<f32>,
        limit: u64,
        require_verified: bool,
    ) -> Result<Vec<SearchMatch>, VectorDbError> {
        let collections = self.collections.read();
        let Some(coll) = collections.get(ns.collection()) else {
            return Ok(Vec::new());
        };

        let mut matches: Vec<SearchMatch> = coll
            .points
            .values()
            .filter(|p| !require_verified || p.entry.verified)
            .map(|p| SearchMatch {
                id: p.id.clone(),
                score: cosine_similarity(&vector, &p.vector),
                entry: p.entry.clone(),
            })
            .collect();

        matches.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        matches.truncate(limit as usize);
        Ok(matches)
    }

    async fn delete(&self, ns: Namespace, ids: Vec<String>) -> Result<(), VectorDbError> {
        let mut collections = self.collections.write();
        if let Some(coll) = collections.get_mut(ns.collection()) {
            for id in ids {
                coll.points.remove(&id);
            }
        }
        Ok(())
    }

    async fn expired_ids(
        &self,
        ns: Namespace,
        now: DateTime<Utc>,
    ) -> Result<Vec<String>, VectorDbError> {
        Ok(self
            .collections
            .read()
            .get(ns.collection())
            .map(|c| {
                c.points
                    .values()
                    .filter(|p| p.entry.ttl_expiry < now)
                    .map(|p| p.id.clone())
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::super::VectorIndexClient;
    use super::*;
    use chrono::Duration;

    fn point(id: &str, vector: Vec<f32>, verified: bool) -> FeedbackPoint {
        FeedbackPoint {
            id: id.to_string(),
            vector,
            entry: FeedbackEntry::new(id, "text", "why", 0.5, "Fake", verified, "u1"),
        }
    }

    #[tokio::test]
    async fn query_ranks_by_cosine() {
        let index = MockVectorIndex::new();
        index.ensure_collection(Namespace::Feedback, 3).await.unwrap();
        index
            .upsert(Namespace::Feedback, point("near", vec![1.0, 0.0, 0.0], true))
            .await
            .unwrap();
        index
            .upsert(Namespace::Feedback, point("far", vec![0.0, 1.0, 0.0], true))
            .await
            .unwrap();

        let matches = index
            .query(Namespace::Feedback, vec![1.0, 0.1, 0.0], 10, false)
            .await
            .unwrap();
        assert_eq!(matches[0].id, "near");
        assert!(matches[0].score > matches[1].score);
    }

    #[tokio::test]
    async fn verified_filter_applies() {
        let index = MockVectorIndex::new();
        index.ensure_collection(Namespace::Feedback, 2).await.unwrap();
        index
            .upsert(Namespace::Feedback, point("v", vec![1.0, 0.0], true))
            .await
            .unwrap();
        index
            .upsert(Namespace::Feedback, point("u", vec![1.0, 0.0], false))
            .await
            .unwrap();

        let matches = index
            .query(Namespace::Feedback, vec![1.0, 0.0], 10, true)
            .await
            .unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].id, "v");
    }

    #[tokio::test]
    async fn dimension_mismatch_rejected() {
        let index = MockVectorIndex::new();
        index.ensure_collection(Namespace::Feedback, 3).await.unwrap();
        let result = index
            .upsert(Namespace::Feedback, point("bad", vec![1.0], true))
            .await;
        assert!(matches!(result, Err(VectorDbError::InvalidDimension { .. })));
    }

    #[tokio::test]
    async fn expired_scan_and_delete() {
        let index = MockVectorIndex::new();
        index.ensure_collection(Namespace::Verified, 2).await.unwrap();

        let mut stale = point("stale", vec![1.0, 0.0], true);
        stale.entry.ttl_expiry = Utc::now() - Duration::days(1);
        index.upsert(Namespace::Verified, stale).await.unwrap();
        index
            .upsert(Namespace::Verified, point("fresh", vec![0.0, 1.0], true))
            .await
            .unwrap();

        let expired = index.expired_ids(Namespace::Verified, Utc::now()).await.unwrap();
        assert_eq!(expired, vec!["stale".to_string()]);

        index.delete(Namespace::Verified, expired).await.unwrap();
        assert_eq!(index.point_count(Namespace::Verified), 1);
    }

    #[tokio::test]
    async fn namespaces_are_isolated() {
        let index = MockVectorIndex::new();
        index.ensure_collection(Namespace::Feedback, 2).await.unwrap();
        index
            .upsert(Namespace::Feedback, point("a", vec![1.0, 0.0], true))
            .await
            .unwrap();

        assert!(index.fetch(Namespace::Verified, "a").await.unwrap().is_none());
        assert!(index.fetch(Namespace::Feedback, "a").await.unwrap().is_some());
    }
}
