//! Document store collaborator.
//!
//! Persists JSON documents by `(collection, id)` with a narrow contract:
//! point get/set/update, a timestamp range scan, and batched writes. The
//! in-process [`MemoryDocumentStore`] is the default backend; remote stores
//! implement the same trait behind the same semantics.

pub mod error;

pub use error::DocStoreError;

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde_json::Value;

/// One write in a batch.
#[derive(Debug, Clone)]
pub enum BatchWrite {
    /// Create or replace (or shallow-merge) a document.
    Set {
        collection: String,
        id: String,
        doc: Value,
        merge: bool,
    },
    /// Shallow-merge fields into an existing document.
    Update {
        collection: String,
        id: String,
        fields: Value,
    },
}

/// Narrow async contract over a JSON document database.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetches a document by id.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, DocStoreError>;

    /// Creates or replaces a document; with `merge`, existing fields not
    /// present in `doc` are kept.
    async fn set(
        &self,
        collection: &str,
        id: &str,
        doc: Value,
        merge: bool,
    ) -> Result<(), DocStoreError>;

    /// Shallow-merges `fields` into an existing document.
    async fn update(&self, collection: &str, id: &str, fields: Value)
    -> Result<(), DocStoreError>;

    /// Documents whose RFC 3339 `field` is at or after `cutoff`, up to `limit`.
    async fn query_updated_since(
        &self,
        collection: &str,
        field: &str,
        cutoff: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<(String, Value)>, DocStoreError>;

    /// All documents of a collection, up to `limit`.
    async fn scan(&self, collection: &str, limit: usize)
    -> Result<Vec<(String, Value)>, DocStoreError>;

    /// Applies `writes` as one batch.
    async fn apply_batch(&self, writes: Vec<BatchWrite>) -> Result<(), DocStoreError>;
}

fn shallow_merge(target: &mut Value, incoming: Value) {
    match (target, incoming) {
        (Value::Object(existing), Value::Object(fields)) => {
            for (key, value) in fields {
                existing.insert(key, value);
            }
        }
        (target, incoming) => *target = incoming,
    }
}

/// In-process [`DocumentStore`] backed by a `RwLock`ed map.
#[derive(Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<String, HashMap<String, Value>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in `collection`.
    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .get(collection)
            .map(|c| c.len())
            .unwrap_or(0)
    }

    fn write_one(
        collections: &mut HashMap<String, HashMap<String, Value>>,
        write: BatchWrite,
    ) -> Result<(), DocStoreError> {
        match write {
            BatchWrite::Set {
                collection,
                id,
                doc,
                merge,
            } => {
                let coll = collections.entry(collection).or_default();
                match coll.get_mut(&id) {
                    Some(existing) if merge => shallow_merge(existing, doc),
                    _ => {
                        coll.insert(id, doc);
                    }
                }
                Ok(())
            }
            BatchWrite::Update {
                collection,
                id,
                fields,
            } => {
                let coll = collections.entry(collection.clone()).or_default();
                let existing = coll.get_mut(&id).ok_or(DocStoreError::NotFound {
                    collection,
                    id: id.clone(),
                })?;
                shallow_merge(existing, fields);
                Ok(())
            }
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, DocStoreError> {
        Ok(self
            .collections
            .read()
            .get(collection)
            .and_then(|c| c.get(id))
            .cloned())
    }

    async fn set(
        &self,
        collection: &str,
        id: &str,
        doc: Value,
        merge: bool,
    ) -> Result<(), DocStoreError> {
        let mut collections = self.collections.write();
        Self::write_one(
            &mut collections,
            BatchWrite::Set {
                collection: collection.to_string(),
                id: id.to_string(),
                doc,
                merge,
            },
        )
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        fields: Value,
    ) -> Result<(), DocStoreError> {
        let mut collections = self.collections.write();
        Self::write_one(
            &mut collections,
            BatchWrite::Update {
                collection: collection.to_string(),
                id: id.to_string(),
                fields,
            },
        )
    }

    async fn query_updated_since(
        &self,
        collection: &str,
        field: &str,
        cutoff: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<(String, Value)>, DocStoreError> {
        let collections = self.collections.read();
        let Some(coll) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        let mut results = Vec::new();
        for (id, doc) in coll.iter() {
            let recent = doc
                .get(field)
                .and_then(Value::as_str)
                .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
                .is_some_and(|ts| ts.with_timezone(&Utc) >= cutoff);

            if recent {
                results.push((id.clone(), doc.clone()));
                if results.len() >= limit {
                    break;
                }
            }
        }

        Ok(results)
    }

    async fn scan(
        &self,
        collection: &str,
        limit: usize,
    ) -> Result<Vec<(String, Value)>, DocStoreError> {
        Ok(self
            .collections
            .read()
            .get(collection)
            .map(|c| {
                c.iter()
                    .take(limit)
                    .map(|(id, doc)| (id.clone(), doc.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn apply_batch(&self, writes: Vec<BatchWrite>) -> Result<(), DocStoreError> {
        let mut collections = self.collections.write();
        for write in writes {
            Self::write_one(&mut collections, write)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    #[tokio::test]
    async fn set_get_roundtrip() {
        let store = MemoryDocumentStore::new();
        store
            .set("articles", "a1", json!({"text": "hello"}), false)
            .await
            .unwrap();

        let doc = store.get("articles", "a1").await.unwrap().unwrap();
        assert_eq!(doc["text"], "hello");
        assert!(store.get("articles", "missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn merge_set_keeps_existing_fields() {
        let store = MemoryDocumentStore::new();
        store
            .set("articles", "a1", json!({"text": "hello", "score": 0.5}), false)
            .await
            .unwrap();
        store
            .set("articles", "a1", json!({"score": 0.9}), true)
            .await
            .unwrap();

        let doc = store.get("articles", "a1").await.unwrap().unwrap();
        assert_eq!(doc["text"], "hello");
        assert_eq!(doc["score"], 0.9);
    }

    #[tokio::test]
    async fn update_requires_existing_doc() {
        let store = MemoryDocumentStore::new();
        let result = store.update("articles", "ghost", json!({"x": 1})).await;
        assert!(matches!(result, Err(DocStoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn range_query_filters_by_timestamp() {
        let store = MemoryDocumentStore::new();
        let now = Utc::now();
        let old = now - Duration::days(60);

        store
            .set(
                "articles",
                "fresh",
                json!({"last_updated": now.to_rfc3339()}),
                false,
            )
            .await
            .unwrap();
        store
            .set(
                "articles",
                "stale",
                json!({"last_updated": old.to_rfc3339()}),
                false,
            )
            .await
            .unwrap();
        store
            .set("articles", "untimestamped", json!({}), false)
            .await
            .unwrap();

        let cutoff = now - Duration::days(30);
        let results = store
            .query_updated_since("articles", "last_updated", cutoff, 50)
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, "fresh");
    }

    #[tokio::test]
    async fn batch_applies_all_writes() {
        let store = MemoryDocumentStore::new();
        store
            .apply_batch(vec![
                BatchWrite::Set {
                    collection: "news_sources".into(),
                    id: "bbc.com".into(),
                    doc: json!({"avg_score": 0.8, "num_votes": 1}),
                    merge: false,
                },
                BatchWrite::Set {
                    collection: "news_sources".into(),
                    id: "reuters.com".into(),
                    doc: json!({"avg_score": 0.9, "num_votes": 2}),
                    merge: false,
                },
            ])
            .await
            .unwrap();

        assert_eq!(store.len("news_sources"), 2);
    }
}
