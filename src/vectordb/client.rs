//! Qdrant-backed vector index client.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use qdrant_client::Qdrant;
use qdrant_client::qdrant::{
    Condition, CreateCollectionBuilder, DeletePointsBuilder, Distance, Filter, GetPointsBuilder,
    PointStruct, PointsIdsList, Range, ScrollPointsBuilder, SearchPointsBuilder,
    UpsertPointsBuilder, VectorParamsBuilder,
};

use super::error::VectorDbError;
use super::model::{
    FeedbackEntry, FeedbackPoint, Namespace, SearchMatch, entry_from_payload, entry_to_payload,
    match_from_scored_point, point_id,
};

const EXPIRY_SCAN_LIMIT: u32 = 1_000;

/// Narrow async interface over the vector index.
#[async_trait]
pub trait VectorIndexClient: Send + Sync {
    /// Ensures the namespace's collection exists.
    async fn ensure_collection(&self, ns: Namespace, dim: u64) -> Result<(), VectorDbError>;

    /// Inserts or replaces a point.
    async fn upsert(&self, ns: Namespace, point: FeedbackPoint) -> Result<(), VectorDbError>;

    /// Fetches an entry by its content-hash id.
    async fn fetch(&self, ns: Namespace, id: &str) -> Result<Option<FeedbackEntry>, VectorDbError>;

    /// Nearest-neighbor query; `require_verified` filters to verified entries.
    async fn query(
        &self,
        ns: Namespace,
        vector: Vec<f32>,
        limit: u64,
        require_verified: bool,
    ) -> Result<Vec<SearchMatch>, VectorDbError>;

    /// Deletes points by content-hash id.
    async fn delete(&self, ns: Namespace, ids: Vec<String>) -> Result<(), VectorDbError>;

    /// Ids of points whose `ttl_expiry` is before `now`.
    async fn expired_ids(
        &self,
        ns: Namespace,
        now: DateTime<Utc>,
    ) -> Result<Vec<String>, VectorDbError>;
}

#[derive(Clone)]
/// Direct Qdrant client wrapper.
pub struct QdrantIndex {
    client: std::sync::Arc<Qdrant>,
    url: String,
}

impl QdrantIndex {
    /// Creates a client for `url`.
    pub fn new(url: &str) -> Result<Self, VectorDbError> {
        let client = Qdrant::from_url(url)
            .build()
            .map_err(|e| VectorDbError::ConnectionFailed {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        Ok(Self {
            client: std::sync::Arc::new(client),
            url: url.to_string(),
        })
    }

    /// Returns the configured URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Performs a basic health check request.
    pub async fn health_check(&self) -> Result<(), VectorDbError> {
        self.client
            .health_check()
            .await
            .map_err(|e| VectorDbError::ConnectionFailed {
                url: self.url.clone(),
                message: e.to_string(),
            })?;
        Ok(())
    }
}

#[async_trait]
impl VectorIndexClient for QdrantIndex {
    async fn ensure_collection(&self, ns: Namespace, dim: u64) -> Result<(), VectorDbError> {
        let name = ns.collection();
        let exists = self.client.collection_exists(name).await.map_err(|e| {
            VectorDbError::CreateCollectionFailed {
                collection: name.to_string(),
                message: e.to_string(),
            }
        })?;

        if !exists {
            self.client
                .create_collection(
                    CreateCollectionBuilder::new(name)
                        .vectors_config(VectorParamsBuilder::new(dim, Distance::Cosine))
                        .on_disk_payload(true),
                )
                .await
                .map_err(|e| VectorDbError::CreateCollectionFailed {
                    collection: name.to_string(),
                    message: e.to_string(),
                })?;
        }

        Ok(())
    }

    async fn upsert(&self, ns: Namespace, point: FeedbackPoint) -> Result<(), VectorDbError> {
        let collection = ns.collection();
        let payload = entry_to_payload(&point.id, &point.entry);
        let qdrant_point = PointStruct::new(point_id(&point.id), point.vector, payload);

        self.client
            .upsert_points(UpsertPointsBuilder::new(collection, vec![qdrant_point]).wait(true))
            .await
            .map_err(|e| VectorDbError::UpsertFailed {
                collection: collection.to_string(),
                message: e.to_string(),
            })?;

        Ok(())
    }

    async fn fetch(&self, ns: Namespace, id: &str) -> Result<Option<FeedbackEntry>, VectorDbError> {
        let collection = ns.collection();
        let response = self
            .client
            .get_points(
                GetPointsBuilder::new(collection, vec![point_id(id).into()]).with_payload(true),
            )
            .await
            .map_err(|e| VectorDbError::FetchFailed {
                collection: collection.to_string(),
                message: e.to_string(),
            })?;

        Ok(response
            .result
            .into_iter()
            .next()
            .and_then(|p| entry_from_payload(&p.payload))
            .map(|(_, entry)| entry))
    }

    async fn query(
        &self,
        ns: Namespace,
        vector: Vec<f32>,
        limit: u64,
        require_verified: bool,
    ) -> Result<Vec<SearchMatch>, VectorDbError> {
        let collection = ns.collection();
        let mut builder =
            SearchPointsBuilder::new(collection, vector, limit).with_payload(true);

        if require_verified {
            builder = builder.filter(Filter::must([Condition::matches("verified", true)]));
        }

        let response =
            self.client
                .search_points(builder)
                .await
                .map_err(|e| VectorDbError::SearchFailed {
                    collection: collection.to_string(),
                    message: e.to_string(),
                })?;

        Ok(response
            .result
            .into_iter()
            .filter_map(match_from_scored_point)
            .collect())
    }

    async fn delete(&self, ns: Namespace, ids: Vec<String>) -> Result<(), VectorDbError> {
        if ids.is_empty() {
            return Ok(());
        }

        let collection = ns.collection();
        let selector = PointsIdsList {
            ids: ids.iter().map(|id| point_id(id).into()).collect(),
        };

        self.client
            .delete_points(
                DeletePointsBuilder::new(collection)
                    .points(selector)
                    .wait(true),
            )
            .await
            .map_err(|e| VectorDbError::DeleteFailed {
                collection: collection.to_string(),
                message: e.to_string(),
            })?;

        Ok(())
    }

    async fn expired_ids(
        &self,
        ns: Namespace,
        now: DateTime<Utc>,
    ) -> Result<Vec<String>, VectorDbError> {
        let collection = ns.collection();
        let filter = Filter::must([Condition::range(
            "ttl_expiry",
            Range {
                lt: Some(now.timestamp() as f64),
                ..Default::default()
            },
        )]);

        let response = self
            .client
            .scroll(
                ScrollPointsBuilder::new(collection)
                    .filter(filter)
                    .limit(EXPIRY_SCAN_LIMIT)
                    .with_payload(true),
            )
            .await
            .map_err(|e| VectorDbError::SearchFailed {
                collection: collection.to_string(),
                message: e.to_string(),
            })?;

        Ok(response
            .result
            .into_iter()
            .filter_map(|p| entry_from_payload(&p.payload))
            .map(|(id, _)| id)
            .collect())
    }
}
