//! Qdrant vector index integration.

pub mod client;
pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod model;

pub use client::{QdrantIndex, VectorIndexClient};
pub use error::VectorDbError;
#[cfg(any(test, feature = "mock"))]
pub use mock::MockVectorIndex;
pub use model::{
    FeedbackEntry, FeedbackPoint, Namespace, SearchMatch, entry_from_payload, entry_to_payload,
    match_from_scored_point, point_id,
};

/// Vector size used when creating collections.
pub const DEFAULT_VECTOR_SIZE: u64 = crate::constants::DEFAULT_EMBEDDING_DIM as u64;
