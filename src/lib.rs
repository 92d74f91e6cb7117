//! Verity library crate (used by the server binary and integration tests).
//!
//! # Architecture
//!
//! A text input flows through three cache tiers (exact content hash →
//! semantic document match → vector-index neighbor) before the full
//! evidence-fusion pipeline runs: fact-check lookup and metadata extraction,
//! then classifier scoring and web corroboration, then per-claim ensemble
//! fusion and aggregation. Fresh results are written back through both
//! stores. Long analyses are tracked per session and hard-cancellable.
//!
//! ## Core Types
//! - [`Config`], [`ConfigError`] - Server configuration
//! - [`Engine`], [`Dependencies`] - The assembled pipeline context
//! - [`TieredCache`], [`TieredLookupResult`] - Cache infrastructure
//! - [`TaskManager`] - Session-scoped task lifecycle
//!
//! ## Collaborator Contracts
//! - [`ReasoningClient`], [`ClassifierClient`], [`WebSearchClient`],
//!   [`FactCheckClient`], [`DocumentStore`], [`VectorIndexClient`],
//!   [`Embedder`]
//!
//! ## Test/Mock Support
//! Mock implementations are available behind `#[cfg(any(test, feature = "mock"))]`.

pub mod cache;
pub mod claims;
pub mod classifier;
pub mod config;
pub mod constants;
pub mod corroborate;
pub mod docstore;
pub mod embedding;
pub mod ensemble;
pub mod factcheck;
pub mod gateway;
pub mod hashing;
pub mod llm;
pub mod pipeline;
pub mod retry;
pub mod tasks;
pub mod trust;
pub mod vectordb;
pub mod websearch;

pub use cache::{ArticleRecord, CacheSource, CachedVerdict, TieredCache, TieredLookupResult};
pub use claims::split_claims;
pub use classifier::{ArticleMetadata, ClassifierClient, ClassifierScores};
#[cfg(any(test, feature = "mock"))]
pub use classifier::MockClassifierClient;
pub use config::{Config, ConfigError};
pub use corroborate::{Corroboration, CorroborationEngine, CorroborationStatus, Evidence};
pub use docstore::{DocStoreError, DocumentStore, MemoryDocumentStore};
pub use embedding::{CachedEmbedder, Embedder, HttpEmbedder, StubEmbedder, cosine_similarity};
pub use ensemble::{Label, adjusted_ensemble, aggregate};
#[cfg(any(test, feature = "mock"))]
pub use factcheck::MockFactCheckClient;
pub use factcheck::{FactCheckClient, FactCheckStatus, FactCheckSummary};
pub use gateway::{HandlerState, create_router};
pub use hashing::{anon_user_id, article_id, normalize_text, normalized_article_id};
#[cfg(any(test, feature = "mock"))]
pub use llm::MockReasoningClient;
pub use llm::{GenaiReasoningClient, ReasoningClient, StructuredOutput, StructuredReply};
pub use pipeline::{AnalysisReport, AnalysisResponse, Dependencies, Engine};
pub use retry::{RetryPolicy, retry_with_policy};
pub use tasks::{TaskManager, TaskState};
pub use trust::{DomainTrustStore, TrustSnapshot, domain_from_url};
#[cfg(any(test, feature = "mock"))]
pub use vectordb::MockVectorIndex;
pub use vectordb::{FeedbackEntry, Namespace, QdrantIndex, VectorIndexClient};
#[cfg(any(test, feature = "mock"))]
pub use websearch::MockSearchClient;
pub use websearch::{DisabledSearchClient, HttpSearchClient, SearchHit, WebSearchClient};
