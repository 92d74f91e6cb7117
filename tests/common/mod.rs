//! Shared harness: a full engine over mock collaborators.

use std::sync::Arc;

use verity::docstore::MemoryDocumentStore;
use verity::embedding::StubEmbedder;
use verity::pipeline::{Dependencies, Engine};
use verity::tasks::TaskManager;
use verity::{
    MockClassifierClient, MockFactCheckClient, MockReasoningClient, MockSearchClient,
    MockVectorIndex,
};

pub struct Harness {
    pub llm: Arc<MockReasoningClient>,
    pub search: Arc<MockSearchClient>,
    pub classifier: Arc<MockClassifierClient>,
    pub factcheck: Arc<MockFactCheckClient>,
    pub docstore: Arc<MemoryDocumentStore>,
    pub vectors: Arc<MockVectorIndex>,
    pub engine: Arc<Engine>,
    pub tasks: Arc<TaskManager>,
}

pub async fn harness() -> Harness {
    let llm = Arc::new(MockReasoningClient::new());
    let search = Arc::new(MockSearchClient::new());
    let classifier = Arc::new(MockClassifierClient::new());
    let factcheck = Arc::new(MockFactCheckClient::new());
    let docstore = Arc::new(MemoryDocumentStore::new());
    let vectors = Arc::new(MockVectorIndex::new());

    let engine = Arc::new(Engine::new(Dependencies {
        llm: llm.clone(),
        search: search.clone(),
        embedder: Arc::new(StubEmbedder::new()),
        classifier: classifier.clone(),
        factcheck: factcheck.clone(),
        docstore: docstore.clone(),
        vectors: vectors.clone(),
    }));
    engine.cache().ensure_ready().await.unwrap();

    Harness {
        llm,
        search,
        classifier,
        factcheck,
        docstore,
        vectors,
        engine,
        tasks: Arc::new(TaskManager::new()),
    }
}

/// Seeds accumulated trust for a domain directly through the document store.
pub async fn seed_domain_trust(docstore: &MemoryDocumentStore, domain: &str, score: f64) {
    use verity::docstore::DocumentStore;

    docstore
        .set(
            "news_sources",
            domain,
            serde_json::json!({
                "avg_score": score,
                "num_votes": 25,
                "last_updated": chrono::Utc::now(),
            }),
            false,
        )
        .await
        .unwrap();
}
