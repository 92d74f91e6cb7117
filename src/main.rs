//! Verity HTTP server entrypoint.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use mimalloc::MiMalloc;
use tokio::net::TcpListener;
use tokio::signal;

use verity::classifier::{ClassifierClient, HttpClassifierClient, PriorClassifierClient};
use verity::config::Config;
use verity::constants::CACHE_CLEANUP_INTERVAL_SECS;
use verity::docstore::{DocumentStore, MemoryDocumentStore};
use verity::embedding::{Embedder, HttpEmbedder, StubEmbedder};
use verity::factcheck::{DisabledFactCheckClient, FactCheckClient, HttpFactCheckClient};
use verity::gateway::{HandlerState, create_router};
use verity::llm::{GenaiReasoningClient, ReasoningClient};
use verity::pipeline::{Dependencies, Engine};
use verity::tasks::TaskManager;
use verity::vectordb::{QdrantIndex, VectorIndexClient};
use verity::websearch::{DisabledSearchClient, HttpSearchClient, WebSearchClient};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::from_env()?;
    config.validate()?;
    let addr: SocketAddr = config.socket_addr().parse()?;

    tracing::info!(
        bind_addr = %config.bind_addr,
        port = config.port,
        model = %config.reasoning_model,
        "Verity starting"
    );

    // Collaborators first, then the engine context, then the task registry.
    let llm: Arc<dyn ReasoningClient> =
        Arc::new(GenaiReasoningClient::new(config.reasoning_model.clone()));

    let search: Arc<dyn WebSearchClient> = match (&config.search_url, &config.search_api_key) {
        (Some(url), Some(key)) => Arc::new(HttpSearchClient::new(
            url.clone(),
            key.clone(),
            config.search_cx.clone().unwrap_or_default(),
        )),
        _ => {
            tracing::warn!("no search endpoint configured, corroboration will find no hits");
            Arc::new(DisabledSearchClient)
        }
    };

    let embedder: Arc<dyn Embedder> = match &config.embedding_url {
        Some(url) => Arc::new(HttpEmbedder::new(url.clone())),
        None => {
            tracing::warn!("no embedding endpoint configured, using the hashing-trick stub");
            Arc::new(StubEmbedder::new())
        }
    };

    let classifier: Arc<dyn ClassifierClient> = match &config.classifier_url {
        Some(url) => Arc::new(HttpClassifierClient::new(url.clone())),
        None => {
            tracing::warn!("no classifier endpoint configured, using the fixed prior");
            Arc::new(PriorClassifierClient)
        }
    };

    let factcheck: Arc<dyn FactCheckClient> =
        match (&config.factcheck_url, &config.factcheck_api_key) {
            (Some(url), Some(key)) => Arc::new(HttpFactCheckClient::new(url.clone(), key.clone())),
            _ => {
                tracing::warn!("no fact-check endpoint configured, summaries will be empty");
                Arc::new(DisabledFactCheckClient)
            }
        };

    let docstore: Arc<dyn DocumentStore> = Arc::new(MemoryDocumentStore::new());
    let vectors: Arc<dyn VectorIndexClient> = Arc::new(QdrantIndex::new(&config.qdrant_url)?);

    let engine = Arc::new(Engine::new(Dependencies {
        llm,
        search,
        embedder,
        classifier,
        factcheck,
        docstore,
        vectors,
    }));

    if let Err(err) = engine.cache().ensure_ready().await {
        tracing::warn!(%err, "vector collections unavailable, vector tier degraded");
    }

    let tasks = Arc::new(TaskManager::new());
    tasks.start_reaper();

    // Periodic expired-vector sweep, matching the on-demand endpoint.
    let sweeper_cache = engine.cache().clone();
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(Duration::from_secs(CACHE_CLEANUP_INTERVAL_SECS));
        loop {
            interval.tick().await;
            let deleted = sweeper_cache.cleanup_expired().await;
            if deleted > 0 {
                tracing::info!(deleted, "periodic vector cleanup");
            }
        }
    });

    let router = create_router(HandlerState::new(engine, tasks.clone()));
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Teardown: kill whatever is still in flight before the process exits.
    let drained = tasks.reap_expired(Duration::from_secs(0));
    tracing::info!(cancelled = drained.len(), "shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let _ = signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
