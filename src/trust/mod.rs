//! Domain credibility tracking.
//!
//! Every web domain accumulates a running-average trust score built from
//! high-confidence evidence observations. Records are never deleted; trust is
//! a monotonically accumulating signal. Reads go through a wholesale
//! snapshot with a 5-minute TTL so the hot evidence-scoring path never waits
//! on the document store; the snapshot is invalidated immediately after each
//! batched write.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::LazyLock;
use std::time::{Duration, Instant};

use chrono::Utc;
use parking_lot::RwLock;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use crate::constants::TRUST_CACHE_TTL_SECS;
use crate::docstore::{BatchWrite, DocStoreError, DocumentStore};

/// Document-store collection holding one record per domain.
pub const TRUST_COLLECTION: &str = "news_sources";

/// Domains treated as known before any votes have accumulated.
pub const DEFAULT_CREDIBLE_DOMAINS: [&str; 9] = [
    "reuters.com",
    "bbc.com",
    "apnews.com",
    "cnn.com",
    "nytimes.com",
    "theguardian.com",
    "npr.org",
    "aljazeera.com",
    "bloomberg.com",
];

static DOMAIN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://(www\.)?([^/]+)").expect("valid regex"));

/// Extracts the lowercased domain of a URL (`https://www.BBC.com/x` → `bbc.com`).
pub fn domain_from_url(url: &str) -> Option<String> {
    DOMAIN_RE
        .captures(url)
        .and_then(|caps| caps.get(2))
        .map(|m| m.as_str().to_lowercase())
}

/// Persistent per-domain credibility record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainTrustRecord {
    pub avg_score: f64,
    pub num_votes: u64,
    pub last_updated: chrono::DateTime<Utc>,
}

/// Point-in-time view of all domain scores.
#[derive(Debug, Clone)]
pub struct TrustSnapshot {
    scores: HashMap<String, f64>,
    seeded: bool,
}

impl TrustSnapshot {
    /// Trust score for a domain; unknown domains score 0.0.
    pub fn score(&self, domain: &str) -> f64 {
        self.scores.get(domain).copied().unwrap_or(0.0)
    }

    /// Whether the domain has appeared before (votes, or the seed list when
    /// no votes exist anywhere yet).
    pub fn is_known(&self, domain: &str) -> bool {
        if self.scores.contains_key(domain) {
            return true;
        }
        self.seeded && DEFAULT_CREDIBLE_DOMAINS.contains(&domain)
    }

    /// Number of voted domains in this snapshot.
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

struct CachedSnapshot {
    snapshot: Arc<TrustSnapshot>,
    fetched_at: Instant,
}

/// Read-mostly trust store with TTL'd snapshot reads and batched vote writes.
pub struct DomainTrustStore {
    store: Arc<dyn DocumentStore>,
    cached: RwLock<Option<CachedSnapshot>>,
    ttl: Duration,
}

impl DomainTrustStore {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            cached: RwLock::new(None),
            ttl: Duration::from_secs(TRUST_CACHE_TTL_SECS),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Returns the current snapshot, refreshing it wholesale when stale.
    ///
    /// Store failures degrade to an empty seeded snapshot; they never fail
    /// the caller.
    pub async fn snapshot(&self) -> Arc<TrustSnapshot> {
        if let Some(cached) = self.cached.read().as_ref()
            && cached.fetched_at.elapsed() < self.ttl
        {
            return Arc::clone(&cached.snapshot);
        }

        let snapshot = Arc::new(self.load_snapshot().await);
        *self.cached.write() = Some(CachedSnapshot {
            snapshot: Arc::clone(&snapshot),
            fetched_at: Instant::now(),
        });
        snapshot
    }

    /// Trust score for the domain of `url` (0.0 when unknown or unparsable).
    pub async fn score_for_url(&self, url: &str) -> f64 {
        match domain_from_url(url) {
            Some(domain) => self.snapshot().await.score(&domain),
            None => 0.0,
        }
    }

    /// Drops the cached snapshot so the next read refetches.
    pub fn invalidate(&self) {
        *self.cached.write() = None;
    }

    /// Applies one vote per domain using online averaging, then invalidates
    /// the snapshot.
    pub async fn apply_votes(&self, votes: HashMap<String, f64>) -> Result<(), DocStoreError> {
        if votes.is_empty() {
            return Ok(());
        }

        let now = Utc::now();
        let mut writes = Vec::with_capacity(votes.len());

        for (domain, score) in votes {
            let domain = domain.trim().to_lowercase();
            if domain.is_empty() {
                continue;
            }

            let existing = self
                .store
                .get(TRUST_COLLECTION, &domain)
                .await?
                .and_then(|doc| serde_json::from_value::<DomainTrustRecord>(doc).ok());

            let record = match existing {
                Some(prev) => DomainTrustRecord {
                    avg_score: round3(
                        (prev.avg_score * prev.num_votes as f64 + score)
                            / (prev.num_votes as f64 + 1.0),
                    ),
                    num_votes: prev.num_votes + 1,
                    last_updated: now,
                },
                None => DomainTrustRecord {
                    avg_score: round3(score),
                    num_votes: 1,
                    last_updated: now,
                },
            };

            writes.push(BatchWrite::Set {
                collection: TRUST_COLLECTION.to_string(),
                id: domain,
                doc: json!(record),
                merge: false,
            });
        }

        let count = writes.len();
        self.store.apply_batch(writes).await?;
        self.invalidate();
        debug!(domains = count, "domain trust votes applied");
        Ok(())
    }

    async fn load_snapshot(&self) -> TrustSnapshot {
        let docs = match self.store.scan(TRUST_COLLECTION, 5_000).await {
            Ok(docs) => docs,
            Err(err) => {
                warn!(%err, "trust snapshot refresh failed, using empty seeded snapshot");
                return TrustSnapshot {
                    scores: HashMap::new(),
                    seeded: true,
                };
            }
        };

        let mut scores = HashMap::new();
        for (domain, doc) in docs {
            if let Ok(record) = serde_json::from_value::<DomainTrustRecord>(doc)
                && record.num_votes >= 1
            {
                scores.insert(domain, record.avg_score);
            }
        }

        let seeded = scores.is_empty();
        TrustSnapshot { scores, seeded }
    }
}

fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docstore::MemoryDocumentStore;

    fn store() -> (Arc<MemoryDocumentStore>, DomainTrustStore) {
        let mem = Arc::new(MemoryDocumentStore::new());
        let trust = DomainTrustStore::new(mem.clone());
        (mem, trust)
    }

    #[test]
    fn extracts_domains() {
        assert_eq!(
            domain_from_url("https://www.BBC.com/news/article"),
            Some("bbc.com".to_string())
        );
        assert_eq!(
            domain_from_url("http://reuters.com"),
            Some("reuters.com".to_string())
        );
        assert_eq!(domain_from_url("not a url"), None);
    }

    #[tokio::test]
    async fn first_vote_creates_record() {
        let (mem, trust) = store();
        trust
            .apply_votes(HashMap::from([("example.com".to_string(), 0.85)]))
            .await
            .unwrap();

        let doc = mem.get(TRUST_COLLECTION, "example.com").await.unwrap().unwrap();
        let record: DomainTrustRecord = serde_json::from_value(doc).unwrap();
        assert_eq!(record.avg_score, 0.85);
        assert_eq!(record.num_votes, 1);
    }

    #[tokio::test]
    async fn votes_converge_by_online_averaging() {
        let (mem, trust) = store();

        // existing record with one vote of 0.0
        trust
            .apply_votes(HashMap::from([("example.com".to_string(), 0.0)]))
            .await
            .unwrap();

        trust
            .apply_votes(HashMap::from([("example.com".to_string(), 1.0)]))
            .await
            .unwrap();
        let doc = mem.get(TRUST_COLLECTION, "example.com").await.unwrap().unwrap();
        let record: DomainTrustRecord = serde_json::from_value(doc).unwrap();
        assert_eq!(record.avg_score, 0.5);
        assert_eq!(record.num_votes, 2);

        trust
            .apply_votes(HashMap::from([("example.com".to_string(), 1.0)]))
            .await
            .unwrap();
        let doc = mem.get(TRUST_COLLECTION, "example.com").await.unwrap().unwrap();
        let record: DomainTrustRecord = serde_json::from_value(doc).unwrap();
        assert_eq!(record.avg_score, 0.667);
        assert_eq!(record.num_votes, 3);
    }

    #[tokio::test]
    async fn snapshot_refreshes_after_invalidation() {
        let (_, trust) = store();

        let before = trust.snapshot().await;
        assert!(before.is_empty());
        assert!(before.is_known("bbc.com"), "seed list applies when empty");

        trust
            .apply_votes(HashMap::from([("example.com".to_string(), 0.9)]))
            .await
            .unwrap();

        // apply_votes invalidated the snapshot despite the TTL
        let after = trust.snapshot().await;
        assert_eq!(after.score("example.com"), 0.9);
        assert!(!after.is_known("bbc.com"), "seed list retires once votes exist");
    }

    #[tokio::test]
    async fn stale_snapshot_is_refetched() {
        let (_, trust) = store();
        let trust = trust.with_ttl(Duration::from_millis(0));

        trust.snapshot().await;
        trust
            .apply_votes(HashMap::from([("example.com".to_string(), 0.8)]))
            .await
            .unwrap();

        assert_eq!(trust.snapshot().await.score("example.com"), 0.8);
    }

    #[tokio::test]
    async fn unknown_urls_score_zero() {
        let (_, trust) = store();
        assert_eq!(trust.score_for_url("https://unknown.example/a").await, 0.0);
        assert_eq!(trust.score_for_url("garbage").await, 0.0);
    }
}
