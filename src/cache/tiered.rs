//! Tiered cache: exact document match, semantic document match, vector index.
//!
//! Tiers are consulted in order of decreasing precision and each hit
//! short-circuits. Store failures are logged and treated as a miss of that
//! tier only; the pipeline always gets an answer path.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::json;
use tracing::{debug, info, instrument, warn};

use super::types::{ArticleRecord, CacheSource, CachedVerdict, TieredLookupResult};
use crate::constants::{
    PERSONALIZE_BELOW, SEMANTIC_DOC_CANDIDATES, SEMANTIC_DOC_THRESHOLD, SEMANTIC_DOC_WINDOW_DAYS,
    SEMANTIC_VECTOR_THRESHOLD, VECTOR_TTL_DAYS,
};
use crate::docstore::DocumentStore;
use crate::embedding::{Embedder, cosine_similarity};
use crate::ensemble::Label;
use crate::hashing::article_id;
use crate::llm::ReasoningClient;
use crate::vectordb::{FeedbackEntry, FeedbackPoint, Namespace, VectorIndexClient};

/// Document-store collection for analyzed articles.
pub const ARTICLES_COLLECTION: &str = "articles";

const VECTOR_QUERY_TOP_K: u64 = 10;

/// The three-tier cache front of the analysis pipeline.
pub struct TieredCache {
    docstore: Arc<dyn DocumentStore>,
    vectors: Arc<dyn VectorIndexClient>,
    embedder: Arc<dyn Embedder>,
    llm: Arc<dyn ReasoningClient>,
}

impl TieredCache {
    pub fn new(
        docstore: Arc<dyn DocumentStore>,
        vectors: Arc<dyn VectorIndexClient>,
        embedder: Arc<dyn Embedder>,
        llm: Arc<dyn ReasoningClient>,
    ) -> Self {
        Self {
            docstore,
            vectors,
            embedder,
            llm,
        }
    }

    /// Creates the vector collections if missing. Call once at startup.
    pub async fn ensure_ready(&self) -> Result<(), crate::vectordb::VectorDbError> {
        for ns in Namespace::ALL {
            self.vectors
                .ensure_collection(ns, self.embedder.dim() as u64)
                .await?;
        }
        Ok(())
    }

    /// Consults the three tiers in order; each hit short-circuits.
    #[instrument(skip(self, url, text), fields(text_len = text.len()))]
    pub async fn lookup(&self, url: &str, text: &str) -> TieredLookupResult {
        let id = article_id(url, text);

        debug!("checking exact document match");
        if let Some(verdict) = self.exact_lookup(&id).await {
            info!(article_id = %verdict.article_id, "exact cache hit");
            return TieredLookupResult::HitExact(verdict);
        }

        debug!("checking semantic document match");
        if let Some(verdict) = self.semantic_doc_lookup(text).await {
            info!(similarity = verdict.similarity, "semantic document hit");
            return TieredLookupResult::HitSemanticDoc(verdict);
        }

        debug!("checking vector index");
        if let Some(verdict) = self.vector_lookup(text, &id).await {
            info!(similarity = verdict.similarity, "vector index hit");
            return TieredLookupResult::HitVector(verdict);
        }

        debug!("full cache miss");
        TieredLookupResult::Miss
    }

    async fn exact_lookup(&self, id: &str) -> Option<CachedVerdict> {
        let doc = match self.docstore.get(ARTICLES_COLLECTION, id).await {
            Ok(doc) => doc?,
            Err(err) => {
                warn!(%err, "exact lookup failed, treating as miss");
                return None;
            }
        };

        let record: ArticleRecord = serde_json::from_value(doc).ok()?;
        Some(CachedVerdict {
            article_id: id.to_string(),
            score: record.text_score,
            prediction: record.prediction,
            explanation: record.text_explanation,
            source: CacheSource::ExactMatch,
            similarity: None,
        })
    }

    /// Cosine scan over documents updated inside the trailing window.
    async fn semantic_doc_lookup(&self, text: &str) -> Option<CachedVerdict> {
        let cutoff = Utc::now() - Duration::days(SEMANTIC_DOC_WINDOW_DAYS);
        let candidates = match self
            .docstore
            .query_updated_since(
                ARTICLES_COLLECTION,
                "last_updated",
                cutoff,
                SEMANTIC_DOC_CANDIDATES,
            )
            .await
        {
            Ok(candidates) => candidates,
            Err(err) => {
                warn!(%err, "semantic document scan failed, treating as miss");
                return None;
            }
        };
        if candidates.is_empty() {
            return None;
        }

        let query_emb = match self.embedder.embed(text).await {
            Ok(emb) => emb,
            Err(err) => {
                warn!(%err, "query embedding failed, skipping semantic tiers");
                return None;
            }
        };

        let mut best: Option<(f64, String, ArticleRecord)> = None;
        for (id, doc) in candidates {
            let Ok(record) = serde_json::from_value::<ArticleRecord>(doc) else {
                continue;
            };
            if record.embedding.is_empty() || record.text.is_empty() {
                continue;
            }

            let similarity = cosine_similarity(&query_emb, &record.embedding) as f64;
            if similarity <= SEMANTIC_DOC_THRESHOLD {
                continue;
            }

            // ties break toward the higher stored score
            let better = match &best {
                Some((best_sim, _, best_record)) => {
                    similarity > *best_sim
                        || (similarity == *best_sim && record.text_score > best_record.text_score)
                }
                None => true,
            };
            if better {
                best = Some((similarity, id, record));
            }
        }

        let (similarity, id, record) = best?;
        let explanation = if similarity < PERSONALIZE_BELOW {
            self.personalize(&record.text_explanation, text).await
        } else {
            record.text_explanation
        };

        Some(CachedVerdict {
            article_id: id,
            score: record.text_score,
            prediction: record.prediction,
            explanation,
            source: CacheSource::SemanticDocument,
            similarity: Some(similarity),
        })
    }

    /// Nearest-neighbor probe of the general feedback namespace.
    async fn vector_lookup(&self, text: &str, article_id: &str) -> Option<CachedVerdict> {
        let vector = self.embedder.embed(text).await.ok()?;

        let matches = match self
            .vectors
            .query(Namespace::Feedback, vector, VECTOR_QUERY_TOP_K, true)
            .await
        {
            Ok(matches) => matches,
            Err(err) => {
                warn!(%err, "vector query failed, treating as miss");
                return None;
            }
        };

        let best = matches
            .into_iter()
            .filter(|m| m.score > SEMANTIC_VECTOR_THRESHOLD)
            .max_by(|a, b| a.score.partial_cmp(&b.score).unwrap_or(std::cmp::Ordering::Equal))?;

        Some(CachedVerdict {
            article_id: if best.entry.article_id.is_empty() {
                article_id.to_string()
            } else {
                best.entry.article_id.clone()
            },
            score: best.entry.score,
            prediction: Label::parse(&best.entry.prediction).unwrap_or(Label::Unknown),
            explanation: best.entry.explanation,
            source: CacheSource::SemanticVector,
            similarity: Some(best.score as f64),
        })
    }

    /// Rewords a cached explanation for the incoming text; any failure
    /// returns the cached explanation unchanged.
    async fn personalize(&self, explanation: &str, text: &str) -> String {
        let prompt = format!(
            "A cached fact-check explanation exists for a closely similar text.\n\
             Adapt it to the new text without changing the verdict or adding claims.\n\
             Return STRICT JSON: {{\"explanation\": \"...\"}}\n\n\
             Cached explanation: {explanation}\n\nNew text: {text}"
        );

        let reply = self.llm.ask_structured(&prompt).await;
        match reply.str_field("explanation") {
            Some(adapted) if !adapted.trim().is_empty() => adapted.trim().to_string(),
            _ => explanation.to_string(),
        }
    }

    /// Writes a fresh pipeline result through to both stores.
    ///
    /// Returns the article id. Store failures are logged; the result is
    /// still returned to the caller.
    #[instrument(skip_all, fields(label = %label))]
    pub async fn store_result(
        &self,
        url: &str,
        text: &str,
        score: f64,
        label: Label,
        explanation: &str,
    ) -> String {
        let id = article_id(url, text);
        let embedding = match self.embedder.embed(text).await {
            Ok(emb) => emb,
            Err(err) => {
                warn!(%err, "embedding failed during write-back");
                Vec::new()
            }
        };

        let record = ArticleRecord {
            text: text.to_string(),
            url: url.to_string(),
            embedding: embedding.clone(),
            verified: true,
            prediction: label,
            text_score: score,
            text_explanation: explanation.to_string(),
            last_updated: Utc::now(),
            total_views: 0,
            total_reports: 0,
            community_flagged: false,
            kind: "text".to_string(),
        };

        let (doc_write, vector_write) = tokio::join!(
            async {
                self.docstore
                    .set(ARTICLES_COLLECTION, &id, json!(record), true)
                    .await
            },
            async {
                if embedding.is_empty() {
                    return Ok(());
                }
                self.upsert_merged(
                    Namespace::Feedback,
                    FeedbackPoint {
                        id: id.clone(),
                        vector: embedding.clone(),
                        entry: FeedbackEntry::new(
                            id.clone(),
                            text,
                            explanation,
                            score,
                            label.as_str(),
                            true,
                            "system",
                        ),
                    },
                )
                .await
            }
        );

        if let Err(err) = doc_write {
            warn!(%err, "document write-back failed");
        }
        if let Err(err) = vector_write {
            warn!(%err, "vector write-back failed");
        }

        id
    }

    /// Stores a user feedback entry, merging with any existing point.
    pub async fn store_feedback(
        &self,
        text: &str,
        explanation: &str,
        sources: Vec<String>,
        anon_user: &str,
        score: f64,
        prediction: &str,
        verified: bool,
    ) -> Result<String, crate::vectordb::VectorDbError> {
        let id = article_id("", text);
        let vector = match self.embedder.embed(text).await {
            Ok(vector) => vector,
            Err(err) => {
                warn!(%err, "embedding failed, feedback not indexed");
                return Ok(id);
            }
        };

        let ns = if verified {
            Namespace::Verified
        } else {
            Namespace::Feedback
        };

        let mut entry = FeedbackEntry::new(
            id.clone(),
            text,
            explanation,
            score,
            prediction,
            verified,
            anon_user,
        );
        entry.sources = sources;

        self.upsert_merged(ns, FeedbackPoint {
            id: id.clone(),
            vector,
            entry,
        })
        .await?;

        Ok(id)
    }

    async fn upsert_merged(
        &self,
        ns: Namespace,
        point: FeedbackPoint,
    ) -> Result<(), crate::vectordb::VectorDbError> {
        let merged = match self.vectors.fetch(ns, &point.id).await? {
            Some(mut existing) => {
                existing.merge_from(&point.entry);
                FeedbackPoint {
                    id: point.id,
                    vector: point.vector,
                    entry: existing,
                }
            }
            None => point,
        };

        self.vectors.upsert(ns, merged).await
    }

    /// Deletes expired vector entries in every namespace. Returns the count.
    pub async fn cleanup_expired(&self) -> usize {
        let now = Utc::now();
        let mut deleted = 0;

        for ns in Namespace::ALL {
            let expired = match self.vectors.expired_ids(ns, now).await {
                Ok(ids) => ids,
                Err(err) => {
                    warn!(%err, collection = ns.collection(), "expiry scan failed");
                    continue;
                }
            };
            if expired.is_empty() {
                continue;
            }

            let count = expired.len();
            match self.vectors.delete(ns, expired).await {
                Ok(()) => {
                    info!(count, collection = ns.collection(), "expired vectors deleted");
                    deleted += count;
                }
                Err(err) => warn!(%err, collection = ns.collection(), "expired delete failed"),
            }
        }

        deleted
    }

    /// Deletes the nearest vector entry for `text` to force re-analysis.
    pub async fn clear_for_text(&self, text: &str) -> bool {
        let Ok(vector) = self.embedder.embed(text).await else {
            return false;
        };

        let matches = match self.vectors.query(Namespace::Feedback, vector, 1, false).await {
            Ok(matches) => matches,
            Err(err) => {
                warn!(%err, "cache clear query failed");
                return false;
            }
        };

        let Some(best) = matches.into_iter().next() else {
            return false;
        };

        match self.vectors.delete(Namespace::Feedback, vec![best.id]).await {
            Ok(()) => true,
            Err(err) => {
                warn!(%err, "cache clear delete failed");
                false
            }
        }
    }

    /// Direct article fetch (used by the feedback endpoint).
    pub async fn get_article(&self, id: &str) -> Option<ArticleRecord> {
        let doc = self.docstore.get(ARTICLES_COLLECTION, id).await.ok()??;
        serde_json::from_value(doc).ok()
    }

    /// Shallow-merges fields into an article document.
    pub async fn update_article(
        &self,
        id: &str,
        fields: serde_json::Value,
    ) -> Result<(), crate::docstore::DocStoreError> {
        self.docstore.update(ARTICLES_COLLECTION, id, fields).await
    }

    /// Vector retention window in days (exposed for status surfaces).
    pub fn retention_days(&self) -> i64 {
        VECTOR_TTL_DAYS
    }
}
