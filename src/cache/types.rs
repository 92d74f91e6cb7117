//! Cache record and lookup result types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ensemble::Label;

/// Where an answer came from, as reported to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CacheSource {
    #[serde(rename = "firestore_exact")]
    ExactMatch,
    #[serde(rename = "firestore_semantic")]
    SemanticDocument,
    #[serde(rename = "semantic_cache")]
    SemanticVector,
    #[serde(rename = "new_analysis")]
    NewAnalysis,
}

impl CacheSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheSource::ExactMatch => "firestore_exact",
            CacheSource::SemanticDocument => "firestore_semantic",
            CacheSource::SemanticVector => "semantic_cache",
            CacheSource::NewAnalysis => "new_analysis",
        }
    }
}

fn default_kind() -> String {
    "text".to_string()
}

/// Analyzed-article document persisted in the document store.
///
/// Document-store entries persist indefinitely; only the vector-index copy
/// carries a retention window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleRecord {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub embedding: Vec<f32>,
    #[serde(default)]
    pub verified: bool,
    #[serde(default = "ArticleRecord::default_prediction")]
    pub prediction: Label,
    /// Veracity score in `[0, 1]`.
    #[serde(default)]
    pub text_score: f64,
    #[serde(default)]
    pub text_explanation: String,
    pub last_updated: DateTime<Utc>,
    #[serde(default)]
    pub total_views: u64,
    #[serde(default)]
    pub total_reports: u64,
    #[serde(default)]
    pub community_flagged: bool,
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,
}

impl ArticleRecord {
    fn default_prediction() -> Label {
        Label::Unknown
    }
}

/// One cache answer, ready to serve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedVerdict {
    pub article_id: String,
    /// Veracity score in `[0, 1]`.
    pub score: f64,
    pub prediction: Label,
    pub explanation: String,
    pub source: CacheSource,
    /// Similarity that produced the hit (absent for exact matches).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f64>,
}

/// Outcome of consulting the three tiers in order.
#[derive(Debug, Clone)]
pub enum TieredLookupResult {
    /// Tier 1: content-hash match in the document store.
    HitExact(CachedVerdict),
    /// Tier 2: recent document with cosine similarity above 0.90.
    HitSemanticDoc(CachedVerdict),
    /// Tier 3: vector-index neighbor above 0.75.
    HitVector(CachedVerdict),
    Miss,
}

impl TieredLookupResult {
    pub fn is_hit(&self) -> bool {
        !matches!(self, TieredLookupResult::Miss)
    }

    /// The served verdict, if any tier hit.
    pub fn into_verdict(self) -> Option<CachedVerdict> {
        match self {
            TieredLookupResult::HitExact(v)
            | TieredLookupResult::HitSemanticDoc(v)
            | TieredLookupResult::HitVector(v) => Some(v),
            TieredLookupResult::Miss => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_wire_names() {
        assert_eq!(
            serde_json::to_string(&CacheSource::ExactMatch).unwrap(),
            "\"firestore_exact\""
        );
        assert_eq!(CacheSource::SemanticVector.as_str(), "semantic_cache");
    }

    #[test]
    fn article_record_tolerates_sparse_documents() {
        let record: ArticleRecord = serde_json::from_value(serde_json::json!({
            "last_updated": Utc::now().to_rfc3339(),
        }))
        .unwrap();
        assert_eq!(record.prediction, Label::Unknown);
        assert_eq!(record.kind, "text");
        assert_eq!(record.total_views, 0);
    }

    #[test]
    fn miss_has_no_verdict() {
        assert!(TieredLookupResult::Miss.into_verdict().is_none());
        assert!(!TieredLookupResult::Miss.is_hit());
    }
}
