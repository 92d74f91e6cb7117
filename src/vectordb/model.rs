//! Vector index point and payload models.

use std::collections::HashMap;

use chrono::{DateTime, TimeZone, Utc};
use qdrant_client::qdrant::ScoredPoint;
use qdrant_client::qdrant::value::Kind;

use crate::constants::VECTOR_TTL_DAYS;
use crate::hashing::hash_to_u64;

/// Vector-index namespace. Qdrant has no first-class namespaces, so each one
/// maps to its own collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    /// General analyzed-text and feedback entries.
    Feedback,
    /// Community-verified fake entries.
    Verified,
}

impl Namespace {
    pub const ALL: [Namespace; 2] = [Namespace::Feedback, Namespace::Verified];

    pub fn collection(&self) -> &'static str {
        match self {
            Namespace::Feedback => "verity_feedback",
            Namespace::Verified => "verity_verified",
        }
    }
}

/// Metadata stored alongside each vector.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackEntry {
    pub article_id: String,
    pub text: String,
    pub explanation: String,
    pub sources: Vec<String>,
    /// Cached veracity score in `[0, 1]`.
    pub score: f64,
    pub prediction: String,
    pub verified: bool,
    pub confirmations: u64,
    /// Anonymized ids of users who confirmed this entry.
    pub unique_users: Vec<String>,
    pub timestamp: DateTime<Utc>,
    pub ttl_expiry: DateTime<Utc>,
}

impl FeedbackEntry {
    /// Builds a fresh entry expiring [`VECTOR_TTL_DAYS`] from now.
    pub fn new(
        article_id: impl Into<String>,
        text: impl Into<String>,
        explanation: impl Into<String>,
        score: f64,
        prediction: impl Into<String>,
        verified: bool,
        user: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            article_id: article_id.into(),
            text: text.into(),
            explanation: explanation.into(),
            sources: Vec::new(),
            score,
            prediction: prediction.into(),
            verified,
            confirmations: 1,
            unique_users: vec![user.into()],
            timestamp: now,
            ttl_expiry: now + chrono::Duration::days(VECTOR_TTL_DAYS),
        }
    }

    /// Folds a repeat submission into this entry: scores average, users
    /// union, the verified flag only ratchets up, and a known prediction
    /// beats "Unknown".
    pub fn merge_from(&mut self, incoming: &FeedbackEntry) {
        self.score = (self.score + incoming.score) / 2.0;
        self.confirmations += 1;
        for user in &incoming.unique_users {
            if !self.unique_users.contains(user) {
                self.unique_users.push(user.clone());
            }
        }
        if incoming.prediction != "Unknown" {
            self.prediction = incoming.prediction.clone();
        }
        self.verified = self.verified || incoming.verified;
        self.timestamp = incoming.timestamp;
        self.ttl_expiry = incoming.ttl_expiry;
    }
}

/// One point to upsert.
#[derive(Debug, Clone)]
pub struct FeedbackPoint {
    /// Content-hash id (hex string); hashed to the numeric Qdrant point id.
    pub id: String,
    pub vector: Vec<f32>,
    pub entry: FeedbackEntry,
}

/// One similarity-search result.
#[derive(Debug, Clone)]
pub struct SearchMatch {
    pub id: String,
    pub score: f32,
    pub entry: FeedbackEntry,
}

/// Numeric Qdrant point id for a content-hash string id.
#[inline]
pub fn point_id(id: &str) -> u64 {
    hash_to_u64(id.as_bytes())
}

type QdrantPayload = HashMap<String, qdrant_client::qdrant::Value>;

fn string_list_value(items: &[String]) -> qdrant_client::qdrant::Value {
    use qdrant_client::qdrant::{ListValue, Value};
    Value {
        kind: Some(Kind::ListValue(ListValue {
            values: items.iter().map(|s| Value::from(s.clone())).collect(),
        })),
    }
}

/// Serializes an entry (plus its string id) into a Qdrant payload.
pub fn entry_to_payload(id: &str, entry: &FeedbackEntry) -> QdrantPayload {
    let mut payload: QdrantPayload = HashMap::new();
    payload.insert("text_hash".to_string(), id.to_string().into());
    payload.insert("article_id".to_string(), entry.article_id.clone().into());
    payload.insert("text".to_string(), entry.text.clone().into());
    payload.insert("explanation".to_string(), entry.explanation.clone().into());
    payload.insert("sources".to_string(), string_list_value(&entry.sources));
    payload.insert("score".to_string(), entry.score.into());
    payload.insert("prediction".to_string(), entry.prediction.clone().into());
    payload.insert("verified".to_string(), entry.verified.into());
    payload.insert("confirmations".to_string(), (entry.confirmations as i64).into());
    payload.insert("unique_users".to_string(), string_list_value(&entry.unique_users));
    payload.insert("timestamp".to_string(), entry.timestamp.timestamp().into());
    payload.insert("ttl_expiry".to_string(), entry.ttl_expiry.timestamp().into());
    payload
}

/// Deserializes a Qdrant payload back into `(string id, entry)`.
pub fn entry_from_payload(payload: &QdrantPayload) -> Option<(String, FeedbackEntry)> {
    let id = payload_str(payload, "text_hash")?;

    let entry = FeedbackEntry {
        article_id: payload_str(payload, "article_id").unwrap_or_else(|| id.clone()),
        text: payload_str(payload, "text").unwrap_or_default(),
        explanation: payload_str(payload, "explanation").unwrap_or_default(),
        sources: payload_str_list(payload, "sources"),
        score: payload_f64(payload, "score").unwrap_or(0.5),
        prediction: payload_str(payload, "prediction").unwrap_or_else(|| "Unknown".to_string()),
        verified: payload_bool(payload, "verified").unwrap_or(false),
        confirmations: payload_i64(payload, "confirmations").unwrap_or(0).max(0) as u64,
        unique_users: payload_str_list(payload, "unique_users"),
        timestamp: payload_i64(payload, "timestamp")
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
            .unwrap_or_else(Utc::now),
        ttl_expiry: payload_i64(payload, "ttl_expiry")
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
            .unwrap_or_else(Utc::now),
    };

    Some((id, entry))
}

/// Builds a [`SearchMatch`] from a scored Qdrant point.
pub fn match_from_scored_point(point: ScoredPoint) -> Option<SearchMatch> {
    let (id, entry) = entry_from_payload(&point.payload)?;
    Some(SearchMatch {
        id,
        score: point.score,
        entry,
    })
}

fn payload_str(payload: &QdrantPayload, key: &str) -> Option<String> {
    payload.get(key).and_then(|v| v.as_str()).map(|s| s.to_string())
}

fn payload_f64(payload: &QdrantPayload, key: &str) -> Option<f64> {
    payload.get(key).and_then(|v| v.as_double())
}

fn payload_i64(payload: &QdrantPayload, key: &str) -> Option<i64> {
    payload.get(key).and_then(|v| v.as_integer())
}

fn payload_bool(payload: &QdrantPayload, key: &str) -> Option<bool> {
    payload.get(key).and_then(|v| v.as_bool())
}

fn payload_str_list(payload: &QdrantPayload, key: &str) -> Vec<String> {
    payload
        .get(key)
        .and_then(|v| match &v.kind {
            Some(Kind::ListValue(list)) => Some(
                list.values
                    .iter()
                    .filter_map(|item| item.as_str())
                    .map(|s| s.to_string())
                    .collect(),
            ),
            _ => None,
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> FeedbackEntry {
        FeedbackEntry::new("art-1", "text body", "because", 0.8, "Fake", true, "user-a")
    }

    #[test]
    fn payload_roundtrip() {
        let original = entry();
        let payload = entry_to_payload("hash-id", &original);
        let (id, decoded) = entry_from_payload(&payload).unwrap();

        assert_eq!(id, "hash-id");
        assert_eq!(decoded.article_id, original.article_id);
        assert_eq!(decoded.score, original.score);
        assert_eq!(decoded.prediction, original.prediction);
        assert_eq!(decoded.unique_users, original.unique_users);
        assert_eq!(decoded.timestamp.timestamp(), original.timestamp.timestamp());
    }

    #[test]
    fn merge_averages_scores_and_unions_users() {
        let mut existing = entry();
        let mut incoming = entry();
        incoming.score = 0.4;
        incoming.unique_users = vec!["user-a".to_string(), "user-b".to_string()];
        incoming.verified = false;

        existing.merge_from(&incoming);

        assert!((existing.score - 0.6).abs() < 1e-9);
        assert_eq!(existing.confirmations, 2);
        assert_eq!(existing.unique_users, vec!["user-a", "user-b"]);
        assert!(existing.verified, "verified only ratchets up");
    }

    #[test]
    fn merge_keeps_known_prediction_over_unknown() {
        let mut existing = entry();
        let mut incoming = entry();
        incoming.prediction = "Unknown".to_string();

        existing.merge_from(&incoming);
        assert_eq!(existing.prediction, "Fake");
    }

    #[test]
    fn point_ids_are_stable() {
        assert_eq!(point_id("abc"), point_id("abc"));
        assert_ne!(point_id("abc"), point_id("abd"));
    }

    #[test]
    fn namespaces_map_to_distinct_collections() {
        assert_ne!(
            Namespace::Feedback.collection(),
            Namespace::Verified.collection()
        );
    }
}
