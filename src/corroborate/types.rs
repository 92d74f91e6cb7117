//! Evidence and corroboration result types.

use serde::{Deserialize, Serialize};

use crate::constants::{EVIDENCE_SIMILARITY_WEIGHT, EVIDENCE_TRUST_WEIGHT, clamp01};

/// Whether an evidence item supports or contradicts the claim.
/// Unrelated judgments are dropped before this type is constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Relevance {
    Supports,
    Contradicts,
}

/// Strength class of the whole corroboration pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorroborationStatus {
    Corroborated,
    Weak,
    NoResults,
}

/// One scored piece of web evidence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evidence {
    pub title: String,
    pub link: String,
    pub snippet: String,
    /// Cosine similarity between claim and snippet, in `[0, 1]`.
    pub similarity: f64,
    /// Domain trust score, in `[0, 1]`.
    pub domain_score: f64,
    /// Composite score per [`composite_score`].
    pub evidence_score: f64,
    /// Domain had no accumulated trust record when observed.
    pub is_new_domain: bool,
    pub relevance: Relevance,
    /// Judge confidence, 0–100.
    pub confidence: u32,
}

/// Composite evidence score: similarity-weighted with a domain-trust term,
/// clamped to `[0, 1]` and rounded to 3 decimals.
pub fn composite_score(similarity: f64, domain_trust: f64) -> f64 {
    let raw = EVIDENCE_SIMILARITY_WEIGHT * similarity + EVIDENCE_TRUST_WEIGHT * domain_trust;
    (clamp01(raw) * 1000.0).round() / 1000.0
}

/// Output of the corroboration engine across all claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Corroboration {
    pub status: CorroborationStatus,
    pub evidence: Vec<Evidence>,
}

impl Corroboration {
    pub fn empty() -> Self {
        Self {
            status: CorroborationStatus::NoResults,
            evidence: Vec::new(),
        }
    }

    /// Classifies evidence count into a status.
    pub fn status_for(evidence_count: usize) -> CorroborationStatus {
        match evidence_count {
            0 => CorroborationStatus::NoResults,
            1 => CorroborationStatus::Weak,
            _ => CorroborationStatus::Corroborated,
        }
    }

    /// Net supports-minus-contradicts confidence, in `[-n, n]` but clamped
    /// by callers' usage to `[-1, 1]` per-unit sums.
    pub fn evidence_strength(&self) -> f64 {
        let mut supports = 0.0;
        let mut contradicts = 0.0;
        for item in &self.evidence {
            let weight = item.confidence as f64 / 100.0;
            match item.relevance {
                Relevance::Supports => supports += weight,
                Relevance::Contradicts => contradicts += weight,
            }
        }
        ((supports - contradicts) * 1000.0).round() / 1000.0
    }
}
