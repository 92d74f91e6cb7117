//! Cross-cutting, shared constants.
//!
//! Pipeline tuning values live here so the thresholds that interlock across
//! modules (claim extraction, evidence scoring, cache acceptance) stay in one
//! place. Prefer deriving secondary constants from primary ones to avoid drift.

/// Minimum sentence length (chars) for a sentence to qualify as a claim.
pub const CLAIM_MIN_LEN: usize = 30;

/// Maximum number of claims extracted from one input.
pub const MAX_CLAIMS: usize = 3;

/// Length of the pseudo-claim fallback when no sentence qualifies.
pub const PSEUDO_CLAIM_LEN: usize = 500;

/// Results requested from the web-search collaborator per query.
pub const SEARCH_RESULTS_PER_QUERY: usize = 10;

/// Maximum articles handed to the relevance judge per claim.
pub const MAX_JUDGED_ARTICLES: usize = 8;

/// Evidence kept per claim after ranking by composite score.
pub const MAX_EVIDENCE_PER_CLAIM: usize = 3;

/// Weight of semantic similarity in the composite evidence score.
pub const EVIDENCE_SIMILARITY_WEIGHT: f64 = 0.75;

/// Weight of domain trust in the composite evidence score.
pub const EVIDENCE_TRUST_WEIGHT: f64 = 0.25;

/// Composite score above which an evidence item casts a domain-trust vote.
pub const TRUST_VOTE_THRESHOLD: f64 = 0.7;

/// Domain-trust snapshot time-to-live.
pub const TRUST_CACHE_TTL_SECS: u64 = 300;

/// Cosine similarity required for a tier-2 (document) cache hit.
pub const SEMANTIC_DOC_THRESHOLD: f64 = 0.90;

/// Below this tier-2 similarity the cached explanation is personalized.
pub const PERSONALIZE_BELOW: f64 = 0.95;

/// Trailing window (days) of documents considered by tier 2.
pub const SEMANTIC_DOC_WINDOW_DAYS: i64 = 30;

/// Candidate documents scanned by tier 2.
pub const SEMANTIC_DOC_CANDIDATES: usize = 50;

/// Similarity required for a tier-3 (vector index) cache hit.
pub const SEMANTIC_VECTOR_THRESHOLD: f32 = 0.75;

/// Retention window for vector-index entries.
pub const VECTOR_TTL_DAYS: i64 = 15;

/// Entries held by the process-wide embedding cache.
pub const EMBEDDING_CACHE_CAPACITY: u64 = 8_192;

/// Default embedding dimension (MiniLM-class sentence encoders).
pub const DEFAULT_EMBEDDING_DIM: usize = 384;

/// Task age after which the reaper removes it.
pub const TASK_MAX_AGE_SECS: u64 = 30 * 60;

/// Interval between task-reaper sweeps.
pub const TASK_REAPER_INTERVAL_SECS: u64 = 60;

/// Interval between periodic expired-vector sweeps.
pub const CACHE_CLEANUP_INTERVAL_SECS: u64 = 3_600;

/// Report-to-view ratio (percent) above which an article is community flagged.
pub const COMMUNITY_FLAG_PERCENT: f64 = 40.0;

/// Clamps `x` to the unit interval.
#[inline]
pub fn clamp01(x: f64) -> f64 {
    x.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evidence_weights_sum_to_one() {
        assert!((EVIDENCE_SIMILARITY_WEIGHT + EVIDENCE_TRUST_WEIGHT - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn clamp01_bounds() {
        assert_eq!(clamp01(-0.5), 0.0);
        assert_eq!(clamp01(0.5), 0.5);
        assert_eq!(clamp01(1.5), 1.0);
    }
}
