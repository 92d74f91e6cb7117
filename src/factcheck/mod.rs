//! Professional fact-check lookup.
//!
//! One query (the most quotable sentence of the input) goes to the
//! fact-check search collaborator; textual ratings come back, get bucketed
//! through a fixed keyword table, and the bucket proportions determine a
//! corpus-level status. The module never errors: every failure mode maps to
//! a well-formed [`FactCheckSummary`] with zero counts.

pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use error::FactCheckError;
#[cfg(any(test, feature = "mock"))]
pub use mock::MockFactCheckClient;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::claims::{longest_query_sentence, truncate_chars};
use crate::retry::{RetryPolicy, retry_with_policy};

const FACTCHECK_TIMEOUT: Duration = Duration::from_secs(6);
const MAX_RESULTS: usize = 5;
const MAX_REVIEWS_PER_CLAIM: usize = 2;
const CLAIM_SNIPPET_LEN: usize = 150;

/// Corpus-level fact-check status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactCheckStatus {
    NoFactChecks,
    PredominantlyFalse,
    PredominantlyTrue,
    MixedRatings,
    Inconclusive,
    ApiError,
    Error,
}

/// Bucket a textual rating falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatingCategory {
    False,
    True,
    Mixed,
    Unknown,
}

/// One professional fact-check review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactCheckRecord {
    pub claim: String,
    pub publisher: String,
    pub rating: String,
    pub rating_category: RatingCategory,
    pub title: String,
    pub url: String,
}

/// Derived per-request summary; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactCheckSummary {
    pub status: FactCheckStatus,
    pub total: usize,
    pub false_count: usize,
    pub true_count: usize,
    pub mixed_count: usize,
    pub records: Vec<FactCheckRecord>,
}

impl FactCheckSummary {
    fn empty(status: FactCheckStatus) -> Self {
        Self {
            status,
            total: 0,
            false_count: 0,
            true_count: 0,
            mixed_count: 0,
            records: Vec::new(),
        }
    }
}

/// A reviewed claim as returned by the search collaborator.
#[derive(Debug, Clone, Deserialize)]
pub struct ReviewedClaim {
    #[serde(default)]
    pub text: String,
    #[serde(default, rename = "claimReview")]
    pub reviews: Vec<ClaimReview>,
}

/// One review attached to a claim.
#[derive(Debug, Clone, Deserialize)]
pub struct ClaimReview {
    #[serde(default)]
    pub publisher: Publisher,
    #[serde(default, rename = "textualRating")]
    pub textual_rating: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Publisher {
    #[serde(default)]
    pub name: String,
}

/// Narrow fact-check search contract.
#[async_trait]
pub trait FactCheckClient: Send + Sync {
    async fn search_claims(&self, query: &str) -> Result<Vec<ReviewedClaim>, FactCheckError>;
}

/// Buckets a textual rating by substring match.
///
/// Checked in order: the false table wins over the mixed table, so
/// "mostly false" lands in [`RatingCategory::False`].
pub fn bucket_rating(rating: &str) -> RatingCategory {
    let rating = rating.to_lowercase();
    const FALSE_WORDS: [&str; 5] = ["false", "fake", "incorrect", "misleading", "pants"];
    const TRUE_WORDS: [&str; 4] = ["true", "correct", "accurate", "verified"];
    const MIXED_WORDS: [&str; 4] = ["mixed", "partial", "mostly", "half"];

    if FALSE_WORDS.iter().any(|w| rating.contains(w)) {
        RatingCategory::False
    } else if TRUE_WORDS.iter().any(|w| rating.contains(w)) {
        RatingCategory::True
    } else if MIXED_WORDS.iter().any(|w| rating.contains(w)) {
        RatingCategory::Mixed
    } else {
        RatingCategory::Unknown
    }
}

/// Flattens reviewed claims into records and derives the corpus status.
pub fn summarize(claims: &[ReviewedClaim]) -> FactCheckSummary {
    let mut records = Vec::new();
    let mut false_count = 0;
    let mut true_count = 0;
    let mut mixed_count = 0;

    for claim in claims.iter().take(MAX_RESULTS) {
        let snippet = truncate_chars(&claim.text, CLAIM_SNIPPET_LEN).to_string();

        for review in claim.reviews.iter().take(MAX_REVIEWS_PER_CLAIM) {
            let rating = review.textual_rating.to_lowercase();
            let category = bucket_rating(&rating);
            match category {
                RatingCategory::False => false_count += 1,
                RatingCategory::True => true_count += 1,
                RatingCategory::Mixed => mixed_count += 1,
                RatingCategory::Unknown => {}
            }

            records.push(FactCheckRecord {
                claim: snippet.clone(),
                publisher: if review.publisher.name.is_empty() {
                    "Unknown".to_string()
                } else {
                    review.publisher.name.clone()
                },
                rating,
                rating_category: category,
                title: review.title.clone(),
                url: review.url.clone(),
            });
        }
    }

    let total = records.len();
    if total == 0 {
        return FactCheckSummary::empty(FactCheckStatus::NoFactChecks);
    }

    let false_ratio = false_count as f64 / total as f64;
    let true_ratio = true_count as f64 / total as f64;

    let status = if false_ratio >= 0.6 {
        FactCheckStatus::PredominantlyFalse
    } else if true_ratio >= 0.6 {
        FactCheckStatus::PredominantlyTrue
    } else if mixed_count >= 2 {
        FactCheckStatus::MixedRatings
    } else {
        FactCheckStatus::Inconclusive
    };

    FactCheckSummary {
        status,
        total,
        false_count,
        true_count,
        mixed_count,
        records,
    }
}

/// Runs the full fact-check lookup for an input text. Never errors.
pub async fn run_fact_check(
    client: &dyn FactCheckClient,
    policy: &RetryPolicy,
    text: &str,
) -> FactCheckSummary {
    let query = longest_query_sentence(text);
    debug!(query_len = query.len(), "fact-check query selected");

    match retry_with_policy(policy, "fact_check", || client.search_claims(&query)).await {
        Ok(claims) => summarize(&claims),
        Err(FactCheckError::BadStatus { status }) => {
            warn!(status, "fact-check endpoint returned error status");
            FactCheckSummary::empty(FactCheckStatus::ApiError)
        }
        Err(err) => {
            warn!(%err, "fact-check lookup failed");
            FactCheckSummary::empty(FactCheckStatus::Error)
        }
    }
}

#[derive(Deserialize)]
struct SearchClaimsResponse {
    #[serde(default)]
    claims: Vec<ReviewedClaim>,
}

/// HTTP-backed [`FactCheckClient`] (claims:search compatible endpoint).
pub struct HttpFactCheckClient {
    http: reqwest::Client,
    url: String,
    api_key: String,
}

impl HttpFactCheckClient {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(FACTCHECK_TIMEOUT)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            url: url.into(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl FactCheckClient for HttpFactCheckClient {
    async fn search_claims(&self, query: &str) -> Result<Vec<ReviewedClaim>, FactCheckError> {
        let response = self
            .http
            .get(&self.url)
            .query(&[
                ("key", self.api_key.as_str()),
                ("query", query),
                ("pageSize", "5"),
                ("languageCode", "en"),
            ])
            .send()
            .await
            .map_err(|e| FactCheckError::RequestFailed {
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(FactCheckError::BadStatus {
                status: response.status().as_u16(),
            });
        }

        let body: SearchClaimsResponse =
            response
                .json()
                .await
                .map_err(|e| FactCheckError::RequestFailed {
                    message: e.to_string(),
                })?;

        Ok(body.claims)
    }
}

/// Stand-in used when no fact-check endpoint is configured: every query
/// finds nothing, so summaries degrade to `no_fact_checks`.
pub struct DisabledFactCheckClient;

#[async_trait]
impl FactCheckClient for DisabledFactCheckClient {
    async fn search_claims(&self, _query: &str) -> Result<Vec<ReviewedClaim>, FactCheckError> {
        Ok(Vec::new())
    }
}
