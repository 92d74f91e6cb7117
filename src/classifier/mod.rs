//! Hosted classifier collaborator.
//!
//! The classifier endpoint scores article metadata into a
//! Real/Fake/Misleading probability triple. It is the least-trusted signal
//! in the ensemble and the most failure-prone collaborator, so every failure
//! mode (timeout, bad status, bad JSON) degrades to the fixed prior
//! `{0.7, 0.2, 0.1}` instead of an error.

pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use error::ClassifierError;
#[cfg(any(test, feature = "mock"))]
pub use mock::MockClassifierClient;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::retry::{RetryPolicy, retry_with_policy};

const CLASSIFIER_TIMEOUT: Duration = Duration::from_secs(15);

/// Metadata sent to the classifier endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleMetadata {
    pub title: String,
    pub text: String,
    pub author: String,
    pub date: String,
    pub source: String,
    pub category: String,
}

/// Real/Fake/Misleading probability triple.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassifierScores {
    pub real: f64,
    pub fake: f64,
    pub misleading: f64,
}

impl ClassifierScores {
    /// Fixed prior used whenever the endpoint cannot be trusted.
    pub fn fallback_prior() -> Self {
        Self {
            real: 0.7,
            fake: 0.2,
            misleading: 0.1,
        }
    }
}

/// Narrow classifier contract.
#[async_trait]
pub trait ClassifierClient: Send + Sync {
    async fn predict(&self, metadata: &ArticleMetadata) -> Result<ClassifierScores, ClassifierError>;
}

/// Calls the classifier with retries; any terminal failure yields the prior.
pub async fn predict_or_prior(
    client: &dyn ClassifierClient,
    policy: &RetryPolicy,
    metadata: &ArticleMetadata,
) -> ClassifierScores {
    match retry_with_policy(policy, "classifier", || client.predict(metadata)).await {
        Ok(scores) => scores,
        Err(err) => {
            warn!(%err, "classifier unavailable, using fallback prior");
            ClassifierScores::fallback_prior()
        }
    }
}

#[derive(Deserialize)]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Deserialize, Default)]
struct Prediction {
    #[serde(default)]
    classes: Vec<String>,
    #[serde(default)]
    scores: Vec<f64>,
}

/// Maps a `classes`/`scores` pair response onto [`ClassifierScores`],
/// falling back to prior components for missing labels.
fn extract_scores(response: PredictResponse) -> Result<ClassifierScores, ClassifierError> {
    let prediction = response
        .predictions
        .into_iter()
        .next()
        .ok_or_else(|| ClassifierError::BadResponse {
            message: "no predictions".to_string(),
        })?;

    if prediction.classes.len() != prediction.scores.len() {
        return Err(ClassifierError::BadResponse {
            message: "classes/scores length mismatch".to_string(),
        });
    }

    let prior = ClassifierScores::fallback_prior();
    let mut scores = prior;
    for (class, score) in prediction.classes.iter().zip(prediction.scores.iter()) {
        match class.to_lowercase().as_str() {
            "real" => scores.real = *score,
            "fake" => scores.fake = *score,
            "misleading" => scores.misleading = *score,
            _ => {}
        }
    }

    Ok(scores)
}

/// HTTP-backed [`ClassifierClient`] (`POST {"instances": [metadata]}`).
pub struct HttpClassifierClient {
    http: reqwest::Client,
    url: String,
}

impl HttpClassifierClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(CLASSIFIER_TIMEOUT)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            url: url.into(),
        }
    }
}

#[async_trait]
impl ClassifierClient for HttpClassifierClient {
    async fn predict(&self, metadata: &ArticleMetadata) -> Result<ClassifierScores, ClassifierError> {
        let response = self
            .http
            .post(&self.url)
            .json(&serde_json::json!({ "instances": [metadata] }))
            .send()
            .await
            .map_err(|e| ClassifierError::RequestFailed {
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(ClassifierError::BadStatus {
                status: response.status().as_u16(),
            });
        }

        let body: PredictResponse =
            response
                .json()
                .await
                .map_err(|e| ClassifierError::BadResponse {
                    message: e.to_string(),
                })?;

        extract_scores(body)
    }
}

/// Stand-in used when no classifier endpoint is configured: always the prior.
pub struct PriorClassifierClient;

#[async_trait]
impl ClassifierClient for PriorClassifierClient {
    async fn predict(&self, _metadata: &ArticleMetadata) -> Result<ClassifierScores, ClassifierError> {
        Ok(ClassifierScores::fallback_prior())
    }
}
