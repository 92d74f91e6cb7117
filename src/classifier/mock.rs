//! Canned classifier client for tests.

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{ArticleMetadata, ClassifierClient, ClassifierError, ClassifierScores};

/// Returns a fixed score triple, or a scripted error.
pub struct MockClassifierClient {
    scores: Mutex<ClassifierScores>,
    failure: Mutex<Option<ClassifierError>>,
    calls: Mutex<usize>,
}

impl MockClassifierClient {
    pub fn new() -> Self {
        Self {
            scores: Mutex::new(ClassifierScores::fallback_prior()),
            failure: Mutex::new(None),
            calls: Mutex::new(0),
        }
    }

    pub fn set_scores(&self, scores: ClassifierScores) {
        *self.scores.lock() = scores;
    }

    pub fn fail_with(&self, error: ClassifierError) {
        *self.failure.lock() = Some(error);
    }

    pub fn call_count(&self) -> usize {
        *self.calls.lock()
    }
}

impl Default for MockClassifierClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ClassifierClient for MockClassifierClient {
    async fn predict(&self, _metadata: &ArticleMetadata) -> Result<ClassifierScores, ClassifierError> {
        *self.calls.lock() += 1;

        if let Some(error) = self.failure.lock().take() {
            return Err(error);
        }

        Ok(*self.scores.lock())
    }
}
