//! Canned fact-check client for tests.

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{FactCheckClient, FactCheckError, ReviewedClaim};

/// Returns a fixed claim set, or a scripted error.
#[derive(Default)]
pub struct MockFactCheckClient {
    claims: Mutex<Vec<ReviewedClaim>>,
    failure: Mutex<Option<FactCheckError>>,
    queries: Mutex<Vec<String>>,
}

impl MockFactCheckClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_claims(&self, claims: Vec<ReviewedClaim>) {
        *self.claims.lock() = claims;
    }

    pub fn fail_with(&self, error: FactCheckError) {
        *self.failure.lock() = Some(error);
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().clone()
    }
}

#[async_trait]
impl FactCheckClient for MockFactCheckClient {
    async fn search_claims(&self, query: &str) -> Result<Vec<ReviewedClaim>, FactCheckError> {
        self.queries.lock().push(query.to_string());

        if let Some(error) = self.failure.lock().take() {
            return Err(error);
        }

        Ok(self.claims.lock().clone())
    }
}
