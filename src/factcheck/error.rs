//! Fact-check collaborator errors.
//!
//! These never leave the module: [`super::run_fact_check`] folds them into
//! the `api_error` / `error` summary statuses.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FactCheckError {
    /// Transport-level failure (timeout, connection, decode).
    #[error("fact-check request failed: {message}")]
    RequestFailed { message: String },

    /// The endpoint answered with a non-success status.
    #[error("fact-check endpoint returned status {status}")]
    BadStatus { status: u16 },
}
