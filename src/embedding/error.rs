//! Embedding collaborator errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// The embedding endpoint call failed.
    #[error("embedding request failed: {message}")]
    RequestFailed { message: String },

    /// The endpoint replied without a usable vector.
    #[error("embedding response malformed: {message}")]
    BadResponse { message: String },

    /// Nothing to embed.
    #[error("cannot embed empty text")]
    EmptyInput,
}
