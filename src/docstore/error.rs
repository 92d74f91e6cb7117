//! Document store errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocStoreError {
    /// The backend rejected or failed the operation.
    #[error("document store operation failed on '{collection}': {message}")]
    OperationFailed { collection: String, message: String },

    /// Update target does not exist.
    #[error("document not found: {collection}/{id}")]
    NotFound { collection: String, id: String },
}
