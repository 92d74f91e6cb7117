//! Classifier collaborator errors (folded into the fallback prior by
//! [`super::predict_or_prior`]).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClassifierError {
    /// Transport-level failure (timeout, connection).
    #[error("classifier request failed: {message}")]
    RequestFailed { message: String },

    /// The endpoint answered with a non-success status.
    #[error("classifier endpoint returned status {status}")]
    BadStatus { status: u16 },

    /// The response body did not carry a usable prediction.
    #[error("classifier response malformed: {message}")]
    BadResponse { message: String },
}
