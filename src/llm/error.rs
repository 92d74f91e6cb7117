//! Reasoning-model transport errors (internal to the wrapper; never escape
//! [`super::ReasoningClient::ask_structured`]).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    /// The upstream chat call failed.
    #[error("reasoning model call failed: {message}")]
    RequestFailed { message: String },

    /// The upstream reply carried no text content.
    #[error("reasoning model returned an empty reply")]
    EmptyReply,
}
