//! Reasoning-model collaborator.
//!
//! The pipeline asks the reasoning model for structured JSON (reformulations,
//! relevance judgments, per-claim verdicts). Model output is never trusted to
//! be well-formed: replies are parsed defensively (direct parse, then brace
//! extraction, then a deterministic fallback) and transport failures degrade
//! to a malformed reply instead of an error. The caller decides what a
//! malformed reply means for its contract.

pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use error::LlmError;
#[cfg(any(test, feature = "mock"))]
pub use mock::MockReasoningClient;

use std::sync::LazyLock;

use async_trait::async_trait;
use genai::Client;
use genai::chat::{ChatMessage, ChatRequest};
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::retry::{RetryPolicy, retry_with_policy};

const CHAT_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(15);

static BRACE_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{[\s\S]*\}").expect("valid regex"));

/// Result of defensively parsing a model reply.
#[derive(Debug, Clone, PartialEq)]
pub enum StructuredOutput {
    /// The reply (or an embedded brace block) parsed as JSON.
    Parsed(Value),
    /// Nothing parseable; callers fall back to their documented default.
    Malformed,
}

/// A reasoning-model reply: the parse outcome plus the raw text.
#[derive(Debug, Clone)]
pub struct StructuredReply {
    pub output: StructuredOutput,
    pub raw_text: String,
}

impl StructuredReply {
    /// A reply representing total transport failure.
    pub fn failed() -> Self {
        Self {
            output: StructuredOutput::Malformed,
            raw_text: String::new(),
        }
    }

    /// Returns the parsed JSON value, if any.
    pub fn parsed(&self) -> Option<&Value> {
        match &self.output {
            StructuredOutput::Parsed(value) => Some(value),
            StructuredOutput::Malformed => None,
        }
    }

    /// Returns a string field of the parsed object.
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.parsed()?.get(key)?.as_str()
    }

    /// Returns an integer field of the parsed object.
    pub fn int_field(&self, key: &str) -> Option<i64> {
        let field = self.parsed()?.get(key)?;
        field.as_i64().or_else(|| field.as_f64().map(|f| f as i64))
    }
}

/// Parses a model reply: strip code fences, direct parse, brace extraction.
pub fn parse_structured(text: &str) -> StructuredOutput {
    let stripped = strip_code_blocks(text);

    if let Ok(value) = serde_json::from_str::<Value>(stripped) {
        return StructuredOutput::Parsed(value);
    }

    if let Some(block) = BRACE_BLOCK.find(stripped)
        && let Ok(value) = serde_json::from_str::<Value>(block.as_str())
    {
        return StructuredOutput::Parsed(value);
    }

    StructuredOutput::Malformed
}

/// Strips markdown code fences from a model reply.
pub fn strip_code_blocks(response: &str) -> &str {
    response
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}

/// Narrow reasoning-model contract: one prompt in, one structured reply out.
/// Implementations never return an error.
#[async_trait]
pub trait ReasoningClient: Send + Sync {
    async fn ask_structured(&self, prompt: &str) -> StructuredReply;
}

/// genai-backed [`ReasoningClient`].
pub struct GenaiReasoningClient {
    client: Client,
    model: String,
    retry: RetryPolicy,
}

impl GenaiReasoningClient {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            client: Client::default(),
            model: model.into(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn exec_once(&self, prompt: &str) -> Result<String, LlmError> {
        let request = ChatRequest::new(vec![ChatMessage::user(prompt)]);
        let response = tokio::time::timeout(
            CHAT_TIMEOUT,
            self.client.exec_chat(&self.model, request, None),
        )
        .await
        .map_err(|_| LlmError::RequestFailed {
            message: "timed out".to_string(),
        })?
        .map_err(|e| LlmError::RequestFailed {
            message: e.to_string(),
        })?;

        response
            .first_text()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or(LlmError::EmptyReply)
    }
}

#[async_trait]
impl ReasoningClient for GenaiReasoningClient {
    async fn ask_structured(&self, prompt: &str) -> StructuredReply {
        let attempt =
            retry_with_policy(&self.retry, "reasoning", || self.exec_once(prompt)).await;

        match attempt {
            Ok(raw_text) => {
                let output = parse_structured(&raw_text);
                if matches!(output, StructuredOutput::Malformed) {
                    debug!(reply_len = raw_text.len(), "reply did not parse as JSON");
                }
                StructuredReply { output, raw_text }
            }
            Err(err) => {
                warn!(%err, "reasoning model unavailable, degrading to malformed reply");
                StructuredReply::failed()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_clean_json() {
        let output = parse_structured(r#"{"prediction": "Real", "confidence": 85}"#);
        assert_eq!(
            output,
            StructuredOutput::Parsed(json!({"prediction": "Real", "confidence": 85}))
        );
    }

    #[test]
    fn parses_json_array() {
        let output = parse_structured(r#"["one rewrite", "another rewrite"]"#);
        assert_eq!(
            output,
            StructuredOutput::Parsed(json!(["one rewrite", "another rewrite"]))
        );
    }

    #[test]
    fn strips_code_fences() {
        let output = parse_structured("```json\n{\"ok\": true}\n```");
        assert_eq!(output, StructuredOutput::Parsed(json!({"ok": true})));
    }

    #[test]
    fn extracts_brace_block_from_prose() {
        let output =
            parse_structured("Sure! Here is the verdict:\n{\"prediction\": \"Fake\"}\nHope it helps.");
        assert_eq!(output, StructuredOutput::Parsed(json!({"prediction": "Fake"})));
    }

    #[test]
    fn malformed_when_nothing_parses() {
        assert_eq!(parse_structured("I cannot answer that."), StructuredOutput::Malformed);
        assert_eq!(parse_structured("{broken: json"), StructuredOutput::Malformed);
    }

    #[test]
    fn field_accessors() {
        let reply = StructuredReply {
            output: parse_structured(r#"{"prediction": "Real", "confidence": 85.4}"#),
            raw_text: String::new(),
        };
        assert_eq!(reply.str_field("prediction"), Some("Real"));
        assert_eq!(reply.int_field("confidence"), Some(85));
        assert_eq!(reply.str_field("missing"), None);
    }

    #[test]
    fn failed_reply_is_malformed() {
        let reply = StructuredReply::failed();
        assert!(reply.parsed().is_none());
        assert!(reply.raw_text.is_empty());
    }
}
