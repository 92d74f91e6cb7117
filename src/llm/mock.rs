//! Scripted reasoning client for tests.

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{ReasoningClient, StructuredReply, parse_structured};

/// Replays canned replies keyed by a prompt substring.
///
/// The first rule whose needle appears in the prompt wins; otherwise the
/// default reply (initially an empty JSON object) is returned. Every prompt
/// is recorded so tests can assert which calls happened.
#[derive(Default)]
pub struct MockReasoningClient {
    rules: Mutex<Vec<(String, String)>>,
    default_reply: Mutex<String>,
    prompts: Mutex<Vec<String>>,
}

impl MockReasoningClient {
    pub fn new() -> Self {
        Self {
            rules: Mutex::new(Vec::new()),
            default_reply: Mutex::new("{}".to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Registers a canned reply for prompts containing `needle`.
    pub fn respond_with(&self, needle: impl Into<String>, reply: impl Into<String>) {
        self.rules.lock().push((needle.into(), reply.into()));
    }

    /// Sets the reply used when no rule matches.
    pub fn set_default(&self, reply: impl Into<String>) {
        *self.default_reply.lock() = reply.into();
    }

    /// Number of prompts seen so far.
    pub fn call_count(&self) -> usize {
        self.prompts.lock().len()
    }

    /// All prompts seen so far, in order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl ReasoningClient for MockReasoningClient {
    async fn ask_structured(&self, prompt: &str) -> StructuredReply {
        self.prompts.lock().push(prompt.to_string());

        let raw_text = self
            .rules
            .lock()
            .iter()
            .find(|(needle, _)| prompt.contains(needle.as_str()))
            .map(|(_, reply)| reply.clone())
            .unwrap_or_else(|| self.default_reply.lock().clone());

        StructuredReply {
            output: parse_structured(&raw_text),
            raw_text,
        }
    }
}
