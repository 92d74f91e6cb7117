//! Gateway request payloads.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct DetectTextRequest {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DetectTextInitialRequest {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    #[serde(default)]
    pub article_id: String,
    #[serde(default)]
    pub text: String,
    /// "YES" marks the article as fake.
    #[serde(default)]
    pub response: String,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub sources: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CancelSessionRequest {
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SessionTasksQuery {
    #[serde(default)]
    pub session_id: Option<String>,
}
