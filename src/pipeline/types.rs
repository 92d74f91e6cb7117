//! Pipeline result types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cache::CacheSource;
use crate::classifier::ClassifierScores;
use crate::corroborate::CorroborationStatus;
use crate::ensemble::Label;
use crate::factcheck::FactCheckSummary;

/// The reasoning model's own verdict for one claim.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ReasoningVerdict {
    pub prediction: Label,
    pub confidence: u32,
}

/// Everything the pipeline decided about one claim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimVerdict {
    pub claim_text: String,
    pub reasoning: ReasoningVerdict,
    pub classifier: ClassifierScores,
    pub fact_check: FactCheckSummary,
    pub corroboration_status: CorroborationStatus,
    pub final_prediction: Label,
    pub final_confidence: u32,
    pub explanation: String,
    pub evidence_strength: f64,
}

/// Aggregated outcome of one full pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub score: u32,
    pub prediction: Label,
    pub explanation: String,
    pub runtime_secs: f64,
    pub claims_checked: usize,
    pub details: Vec<ClaimVerdict>,
}

/// The exposed analysis answer, cache hit or fresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResponse {
    /// Confidence score, 0–100.
    pub score: u32,
    pub prediction: Label,
    pub explanation: String,
    pub article_id: String,
    pub source: CacheSource,
    pub details: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_secs: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claims_checked: Option<usize>,
}
