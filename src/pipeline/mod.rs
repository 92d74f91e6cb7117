//! The evidence-fusion analysis pipeline.
//!
//! [`Engine`] is the explicitly constructed context that replaces ad-hoc
//! process globals: it owns every collaborator handle, the shared embedding
//! cache, and the domain-trust store, and is built once at startup
//! ([`Engine::new`] documents the construction order). A full run has three
//! phases (fact-check + metadata, classifier + corroboration, per-claim
//! fusion), each fanning its calls out concurrently and joining at the phase
//! boundary. Per-claim working data is independent; nothing in a phase needs
//! synchronization.

pub mod metadata;
pub mod types;

pub use types::{AnalysisReport, AnalysisResponse, ClaimVerdict, ReasoningVerdict};

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures_util::future::join_all;
use serde_json::{Value, json};
use tracing::{info, instrument};

use crate::cache::{CacheSource, TieredCache, TieredLookupResult};
use crate::claims::{repair_sentence_gaps, split_claims, truncate_chars};
use crate::classifier::{ClassifierClient, ClassifierScores, predict_or_prior};
use crate::corroborate::{Corroboration, CorroborationEngine, CorroborationStatus};
use crate::docstore::DocumentStore;
use crate::embedding::{CachedEmbedder, Embedder};
use crate::ensemble::{Label, adjusted_ensemble, aggregate};
use crate::factcheck::{FactCheckClient, FactCheckStatus, FactCheckSummary, run_fact_check};
use crate::llm::ReasoningClient;
use crate::pipeline::metadata::extract_metadata;
use crate::retry::RetryPolicy;
use crate::trust::DomainTrustStore;
use crate::vectordb::VectorIndexClient;
use crate::websearch::WebSearchClient;

const LOCAL_CONTEXT_WINDOW: usize = 2;
const LOCAL_CONTEXT_LIMIT: usize = 1_200;
const DEFAULT_REASONING_CONF: u32 = 70;

/// Collaborator handles the engine is built from.
pub struct Dependencies {
    pub llm: Arc<dyn ReasoningClient>,
    pub search: Arc<dyn WebSearchClient>,
    pub embedder: Arc<dyn Embedder>,
    pub classifier: Arc<dyn ClassifierClient>,
    pub factcheck: Arc<dyn FactCheckClient>,
    pub docstore: Arc<dyn DocumentStore>,
    pub vectors: Arc<dyn VectorIndexClient>,
}

/// The assembled pipeline context.
pub struct Engine {
    llm: Arc<dyn ReasoningClient>,
    classifier: Arc<dyn ClassifierClient>,
    factcheck: Arc<dyn FactCheckClient>,
    corroborator: CorroborationEngine,
    cache: Arc<TieredCache>,
    trust: Arc<DomainTrustStore>,
    retry: RetryPolicy,
}

impl Engine {
    /// Assembles the context. Construction order: the embedding cache wraps
    /// the raw embedder first, the trust store binds to the document store,
    /// then the corroboration engine and cache tiers share those handles.
    pub fn new(deps: Dependencies) -> Self {
        let embedder: Arc<dyn Embedder> = Arc::new(CachedEmbedder::new(deps.embedder));
        let trust = Arc::new(DomainTrustStore::new(deps.docstore.clone()));

        let corroborator = CorroborationEngine::new(
            deps.llm.clone(),
            deps.search,
            embedder.clone(),
            trust.clone(),
        );

        let cache = Arc::new(TieredCache::new(
            deps.docstore,
            deps.vectors,
            embedder,
            deps.llm.clone(),
        ));

        Self {
            llm: deps.llm,
            classifier: deps.classifier,
            factcheck: deps.factcheck,
            corroborator,
            cache,
            trust,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// The cache layer (shared with the gateway for feedback and cleanup).
    pub fn cache(&self) -> &Arc<TieredCache> {
        &self.cache
    }

    /// The domain trust store.
    pub fn trust(&self) -> &Arc<DomainTrustStore> {
        &self.trust
    }

    /// Full analysis entry point: cache tiers first, pipeline on a miss,
    /// write-back after. Always produces an answer.
    #[instrument(skip(self, url, text), fields(text_len = text.len()))]
    pub async fn analyze(&self, url: &str, text: &str) -> AnalysisResponse {
        match self.cache.lookup(url, text).await {
            TieredLookupResult::HitExact(verdict) => {
                let details = json!([{
                    "score": verdict.score,
                    "prediction": verdict.prediction,
                    "explanation": verdict.explanation,
                    "source": verdict.source,
                    "article_id": verdict.article_id,
                }]);
                Self::cached_response(verdict, details)
            }
            TieredLookupResult::HitSemanticDoc(verdict) => {
                Self::cached_response(verdict, json!([]))
            }
            TieredLookupResult::HitVector(verdict) => {
                let details = json!([{ "prediction": verdict.prediction }]);
                Self::cached_response(verdict, details)
            }
            TieredLookupResult::Miss => {
                let report = self.detect_text(text).await;
                let article_id = self
                    .cache
                    .store_result(
                        url,
                        text,
                        report.score as f64 / 100.0,
                        report.prediction,
                        &report.explanation,
                    )
                    .await;

                info!(score = report.score, prediction = %report.prediction, "fresh analysis complete");
                let details = serde_json::to_value(&report)
                    .map(|value| vec![value])
                    .unwrap_or_default();
                AnalysisResponse {
                    score: report.score,
                    prediction: report.prediction,
                    explanation: report.explanation,
                    article_id,
                    source: CacheSource::NewAnalysis,
                    details,
                    runtime_secs: Some(report.runtime_secs),
                    claims_checked: Some(report.claims_checked),
                }
            }
        }
    }

    /// Runs the three-phase pipeline without touching the cache.
    #[instrument(skip(self, text), fields(text_len = text.len()))]
    pub async fn detect_text(&self, text: &str) -> AnalysisReport {
        let started = Instant::now();
        let text = repair_sentence_gaps(text);

        // Phase 1: fact-check lookup and metadata extraction.
        let (fact_check, metadata) = tokio::join!(
            run_fact_check(self.factcheck.as_ref(), &self.retry, &text),
            extract_metadata(self.llm.as_ref(), &text),
        );

        // Phase 2: classifier and corroboration over the combined claim query.
        let claims = split_claims(&metadata.text);
        let combined_query = claims.join(" OR ");
        let (classifier_scores, corroboration) = tokio::join!(
            predict_or_prior(self.classifier.as_ref(), &self.retry, &metadata),
            self.corroborator.corroborate(std::slice::from_ref(&combined_query)),
        );

        // Phase 3: per-claim fusion, one concurrent branch per claim.
        let verdicts = join_all(claims.iter().map(|claim| {
            self.process_claim(claim, &metadata.text, &fact_check, &corroboration, classifier_scores)
        }))
        .await;

        let pairs: Vec<(Label, u32)> = verdicts
            .iter()
            .map(|v| (v.final_prediction, v.final_confidence))
            .collect();
        let (prediction, score) = aggregate(&pairs).unwrap_or((Label::Unknown, 50));

        let explanation = verdicts
            .iter()
            .take(3)
            .map(|v| v.explanation.as_str())
            .collect::<Vec<_>>()
            .join(" | ");

        AnalysisReport {
            score,
            prediction,
            explanation,
            runtime_secs: started.elapsed().as_secs_f64(),
            claims_checked: verdicts.len(),
            details: verdicts,
        }
    }

    async fn process_claim(
        &self,
        claim: &str,
        full_text: &str,
        fact_check: &FactCheckSummary,
        corroboration: &Corroboration,
        classifier_scores: ClassifierScores,
    ) -> ClaimVerdict {
        // No grounding signal at all: answer Unknown without burning a
        // reasoning call.
        if corroboration.status == CorroborationStatus::NoResults
            && fact_check.status == FactCheckStatus::NoFactChecks
        {
            let reasoning = ReasoningVerdict {
                prediction: Label::Unknown,
                confidence: 60,
            };

            return ClaimVerdict {
                claim_text: claim.to_string(),
                reasoning,
                classifier: classifier_scores,
                fact_check: fact_check.clone(),
                corroboration_status: corroboration.status,
                final_prediction: Label::Unknown,
                final_confidence: 60,
                explanation: "Unknown: 60% | evidence=0".to_string(),
                evidence_strength: 0.0,
            };
        }

        let prompt = claim_prompt(claim, full_text, fact_check, corroboration);
        let reply = self.llm.ask_structured(&prompt).await;

        let reasoning = ReasoningVerdict {
            prediction: reply
                .str_field("prediction")
                .and_then(Label::parse)
                .unwrap_or(Label::Unknown),
            confidence: reply
                .int_field("confidence")
                .map(|c| c.clamp(0, 100) as u32)
                .unwrap_or(DEFAULT_REASONING_CONF),
        };

        let evidence_strength = corroboration.evidence_strength();

        // The triage path: non-factual content bypasses the ensemble.
        let (final_prediction, final_confidence) =
            if reasoning.prediction == Label::NotApplicable {
                (Label::NotApplicable, reasoning.confidence)
            } else {
                adjusted_ensemble(
                    reasoning.prediction,
                    reasoning.confidence,
                    classifier_scores,
                    fact_check.status,
                    corroboration.status,
                    evidence_strength,
                )
            };

        let explanation = match reply.str_field("explanation") {
            Some(explanation) if !explanation.is_empty() && !explanation.contains('{') => {
                explanation.to_string()
            }
            _ => format!("{final_prediction}: {final_confidence}% | evidence={evidence_strength}"),
        };

        ClaimVerdict {
            claim_text: claim.to_string(),
            reasoning,
            classifier: classifier_scores,
            fact_check: fact_check.clone(),
            corroboration_status: corroboration.status,
            final_prediction,
            final_confidence,
            explanation,
            evidence_strength,
        }
    }

    /// Fast first impression: one reasoning call, no verdict, no score.
    pub async fn quick_assessment(&self, text: &str) -> Value {
        let today = Utc::now().format("%B %d, %Y");
        let prompt = format!(
            "You are assisting in misinformation detection, but this is a quick initial \
             impression. DO NOT claim anything is true or false and DO NOT assign confidence \
             or numeric scores.\n\n\
             Provide a short paragraph (3-5 sentences max) summarizing:\n\
             - What type of content this text appears to be (news, opinion, speculation)\n\
             - Whether it sounds factual or sensational\n\
             - Whether anything seems unverifiable at first glance\n\
             - Ask the user to wait for full fact-check and verification\n\
             - Assume that the date is {today}\n\n\
             Never assert factual accuracy.\n\nText to evaluate:\n\"\"\"{text}\"\"\""
        );

        let reply = self.llm.ask_structured(&prompt).await;
        if reply.raw_text.trim().is_empty() {
            json!({
                "status": "error",
                "initial_analysis": "Could not analyze text.",
            })
        } else {
            json!({
                "status": "ok",
                "initial_analysis": reply.raw_text.trim(),
            })
        }
    }

    fn cached_response(verdict: crate::cache::CachedVerdict, details: Value) -> AnalysisResponse {
        let details = details.as_array().cloned().unwrap_or_default();
        AnalysisResponse {
            score: ((verdict.score * 100.0).round() as u32).min(100),
            prediction: verdict.prediction,
            explanation: verdict.explanation,
            article_id: verdict.article_id,
            source: verdict.source,
            details,
            runtime_secs: None,
            claims_checked: None,
        }
    }
}

/// ±2 sentences of context around the claim's position in the full text.
fn local_context(claim: &str, full_text: &str) -> String {
    let sentences = crate::claims::split_sentences(full_text);
    if sentences.is_empty() {
        return String::new();
    }

    let probe: String = claim
        .trim()
        .chars()
        .take(30)
        .collect::<String>()
        .to_lowercase();
    let best_idx = sentences
        .iter()
        .position(|s| s.to_lowercase().contains(&probe))
        .unwrap_or(0);

    let start = best_idx.saturating_sub(LOCAL_CONTEXT_WINDOW);
    let end = (best_idx + LOCAL_CONTEXT_WINDOW + 1).min(sentences.len());
    let joined = sentences[start..end].join(" ");
    truncate_chars(&joined, LOCAL_CONTEXT_LIMIT).to_string()
}

/// The per-claim synthesis prompt: context, evidence, fact-check summary,
/// content-type triage, and the strict JSON verdict contract.
fn claim_prompt(
    claim: &str,
    full_text: &str,
    fact_check: &FactCheckSummary,
    corroboration: &Corroboration,
) -> String {
    let today = Utc::now().format("%B %d, %Y");
    let context = local_context(claim, full_text);
    let context_part = if context.is_empty() {
        String::new()
    } else {
        format!("The claim appears in the following context:\n\"\"\"{context}\"\"\"\n\n")
    };

    let fact_checks_str = if fact_check.records.is_empty() {
        "No professional fact-checks found for this specific claim.".to_string()
    } else {
        fact_check
            .records
            .iter()
            .take(3)
            .map(|r| {
                format!(
                    "- {}: \"{}\" ({:?}) - {}",
                    r.publisher,
                    r.rating,
                    r.rating_category,
                    truncate_chars(&r.claim, 100)
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    let evidence_json = serde_json::to_string(
        &corroboration.evidence.iter().take(5).collect::<Vec<_>>(),
    )
    .unwrap_or_else(|_| "[]".to_string());
    let status_json =
        serde_json::to_string(&fact_check.status).unwrap_or_default();
    let corroboration_json =
        serde_json::to_string(&corroboration.status).unwrap_or_default();

    format!(
        "You are an AI fact-checking assistant synthesizing ML predictions, search evidence, \
         and professional fact-checks.\n\n\
         {context_part}\
         Input claim: \"\"\"{claim}\"\"\"\n\
         Corroboration status: {corroboration_json}\n\
         Evidence snippets: {evidence_json}\n\
         Fact-Check Status: {status_json}\n\
         Fact-Check Summary:\n{fact_checks_str}\n\
            - Total fact-checks: {total}\n\
            - Rated FALSE: {false_count} | TRUE: {true_count} | MIXED: {mixed_count}\n\
         Today's date: {today}\n\n\
         FIRST, ASSESS THE CONTENT TYPE:\n\
         Determine if this text contains VERIFIABLE FACTUAL CLAIMS that require fact-checking.\n\
         Non-factual content (personal experiences, opinions, questions, creative content, \
         instructions, promotional content, greetings) does not.\n\n\
         IF NON-FACTUAL CONTENT DETECTED, return JSON with:\n\
         - prediction: \"Not Applicable\"\n\
         - confidence: 100\n\
         - explanation: short description of the content type\n\n\
         IF FACTUAL CONTENT DETECTED, proceed with full analysis:\n\
         - Prioritize fact-check consensus if available.\n\
         - Use evidence snippets to verify factual accuracy.\n\
         - Evaluate the claim considering today's date ({today}); old news may be accurate \
           but outdated, and satire should be rated Misleading.\n\n\
         Return a strict JSON object with keys:\n\
         - prediction: \"Real\", \"Fake\", or \"Misleading\"\n\
         - confidence: integer 0-100\n\
         - explanation: 1-2 short plain sentences, use \"|\" to separate reasoning steps\n\n\
         Return ONLY valid JSON. No additional text.",
        total = fact_check.total,
        false_count = fact_check.false_count,
        true_count = fact_check.true_count,
        mixed_count = fact_check.mixed_count,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factcheck::summarize;

    #[test]
    fn local_context_centers_on_claim() {
        let text = "One. Two. The claim sentence lives here in the middle. Four. Five. Six.";
        let context = local_context("The claim sentence lives here", text);
        assert!(context.contains("One."));
        assert!(context.contains("Five."));
        assert!(!context.contains("Six."));
    }

    #[test]
    fn local_context_is_bounded() {
        let sentence = format!("{}. ", "w".repeat(900));
        let text = sentence.repeat(5);
        let context = local_context(&sentence, &text);
        assert!(context.chars().count() <= 1_200);
    }

    #[test]
    fn claim_prompt_mentions_missing_fact_checks() {
        let fact_check = summarize(&[]);
        let prompt = claim_prompt(
            "Some claim",
            "Some claim in text.",
            &fact_check,
            &Corroboration::empty(),
        );
        assert!(prompt.contains("No professional fact-checks found"));
        assert!(prompt.contains("\"no_results\""));
    }
}
