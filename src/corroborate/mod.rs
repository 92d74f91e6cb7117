//! Corroboration engine: web evidence for each claim.
//!
//! For every claim the engine asks the reasoning model for meaning-preserving
//! reformulations and a compressed search query (both defensively parsed),
//! fans the merged queries out to the web-search collaborator, has the
//! reasoning model judge each result set against its claim, and scores the
//! retained evidence by semantic similarity and domain trust. High-scoring
//! evidence casts batched domain-trust votes.

pub mod types;

pub use types::{Corroboration, CorroborationStatus, Evidence, Relevance, composite_score};

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::future::join_all;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::claims::truncate_chars;
use crate::constants::{
    MAX_EVIDENCE_PER_CLAIM, MAX_JUDGED_ARTICLES, SEARCH_RESULTS_PER_QUERY, TRUST_VOTE_THRESHOLD,
};
use crate::embedding::{Embedder, cosine_similarity};
use crate::llm::ReasoningClient;
use crate::trust::{DomainTrustStore, domain_from_url};
use crate::websearch::{SearchHit, WebSearchClient};

const MAX_REFORMULATIONS: usize = 6;
const MERGED_REFORMULATIONS: usize = 4;
const MIN_SNIPPET_LEN: usize = 20;
const SNIPPET_TRUNCATE: usize = 350;
const MIN_SUMMARY_LEN: usize = 10;

/// Runs the corroboration pass. Holds shared collaborator handles; per-claim
/// working data stays on the stack of each future.
pub struct CorroborationEngine {
    llm: Arc<dyn ReasoningClient>,
    search: Arc<dyn WebSearchClient>,
    embedder: Arc<dyn Embedder>,
    trust: Arc<DomainTrustStore>,
}

impl CorroborationEngine {
    pub fn new(
        llm: Arc<dyn ReasoningClient>,
        search: Arc<dyn WebSearchClient>,
        embedder: Arc<dyn Embedder>,
        trust: Arc<DomainTrustStore>,
    ) -> Self {
        Self {
            llm,
            search,
            embedder,
            trust,
        }
    }

    /// Gathers and scores evidence for all claims.
    #[instrument(skip(self, claims), fields(claims = claims.len()))]
    pub async fn corroborate(&self, claims: &[String]) -> Corroboration {
        if claims.is_empty() {
            return Corroboration::empty();
        }

        // Stage 1: reformulations and compressed queries, all claims at once.
        let prompts = join_all(claims.iter().map(|claim| async move {
            let (reformulations, summary) =
                tokio::join!(self.reformulate(claim), self.compress_query(claim));
            build_query(claim, &summary, &reformulations)
        }))
        .await;

        // Stage 2: search fan-out.
        let result_sets = join_all(
            prompts
                .iter()
                .map(|query| self.search.search(query, SEARCH_RESULTS_PER_QUERY)),
        )
        .await;

        // Stage 3: judge and score each claim's results.
        let snapshot = self.trust.snapshot().await;
        let scored = join_all(
            claims
                .iter()
                .zip(result_sets)
                .map(|(claim, hits)| self.judge_and_score(claim, hits)),
        )
        .await;

        let mut evidence = Vec::new();
        let mut votes: HashMap<String, f64> = HashMap::new();
        for (mut claim_evidence, claim_votes) in scored {
            for item in &mut claim_evidence {
                if let Some(domain) = domain_from_url(&item.link) {
                    item.is_new_domain = !snapshot.is_known(&domain);
                }
            }
            evidence.extend(claim_evidence);
            votes.extend(claim_votes);
        }

        if !votes.is_empty()
            && let Err(err) = self.trust.apply_votes(votes).await
        {
            warn!(%err, "domain trust update failed");
        }

        Corroboration {
            status: Corroboration::status_for(evidence.len()),
            evidence,
        }
    }

    /// Asks for 3–6 meaning-preserving reformulations of the claim.
    async fn reformulate(&self, claim: &str) -> Vec<String> {
        let prompt = format!(
            "Rewrite this claim into 3-6 alternative formulations that preserve meaning.\n\
             Each reformulation should be concise, factual, and under 25 words.\n\
             Return ONLY a JSON array of strings.\n\nText: {claim}"
        );

        let reply = self.llm.ask_structured(&prompt).await;
        let variations: Vec<String> = match reply.parsed() {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            // Some models wrap the array in an object key.
            Some(Value::Object(map)) => ["rewrites", "summaries", "sentences"]
                .iter()
                .find_map(|key| map.get(*key))
                .and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            _ => Vec::new(),
        };

        variations
            .into_iter()
            .map(|v| v.trim().to_string())
            .filter(|v| v.chars().count() > 5)
            .take(MAX_REFORMULATIONS)
            .collect()
    }

    /// Asks for one compressed search query for the claim.
    async fn compress_query(&self, claim: &str) -> String {
        let prompt = format!(
            "Rewrite this as a concise web search query (5-10 words).\n\
             Return ONLY the query text, no JSON, no quotes, no explanation.\n\nText: {claim}"
        );

        let reply = self.llm.ask_structured(&prompt).await;

        if let Some(parsed) = reply.parsed() {
            match parsed {
                Value::String(s) => return truncate_chars(s.trim(), 150).to_string(),
                Value::Object(map) => {
                    if let Some(query) = map
                        .get("query")
                        .or_else(|| map.get("summary"))
                        .and_then(Value::as_str)
                        && !query.trim().is_empty()
                    {
                        return truncate_chars(query.trim(), 150).to_string();
                    }
                }
                _ => {}
            }
        }

        let raw = reply.raw_text.trim();
        if !raw.is_empty() {
            let cleaned: String = raw.chars().filter(|c| !"{}\":".contains(*c)).collect();
            let cleaned = cleaned.trim();
            if cleaned.chars().count() >= MIN_SUMMARY_LEN {
                return truncate_chars(cleaned, 150).to_string();
            }
        }

        truncate_chars(claim, 100).to_string()
    }

    /// Judges one claim's search hits and scores retained evidence.
    /// Returns the top evidence and the domain-trust votes it cast.
    async fn judge_and_score(
        &self,
        claim: &str,
        hits: Vec<SearchHit>,
    ) -> (Vec<Evidence>, HashMap<String, f64>) {
        if hits.is_empty() {
            debug!(claim = truncate_chars(claim, 60), "no search hits for claim");
            return (Vec::new(), HashMap::new());
        }

        let articles: Vec<SearchHit> = hits
            .into_iter()
            .filter_map(|hit| {
                let snippet = unescape_html(hit.snippet.trim());
                if snippet.chars().count() < MIN_SNIPPET_LEN {
                    return None;
                }
                Some(SearchHit {
                    title: if hit.title.is_empty() {
                        "No title".to_string()
                    } else {
                        hit.title
                    },
                    snippet: truncate_chars(&snippet, SNIPPET_TRUNCATE).to_string(),
                    link: hit.link,
                })
            })
            .take(MAX_JUDGED_ARTICLES)
            .collect();

        if articles.is_empty() {
            return (Vec::new(), HashMap::new());
        }

        let prompt = judge_prompt(claim, &articles);
        let reply = self.llm.ask_structured(&prompt).await;
        let evaluated = reply
            .parsed()
            .and_then(|v| v.get("evaluated"))
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let mut evidence = Vec::new();
        let mut votes = HashMap::new();

        for item in evaluated {
            let relevance = match item.get("relevance").and_then(Value::as_str) {
                Some("supports") => Relevance::Supports,
                Some("contradicts") => Relevance::Contradicts,
                _ => continue,
            };

            let link = item
                .get("link")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let snippet = articles
                .iter()
                .find(|a| a.link == link)
                .map(|a| a.snippet.clone())
                .unwrap_or_default();

            let similarity = self.similarity(claim, &snippet).await;
            let domain_score = self.trust.score_for_url(&link).await;
            let evidence_score = composite_score(similarity, domain_score);

            if evidence_score > TRUST_VOTE_THRESHOLD
                && let Some(domain) = domain_from_url(&link)
            {
                votes.insert(domain, evidence_score);
            }

            evidence.push(Evidence {
                title: item
                    .get("title")
                    .and_then(Value::as_str)
                    .unwrap_or("No title")
                    .to_string(),
                link,
                snippet,
                similarity: (similarity * 1000.0).round() / 1000.0,
                domain_score,
                evidence_score,
                is_new_domain: false, // filled in by the caller from the snapshot
                relevance,
                confidence: item
                    .get("confidence")
                    .and_then(Value::as_u64)
                    .unwrap_or(50)
                    .min(100) as u32,
            });
        }

        evidence.sort_by(|a, b| {
            b.evidence_score
                .partial_cmp(&a.evidence_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        evidence.truncate(MAX_EVIDENCE_PER_CLAIM);

        (evidence, votes)
    }

    async fn similarity(&self, claim: &str, snippet: &str) -> f64 {
        if snippet.is_empty() {
            return 0.0;
        }

        let (claim_emb, snippet_emb) =
            tokio::join!(self.embedder.embed(claim), self.embedder.embed(snippet));
        match (claim_emb, snippet_emb) {
            (Ok(a), Ok(b)) => cosine_similarity(&a, &b).clamp(0.0, 1.0) as f64,
            (Err(err), _) | (_, Err(err)) => {
                warn!(%err, "embedding failed while scoring evidence");
                0.0
            }
        }
    }
}

/// Merges the compressed summary and reformulation keywords into one query.
pub fn build_query(claim: &str, summary: &str, reformulations: &[String]) -> String {
    let summary = if summary.chars().count() < MIN_SUMMARY_LEN
        || summary.contains('{')
        || summary.to_lowercase().contains("error")
    {
        truncate_chars(claim, 120)
    } else {
        summary
    };

    if reformulations.is_empty() {
        return summary.to_string();
    }

    let keywords = reformulations
        .iter()
        .take(MERGED_REFORMULATIONS)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" ");

    if summary.to_lowercase().contains(&keywords.to_lowercase()) {
        summary.to_string()
    } else {
        format!("{summary} {keywords}")
    }
}

fn judge_prompt(claim: &str, articles: &[SearchHit]) -> String {
    let articles_json = serde_json::to_string_pretty(articles).unwrap_or_else(|_| "[]".to_string());
    format!(
        "You evaluate whether news articles support a claim.\n\n\
         CLAIM: \"{claim}\"\n\n\
         ARTICLES:\n{articles_json}\n\
         Also take into account the date of posting of the article; dismiss older articles \
         if a newer claim says the opposite.\n\
         Return STRICT JSON ONLY:\n\n\
         {{\n \"evaluated\": [\n   {{\n     \"title\": \"...\",\n     \"link\": \"...\",\n     \
         \"relevance\": \"supports\" | \"contradicts\" | \"unrelated\",\n     \
         \"confidence\": 0-100\n   }}\n ]\n}}"
    )
}

fn unescape_html(text: &str) -> String {
    text.replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}
