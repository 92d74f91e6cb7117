//! Article metadata extraction via the reasoning model.

use chrono::Utc;

use crate::claims::truncate_chars;
use crate::classifier::ArticleMetadata;
use crate::llm::ReasoningClient;

const METADATA_TEXT_LIMIT: usize = 4_000;

/// Extracts structured metadata from raw article text.
///
/// Every field has a deterministic fallback; a completely malformed reply
/// still produces usable metadata for the classifier.
pub async fn extract_metadata(llm: &dyn ReasoningClient, text: &str) -> ArticleMetadata {
    let prompt = format!(
        "Extract structured information from the following news article text. \
         Return only valid JSON with keys: title, text, author, date, source, category. \
         Rules: \
         - Infer 'title' and 'category' from the text. \
         - If 'author' or 'source' is not present, use \"Unknown\". \
         - If 'date' is missing, use today's date in YYYY-MM-DD. \
         Text: {text}"
    );

    let reply = llm.ask_structured(&prompt).await;
    let field = |key: &str| {
        reply
            .str_field(key)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    ArticleMetadata {
        title: field("title").unwrap_or_else(|| "Inferred".to_string()),
        text: field("text").unwrap_or_else(|| truncate_chars(text, METADATA_TEXT_LIMIT).to_string()),
        author: field("author").unwrap_or_else(|| "Unknown".to_string()),
        date: field("date").unwrap_or_else(|| Utc::now().format("%Y-%m-%d").to_string()),
        source: field("source").unwrap_or_else(|| "Unknown".to_string()),
        category: field("category").unwrap_or_else(|| "Inferred".to_string()),
    }
}
