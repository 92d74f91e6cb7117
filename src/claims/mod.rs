//! Claim extraction from raw input text.
//!
//! A claim is a checkable sentence of the input. Extraction keeps at most
//! [`MAX_CLAIMS`] sentences of at least [`CLAIM_MIN_LEN`] characters, in
//! input order. When nothing qualifies, the head of the text becomes a
//! single pseudo-claim so downstream stages always have something to score.

use std::sync::LazyLock;

use regex::Regex;

use crate::constants::{CLAIM_MIN_LEN, MAX_CLAIMS, PSEUDO_CLAIM_LEN};

static GLUED_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([a-zA-Z])\.([A-Z])").expect("valid regex"));

static SENTENCE_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]\s+").expect("valid regex"));

/// Re-inserts the space after periods that got glued to the next sentence
/// (`"sea level.Scientists"` → `"sea level. Scientists"`).
pub fn repair_sentence_gaps(text: &str) -> String {
    GLUED_BOUNDARY.replace_all(text, "$1. $2").into_owned()
}

/// Splits `text` into sentences, keeping terminal punctuation.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    let mut sentences = Vec::new();
    let mut start = 0;
    for boundary in SENTENCE_END.find_iter(trimmed) {
        // boundary starts at the punctuation char; keep it with the sentence
        let end = boundary.start() + 1;
        let sentence = trimmed[start..end].trim();
        if !sentence.is_empty() {
            sentences.push(sentence);
        }
        start = boundary.end();
    }

    let tail = trimmed[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail);
    }

    sentences
}

/// Extracts up to [`MAX_CLAIMS`] checkable claims from `text`.
///
/// Returns an empty list only for blank input.
pub fn split_claims(text: &str) -> Vec<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    let claims: Vec<String> = split_sentences(trimmed)
        .into_iter()
        .filter(|s| s.chars().count() >= CLAIM_MIN_LEN)
        .take(MAX_CLAIMS)
        .map(str::to_string)
        .collect();

    if claims.is_empty() {
        vec![truncate_chars(trimmed, PSEUDO_CLAIM_LEN).to_string()]
    } else {
        claims
    }
}

/// Picks the sentence best suited as a fact-check query: the longest one
/// between 5 and 20 words, falling back to the first 100 characters.
pub fn longest_query_sentence(text: &str) -> String {
    split_sentences(text)
        .into_iter()
        .filter(|s| {
            let words = s.split_whitespace().count();
            (5..=20).contains(&words)
        })
        .max_by_key(|s| s.chars().count())
        .map(str::to_string)
        .unwrap_or_else(|| truncate_chars(text.trim(), 100).to_string())
}

/// Truncates to at most `max_chars` characters, never splitting a char.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repairs_glued_boundaries() {
        assert_eq!(
            repair_sentence_gaps("at sea level.Scientists agree"),
            "at sea level. Scientists agree"
        );
        assert_eq!(repair_sentence_gaps("v1.2 release"), "v1.2 release");
    }

    #[test]
    fn splits_on_terminal_punctuation() {
        let sentences = split_sentences("First one. Second one! Third?");
        assert_eq!(sentences, vec!["First one.", "Second one!", "Third?"]);
    }

    #[test]
    fn keeps_qualifying_sentences_in_order() {
        let text = "Scientists confirm water boils at 100C at sea level. \
                    Short. \
                    The measurement has been replicated in hundreds of laboratories.";
        let claims = split_claims(text);
        assert_eq!(claims.len(), 2);
        assert!(claims[0].starts_with("Scientists confirm"));
        assert!(claims[1].starts_with("The measurement"));
    }

    #[test]
    fn caps_at_three_claims() {
        let long = "This sentence is long enough to qualify as claim number one here. ";
        let text = long.repeat(5);
        assert_eq!(split_claims(&text).len(), 3);
    }

    #[test]
    fn falls_back_to_pseudo_claim() {
        let claims = split_claims("Too short. Tiny! No?");
        assert_eq!(claims.len(), 1);
        assert_eq!(claims[0], "Too short. Tiny! No?");
    }

    #[test]
    fn pseudo_claim_is_bounded() {
        let text = "x".repeat(2_000);
        let claims = split_claims(&text);
        assert_eq!(claims.len(), 1);
        assert_eq!(claims[0].chars().count(), 500);
    }

    #[test]
    fn blank_input_yields_no_claims() {
        assert!(split_claims("   ").is_empty());
    }

    #[test]
    fn query_sentence_prefers_mid_length() {
        let text = "No. \
                    The government announced a brand new infrastructure plan yesterday. \
                    This extremely long sentence keeps going and going well past the twenty word ceiling so it can never be selected as the refined query at all.";
        let query = longest_query_sentence(text);
        assert!(query.starts_with("The government announced"));
    }

    #[test]
    fn query_sentence_fallback_is_bounded() {
        let text = "word ".repeat(60);
        let query = longest_query_sentence(&text);
        assert!(query.chars().count() <= 100);
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }
}
