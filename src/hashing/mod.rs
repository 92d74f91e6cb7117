//! Content hashing and text normalization.
//!
//! Article identity is content-addressed: the exact id hashes `url + text`
//! verbatim, the normalized id hashes the casefolded, punctuation-stripped
//! form so trivially reformatted copies of the same text collapse to one id.

use blake3::Hasher;

/// Stable article id for a `(url, text)` pair (hex-encoded BLAKE3).
#[inline]
pub fn article_id(url: &str, text: &str) -> String {
    let mut hasher = Hasher::new();
    hasher.update(url.as_bytes());
    hasher.update(text.as_bytes());
    hasher.finalize().to_hex().to_string()
}

/// Article id that ignores punctuation and formatting differences.
#[inline]
pub fn normalized_article_id(url: &str, text: &str) -> String {
    let norm_url = url.to_lowercase();
    let norm_text = normalize_text(text);

    let mut hasher = Hasher::new();
    hasher.update(norm_url.as_bytes());
    hasher.update(norm_text.as_bytes());
    hasher.finalize().to_hex().to_string()
}

/// Lowercases, strips symbols, and collapses runs of whitespace.
pub fn normalize_text(text: &str) -> String {
    let replaced: String = text
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '_' {
                c
            } else {
                ' '
            }
        })
        .collect();

    replaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Computes a 64-bit BLAKE3 hash, truncated from 256 bits.
///
/// Used for in-memory cache keys only; a collision degrades to a cache miss,
/// never to data corruption.
#[inline]
pub fn hash_to_u64(data: &[u8]) -> u64 {
    let hash = blake3::hash(data);
    let bytes: [u8; 8] = hash.as_bytes()[0..8]
        .try_into()
        .expect("BLAKE3 always produces at least 8 bytes");
    u64::from_le_bytes(bytes)
}

/// Anonymizes a user fingerprint to a short stable token.
#[inline]
pub fn anon_user_id(fingerprint: &str) -> String {
    blake3::hash(fingerprint.as_bytes()).to_hex()[..16].to_string()
}
