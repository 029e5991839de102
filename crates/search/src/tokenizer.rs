//! Text tokenization for lexical indexing and querying
//!
//! - Lowercase
//! - Split on any char that is neither a letter nor a digit
//! - Drop tokens shorter than 2 characters
//! - Drop grammatical English stop words (domain terms are never filtered)

use once_cell::sync::Lazy;
use std::collections::HashSet;

/// Purely grammatical words: articles, conjunctions, common pronouns and
/// auxiliaries. Deliberately short; anything domain-flavored stays in.
static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "have", "he", "in",
        "is", "it", "its", "of", "on", "or", "that", "the", "to", "was", "were", "with", "this",
        "but", "they", "we", "you", "your", "my", "their", "been", "do", "does", "did",
    ]
    .into_iter()
    .collect()
});

/// Whether a normalized token is a stop word
pub fn is_stop_word(token: &str) -> bool {
    STOP_WORDS.contains(token)
}

/// Tokenize text into searchable terms
///
/// # Example
///
/// ```
/// use skald_search::tokenizer::tokenize;
///
/// let tokens = tokenize("The quick, brown Fox!");
/// assert_eq!(tokens, vec!["quick", "brown", "fox"]);
/// ```
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|s| s.chars().count() >= 2)
        .filter(|s| !is_stop_word(s))
        .map(String::from)
        .collect()
}

/// Tokenize and deduplicate, preserving first-seen order
///
/// Used for query processing where each distinct term is scored once.
pub fn tokenize_unique(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    tokenize(text)
        .into_iter()
        .filter(|t| seen.insert(t.clone()))
        .collect()
}
