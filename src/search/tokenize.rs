//! Text tokenization and stemming for fuzzy field scoring.

use ahash::AHashSet;
use rust_stemmers::Stemmer;

/// High-frequency English words that never help ranking.
const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "he", "in", "is", "it",
    "its", "of", "on", "that", "the", "to", "was", "will", "with",
];

/// Splits `text` into lowercase stemmed terms.
///
/// Words are runs of letters, so `_`, `-`, digits and punctuation all separate
/// them. A word with lower-to-upper case transitions also yields its parts:
/// `HttpServer` gives `http`, `server` and `httpserv`.
pub(crate) fn tokenize_and_stem(text: &str, stemmer: &Stemmer) -> Vec<String> {
    let mut terms = Vec::new();
    for word in text.split(|c: char| !c.is_alphabetic()).filter(|w| !w.is_empty()) {
        let parts = camel_parts(word);
        if parts.len() > 1 {
            terms.extend(parts.into_iter().filter_map(|part| stem(part, stemmer)));
        }
        terms.extend(stem(word, stemmer));
    }
    terms
}

/// `parseJsonValue` → `["parse", "Json", "Value"]`. Runs of capitals stay
/// together, so `HTTPServer` is a single part.
fn camel_parts(word: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut prev_lower = false;
    for (i, c) in word.char_indices() {
        if prev_lower && c.is_uppercase() {
            parts.push(&word[start..i]);
            start = i;
        }
        prev_lower = c.is_lowercase();
    }
    parts.push(&word[start..]);
    parts
}

fn stem(token: &str, stemmer: &Stemmer) -> Option<String> {
    let lowercase = token.to_lowercase();
    if STOP_WORDS.contains(&lowercase.as_str()) {
        return None;
    }
    Some(stemmer.stem(&lowercase).into_owned())
}

/// Distinct stemmed terms of `text`, in first-seen order.
pub(crate) fn distinct_terms(text: &str, stemmer: &Stemmer) -> Vec<String> {
    let mut seen = AHashSet::new();
    tokenize_and_stem(text, stemmer)
        .into_iter()
        .filter(|term| seen.insert(term.clone()))
        .collect()
}

/// Lowercases an identifier and drops `_`, `-` and whitespace, so that
/// `HashMap`, `hash_map` and `hash map` compare equal.
pub(crate) fn compact_identifier(text: &str) -> String {
    text.chars()
        .filter(|c| *c != '_' && *c != '-' && !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}
