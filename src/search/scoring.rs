//! Fuzzy field scoring.
//!
//! Every field score is a similarity in `[0, 1]`. The combined score is the
//! best weighted field score, so an identifier match always outranks a prose
//! match of the same edit distance.

use crate::search::tokenize::{compact_identifier, distinct_terms};
use crate::types::{DocItem, normalize_item_path};
use rapidfuzz::distance::{jaro_winkler, levenshtein};
use rust_stemmers::Stemmer;

pub const NAME_WEIGHT: f64 = 1.0;
pub const PATH_WEIGHT: f64 = 0.95;
pub const DESCRIPTION_WEIGHT: f64 = 0.8;
pub const CAPTION_WEIGHT: f64 = 0.7;

/// Minimum Jaro-Winkler similarity for a "did you mean" path suggestion.
const SUGGESTION_THRESHOLD: f64 = 0.7;

/// Query-independent keys of one stored item, computed once at insert time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchKeys {
    /// Compacted name, see [`compact_identifier`].
    pub name: String,
    /// Lowercased full path.
    pub path: String,
    pub segments: Vec<String>,
    pub description_terms: Vec<String>,
    pub caption_terms: Vec<String>,
}

impl SearchKeys {
    pub fn from_item(item: &DocItem, stemmer: &Stemmer) -> Self {
        let path = item.path.to_lowercase();
        let segments = path.split("::").map(str::to_string).collect();

        let captions = item
            .examples
            .iter()
            .filter_map(|example| example.caption.as_deref())
            .collect::<Vec<_>>()
            .join(" ");

        Self {
            name: compact_identifier(&item.name),
            path,
            segments,
            description_terms: distinct_terms(&item.description, stemmer),
            caption_terms: distinct_terms(&captions, stemmer),
        }
    }
}

/// A search query prepared once and scored against many [`SearchKeys`].
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedQuery {
    compact: String,
    path: String,
    segment_count: usize,
    terms: Vec<String>,
}

impl PreparedQuery {
    pub fn new(query: &str, stemmer: &Stemmer) -> Self {
        let path = normalize_item_path(query).to_lowercase();
        let segment_count = path.split("::").filter(|s| !s.is_empty()).count().max(1);

        Self {
            compact: compact_identifier(query),
            path,
            segment_count,
            terms: distinct_terms(query, stemmer),
        }
    }

    pub fn name_score(&self, keys: &SearchKeys) -> f64 {
        similarity(&self.compact, &keys.name)
    }

    /// Compares the query against the trailing segments of equal count and
    /// against the whole path.
    pub fn path_score(&self, keys: &SearchKeys) -> f64 {
        let whole = similarity(&self.path, &keys.path);
        if self.segment_count > keys.segments.len() {
            return whole;
        }

        let tail = keys.segments[keys.segments.len() - self.segment_count..].join("::");
        whole.max(similarity(&self.path, &tail))
    }

    pub fn description_score(&self, keys: &SearchKeys) -> f64 {
        terms_score(&self.terms, &keys.description_terms)
    }

    pub fn caption_score(&self, keys: &SearchKeys) -> f64 {
        terms_score(&self.terms, &keys.caption_terms)
    }

    /// Combined relevance of one item.
    pub fn score(&self, keys: &SearchKeys) -> f64 {
        let name = NAME_WEIGHT * self.name_score(keys);
        if name >= 1.0 {
            return 1.0;
        }

        [
            name,
            PATH_WEIGHT * self.path_score(keys),
            DESCRIPTION_WEIGHT * self.description_score(keys),
            CAPTION_WEIGHT * self.caption_score(keys),
        ]
        .into_iter()
        .fold(0.0, f64::max)
        .clamp(0.0, 1.0)
    }
}

/// Similarity of `query` to `target`: exact match, prefix and substring
/// bonuses scaled by coverage, or normalized Levenshtein similarity,
/// whichever is highest.
pub fn similarity(query: &str, target: &str) -> f64 {
    if query.is_empty() || target.is_empty() {
        return 0.0;
    }
    if query == target {
        return 1.0;
    }

    let coverage = query.chars().count() as f64 / target.chars().count() as f64;
    let edit = levenshtein::normalized_similarity(query.chars(), target.chars());

    let containment = if target.starts_with(query) {
        0.8 + 0.2 * coverage
    } else if target.contains(query) {
        0.6 + 0.2 * coverage
    } else {
        0.0
    };

    edit.max(containment)
}

/// Per query term, the best edit similarity against any field term, averaged
/// over the query terms.
fn terms_score(query_terms: &[String], field_terms: &[String]) -> f64 {
    if query_terms.is_empty() || field_terms.is_empty() {
        return 0.0;
    }

    let total: f64 = query_terms
        .iter()
        .map(|query_term| {
            field_terms
                .iter()
                .map(|term| levenshtein::normalized_similarity(query_term.chars(), term.chars()))
                .fold(0.0, f64::max)
        })
        .sum();

    total / query_terms.len() as f64
}

/// Closest paths to `path` by Jaro-Winkler similarity, best first.
pub fn suggest_paths<'a>(
    path: &str,
    candidates: impl IntoIterator<Item = &'a str>,
    limit: usize,
) -> Vec<String> {
    let needle = path.to_lowercase();
    let mut scored: Vec<(f64, &str)> = candidates
        .into_iter()
        .map(|candidate| {
            let score = jaro_winkler::similarity(needle.chars(), candidate.to_lowercase().chars());
            (score, candidate)
        })
        .filter(|(score, _)| *score >= SUGGESTION_THRESHOLD)
        .collect();

    scored.sort_by(|(a_score, a), (b_score, b)| b_score.total_cmp(a_score).then_with(|| a.cmp(b)));
    scored.dedup_by(|(_, a), (_, b)| a == b);
    scored
        .into_iter()
        .take(limit)
        .map(|(_, candidate)| candidate.to_string())
        .collect()
}
