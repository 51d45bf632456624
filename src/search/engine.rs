//! Ranked fuzzy search over stored scopes.

use super::scoring::PreparedQuery;
use crate::config::ServerConfig;
use crate::error::{DocsError, Result};
use crate::normalize::docs::first_sentence;
use crate::store::{DocStore, IndexedItem, ScopeFilter};
use crate::types::{MatchType, SearchOutcome, SearchResult};
use rust_stemmers::{Algorithm, Stemmer};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// How far below the threshold the relaxed pass reaches.
pub const RELAXED_MARGIN: f64 = 0.2;

const SNIPPET_MAX_CHARS: usize = 160;

/// The time budget is checked once per this many scored candidates.
const BUDGET_CHECK_INTERVAL: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchOptions {
    pub threshold: f64,
    pub max_scan_candidates: usize,
    pub time_budget: Duration,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self::from_config(&ServerConfig::default())
    }
}

impl SearchOptions {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            threshold: config.fuzzy_match_threshold,
            max_scan_candidates: config.max_scan_candidates,
            time_budget: config.search_time_budget(),
        }
    }

    fn relaxed_threshold(&self) -> f64 {
        (self.threshold - RELAXED_MARGIN).max(0.0)
    }
}

pub struct SearchEngine {
    store: Arc<DocStore>,
    options: SearchOptions,
    stemmer: Stemmer,
}

impl SearchEngine {
    pub fn new(store: Arc<DocStore>, options: SearchOptions) -> Self {
        Self {
            store,
            options,
            stemmer: Stemmer::create(Algorithm::English),
        }
    }

    pub const fn options(&self) -> &SearchOptions {
        &self.options
    }

    /// Ranks the items selected by `filter` against `query`.
    ///
    /// Results clearing the threshold are `matched`. When none do, candidates
    /// within [`RELAXED_MARGIN`] below it are returned as `suggested`.
    pub fn search(
        &self,
        query: &str,
        filter: &ScopeFilter,
        max_results: usize,
    ) -> Result<SearchOutcome> {
        let query = query.trim();
        if query.is_empty() {
            return Err(DocsError::search("query must not be empty"));
        }
        if max_results == 0 {
            return Err(DocsError::search("max_results must be at least 1"));
        }

        let items = self.store.scan(filter)?;
        if items.is_empty() {
            return Ok(SearchOutcome::empty());
        }

        let prepared = PreparedQuery::new(query, &self.stemmer);
        let floor = self.options.relaxed_threshold();
        let start = Instant::now();

        let mut scanned = 0;
        let mut candidates: Vec<(f64, &Arc<IndexedItem>)> = Vec::new();
        for indexed in items.iter() {
            if scanned >= self.options.max_scan_candidates {
                tracing::warn!(
                    query,
                    scanned,
                    total = items.len(),
                    "Search stopped at the candidate cap"
                );
                break;
            }
            if scanned % BUDGET_CHECK_INTERVAL == 0 && start.elapsed() > self.options.time_budget {
                tracing::warn!(
                    query,
                    scanned,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Search stopped at the time budget"
                );
                break;
            }
            scanned += 1;

            let score = prepared.score(&indexed.keys);
            if score >= floor {
                candidates.push((score, indexed));
            }
        }

        let matched = candidates
            .iter()
            .any(|(score, _)| *score >= self.options.threshold);
        let match_type = if matched {
            candidates.retain(|(score, _)| *score >= self.options.threshold);
            MatchType::Matched
        } else {
            MatchType::Suggested
        };

        candidates.sort_by(|(a_score, a), (b_score, b)| {
            b_score
                .total_cmp(a_score)
                .then_with(|| a.item.path.cmp(&b.item.path))
                .then_with(|| a.item.crate_name.cmp(&b.item.crate_name))
                .then_with(|| a.item.version.cmp(&b.item.version))
        });
        candidates.truncate(max_results);

        tracing::debug!(
            query,
            scanned,
            results = candidates.len(),
            ?match_type,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Search finished"
        );

        Ok(SearchOutcome {
            match_type,
            results: candidates
                .into_iter()
                .map(|(score, indexed)| to_result(score, indexed))
                .collect(),
        })
    }
}

fn to_result(score: f64, indexed: &IndexedItem) -> SearchResult {
    let item = &indexed.item;
    SearchResult {
        item_path: item.path.clone(),
        name: item.name.clone(),
        kind: item.kind,
        snippet: snippet(indexed),
        relevance_score: score,
        crate_name: item.crate_name.clone(),
        version: item.version.clone(),
    }
}

/// First sentence of the description, else the signature, else kind and path.
fn snippet(indexed: &IndexedItem) -> String {
    let item = &indexed.item;
    let sentence = first_sentence(&item.description, SNIPPET_MAX_CHARS);
    if !sentence.is_empty() {
        return sentence;
    }
    match &item.signature {
        Some(signature) => signature.clone(),
        None => format!("{} {}", item.kind, item.path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DocItem, ItemKind, ScopeKey};
    use assert2::{check, let_assert};

    fn engine_with(items: &[(&str, &str, ItemKind, &str)]) -> SearchEngine {
        let store = Arc::new(DocStore::in_memory());
        let mut by_scope: std::collections::BTreeMap<ScopeKey, Vec<DocItem>> = Default::default();
        for (crate_name, path, kind, description) in items {
            let scope = ScopeKey::new(crate_name, "1.0.0");
            let mut item = DocItem::new(&scope, *path, *kind);
            item.description = description.to_string();
            by_scope.entry(scope).or_default().push(item);
        }
        for (scope, items) in by_scope {
            store.replace_scope(&scope, items).unwrap();
        }
        SearchEngine::new(store, SearchOptions::default())
    }

    #[test]
    fn empty_query_is_rejected() {
        let engine = engine_with(&[]);
        let_assert!(Err(DocsError::Search { .. }) = engine.search("  ", &ScopeFilter::all(), 5));
    }

    #[test]
    fn zero_max_results_is_rejected() {
        let engine = engine_with(&[]);
        let_assert!(Err(DocsError::Search { .. }) = engine.search("vec", &ScopeFilter::all(), 0));
    }

    #[test]
    fn empty_store_yields_empty_outcome() {
        let engine = engine_with(&[]);
        let outcome = engine.search("vec", &ScopeFilter::all(), 5).unwrap();
        check!(outcome.results.is_empty());
        check!(outcome.match_type == MatchType::Matched);
    }

    #[test]
    fn ties_are_broken_by_path() {
        let engine = engine_with(&[
            ("demo", "demo::b::parse", ItemKind::Function, ""),
            ("demo", "demo::a::parse", ItemKind::Function, ""),
        ]);
        let outcome = engine.search("parse", &ScopeFilter::for_crate("demo"), 5).unwrap();
        let paths: Vec<_> = outcome.results.iter().map(|r| r.item_path.as_str()).collect();
        check!(paths == vec!["demo::a::parse", "demo::b::parse"]);
    }

    #[test]
    fn results_are_truncated() {
        let engine = engine_with(&[
            ("demo", "demo::parse", ItemKind::Function, ""),
            ("demo", "demo::parser", ItemKind::Function, ""),
            ("demo", "demo::parsed", ItemKind::Function, ""),
        ]);
        let outcome = engine.search("parse", &ScopeFilter::all(), 2).unwrap();
        check!(outcome.results.len() == 2);
        check!(outcome.results[0].item_path == "demo::parse");
    }

    #[test]
    fn near_misses_are_suggested() {
        let engine = engine_with(&[("demo", "demo::serialize", ItemKind::Function, "")]);
        let outcome = engine.search("serialise_all", &ScopeFilter::all(), 5).unwrap();

        check!(outcome.match_type == MatchType::Suggested);
        check!(outcome.results.len() == 1);
        check!(outcome.results[0].relevance_score < 0.7);
    }

    #[test]
    fn unrelated_query_returns_nothing() {
        let engine = engine_with(&[("demo", "demo::add", ItemKind::Function, "Adds numbers.")]);
        let outcome = engine.search("zzzzzzzz", &ScopeFilter::all(), 5).unwrap();
        check!(outcome.results.is_empty());
    }

    #[test]
    fn candidate_cap_bounds_the_scan() {
        let store = Arc::new(DocStore::in_memory());
        let scope = ScopeKey::new("demo", "1.0.0");
        store
            .replace_scope(
                &scope,
                vec![
                    DocItem::new(&scope, "demo::alpha", ItemKind::Function),
                    DocItem::new(&scope, "demo::zeta", ItemKind::Function),
                ],
            )
            .unwrap();
        let engine = SearchEngine::new(
            store,
            SearchOptions {
                max_scan_candidates: 1,
                ..SearchOptions::default()
            },
        );

        let outcome = engine.search("zeta", &ScopeFilter::all(), 5).unwrap();
        check!(outcome.results.iter().all(|r| r.item_path != "demo::zeta"));
    }

    #[test]
    fn snippet_falls_back_to_signature_then_kind() {
        let scope = ScopeKey::new("demo", "1.0.0");
        let mut with_signature = DocItem::new(&scope, "demo::add", ItemKind::Function);
        with_signature.signature = Some("fn add(a: i32, b: i32) -> i32".to_string());
        let bare = DocItem::new(&scope, "demo::inner", ItemKind::Module);

        let indexed = |item: DocItem| IndexedItem {
            item,
            keys: Default::default(),
        };
        check!(snippet(&indexed(with_signature)) == "fn add(a: i32, b: i32) -> i32");
        check!(snippet(&indexed(bare)) == "module demo::inner");
    }
}
