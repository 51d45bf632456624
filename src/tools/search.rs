//! `search_rust_docs`: ranked fuzzy search across stored scopes.

use super::{DocState, default_true};
use crate::error::{DocsError, Result};
use crate::store::ScopeFilter;
use crate::types::{MatchType, SearchResult};
use rmcp::schemars;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Deserialize, schemars::JsonSchema)]
pub struct SearchRequest {
    /// Item name, path fragment (e.g. `vec::push`) or words from its documentation
    pub query: String,
    /// Only search this crate (any stored version)
    #[serde(default, rename = "crate")]
    pub crate_name: Option<String>,
    /// Maximum number of results (default: 5, capped by the server configuration)
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    /// Also search the standard library, alongside `crate` when one is given (default: true)
    #[serde(default = "default_true")]
    pub include_std: bool,
}

const fn default_max_results() -> usize {
    5
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            crate_name: None,
            max_results: default_max_results(),
            include_std: true,
        }
    }

    fn filter(&self) -> ScopeFilter {
        match self.crate_name.as_deref().map(str::trim).filter(|name| !name.is_empty()) {
            Some(name) => ScopeFilter::for_crate(name).include_std(self.include_std),
            None => ScopeFilter::all().include_std(self.include_std),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub match_type: MatchType,
    pub results: Vec<SearchResult>,
}

pub async fn handle_search(state: &Arc<DocState>, request: SearchRequest) -> Result<SearchResponse> {
    let max_results = request.max_results.min(state.config().max_search_results);
    if max_results < request.max_results {
        tracing::debug!(
            requested = request.max_results,
            max_results,
            "Clamped max_results"
        );
    }

    let filter = request.filter();
    let engine = state.engine().clone();
    let query = request.query.clone();

    let outcome = tokio::task::spawn_blocking(move || engine.search(&query, &filter, max_results))
        .await
        .map_err(|e| DocsError::search(format!("search task failed: {}", e)))??;

    tracing::debug!(
        query = %request.query,
        results = outcome.results.len(),
        match_type = ?outcome.match_type,
        "Search finished"
    );

    Ok(SearchResponse {
        query: request.query,
        match_type: outcome.match_type,
        results: outcome.results,
    })
}
