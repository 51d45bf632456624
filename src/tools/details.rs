//! `get_rust_doc_details`: the full projection of one item.

use super::{DocState, default_true};
use crate::error::Result;
use crate::normalize::docs::first_sentence;
use crate::store::IndexedItem;
use crate::types::{DocItem, ItemKind};
use rmcp::schemars;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const SUMMARY_MAX_CHARS: usize = 160;

#[derive(Debug, Clone, Deserialize, schemars::JsonSchema)]
pub struct DetailsRequest {
    /// Fully-qualified item path, e.g. `std::vec::Vec::push`
    pub item_path: String,
    /// Include code examples from the doc comment (default: true)
    #[serde(default = "default_true")]
    pub include_examples: bool,
    /// Expand methods, fields and trait implementations into summaries (default: true)
    #[serde(default = "default_true")]
    pub include_methods: bool,
}

impl DetailsRequest {
    pub fn new(item_path: impl Into<String>) -> Self {
        Self {
            item_path: item_path.into(),
            include_examples: true,
            include_methods: true,
        }
    }
}

/// A child item reduced to what a listing needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChildSummary {
    pub path: String,
    pub name: String,
    pub kind: ItemKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    pub summary: String,
}

impl ChildSummary {
    fn from_item(item: &DocItem) -> Self {
        Self {
            path: item.path.clone(),
            name: item.name.clone(),
            kind: item.kind,
            signature: item.signature.clone(),
            summary: first_sentence(&item.description, SUMMARY_MAX_CHARS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Documentation {
    #[serde(flatten)]
    pub item: DocItem,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub method_details: Vec<ChildSummary>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub field_details: Vec<ChildSummary>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub trait_impl_details: Vec<ChildSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailsResponse {
    pub documentation: Documentation,
}

pub async fn handle_details(state: &Arc<DocState>, request: DetailsRequest) -> Result<DetailsResponse> {
    let indexed = state.store().find_path(&request.item_path)?;
    let mut item = indexed.item.clone();

    if !request.include_examples {
        item.examples.clear();
    }

    let mut documentation = Documentation {
        item,
        method_details: Vec::new(),
        field_details: Vec::new(),
        trait_impl_details: Vec::new(),
    };

    if request.include_methods {
        let item = &documentation.item;
        documentation.method_details = summarize(state, &indexed, &item.methods);
        documentation.field_details = summarize(state, &indexed, &item.fields);
        documentation.trait_impl_details = summarize(state, &indexed, &item.trait_implementations);
    }

    Ok(DetailsResponse { documentation })
}

/// Looks child paths up in the parent's scope. Paths that no longer resolve
/// are logged and left out.
fn summarize(state: &DocState, parent: &IndexedItem, paths: &[String]) -> Vec<ChildSummary> {
    let scope = parent.item.scope();
    paths
        .iter()
        .filter_map(|path| match state.store().get(&scope, path) {
            Ok(child) => Some(ChildSummary::from_item(&child.item)),
            Err(e) => {
                tracing::debug!(
                    parent = %parent.item.path,
                    child = %path,
                    error = %e,
                    "Child item did not resolve"
                );
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ScopeKey;
    use assert2::check;

    #[test]
    fn request_defaults() {
        let request: DetailsRequest = serde_json::from_str(r#"{"item_path": "demo::add"}"#).unwrap();
        check!(request.include_examples);
        check!(request.include_methods);
    }

    #[test]
    fn child_summary_uses_first_sentence() {
        let scope = ScopeKey::new("demo", "0.1.0");
        let mut item = DocItem::new(&scope, "demo::Stack::push", ItemKind::Method);
        item.description = "Pushes a value. Grows the buffer when full.".to_string();
        item.signature = Some("pub fn push(&mut self, value: T)".to_string());

        let summary = ChildSummary::from_item(&item);
        check!(summary.name == "push");
        check!(summary.summary == "Pushes a value.");
    }
}
