//! Raw tree parser: rustdoc JSON bytes into a tree of typed intermediate nodes.
//!
//! Only the top-level `root` and `index` fields are structural. Every `index`
//! entry is decoded on its own so that one malformed node is recorded and
//! skipped instead of failing the whole crate.

use crate::error::{DocsError, Result};
use rustdoc_types::{Id, Item, ItemEnum, ItemSummary};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// An `index` or `paths` entry that could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedNode {
    pub id: String,
    pub reason: String,
}

/// Parsed rustdoc crate, keyed by node id. Nodes keep their links to
/// children (module items, fields, variants, trait items, impls) as ids.
#[derive(Debug, Clone)]
pub struct RawTree {
    /// Name of the root module, i.e. the crate name as it appears in item paths.
    pub crate_name: String,
    pub root: Id,
    pub nodes: HashMap<Id, Item>,
    pub paths: HashMap<Id, ItemSummary>,
    pub malformed: Vec<MalformedNode>,
}

impl RawTree {
    pub fn get(&self, id: &Id) -> Option<&Item> {
        self.nodes.get(id)
    }

    /// Fully-qualified path of an item known to rustdoc's path table.
    pub fn summary_path(&self, id: &Id) -> Option<String> {
        self.paths.get(id).map(|summary| summary.path.join("::"))
    }
}

/// Parses rustdoc JSON. Fails only when the document itself is unusable.
pub fn parse(bytes: &[u8]) -> Result<RawTree> {
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| DocsError::malformed(format!("not valid JSON: {}", e)))?;

    let Value::Object(mut document) = value else {
        return Err(DocsError::malformed("top-level value is not an object"));
    };

    let root = document
        .get("root")
        .and_then(Value::as_u64)
        .and_then(|id| u32::try_from(id).ok())
        .map(Id)
        .ok_or_else(|| DocsError::malformed("missing or invalid `root` field"))?;

    let Some(Value::Object(index)) = document.remove("index") else {
        return Err(DocsError::malformed("missing or invalid `index` field"));
    };

    let format_version = document
        .get("format_version")
        .and_then(Value::as_u64)
        .and_then(|v| u32::try_from(v).ok());

    if let Some(found) = format_version
        && found != rustdoc_types::FORMAT_VERSION
    {
        tracing::warn!(
            found,
            expected = rustdoc_types::FORMAT_VERSION,
            "rustdoc JSON format version differs; decoding entries individually"
        );
    }

    let mut malformed = Vec::new();
    let nodes = parse_index(index, &mut malformed);

    let paths = match document.remove("paths") {
        Some(Value::Object(paths)) => parse_paths(paths, &mut malformed),
        Some(_) => {
            malformed.push(MalformedNode {
                id: "paths".to_string(),
                reason: "`paths` is not an object".to_string(),
            });
            HashMap::new()
        }
        None => HashMap::new(),
    };

    let crate_name = nodes
        .get(&root)
        .filter(|item| matches!(item.inner, ItemEnum::Module(_)))
        .and_then(|item| item.name.clone())
        .ok_or_else(|| DocsError::malformed("root node is missing or is not a named module"))?;

    malformed.sort_by(|a, b| a.id.cmp(&b.id));
    if !malformed.is_empty() {
        tracing::warn!(
            crate_name = %crate_name,
            malformed = malformed.len(),
            "Skipped malformed rustdoc nodes"
        );
    }

    tracing::debug!(
        crate_name = %crate_name,
        nodes = nodes.len(),
        paths = paths.len(),
        "Parsed rustdoc JSON"
    );

    Ok(RawTree {
        crate_name,
        root,
        nodes,
        paths,
        malformed,
    })
}

fn parse_id(key: &str) -> Option<Id> {
    key.parse().ok().map(Id)
}

fn parse_index(index: Map<String, Value>, malformed: &mut Vec<MalformedNode>) -> HashMap<Id, Item> {
    let mut nodes = HashMap::with_capacity(index.len());

    for (key, entry) in index {
        let Some(id) = parse_id(&key) else {
            malformed.push(MalformedNode {
                id: key,
                reason: "index key is not a numeric id".to_string(),
            });
            continue;
        };

        match serde_json::from_value::<Item>(entry) {
            Ok(item) if item.id == id => {
                nodes.insert(id, item);
            }
            Ok(item) => malformed.push(MalformedNode {
                id: key,
                reason: format!("entry declares id {} under a different key", item.id.0),
            }),
            Err(e) => malformed.push(MalformedNode {
                id: key,
                reason: e.to_string(),
            }),
        }
    }

    nodes
}

fn parse_paths(
    paths: Map<String, Value>,
    malformed: &mut Vec<MalformedNode>,
) -> HashMap<Id, ItemSummary> {
    let mut summaries = HashMap::with_capacity(paths.len());

    for (key, entry) in paths {
        let Some(id) = parse_id(&key) else {
            malformed.push(MalformedNode {
                id: format!("paths/{}", key),
                reason: "path key is not a numeric id".to_string(),
            });
            continue;
        };

        match serde_json::from_value::<ItemSummary>(entry) {
            Ok(summary) => {
                summaries.insert(id, summary);
            }
            Err(e) => malformed.push(MalformedNode {
                id: format!("paths/{}", key),
                reason: e.to_string(),
            }),
        }
    }

    summaries
}
