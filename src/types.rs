//! Core data model: scopes, normalized documentation items and search results.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Standard library crates shipped by the `rust-docs-json` nightly component.
pub const STDLIB_CRATES: &[&str] = &["std", "core", "alloc", "proc_macro", "test"];

/// Normalizes a crate name for comparison: `serde-json` and `serde_json` are the same crate.
pub fn normalize_crate_name(name: &str) -> String {
    name.trim().replace('-', "_")
}

/// Normalizes a user-supplied item path: `.` is accepted as a separator and
/// surrounding whitespace or a leading `::` is dropped.
pub fn normalize_item_path(path: &str) -> String {
    let path = path.trim().replace('.', "::");
    path.trim_start_matches("::").to_string()
}

/// Identifies one ingested crate version. All items of one generation run share a scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScopeKey {
    crate_name: String,
    version: String,
}

impl ScopeKey {
    pub fn new(crate_name: &str, version: impl Into<String>) -> Self {
        Self {
            crate_name: normalize_crate_name(crate_name),
            version: version.into(),
        }
    }

    pub fn crate_name(&self) -> &str {
        &self.crate_name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn is_stdlib(&self) -> bool {
        STDLIB_CRATES.contains(&self.crate_name.as_str())
    }
}

impl fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.crate_name, self.version)
    }
}

/// Kind of a normalized item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ItemKind {
    Function,
    Method,
    Struct,
    Enum,
    Trait,
    TraitImpl,
    Module,
    Constant,
    Macro,
    TypeAlias,
}

impl ItemKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Method => "method",
            Self::Struct => "struct",
            Self::Enum => "enum",
            Self::Trait => "trait",
            Self::TraitImpl => "trait-impl",
            Self::Module => "module",
            Self::Constant => "constant",
            Self::Macro => "macro",
            Self::TypeAlias => "type-alias",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One input parameter of a function or method. The `self` receiver is never listed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub description: Option<String>,
}

/// A code block lifted verbatim from a doc comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeExample {
    pub code: String,
    pub language: Option<String>,
    pub caption: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteKind {
    Deprecated,
    Panics,
    Safety,
    Errors,
    Warning,
}

/// An annotation worth surfacing separately from the description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub kind: NoteKind,
    pub text: String,
}

/// A normalized documentation item, addressable by `(crate, version, path)`.
///
/// Relationships (`related_items`, `methods`, `fields`, `trait_implementations`)
/// hold paths into the same scope, never embedded items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocItem {
    pub path: String,
    pub name: String,
    pub kind: ItemKind,
    pub signature: Option<String>,
    pub description: String,
    pub parameters: Vec<Parameter>,
    pub return_type: Option<String>,
    pub examples: Vec<CodeExample>,
    pub notes: Vec<Note>,
    pub related_items: Vec<String>,
    #[serde(rename = "crate")]
    pub crate_name: String,
    pub version: String,
    pub methods: Vec<String>,
    pub fields: Vec<String>,
    pub trait_implementations: Vec<String>,
}

impl DocItem {
    /// Creates an empty item of `kind` at `path`; `name` is the last path segment.
    pub fn new(scope: &ScopeKey, path: impl Into<String>, kind: ItemKind) -> Self {
        let path = path.into();
        let name = path.rsplit("::").next().unwrap_or(&path).to_string();
        Self {
            path,
            name,
            kind,
            signature: None,
            description: String::new(),
            parameters: Vec::new(),
            return_type: None,
            examples: Vec::new(),
            notes: Vec::new(),
            related_items: Vec::new(),
            crate_name: scope.crate_name().to_string(),
            version: scope.version().to_string(),
            methods: Vec::new(),
            fields: Vec::new(),
            trait_implementations: Vec::new(),
        }
    }

    pub fn scope(&self) -> ScopeKey {
        ScopeKey::new(&self.crate_name, self.version.clone())
    }

    /// Adds a related path once, preserving first-seen order.
    pub fn add_related(&mut self, path: impl Into<String>) {
        let path = path.into();
        if path != self.path && !self.related_items.contains(&path) {
            self.related_items.push(path);
        }
    }
}

/// Whether a search outcome cleared the configured threshold or came from the relaxed pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    Matched,
    Suggested,
}

/// A ranked search hit. Transient; never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub item_path: String,
    pub name: String,
    pub kind: ItemKind,
    pub snippet: String,
    pub relevance_score: f64,
    #[serde(rename = "crate")]
    pub crate_name: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub match_type: MatchType,
    pub results: Vec<SearchResult>,
}

impl SearchOutcome {
    pub const fn empty() -> Self {
        Self {
            match_type: MatchType::Matched,
            results: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::check;
    use rstest::rstest;

    #[test]
    fn scope_key_normalizes_hyphens() {
        check!(ScopeKey::new("serde-json", "1.0.0") == ScopeKey::new("serde_json", "1.0.0"));
        check!(ScopeKey::new("serde-json", "1.0.0").to_string() == "serde_json@1.0.0");
    }

    #[rstest]
    #[case("std", true)]
    #[case("proc-macro", true)]
    #[case("serde", false)]
    fn stdlib_scopes(#[case] name: &str, #[case] expected: bool) {
        check!(ScopeKey::new(name, "1.0.0").is_stdlib() == expected);
    }

    #[rstest]
    #[case("std.vec.Vec", "std::vec::Vec")]
    #[case(" ::demo::add ", "demo::add")]
    #[case("demo::Point", "demo::Point")]
    fn item_path_normalization(#[case] input: &str, #[case] expected: &str) {
        check!(normalize_item_path(input) == expected);
    }

    #[test]
    fn item_kind_serializes_kebab_case() {
        let json = serde_json::to_string(&ItemKind::TraitImpl).unwrap();
        check!(json == "\"trait-impl\"");
        check!(ItemKind::TypeAlias.to_string() == "type-alias");
    }

    #[test]
    fn doc_item_name_is_last_segment() {
        let scope = ScopeKey::new("demo", "0.1.0");
        let mut item = DocItem::new(&scope, "demo::Point::new", ItemKind::Method);
        check!(item.name == "new");
        item.add_related("demo::Point");
        item.add_related("demo::Point");
        item.add_related("demo::Point::new");
        check!(item.related_items == vec!["demo::Point".to_string()]);
    }

    #[test]
    fn doc_item_serializes_crate_field() {
        let scope = ScopeKey::new("demo", "0.1.0");
        let item = DocItem::new(&scope, "demo::add", ItemKind::Function);
        let value = serde_json::to_value(&item).unwrap();
        check!(value["crate"] == "demo");
        check!(value["kind"] == "function");
    }
}
