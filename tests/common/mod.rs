//! Shared fixtures for integration tests.
//!
//! - [`RustdocFixture`] assembles rustdoc JSON documents node by node.
//! - [`demo_crate`] and [`std_crate`] are the two fixture crates most tests use.
//! - [`CountingGenerator`], [`HangingGenerator`] and [`FailingGenerator`] stand
//!   in for `cargo rustdoc`.
//! - [`TempWorkspace`] is a throwaway directory for on-disk stores and projects.

#![allow(dead_code)] // Each integration test crate uses a different subset

use futures::FutureExt;
use futures::future::BoxFuture;
use rust_docs_mcp::ServerConfig;
use rust_docs_mcp::error::{DocsError, Result};
use rust_docs_mcp::ingest::{CrateOrigin, CrateTarget, DocGenerator, Ingestor};
use rust_docs_mcp::store::DocStore;
use rust_docs_mcp::tools::DocState;
use rust_docs_mcp::types::ScopeKey;
use serde_json::{Map, Value, json};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

// --- rustdoc JSON ---

pub fn primitive(name: &str) -> Value {
    json!({ "primitive": name })
}

pub fn generic(name: &str) -> Value {
    json!({ "generic": name })
}

pub fn resolved(path: &str, id: u32) -> Value {
    json!({ "resolved_path": { "path": path, "id": id, "args": null } })
}

pub fn mut_self() -> Value {
    json!({ "borrowed_ref": { "lifetime": null, "is_mutable": true, "type": generic("Self") } })
}

fn no_generics() -> Value {
    json!({ "params": [], "where_predicates": [] })
}

/// Builds a rustdoc JSON document. Node 0 is the crate root module; every
/// other node gets the next free id.
#[derive(Debug, Clone)]
pub struct RustdocFixture {
    crate_name: String,
    crate_version: String,
    index: Map<String, Value>,
    root_members: Vec<u32>,
    next_id: u32,
}

impl RustdocFixture {
    pub fn new(crate_name: &str, crate_version: &str) -> Self {
        Self {
            crate_name: crate_name.to_string(),
            crate_version: crate_version.to_string(),
            index: Map::new(),
            root_members: Vec::new(),
            next_id: 1,
        }
    }

    pub fn scope(&self) -> ScopeKey {
        ScopeKey::new(&self.crate_name, self.crate_version.clone())
    }

    fn node(&mut self, name: Option<&str>, docs: Option<&str>, visibility: &str, inner: Value) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        self.index.insert(
            id.to_string(),
            json!({
                "id": id,
                "crate_id": 0,
                "name": name,
                "span": null,
                "visibility": visibility,
                "docs": docs,
                "links": {},
                "attrs": [],
                "deprecation": null,
                "inner": inner,
            }),
        );
        id
    }

    /// Lists `ids` as members of the crate root.
    pub fn at_root(&mut self, ids: &[u32]) -> &mut Self {
        self.root_members.extend_from_slice(ids);
        self
    }

    /// Inserts an arbitrary index entry under `key`, valid or not.
    pub fn raw_entry(&mut self, key: &str, entry: Value) -> &mut Self {
        self.index.insert(key.to_string(), entry);
        self
    }

    /// Marks a node as private (`visibility: "default"`).
    pub fn make_private(&mut self, id: u32) -> &mut Self {
        if let Some(entry) = self.index.get_mut(&id.to_string()) {
            entry["visibility"] = json!("default");
        }
        self
    }

    pub fn reserve_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn function(&mut self, name: &str, docs: &str, inputs: &[(&str, Value)], output: Option<Value>) -> u32 {
        let inputs: Vec<Value> = inputs.iter().map(|(param, ty)| json!([param, ty])).collect();
        self.node(
            Some(name),
            Some(docs),
            "public",
            json!({ "function": {
                "sig": { "inputs": inputs, "output": output, "is_c_variadic": false },
                "generics": no_generics(),
                "header": { "is_const": false, "is_unsafe": false, "is_async": false, "abi": "Rust" },
                "has_body": true,
            } }),
        )
    }

    pub fn module(&mut self, name: &str, docs: &str, items: &[u32]) -> u32 {
        self.node(
            Some(name),
            Some(docs),
            "public",
            json!({ "module": { "is_crate": false, "items": items, "is_stripped": false } }),
        )
    }

    pub fn constant(&mut self, name: &str, docs: &str, ty: Value, expr: &str) -> u32 {
        self.node(
            Some(name),
            Some(docs),
            "public",
            json!({ "constant": {
                "type": ty,
                "const": { "expr": expr, "value": expr, "is_literal": true },
            } }),
        )
    }

    pub fn field(&mut self, name: &str, ty: Value) -> u32 {
        self.node(Some(name), None, "public", json!({ "struct_field": ty }))
    }

    pub fn private_field(&mut self, name: &str, ty: Value) -> u32 {
        self.node(Some(name), None, "default", json!({ "struct_field": ty }))
    }

    /// A struct whose id is known in advance (impls must name it).
    pub fn struct_at(&mut self, id: u32, name: &str, docs: &str, fields: &[u32], impls: &[u32]) -> u32 {
        self.index.insert(
            id.to_string(),
            json!({
                "id": id,
                "crate_id": 0,
                "name": name,
                "span": null,
                "visibility": "public",
                "docs": docs,
                "links": {},
                "attrs": [],
                "deprecation": null,
                "inner": { "struct": {
                    "kind": { "plain": { "fields": fields, "has_stripped_fields": false } },
                    "generics": no_generics(),
                    "impls": impls,
                } },
            }),
        );
        id
    }

    pub fn inherent_impl(&mut self, for_type: Value, items: &[u32]) -> u32 {
        self.impl_block(Value::Null, for_type, items)
    }

    pub fn trait_impl(&mut self, trait_path: &str, trait_id: u32, for_type: Value, items: &[u32]) -> u32 {
        let trait_ = json!({ "path": trait_path, "id": trait_id, "args": null });
        self.impl_block(trait_, for_type, items)
    }

    fn impl_block(&mut self, trait_: Value, for_type: Value, items: &[u32]) -> u32 {
        self.node(
            None,
            None,
            "default",
            json!({ "impl": {
                "is_unsafe": false,
                "generics": no_generics(),
                "provided_trait_methods": [],
                "trait": trait_,
                "for": for_type,
                "items": items,
                "is_negative": false,
                "is_synthetic": false,
                "blanket_impl": null,
            } }),
        )
    }

    pub fn trait_at(&mut self, id: u32, name: &str, docs: &str, items: &[u32], implementations: &[u32]) -> u32 {
        self.index.insert(
            id.to_string(),
            json!({
                "id": id,
                "crate_id": 0,
                "name": name,
                "span": null,
                "visibility": "public",
                "docs": docs,
                "links": {},
                "attrs": [],
                "deprecation": null,
                "inner": { "trait": {
                    "is_auto": false,
                    "is_unsafe": false,
                    "is_dyn_compatible": true,
                    "items": items,
                    "generics": no_generics(),
                    "bounds": [],
                    "implementations": implementations,
                } },
            }),
        );
        id
    }

    pub fn reexport(&mut self, name: &str, source: &str, target: Option<u32>, is_glob: bool) -> u32 {
        self.node(
            None,
            None,
            "public",
            json!({ "use": { "source": source, "name": name, "id": target, "is_glob": is_glob } }),
        )
    }

    pub fn macro_rules(&mut self, name: &str, docs: &str, source: &str) -> u32 {
        self.node(Some(name), Some(docs), "public", json!({ "macro": source }))
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut index = self.index.clone();
        index.insert(
            "0".to_string(),
            json!({
                "id": 0,
                "crate_id": 0,
                "name": self.crate_name,
                "span": null,
                "visibility": "public",
                "docs": format!("The `{}` crate.", self.crate_name),
                "links": {},
                "attrs": [],
                "deprecation": null,
                "inner": { "module": { "is_crate": true, "items": self.root_members, "is_stripped": false } },
            }),
        );

        serde_json::to_vec(&json!({
            "root": 0,
            "crate_version": self.crate_version,
            "includes_private": false,
            "index": index,
            "paths": {},
            "external_crates": {},
            "format_version": rustdoc_types::FORMAT_VERSION,
        }))
        .unwrap()
    }
}

/// `demo::add(a: i32, b: i32) -> i32` and `demo::sub(a: i32, b: i32) -> i32`.
pub fn demo_crate() -> RustdocFixture {
    let mut fixture = RustdocFixture::new("demo", "0.1.0");
    let add = fixture.function(
        "add",
        "Adds two numbers together.\n\n# Arguments\n\n* `a` - The first operand\n* `b` - The second operand\n\n# Examples\n\n```\nassert_eq!(demo::add(1, 2), 3);\n```",
        &[("a", primitive("i32")), ("b", primitive("i32"))],
        Some(primitive("i32")),
    );
    let sub = fixture.function(
        "sub",
        "Subtracts `b` from `a`.",
        &[("a", primitive("i32")), ("b", primitive("i32"))],
        Some(primitive("i32")),
    );
    fixture.at_root(&[add, sub]);
    fixture
}

/// A slice of `std`: `std::vec::Vec` with `push`, `pop` and `len`, and
/// `std::collections::HashMap` with `insert`.
pub fn std_crate() -> RustdocFixture {
    let mut fixture = RustdocFixture::new("std", "1.86.0-nightly");

    let vec_id = fixture.reserve_id();
    let push = fixture.function(
        "push",
        "Appends an element to the back of a collection.\n\n# Panics\n\nPanics if the new capacity exceeds `isize::MAX` bytes.",
        &[("self", mut_self()), ("value", generic("T"))],
        None,
    );
    let pop = fixture.function(
        "pop",
        "Removes the last element from a vector and returns it, or `None` if it is empty.",
        &[("self", mut_self())],
        Some(generic("Option<T>")),
    );
    let len = fixture.function(
        "len",
        "Returns the number of elements in the vector.",
        &[("self", mut_self())],
        Some(primitive("usize")),
    );
    let vec_impl = fixture.inherent_impl(resolved("Vec", vec_id), &[push, pop, len]);
    fixture.struct_at(vec_id, "Vec", "A contiguous growable array type.", &[], &[vec_impl]);
    let vec_module = fixture.module("vec", "A contiguous growable array type with heap-allocated contents.", &[vec_id]);

    let map_id = fixture.reserve_id();
    let insert = fixture.function(
        "insert",
        "Inserts a key-value pair into the map.",
        &[("self", mut_self()), ("k", generic("K")), ("v", generic("V"))],
        Some(generic("Option<V>")),
    );
    let map_impl = fixture.inherent_impl(resolved("HashMap", map_id), &[insert]);
    fixture.struct_at(map_id, "HashMap", "A hash map implemented with quadratic probing.", &[], &[map_impl]);
    let collections = fixture.module("collections", "Collection types.", &[map_id]);

    fixture.at_root(&[vec_module, collections]);
    fixture
}

// --- generators ---

/// Returns fixed bytes after `delay`, counting calls.
#[derive(Debug)]
pub struct CountingGenerator {
    bytes: Vec<u8>,
    delay: Duration,
    calls: AtomicUsize,
}

impl CountingGenerator {
    pub fn new(bytes: Vec<u8>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            bytes,
            delay,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DocGenerator for CountingGenerator {
    fn generate(&self, _target: &CrateTarget, _cancel: CancellationToken) -> BoxFuture<'static, Result<Vec<u8>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let bytes = self.bytes.clone();
        let delay = self.delay;
        async move {
            tokio::time::sleep(delay).await;
            Ok(bytes)
        }
        .boxed()
    }
}

/// Never finishes on its own; stops only when cancelled.
#[derive(Debug, Default)]
pub struct HangingGenerator;

impl DocGenerator for HangingGenerator {
    fn generate(&self, target: &CrateTarget, cancel: CancellationToken) -> BoxFuture<'static, Result<Vec<u8>>> {
        let scope = target.scope().to_string();
        async move {
            cancel.cancelled().await;
            Err(DocsError::Cancelled { scope })
        }
        .boxed()
    }
}

/// Fails every crate whose name is in `failing`; other crates get `bytes`.
#[derive(Debug)]
pub struct FailingGenerator {
    failing: Vec<String>,
    bytes: Vec<u8>,
}

impl FailingGenerator {
    pub fn new(failing: &[&str], bytes: Vec<u8>) -> Arc<Self> {
        Arc::new(Self {
            failing: failing.iter().map(|name| name.to_string()).collect(),
            bytes,
        })
    }
}

impl DocGenerator for FailingGenerator {
    fn generate(&self, target: &CrateTarget, _cancel: CancellationToken) -> BoxFuture<'static, Result<Vec<u8>>> {
        let result = if self.failing.contains(&target.name) {
            Err(DocsError::Generation {
                message: format!("cargo rustdoc failed for '{}'", target.name),
            })
        } else {
            Ok(self.bytes.clone())
        };
        async move { result }.boxed()
    }
}

pub fn target(name: &str, version: &str) -> CrateTarget {
    CrateTarget {
        name: name.to_string(),
        version: version.to_string(),
        lib_name: name.replace('-', "_"),
        manifest_dir: PathBuf::from("/nonexistent/project"),
        origin: CrateOrigin::Local,
    }
}

// --- state ---

pub fn ingestor(generator: Arc<dyn DocGenerator>, timeout: Duration) -> Ingestor {
    Ingestor::new(Arc::new(DocStore::in_memory()), generator, timeout)
}

/// In-memory state with the given fixture crates already ingested.
pub async fn state_with(fixtures: &[RustdocFixture]) -> Arc<DocState> {
    state_with_generator(fixtures, Arc::new(HangingGenerator)).await
}

pub async fn state_with_generator(fixtures: &[RustdocFixture], generator: Arc<dyn DocGenerator>) -> Arc<DocState> {
    let state = Arc::new(DocState::new(
        ServerConfig::default(),
        Arc::new(DocStore::in_memory()),
        generator,
    ));
    for fixture in fixtures {
        state
            .ingestor()
            .ingest_json(fixture.scope(), fixture.to_bytes())
            .await
            .unwrap();
    }
    state
}

pub async fn demo_state() -> Arc<DocState> {
    state_with(&[demo_crate(), std_crate()]).await
}

/// A temporary directory removed on drop.
pub struct TempWorkspace {
    _temp: TempDir,
    root: PathBuf,
}

impl TempWorkspace {
    pub fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let root = temp.path().to_path_buf();
        Self { _temp: temp, root }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Creates a file, and its parent directories, inside the workspace.
    pub fn create_file(&self, path: &str, content: &str) {
        let full_path = self.root.join(path);
        if let Some(parent) = full_path.parent() {
            std::fs::create_dir_all(parent).unwrap_or_else(|e| {
                panic!("Failed to create parent directory for '{}': {}", path, e)
            });
        }
        std::fs::write(&full_path, content)
            .unwrap_or_else(|e| panic!("Failed to write file '{}': {}", path, e));
    }

    /// A library package with no dependencies.
    pub fn create_library(&self, dir: &str, name: &str) {
        self.create_file(
            &format!("{}/Cargo.toml", dir),
            &format!("[package]\nname = \"{}\"\nversion = \"0.1.0\"\nedition = \"2021\"\n\n[dependencies]\n", name),
        );
        self.create_file(&format!("{}/src/lib.rs", dir), "pub fn add(a: i32, b: i32) -> i32 { a + b }\n");
    }

    /// A library package depending on another package by relative path.
    pub fn create_library_with_path_dep(&self, dir: &str, name: &str, dep_name: &str, dep_dir: &str) {
        self.create_file(
            &format!("{}/Cargo.toml", dir),
            &format!(
                "[package]\nname = \"{}\"\nversion = \"0.1.0\"\nedition = \"2021\"\n\n[dependencies]\n{} = {{ path = \"{}\" }}\n",
                name, dep_name, dep_dir
            ),
        );
        self.create_file(&format!("{}/src/lib.rs", dir), "pub fn add(a: i32, b: i32) -> i32 { a + b }\n");
    }
}

impl Default for TempWorkspace {
    fn default() -> Self {
        Self::new()
    }
}
