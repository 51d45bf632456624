//! Item normalizer: flattens a [`RawTree`] into uniquely-pathed [`DocItem`]s.
//!
//! Traversal is breadth-first over an explicit work queue starting at the root
//! module, visiting every node id at most once, so each item gets its shortest
//! public path and reference cycles terminate. Members of types and traits
//! (methods and trait impls) are expanded in a second pass, once every
//! module-level item has a path, and cross-references are then resolved from
//! the id → path map.

pub mod docs;
pub mod signature;

use crate::error::{DocsError, Result};
use crate::raw::RawTree;
use crate::types::{DocItem, ItemKind, Note, NoteKind, Parameter, ScopeKey};
use rustdoc_types::{
    Id, Impl, Item, ItemEnum, MacroKind, Path, StructKind, Type, Use, Visibility,
};
use signature::{TypeFormatter, single_line};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

/// Output of one normalization run.
#[derive(Debug, Clone)]
pub struct NormalizedScope {
    pub scope: ScopeKey,
    pub items: Vec<DocItem>,
    pub stats: NormalizeStats,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeStats {
    pub emitted: usize,
    /// Nodes that have no item counterpart: private, unnamed, stripped, fields,
    /// variants, associated items, primitives, synthetic or blanket impls and
    /// re-exports of items outside this crate's JSON.
    pub skipped: usize,
    /// Glob re-exports hidden by an explicit item, and repeated member names
    /// across specialized impls.
    pub shadowed: usize,
    pub malformed: usize,
}

/// How a path was reached. Glob imports never override another item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Declared,
    Glob,
    Member,
}

#[derive(Debug)]
struct Visit {
    id: Id,
    path: String,
    name: String,
    origin: Origin,
}

#[derive(Debug)]
struct Emitted {
    item: DocItem,
    origin: Origin,
    id: Id,
}

/// Normalizes a parsed crate into the items of `scope`.
pub fn normalize(tree: &RawTree, scope: &ScopeKey) -> Result<NormalizedScope> {
    let started = std::time::Instant::now();
    let normalized = Normalizer::new(tree, scope).run()?;
    tracing::info!(
        scope = %scope,
        emitted = normalized.stats.emitted,
        skipped = normalized.stats.skipped,
        shadowed = normalized.stats.shadowed,
        malformed = normalized.stats.malformed,
        elapsed = ?started.elapsed(),
        "Normalized crate"
    );
    Ok(normalized)
}

struct Normalizer<'a> {
    tree: &'a RawTree,
    scope: &'a ScopeKey,
    fmt: TypeFormatter<'a>,
    queue: VecDeque<Visit>,
    visited: HashSet<Id>,
    items: BTreeMap<String, Emitted>,
    /// Paths of emitted module-level items, for resolving cross-references.
    id_paths: HashMap<Id, String>,
    /// Emitted types and traits whose members are expanded in the second pass.
    containers: Vec<(Id, String)>,
    stats: NormalizeStats,
}

impl<'a> Normalizer<'a> {
    fn new(tree: &'a RawTree, scope: &'a ScopeKey) -> Self {
        Self {
            tree,
            scope,
            fmt: TypeFormatter::new(tree),
            queue: VecDeque::new(),
            visited: HashSet::new(),
            items: BTreeMap::new(),
            id_paths: HashMap::new(),
            containers: Vec::new(),
            stats: NormalizeStats {
                malformed: tree.malformed.len(),
                ..NormalizeStats::default()
            },
        }
    }

    fn run(mut self) -> Result<NormalizedScope> {
        self.queue.push_back(Visit {
            id: self.tree.root,
            path: self.tree.crate_name.clone(),
            name: self.tree.crate_name.clone(),
            origin: Origin::Declared,
        });

        while let Some(visit) = self.queue.pop_front() {
            self.visit(visit)?;
        }

        self.expand_members();

        self.stats.emitted = self.items.len();
        let items = self.items.into_values().map(|e| e.item).collect();
        Ok(NormalizedScope {
            scope: self.scope.clone(),
            items,
            stats: self.stats,
        })
    }

    fn skip(&mut self, id: Id, reason: &'static str) {
        self.stats.skipped += 1;
        tracing::trace!(id = id.0, reason, "Skipped node");
    }

    fn visit(&mut self, visit: Visit) -> Result<()> {
        if self.visited.contains(&visit.id) {
            tracing::trace!(id = visit.id.0, path = %visit.path, "Already reachable by a shorter path");
            return Ok(());
        }
        let tree = self.tree;
        let Some(item) = tree.get(&visit.id) else {
            self.skip(visit.id, "target not present in index");
            return Ok(());
        };

        let Some(kind) = module_level_kind(&item.inner) else {
            self.skip(visit.id, "kind has no item counterpart");
            return Ok(());
        };
        if let ItemEnum::Module(module) = &item.inner
            && module.is_stripped
        {
            self.skip(visit.id, "stripped module");
            return Ok(());
        }

        let path = if kind == ItemKind::Macro {
            format!("{}!", visit.path)
        } else {
            visit.path.clone()
        };

        if let Some(existing) = self.items.get(&path) {
            match (existing.origin, visit.origin) {
                (_, Origin::Glob) => {
                    self.stats.shadowed += 1;
                    tracing::debug!(path = %path, "Glob re-export shadowed by an existing item");
                    return Ok(());
                }
                (Origin::Glob, _) => {
                    let displaced = existing.id;
                    self.items.remove(&path);
                    self.id_paths.remove(&displaced);
                    self.stats.shadowed += 1;
                }
                _ => {
                    return Err(DocsError::Normalization {
                        path,
                        message: format!(
                            "node {} and node {} both resolve to this path",
                            existing.id.0, visit.id.0
                        ),
                    });
                }
            }
        }

        self.visited.insert(visit.id);
        let doc_item = self.build_item(item, &path, &visit.name, kind);

        match &item.inner {
            ItemEnum::Module(module) => self.enqueue_module_children(&path, &module.items),
            ItemEnum::Struct(_) | ItemEnum::Union(_) | ItemEnum::Enum(_) | ItemEnum::Trait(_) => {
                self.containers.push((visit.id, path.clone()));
            }
            _ => {}
        }

        self.id_paths.insert(visit.id, path.clone());
        self.items.insert(
            path,
            Emitted {
                item: doc_item,
                origin: visit.origin,
                id: visit.id,
            },
        );
        Ok(())
    }

    fn enqueue(&mut self, id: Id, parent: &str, name: &str, origin: Origin) {
        self.queue.push_back(Visit {
            id,
            path: format!("{}::{}", parent, name),
            name: name.to_string(),
            origin,
        });
    }

    /// Enqueues declared children first, then glob-imported ones, so an
    /// explicit item always claims its path before a glob import can.
    fn enqueue_module_children(&mut self, path: &str, children: &[Id]) {
        let tree = self.tree;
        let mut globs = Vec::new();

        for child_id in children {
            let Some(child) = tree.get(child_id) else {
                self.skip(*child_id, "module member not present in index");
                continue;
            };
            if !matches!(child.visibility, Visibility::Public) {
                self.skip(*child_id, "not public");
                continue;
            }
            match &child.inner {
                ItemEnum::Impl(_) => {}
                ItemEnum::Use(import) if import.is_glob => globs.push(import),
                ItemEnum::Use(import) => self.enqueue_reexport(*child_id, import, path, Origin::Declared),
                _ => match &child.name {
                    Some(name) => self.enqueue(*child_id, path, name, Origin::Declared),
                    None => self.skip(*child_id, "unnamed"),
                },
            }
        }

        let mut expanded = HashSet::new();
        for import in globs {
            self.enqueue_glob(path, import, &mut expanded);
        }
    }

    fn enqueue_reexport(&mut self, use_id: Id, import: &Use, parent: &str, origin: Origin) {
        match import.id {
            Some(target) if self.tree.nodes.contains_key(&target) => {
                self.enqueue(target, parent, &import.name, origin);
            }
            _ => self.skip(use_id, "re-export of an item outside this crate's JSON"),
        }
    }

    fn enqueue_glob(&mut self, path: &str, import: &Use, expanded: &mut HashSet<Id>) {
        let tree = self.tree;
        let Some(target) = import.id else {
            tracing::debug!(source = %import.source, "Glob re-export of an external module");
            self.stats.skipped += 1;
            return;
        };
        if !expanded.insert(target) {
            return;
        }
        let Some(ItemEnum::Module(module)) = tree.get(&target).map(|item| &item.inner) else {
            self.skip(target, "glob re-export of a non-module");
            return;
        };

        for child_id in &module.items {
            let Some(child) = tree.get(child_id) else {
                continue;
            };
            if !matches!(child.visibility, Visibility::Public) {
                continue;
            }
            match &child.inner {
                ItemEnum::Impl(_) => {}
                ItemEnum::Use(nested) if nested.is_glob => self.enqueue_glob(path, nested, expanded),
                ItemEnum::Use(nested) => self.enqueue_reexport(*child_id, nested, path, Origin::Glob),
                _ => {
                    if let Some(name) = &child.name {
                        self.enqueue(*child_id, path, name, Origin::Glob);
                    }
                }
            }
        }
    }

    /// Builds the item for a module-level node; members are filled in later.
    fn build_item(&self, item: &Item, path: &str, name: &str, kind: ItemKind) -> DocItem {
        let mut doc = DocItem::new(self.scope, path, kind);
        doc.name = name.to_string();
        let argument_docs = self.apply_docs(&mut doc, item);

        match &item.inner {
            ItemEnum::Function(func) => {
                self.apply_function(&mut doc, name, func, &argument_docs);
            }
            ItemEnum::Struct(s) => {
                doc.signature = Some(self.fmt.declaration("struct", name, &s.generics));
                doc.fields = self.struct_fields(path, &s.kind);
            }
            ItemEnum::Union(u) => {
                doc.signature = Some(self.fmt.declaration("union", name, &u.generics));
                doc.fields = self.named_fields(path, &u.fields);
            }
            ItemEnum::Enum(e) => {
                doc.signature = Some(self.fmt.declaration("enum", name, &e.generics));
                doc.fields = e
                    .variants
                    .iter()
                    .filter_map(|id| self.tree.get(id)?.name.as_deref())
                    .map(|variant| format!("{}::{}", path, variant))
                    .collect();
            }
            ItemEnum::Trait(t) => {
                doc.signature = Some(self.fmt.trait_signature(name, t));
                for bound in &t.bounds {
                    if let rustdoc_types::GenericBound::TraitBound { trait_, .. } = bound {
                        doc.add_related(self.resolve_path(trait_));
                    }
                }
            }
            ItemEnum::TypeAlias(alias) => {
                let mut signature = self.fmt.declaration("type", name, &alias.generics);
                signature.push_str(" = ");
                signature.push_str(&self.fmt.type_to_string(&alias.type_));
                doc.signature = Some(signature);
            }
            ItemEnum::Constant { type_, const_ } => {
                doc.signature = Some(format!(
                    "const {}: {} = {}",
                    name,
                    self.fmt.type_to_string(type_),
                    const_.expr
                ));
                doc.return_type = Some(self.fmt.type_to_string(type_));
            }
            ItemEnum::Static(s) => {
                let mutability = if s.is_mutable { "mut " } else { "" };
                doc.signature = Some(format!(
                    "static {}{}: {}",
                    mutability,
                    name,
                    self.fmt.type_to_string(&s.type_)
                ));
                doc.return_type = Some(self.fmt.type_to_string(&s.type_));
            }
            ItemEnum::Macro(source) => {
                doc.signature = Some(single_line(source));
            }
            ItemEnum::ProcMacro(proc_macro) => {
                doc.signature = Some(match proc_macro.kind {
                    MacroKind::Bang => format!("{}!()", name),
                    MacroKind::Attr => format!("#[{}]", name),
                    MacroKind::Derive => format!("#[derive({})]", name),
                });
            }
            _ => {}
        }

        doc
    }

    /// Fills description, examples and notes; returns per-argument docs.
    fn apply_docs(&self, doc: &mut DocItem, item: &Item) -> HashMap<String, String> {
        if let Some(deprecation) = &item.deprecation {
            let mut text = match &deprecation.since {
                Some(since) => format!("Deprecated since {}", since),
                None => "Deprecated".to_string(),
            };
            if let Some(note) = &deprecation.note {
                text.push_str(": ");
                text.push_str(note);
            }
            doc.notes.push(Note {
                kind: NoteKind::Deprecated,
                text,
            });
        }

        let Some(raw_docs) = &item.docs else {
            return HashMap::new();
        };
        let extracted = docs::extract(raw_docs);
        doc.description = extracted.description;
        doc.examples = extracted.examples;
        doc.notes.extend(extracted.notes);
        extracted.argument_docs
    }

    fn apply_function(
        &self,
        doc: &mut DocItem,
        name: &str,
        func: &rustdoc_types::Function,
        argument_docs: &HashMap<String, String>,
    ) {
        doc.signature = Some(self.fmt.function_signature(name, func));
        doc.parameters = func
            .sig
            .inputs
            .iter()
            .filter(|(param, _)| param != "self")
            .map(|(param, ty)| Parameter {
                name: param.clone(),
                type_name: self.fmt.type_to_string(ty),
                description: argument_docs.get(param).cloned(),
            })
            .collect();
        doc.return_type = func.sig.output.as_ref().map(|ty| self.fmt.type_to_string(ty));
    }

    fn struct_fields(&self, path: &str, kind: &StructKind) -> Vec<String> {
        match kind {
            StructKind::Unit => Vec::new(),
            StructKind::Tuple(fields) => fields
                .iter()
                .enumerate()
                .filter(|(_, id)| {
                    id.and_then(|id| self.tree.get(&id))
                        .is_some_and(|field| matches!(field.visibility, Visibility::Public))
                })
                .map(|(i, _)| format!("{}::{}", path, i))
                .collect(),
            StructKind::Plain { fields, .. } => self.named_fields(path, fields),
        }
    }

    fn named_fields(&self, path: &str, fields: &[Id]) -> Vec<String> {
        fields
            .iter()
            .filter_map(|id| self.tree.get(id))
            .filter(|field| matches!(field.visibility, Visibility::Public))
            .filter_map(|field| field.name.as_deref())
            .map(|field| format!("{}::{}", path, field))
            .collect()
    }

    /// Path of a referenced item: local emitted path, then rustdoc's path table,
    /// then the path as written.
    fn resolve_path(&self, path: &Path) -> String {
        self.id_paths
            .get(&path.id)
            .cloned()
            .or_else(|| self.tree.summary_path(&path.id))
            .unwrap_or_else(|| path.path.clone())
    }

    fn resolve_type_path(&self, ty: &Type) -> Option<String> {
        match ty {
            Type::ResolvedPath(path) => Some(self.resolve_path(path)),
            _ => None,
        }
    }

    fn insert_member(&mut self, item: DocItem, id: Id) -> bool {
        if self.items.contains_key(&item.path) {
            self.stats.shadowed += 1;
            tracing::debug!(path = %item.path, "Member path already taken by an earlier impl");
            return false;
        }
        self.items.insert(
            item.path.clone(),
            Emitted {
                item,
                origin: Origin::Member,
                id,
            },
        );
        true
    }

    fn expand_members(&mut self) {
        let tree = self.tree;
        let containers = std::mem::take(&mut self.containers);
        let mut trait_impls: Vec<(Id, Option<String>)> = Vec::new();
        let mut seen_impls = HashSet::new();

        for (id, path) in &containers {
            let Some(item) = tree.get(id) else { continue };
            let impl_ids: &[Id] = match &item.inner {
                ItemEnum::Struct(s) => &s.impls,
                ItemEnum::Union(u) => &u.impls,
                ItemEnum::Enum(e) => &e.impls,
                ItemEnum::Trait(t) => {
                    self.expand_trait_methods(path, &t.items);
                    for impl_id in &t.implementations {
                        if seen_impls.insert(*impl_id) {
                            trait_impls.push((*impl_id, None));
                        }
                    }
                    continue;
                }
                _ => continue,
            };

            for impl_id in impl_ids {
                let Some(ItemEnum::Impl(imp)) = tree.get(impl_id).map(|i| &i.inner) else {
                    self.skip(*impl_id, "impl not present in index");
                    continue;
                };
                if imp.is_synthetic || imp.blanket_impl.is_some() {
                    self.skip(*impl_id, "synthetic or blanket impl");
                    continue;
                }
                if imp.trait_.is_none() {
                    self.expand_inherent_methods(path, imp);
                } else if seen_impls.insert(*impl_id) {
                    trait_impls.push((*impl_id, Some(path.clone())));
                } else {
                    // Listed by the trait before this type was reached.
                    if let Some(entry) = trait_impls.iter_mut().find(|(i, _)| i == impl_id) {
                        entry.1 = Some(path.clone());
                    }
                }
            }
        }

        for (impl_id, owner) in trait_impls {
            self.emit_trait_impl(impl_id, owner);
        }
    }

    fn expand_inherent_methods(&mut self, owner: &str, imp: &Impl) {
        let tree = self.tree;
        for member_id in &imp.items {
            let Some(member) = tree.get(member_id) else { continue };
            let (Some(name), ItemEnum::Function(func)) = (&member.name, &member.inner) else {
                self.skip(*member_id, "associated item without an item counterpart");
                continue;
            };
            if !matches!(member.visibility, Visibility::Public) {
                self.skip(*member_id, "not public");
                continue;
            }
            let method = self.build_method(owner, member, name, func);
            let method_path = method.path.clone();
            if self.insert_member(method, *member_id) {
                self.push_child(owner, |parent| parent.methods.push(method_path));
            }
        }
    }

    fn expand_trait_methods(&mut self, owner: &str, members: &[Id]) {
        let tree = self.tree;
        for member_id in members {
            let Some(member) = tree.get(member_id) else { continue };
            let (Some(name), ItemEnum::Function(func)) = (&member.name, &member.inner) else {
                self.skip(*member_id, "associated item without an item counterpart");
                continue;
            };
            let method = self.build_method(owner, member, name, func);
            let method_path = method.path.clone();
            if self.insert_member(method, *member_id) {
                self.push_child(owner, |parent| parent.methods.push(method_path));
            }
        }
    }

    fn build_method(
        &self,
        owner: &str,
        member: &Item,
        name: &str,
        func: &rustdoc_types::Function,
    ) -> DocItem {
        let mut method = DocItem::new(self.scope, format!("{}::{}", owner, name), ItemKind::Method);
        let argument_docs = self.apply_docs(&mut method, member);
        self.apply_function(&mut method, name, func, &argument_docs);
        method.add_related(owner);
        method
    }

    fn push_child(&mut self, owner: &str, update: impl FnOnce(&mut DocItem)) {
        if let Some(parent) = self.items.get_mut(owner) {
            update(&mut parent.item);
        }
    }

    fn emit_trait_impl(&mut self, impl_id: Id, owner: Option<String>) {
        let tree = self.tree;
        let Some(impl_item) = tree.get(&impl_id) else {
            self.skip(impl_id, "impl not present in index");
            return;
        };
        let ItemEnum::Impl(imp) = &impl_item.inner else {
            self.skip(impl_id, "implementation entry is not an impl");
            return;
        };
        let Some(trait_) = &imp.trait_ else { return };
        if imp.is_synthetic || imp.blanket_impl.is_some() {
            self.skip(impl_id, "synthetic or blanket impl");
            return;
        }

        let trait_display = self.fmt.path_to_string(trait_);
        let type_display = self.fmt.type_to_string(&imp.for_);
        let trait_path = self.resolve_path(trait_);
        let type_path = self.resolve_type_path(&imp.for_);
        let local_trait = self.id_paths.get(&trait_.id).cloned();

        let path = match (&owner, &local_trait) {
            (Some(owner), _) => format!("{}::impl-{}", owner, trait_display),
            (None, Some(trait_owner)) => format!("{}::impl-for-{}", trait_owner, type_display),
            (None, None) => {
                self.skip(impl_id, "neither implementing type nor trait is local");
                return;
            }
        };

        let mut doc = DocItem::new(self.scope, path.clone(), ItemKind::TraitImpl);
        let negation = if imp.is_negative { "!" } else { "" };
        doc.name = format!("impl {}{} for {}", negation, trait_display, type_display);
        doc.signature = Some(self.fmt.impl_signature(imp));
        self.apply_docs(&mut doc, impl_item);
        doc.add_related(trait_path.clone());
        if let Some(type_path) = &type_path {
            doc.add_related(type_path.clone());
        }

        if !self.insert_member(doc, impl_id) {
            return;
        }

        if let Some(owner) = &owner {
            self.push_child(owner, |parent| {
                parent.trait_implementations.push(path.clone());
                parent.add_related(trait_path.clone());
            });
        }
        if let Some(trait_owner) = &local_trait {
            self.push_child(trait_owner, |parent| {
                parent.trait_implementations.push(path.clone());
                if let Some(type_path) = type_path {
                    parent.add_related(type_path);
                }
            });
        }
    }
}

/// Kind of an item reachable from a module, or `None` for nodes that never
/// become items on their own.
const fn module_level_kind(inner: &ItemEnum) -> Option<ItemKind> {
    match inner {
        ItemEnum::Module(_) => Some(ItemKind::Module),
        ItemEnum::Struct(_) | ItemEnum::Union(_) => Some(ItemKind::Struct),
        ItemEnum::Enum(_) => Some(ItemKind::Enum),
        ItemEnum::Trait(_) => Some(ItemKind::Trait),
        ItemEnum::Function(_) => Some(ItemKind::Function),
        ItemEnum::TypeAlias(_) => Some(ItemKind::TypeAlias),
        ItemEnum::Constant { .. } | ItemEnum::Static(_) => Some(ItemKind::Constant),
        ItemEnum::Macro(_) | ItemEnum::ProcMacro(_) => Some(ItemKind::Macro),
        ItemEnum::ExternCrate { .. }
        | ItemEnum::Use(_)
        | ItemEnum::StructField(_)
        | ItemEnum::Variant(_)
        | ItemEnum::TraitAlias(_)
        | ItemEnum::Impl(_)
        | ItemEnum::ExternType
        | ItemEnum::Primitive(_)
        | ItemEnum::AssocConst { .. }
        | ItemEnum::AssocType { .. } => None,
    }
}
