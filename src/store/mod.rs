//! Documentation Store: scope-atomic item index keyed by `(crate, version, path)`.
//!
//! Each scope is held as an immutable [`ScopeSnapshot`] behind an `Arc`. Writers
//! build a complete replacement snapshot and swap it in, so readers observe
//! either the old or the new scope and never a mixture. Writers of one scope
//! are serialized by the slot's writer mutex; writers of distinct scopes only
//! touch the scope table to create or remove a slot.

mod disk;
pub mod eviction;

pub use disk::SCHEMA_VERSION;
pub use eviction::{EvictionPolicy, EvictionReport};

use crate::error::{DocsError, Result};
use crate::search::scoring::{SearchKeys, suggest_paths};
use crate::types::{DocItem, ScopeKey, normalize_crate_name, normalize_item_path};
use disk::DiskStore;
use rust_stemmers::{Algorithm, Stemmer};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::SystemTime;

/// Maximum number of "did you mean" paths attached to a `NotFound`.
const MAX_SUGGESTIONS: usize = 5;

/// A stored item together with its precomputed search keys.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedItem {
    pub item: DocItem,
    pub keys: SearchKeys,
}

/// Immutable contents of one scope.
#[derive(Debug, Clone)]
pub struct ScopeSnapshot {
    scope: ScopeKey,
    items: BTreeMap<String, Arc<IndexedItem>>,
    written_at: SystemTime,
    size_bytes: u64,
}

impl ScopeSnapshot {
    fn build(
        scope: ScopeKey,
        items: impl IntoIterator<Item = DocItem>,
        written_at: SystemTime,
        stemmer: &Stemmer,
    ) -> Self {
        let items: BTreeMap<_, _> = items
            .into_iter()
            .map(|item| {
                let keys = SearchKeys::from_item(&item, stemmer);
                (item.path.clone(), Arc::new(IndexedItem { item, keys }))
            })
            .collect();
        let size_bytes = items.values().map(|indexed| approximate_size(&indexed.item)).sum();

        Self {
            scope,
            items,
            written_at,
            size_bytes,
        }
    }

    /// Copy of this snapshot with `item` inserted or replaced.
    fn with_item(&self, item: DocItem, written_at: SystemTime, stemmer: &Stemmer) -> Self {
        let mut items = self.items.clone();
        let keys = SearchKeys::from_item(&item, stemmer);
        let added = approximate_size(&item);
        let replaced = items
            .insert(item.path.clone(), Arc::new(IndexedItem { item, keys }))
            .map_or(0, |old| approximate_size(&old.item));

        Self {
            scope: self.scope.clone(),
            items,
            written_at,
            size_bytes: self.size_bytes + added - replaced,
        }
    }

    pub fn scope(&self) -> &ScopeKey {
        &self.scope
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, path: &str) -> Option<&Arc<IndexedItem>> {
        self.items.get(path)
    }

    /// Items in path order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<IndexedItem>> {
        self.items.values()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.items.keys().map(String::as_str)
    }

    pub const fn written_at(&self) -> SystemTime {
        self.written_at
    }

    pub const fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    fn info(&self) -> ScopeInfo {
        ScopeInfo {
            scope: self.scope.clone(),
            item_count: self.items.len(),
            size_bytes: self.size_bytes,
            written_at: self.written_at,
        }
    }
}

/// Rough in-memory footprint of an item, used for size-based eviction.
fn approximate_size(item: &DocItem) -> u64 {
    let strings = [&item.path, &item.name, &item.description, &item.crate_name, &item.version]
        .iter()
        .map(|s| s.len())
        .sum::<usize>()
        + item.signature.as_ref().map_or(0, String::len)
        + item.return_type.as_ref().map_or(0, String::len)
        + item
            .parameters
            .iter()
            .map(|p| p.name.len() + p.type_name.len() + p.description.as_ref().map_or(0, String::len))
            .sum::<usize>()
        + item
            .examples
            .iter()
            .map(|e| e.code.len() + e.caption.as_ref().map_or(0, String::len))
            .sum::<usize>()
        + item.notes.iter().map(|n| n.text.len()).sum::<usize>()
        + [
            &item.related_items,
            &item.methods,
            &item.fields,
            &item.trait_implementations,
        ]
        .iter()
        .flat_map(|paths| paths.iter())
        .map(String::len)
        .sum::<usize>();

    strings as u64
}

/// Summary of one stored scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeInfo {
    pub scope: ScopeKey,
    pub item_count: usize,
    pub size_bytes: u64,
    pub written_at: SystemTime,
}

/// Which scopes a scan covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeFilter {
    /// Restrict to one crate (any version unless `version` is set).
    pub crate_name: Option<String>,
    pub version: Option<String>,
    /// Include standard-library scopes, alongside the named crate if any.
    pub include_std: bool,
}

impl Default for ScopeFilter {
    fn default() -> Self {
        Self::all()
    }
}

impl ScopeFilter {
    pub const fn all() -> Self {
        Self {
            crate_name: None,
            version: None,
            include_std: true,
        }
    }

    /// Only the scopes of `crate_name`; add `include_std(true)` to search the
    /// standard library alongside it.
    pub fn for_crate(crate_name: &str) -> Self {
        Self {
            crate_name: Some(normalize_crate_name(crate_name)),
            version: None,
            include_std: false,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub const fn include_std(mut self, include_std: bool) -> Self {
        self.include_std = include_std;
        self
    }

    fn matches(&self, scope: &ScopeKey) -> bool {
        match &self.crate_name {
            Some(_) => self.names(scope) || (self.include_std && scope.is_stdlib()),
            None => self.include_std || !scope.is_stdlib(),
        }
    }

    /// Whether `scope` is the crate (and version) this filter names.
    fn names(&self, scope: &ScopeKey) -> bool {
        self.crate_name
            .as_deref()
            .is_some_and(|name| scope.crate_name() == normalize_crate_name(name))
            && self.version.as_deref().is_none_or(|v| scope.version() == v)
    }
}

/// Snapshots selected by a [`ScopeFilter`]. Iteration can be restarted and
/// always sees the snapshots as they were when the scan began.
#[derive(Debug, Clone, Default)]
pub struct ScopedItems {
    snapshots: Vec<Arc<ScopeSnapshot>>,
}

impl ScopedItems {
    pub fn iter(&self) -> impl Iterator<Item = &Arc<IndexedItem>> {
        self.snapshots.iter().flat_map(|snapshot| snapshot.iter())
    }

    pub fn scopes(&self) -> impl Iterator<Item = &ScopeKey> {
        self.snapshots.iter().map(|snapshot| snapshot.scope())
    }

    pub fn len(&self) -> usize {
        self.snapshots.iter().map(|snapshot| snapshot.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A scope's current snapshot. `None` until the first write for the scope
/// completes; readers skip such slots.
struct ScopeSlot {
    snapshot: RwLock<Option<Arc<ScopeSnapshot>>>,
    writer: Mutex<()>,
}

impl ScopeSlot {
    fn new(snapshot: Option<ScopeSnapshot>) -> Self {
        Self {
            snapshot: RwLock::new(snapshot.map(Arc::new)),
            writer: Mutex::new(()),
        }
    }

    fn current(&self) -> Option<Arc<ScopeSnapshot>> {
        read(&self.snapshot).clone()
    }
}

pub struct DocStore {
    scopes: RwLock<HashMap<ScopeKey, Arc<ScopeSlot>>>,
    disk: Option<DiskStore>,
    stemmer: Stemmer,
}

impl DocStore {
    /// A store that lives only as long as the process.
    pub fn in_memory() -> Self {
        Self {
            scopes: RwLock::new(HashMap::new()),
            disk: None,
            stemmer: Stemmer::create(Algorithm::English),
        }
    }

    /// Opens (or creates) a persistent store rooted at `dir`, loading every
    /// scope that survives validation.
    pub fn open(dir: &Path) -> Result<Self> {
        let (disk, loaded) = DiskStore::open(dir)?;
        let stemmer = Stemmer::create(Algorithm::English);

        let scopes = loaded
            .into_iter()
            .map(|scope| {
                let key = scope.scope.clone();
                let snapshot = ScopeSnapshot::build(scope.scope, scope.items, scope.written_at, &stemmer);
                (key, Arc::new(ScopeSlot::new(Some(snapshot))))
            })
            .collect::<HashMap<_, _>>();

        tracing::info!(
            path = %dir.display(),
            scopes = scopes.len(),
            "Opened documentation store"
        );

        Ok(Self {
            scopes: RwLock::new(scopes),
            disk: Some(disk),
            stemmer,
        })
    }

    /// Inserts or replaces one item (last write wins).
    pub fn put(&self, item: DocItem) -> Result<()> {
        let scope = item.scope();
        self.write_scope(&scope, |current| match current {
            Some(snapshot) => snapshot.with_item(item, SystemTime::now(), &self.stemmer),
            None => ScopeSnapshot::build(scope.clone(), [item], SystemTime::now(), &self.stemmer),
        })
        .map(|_| ())
    }

    /// Replaces the whole scope with `items`. Returns the stored item count.
    pub fn replace_scope(&self, scope: &ScopeKey, items: Vec<DocItem>) -> Result<usize> {
        if let Some(item) = items.iter().find(|item| item.scope() != *scope) {
            return Err(DocsError::storage(
                "store item",
                Path::new(&item.path),
                format!("item belongs to {} but is written to {}", item.scope(), scope),
            ));
        }

        let snapshot = ScopeSnapshot::build(scope.clone(), items, SystemTime::now(), &self.stemmer);
        let count = snapshot.len();
        self.write_scope(scope, |_| snapshot)?;

        tracing::info!(scope = %scope, items = count, "Replaced scope");
        Ok(count)
    }

    fn write_scope(
        &self,
        scope: &ScopeKey,
        update: impl FnOnce(Option<&ScopeSnapshot>) -> ScopeSnapshot,
    ) -> Result<Arc<ScopeSnapshot>> {
        loop {
            let slot = self.slot_for_write(scope);
            let _writer = lock(&slot.writer);

            // The slot may have been removed between lookup and locking.
            if !self.is_current_slot(scope, &slot) {
                continue;
            }

            let current = slot.current();
            let next = Arc::new(update(current.as_deref()));

            if let Some(disk) = &self.disk
                && let Err(e) = disk.write_scope(&next)
            {
                if current.is_none() {
                    self.drop_unwritten(scope, &slot);
                }
                return Err(e);
            }

            *write(&slot.snapshot) = Some(next.clone());
            return Ok(next);
        }
    }

    fn slot_for_write(&self, scope: &ScopeKey) -> Arc<ScopeSlot> {
        if let Some(slot) = read(&self.scopes).get(scope) {
            return slot.clone();
        }

        write(&self.scopes)
            .entry(scope.clone())
            .or_insert_with(|| Arc::new(ScopeSlot::new(None)))
            .clone()
    }

    fn is_current_slot(&self, scope: &ScopeKey, slot: &Arc<ScopeSlot>) -> bool {
        read(&self.scopes)
            .get(scope)
            .is_some_and(|current| Arc::ptr_eq(current, slot))
    }

    fn drop_unwritten(&self, scope: &ScopeKey, slot: &Arc<ScopeSlot>) {
        let mut scopes = write(&self.scopes);
        if scopes.get(scope).is_some_and(|current| Arc::ptr_eq(current, slot)) {
            scopes.remove(scope);
        }
    }

    pub fn snapshot(&self, scope: &ScopeKey) -> Option<Arc<ScopeSnapshot>> {
        read(&self.scopes).get(scope).and_then(|slot| slot.current())
    }

    pub fn contains_scope(&self, scope: &ScopeKey) -> bool {
        self.snapshot(scope).is_some()
    }

    /// Looks up one item in an explicit scope.
    pub fn get(&self, scope: &ScopeKey, path: &str) -> Result<Arc<IndexedItem>> {
        let snapshot = self.snapshot(scope).ok_or_else(|| DocsError::UnknownScope {
            crate_name: scope.crate_name().to_string(),
            version: Some(scope.version().to_string()),
        })?;

        let path = normalize_item_path(path);
        snapshot.get(&path).cloned().ok_or_else(|| DocsError::NotFound {
            suggestions: suggest_paths(&path, snapshot.paths(), MAX_SUGGESTIONS),
            path,
        })
    }

    /// Resolves a path without an explicit scope. Scopes of the crate named by
    /// the first path segment are tried first, newest first, then every other
    /// scope.
    pub fn find_path(&self, path: &str) -> Result<Arc<IndexedItem>> {
        let path = normalize_item_path(path);
        let first_segment = normalize_crate_name(path.split("::").next().unwrap_or_default());

        let mut snapshots = self.all_snapshots();
        snapshots.sort_by(|a, b| {
            let a_owns = a.scope().crate_name() == first_segment;
            let b_owns = b.scope().crate_name() == first_segment;
            b_owns
                .cmp(&a_owns)
                .then_with(|| b.written_at().cmp(&a.written_at()))
                .then_with(|| b.scope().cmp(a.scope()))
        });

        if let Some(found) = snapshots.iter().find_map(|snapshot| snapshot.get(&path)) {
            return Ok(found.clone());
        }

        let owning: Vec<_> = snapshots
            .iter()
            .filter(|snapshot| snapshot.scope().crate_name() == first_segment)
            .collect();
        let candidates = if owning.is_empty() {
            snapshots.iter().collect()
        } else {
            owning
        };
        let suggestions = suggest_paths(
            &path,
            candidates.iter().flat_map(|snapshot| snapshot.paths()),
            MAX_SUGGESTIONS,
        );

        Err(DocsError::NotFound { path, suggestions })
    }

    /// Snapshots matching `filter`, in scope order. Naming a crate (or a crate
    /// version) that has never been stored is an `UnknownScope` error.
    pub fn scan(&self, filter: &ScopeFilter) -> Result<ScopedItems> {
        let mut snapshots: Vec<_> = read(&self.scopes)
            .iter()
            .filter(|(scope, _)| filter.matches(scope))
            .filter_map(|(_, slot)| slot.current())
            .collect();

        if let Some(crate_name) = &filter.crate_name
            && !snapshots.iter().any(|snapshot| filter.names(snapshot.scope()))
        {
            return Err(DocsError::UnknownScope {
                crate_name: crate_name.clone(),
                version: filter.version.clone(),
            });
        }

        snapshots.sort_by(|a, b| a.scope().cmp(b.scope()));
        Ok(ScopedItems { snapshots })
    }

    fn all_snapshots(&self) -> Vec<Arc<ScopeSnapshot>> {
        read(&self.scopes)
            .values()
            .filter_map(|slot| slot.current())
            .collect()
    }

    /// Every stored scope, in scope order.
    pub fn scopes(&self) -> Vec<ScopeInfo> {
        let mut scopes: Vec<_> = self.all_snapshots().iter().map(|s| s.info()).collect();
        scopes.sort_by(|a, b| a.scope.cmp(&b.scope));
        scopes
    }

    /// Removes one scope as a unit. Returns whether it existed.
    pub fn remove_scope(&self, scope: &ScopeKey) -> Result<bool> {
        self.remove_scope_if(scope, |_| true)
    }

    /// Removes `scope` only if its current snapshot was written at
    /// `written_at`. A scope rewritten since then is kept.
    pub fn remove_scope_written_at(&self, scope: &ScopeKey, written_at: SystemTime) -> Result<bool> {
        self.remove_scope_if(scope, |snapshot| snapshot.written_at() == written_at)
    }

    /// Checks `condition` against the current snapshot under the slot's writer
    /// lock, so no write can land between the check and the removal.
    fn remove_scope_if(&self, scope: &ScopeKey, condition: impl FnOnce(&ScopeSnapshot) -> bool) -> Result<bool> {
        let Some(slot) = read(&self.scopes).get(scope).cloned() else {
            return Ok(false);
        };

        let _writer = lock(&slot.writer);
        match slot.current() {
            Some(snapshot) if condition(&snapshot) => {}
            Some(_) => {
                tracing::debug!(scope = %scope, "Scope rewritten since selection; not removed");
                return Ok(false);
            }
            None => return Ok(false),
        }
        {
            let mut scopes = write(&self.scopes);
            match scopes.get(scope) {
                Some(current) if Arc::ptr_eq(current, &slot) => {
                    scopes.remove(scope);
                }
                _ => return Ok(false),
            }
        }

        if let Some(disk) = &self.disk {
            disk.remove_scope(scope)?;
        }

        tracing::info!(scope = %scope, "Removed scope");
        Ok(true)
    }

    pub fn evict(&self, policy: &EvictionPolicy) -> Result<EvictionReport> {
        self.evict_at(policy, SystemTime::now())
    }

    /// Applies `policy` as if the current time were `now`.
    pub fn evict_at(&self, policy: &EvictionPolicy, now: SystemTime) -> Result<EvictionReport> {
        let scopes = self.scopes();
        let victims = eviction::select_victims(&scopes, policy, now);

        let mut report = EvictionReport::default();
        for info in scopes.iter().filter(|info| victims.contains(&info.scope)) {
            if self.remove_scope_written_at(&info.scope, info.written_at)? {
                report.freed_bytes += info.size_bytes;
                report.removed.push(info.scope.clone());
            }
        }
        report.remaining_bytes = self.scopes().iter().map(|info| info.size_bytes).sum();

        if !report.removed.is_empty() {
            tracing::info!(
                removed = report.removed.len(),
                freed_bytes = report.freed_bytes,
                remaining_bytes = report.remaining_bytes,
                "Evicted scopes"
            );
        }
        Ok(report)
    }
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ItemKind;
    use assert2::{check, let_assert};

    fn item(scope: &ScopeKey, path: &str) -> DocItem {
        let mut item = DocItem::new(scope, path, ItemKind::Function);
        item.description = format!("Documentation for {}.", path);
        item
    }

    #[test]
    fn replace_scope_swaps_whole_contents() {
        let store = DocStore::in_memory();
        let scope = ScopeKey::new("demo", "0.1.0");

        store
            .replace_scope(&scope, vec![item(&scope, "demo::add"), item(&scope, "demo::sub")])
            .unwrap();
        store.replace_scope(&scope, vec![item(&scope, "demo::mul")]).unwrap();

        let snapshot = store.snapshot(&scope).unwrap();
        check!(snapshot.paths().collect::<Vec<_>>() == vec!["demo::mul"]);
    }

    #[test]
    fn put_is_last_write_wins() {
        let store = DocStore::in_memory();
        let scope = ScopeKey::new("demo", "0.1.0");

        let mut first = item(&scope, "demo::add");
        first.description = "first".to_string();
        let mut second = first.clone();
        second.description = "second".to_string();

        store.put(first).unwrap();
        store.put(second).unwrap();

        let stored = store.get(&scope, "demo::add").unwrap();
        check!(stored.item.description == "second");
        check!(store.snapshot(&scope).unwrap().len() == 1);
    }

    #[test]
    fn replace_scope_rejects_foreign_items() {
        let store = DocStore::in_memory();
        let scope = ScopeKey::new("demo", "0.1.0");
        let other = ScopeKey::new("other", "0.1.0");

        let_assert!(Err(DocsError::Storage { .. }) = store.replace_scope(&scope, vec![item(&other, "other::x")]));
        check!(!store.contains_scope(&scope));
    }

    #[test]
    fn get_distinguishes_unknown_scope_from_missing_item() {
        let store = DocStore::in_memory();
        let scope = ScopeKey::new("demo", "0.1.0");
        store.replace_scope(&scope, vec![item(&scope, "demo::add")]).unwrap();

        let_assert!(Err(DocsError::UnknownScope { .. }) = store.get(&ScopeKey::new("demo", "9.9.9"), "demo::add"));
        let_assert!(Err(DocsError::NotFound { suggestions, .. }) = store.get(&scope, "demo::ad"));
        check!(suggestions == vec!["demo::add".to_string()]);
    }

    #[test]
    fn get_accepts_dot_separated_paths() {
        let store = DocStore::in_memory();
        let scope = ScopeKey::new("demo", "0.1.0");
        store.replace_scope(&scope, vec![item(&scope, "demo::add")]).unwrap();

        check!(store.get(&scope, "demo.add").is_ok());
    }

    #[test]
    fn find_path_prefers_newest_scope_of_owning_crate() {
        let store = DocStore::in_memory();
        let old = ScopeKey::new("demo", "0.1.0");
        let new = ScopeKey::new("demo", "0.2.0");
        store.replace_scope(&old, vec![item(&old, "demo::add")]).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        store.replace_scope(&new, vec![item(&new, "demo::add")]).unwrap();

        let found = store.find_path("demo::add").unwrap();
        check!(found.item.version == "0.2.0");
    }

    #[test]
    fn find_path_reports_suggestions() {
        let store = DocStore::in_memory();
        let scope = ScopeKey::new("demo", "0.1.0");
        store.replace_scope(&scope, vec![item(&scope, "demo::add")]).unwrap();

        let_assert!(Err(err) = store.find_path("demo::addd"));
        check!(err.error_type() == "NotFound");
        check!(err.suggestion().unwrap().contains("demo::add"));
    }

    #[test]
    fn scan_by_crate_requires_known_scope() {
        let store = DocStore::in_memory();
        let_assert!(Err(DocsError::UnknownScope { crate_name, .. }) = store.scan(&ScopeFilter::for_crate("serde-json")));
        check!(crate_name == "serde_json");
    }

    #[test]
    fn scan_can_exclude_stdlib() {
        let store = DocStore::in_memory();
        let std = ScopeKey::new("std", "1.80.0");
        let demo = ScopeKey::new("demo", "0.1.0");
        store.replace_scope(&std, vec![item(&std, "std::vec::Vec")]).unwrap();
        store.replace_scope(&demo, vec![item(&demo, "demo::add")]).unwrap();

        let everything = store.scan(&ScopeFilter::all()).unwrap();
        check!(everything.len() == 2);

        let without_std = store.scan(&ScopeFilter::all().include_std(false)).unwrap();
        check!(without_std.scopes().collect::<Vec<_>>() == vec![&demo]);

        // A named crate is searched even when it is a stdlib crate.
        let only_std = store.scan(&ScopeFilter::for_crate("std").include_std(false)).unwrap();
        check!(only_std.len() == 1);
    }

    #[test]
    fn named_crate_can_include_stdlib() {
        let store = DocStore::in_memory();
        let std = ScopeKey::new("std", "1.80.0");
        let demo = ScopeKey::new("demo", "0.1.0");
        let other = ScopeKey::new("other", "0.1.0");
        store.replace_scope(&std, vec![item(&std, "std::vec::Vec")]).unwrap();
        store.replace_scope(&demo, vec![item(&demo, "demo::add")]).unwrap();
        store.replace_scope(&other, vec![item(&other, "other::x")]).unwrap();

        let with_std = store.scan(&ScopeFilter::for_crate("demo").include_std(true)).unwrap();
        check!(with_std.scopes().collect::<Vec<_>>() == vec![&demo, &std]);

        let without_std = store.scan(&ScopeFilter::for_crate("demo")).unwrap();
        check!(without_std.scopes().collect::<Vec<_>>() == vec![&demo]);

        // Stdlib scopes alone do not make an unknown crate known.
        let_assert!(
            Err(DocsError::UnknownScope { .. }) = store.scan(&ScopeFilter::for_crate("missing").include_std(true))
        );
        let_assert!(
            Err(DocsError::UnknownScope { .. }) =
                store.scan(&ScopeFilter::for_crate("demo").with_version("9.9.9").include_std(true))
        );
    }

    #[test]
    fn scope_rewritten_after_selection_is_not_removed() {
        let store = DocStore::in_memory();
        let scope = ScopeKey::new("demo", "0.1.0");
        store.replace_scope(&scope, vec![item(&scope, "demo::a")]).unwrap();
        let selected = store.snapshot(&scope).unwrap().written_at();

        std::thread::sleep(std::time::Duration::from_millis(5));
        store.replace_scope(&scope, vec![item(&scope, "demo::b")]).unwrap();

        check!(!store.remove_scope_written_at(&scope, selected).unwrap());
        check!(store.get(&scope, "demo::b").is_ok());

        let current = store.snapshot(&scope).unwrap().written_at();
        check!(store.remove_scope_written_at(&scope, current).unwrap());
        check!(!store.contains_scope(&scope));
    }

    #[test]
    fn scan_is_restartable() {
        let store = DocStore::in_memory();
        let scope = ScopeKey::new("demo", "0.1.0");
        store
            .replace_scope(&scope, vec![item(&scope, "demo::b"), item(&scope, "demo::a")])
            .unwrap();

        let items = store.scan(&ScopeFilter::all()).unwrap();
        let first: Vec<_> = items.iter().map(|i| i.item.path.clone()).collect();
        let second: Vec<_> = items.iter().map(|i| i.item.path.clone()).collect();
        check!(first == vec!["demo::a".to_string(), "demo::b".to_string()]);
        check!(first == second);
    }

    #[test]
    fn scan_keeps_snapshot_across_replacement() {
        let store = DocStore::in_memory();
        let scope = ScopeKey::new("demo", "0.1.0");
        store.replace_scope(&scope, vec![item(&scope, "demo::a")]).unwrap();

        let before = store.scan(&ScopeFilter::all()).unwrap();
        store.replace_scope(&scope, vec![item(&scope, "demo::b")]).unwrap();

        check!(before.iter().map(|i| i.item.path.as_str()).collect::<Vec<_>>() == vec!["demo::a"]);
    }

    #[test]
    fn remove_scope_reports_presence() {
        let store = DocStore::in_memory();
        let scope = ScopeKey::new("demo", "0.1.0");
        store.replace_scope(&scope, vec![item(&scope, "demo::a")]).unwrap();

        check!(store.remove_scope(&scope).unwrap());
        check!(!store.remove_scope(&scope).unwrap());
        check!(store.scopes().is_empty());
    }
}
