//! On-disk layout of the documentation store.
//!
//! ```text
//! <root>/manifest.json       schema version and one entry per scope
//! <root>/scopes/<hash>.bin   postcard-encoded items of one scope
//! ```
//!
//! Files are written to a temporary sibling and renamed into place. The
//! manifest is rewritten after every scope write or removal.

use super::ScopeSnapshot;
use crate::error::{DocsError, Result};
use crate::types::{DocItem, ScopeKey};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use xxhash_rust::xxh3::xxh3_64;

/// Version of the on-disk layout. Bump when the manifest or scope file
/// encoding changes; older data is then discarded on open.
pub const SCHEMA_VERSION: u32 = 1;

const MANIFEST_FILE: &str = "manifest.json";
const SCOPES_DIR: &str = "scopes";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Manifest {
    schema_version: u32,
    scopes: Vec<ManifestEntry>,
}

impl Default for Manifest {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            scopes: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ManifestEntry {
    crate_name: String,
    version: String,
    file: String,
    /// xxh3 of the scope file contents.
    checksum: u64,
    size_bytes: u64,
    item_count: usize,
    /// Milliseconds since the Unix epoch.
    written_at: u64,
}

impl ManifestEntry {
    fn scope(&self) -> ScopeKey {
        ScopeKey::new(&self.crate_name, self.version.clone())
    }
}

#[derive(Serialize)]
struct ScopeFileRef<'a> {
    scope: &'a ScopeKey,
    items: Vec<&'a DocItem>,
}

#[derive(Deserialize)]
struct ScopeFile {
    scope: ScopeKey,
    items: Vec<DocItem>,
}

/// A scope read back from disk.
pub(super) struct LoadedScope {
    pub scope: ScopeKey,
    pub items: Vec<DocItem>,
    pub written_at: SystemTime,
}

pub(super) struct DiskStore {
    root: PathBuf,
    manifest: Mutex<Manifest>,
}

impl DiskStore {
    /// Opens the store at `root`, creating it if needed, and returns every
    /// scope whose file is present and intact.
    pub fn open(root: &Path) -> Result<(Self, Vec<LoadedScope>)> {
        let scopes_dir = root.join(SCOPES_DIR);
        std::fs::create_dir_all(&scopes_dir)
            .map_err(|e| DocsError::storage("create", &scopes_dir, e))?;

        let manifest_path = root.join(MANIFEST_FILE);
        let mut manifest = read_manifest(&manifest_path)?;

        let mut loaded = Vec::new();
        manifest.scopes.retain(|entry| {
            let path = scopes_dir.join(&entry.file);
            match load_scope(&path, entry) {
                Ok(scope) => {
                    loaded.push(scope);
                    true
                }
                Err(reason) => {
                    tracing::warn!(
                        scope = %entry.scope(),
                        file = %path.display(),
                        reason = %reason,
                        "Dropping unreadable scope"
                    );
                    false
                }
            }
        });

        let store = Self {
            root: root.to_path_buf(),
            manifest: Mutex::new(manifest),
        };

        store.remove_orphans()?;
        store.save_manifest(&store.lock_manifest())?;

        Ok((store, loaded))
    }

    /// Persists a snapshot, replacing any previous file of the same scope.
    pub fn write_scope(&self, snapshot: &ScopeSnapshot) -> Result<()> {
        let scope = snapshot.scope();
        let file = scope_file_name(scope);
        let path = self.root.join(SCOPES_DIR).join(&file);

        let contents = ScopeFileRef {
            scope,
            items: snapshot.iter().map(|indexed| &indexed.item).collect(),
        };
        let bytes = postcard::to_allocvec(&contents)
            .map_err(|e| DocsError::storage("encode", &path, e))?;
        write_atomic(&path, &bytes)?;

        let entry = ManifestEntry {
            crate_name: scope.crate_name().to_string(),
            version: scope.version().to_string(),
            file,
            checksum: xxh3_64(&bytes),
            size_bytes: bytes.len() as u64,
            item_count: snapshot.len(),
            written_at: to_millis(snapshot.written_at()),
        };

        let mut manifest = self.lock_manifest();
        manifest.scopes.retain(|existing| existing.scope() != *scope);
        manifest.scopes.push(entry);
        manifest
            .scopes
            .sort_by(|a, b| (&a.crate_name, &a.version).cmp(&(&b.crate_name, &b.version)));
        self.save_manifest(&manifest)?;

        tracing::debug!(scope = %scope, file = %path.display(), bytes = bytes.len(), "Wrote scope file");
        Ok(())
    }

    pub fn remove_scope(&self, scope: &ScopeKey) -> Result<()> {
        let mut manifest = self.lock_manifest();
        let before = manifest.scopes.len();
        manifest.scopes.retain(|entry| entry.scope() != *scope);
        if manifest.scopes.len() == before {
            return Ok(());
        }
        self.save_manifest(&manifest)?;
        drop(manifest);

        let path = self.root.join(SCOPES_DIR).join(scope_file_name(scope));
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(DocsError::storage("remove", &path, e)),
        }
    }

    fn lock_manifest(&self) -> std::sync::MutexGuard<'_, Manifest> {
        self.manifest.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn save_manifest(&self, manifest: &Manifest) -> Result<()> {
        let path = self.root.join(MANIFEST_FILE);
        let bytes = serde_json::to_vec_pretty(manifest)
            .map_err(|e| DocsError::storage("encode", &path, e))?;
        write_atomic(&path, &bytes)
    }

    /// Deletes files under `scopes/` that no manifest entry refers to,
    /// including leftovers of interrupted writes.
    fn remove_orphans(&self) -> Result<()> {
        let scopes_dir = self.root.join(SCOPES_DIR);
        let known: HashSet<String> = self
            .lock_manifest()
            .scopes
            .iter()
            .map(|entry| entry.file.clone())
            .collect();

        let entries = std::fs::read_dir(&scopes_dir)
            .map_err(|e| DocsError::storage("list", &scopes_dir, e))?;
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().into_owned();
            if known.contains(&name) {
                continue;
            }
            tracing::debug!(file = %entry.path().display(), "Removing orphaned scope file");
            if let Err(e) = std::fs::remove_file(entry.path()) {
                tracing::warn!(file = %entry.path().display(), error = %e, "Failed to remove orphaned file");
            }
        }
        Ok(())
    }
}

/// Reads the manifest. Missing or outdated manifests yield an empty one
/// (outdated scope files are then removed as orphans). A manifest written by
/// a newer schema is an error.
fn read_manifest(path: &Path) -> Result<Manifest> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Manifest::default()),
        Err(e) => return Err(DocsError::storage("read", path, e)),
    };

    let value: serde_json::Value = match serde_json::from_slice(&bytes) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Discarding unreadable manifest");
            return Ok(Manifest::default());
        }
    };

    let found = value
        .get("schema_version")
        .and_then(serde_json::Value::as_u64)
        .unwrap_or(0);

    if found > u64::from(SCHEMA_VERSION) {
        return Err(DocsError::storage(
            "open",
            path,
            format!(
                "store schema version {} is newer than supported version {}",
                found, SCHEMA_VERSION
            ),
        ));
    }

    if found < u64::from(SCHEMA_VERSION) {
        tracing::info!(
            path = %path.display(),
            found,
            current = SCHEMA_VERSION,
            "Store schema is outdated; discarding stored documentation"
        );
        return Ok(Manifest::default());
    }

    serde_json::from_value(value).or_else(|e| {
        tracing::warn!(path = %path.display(), error = %e, "Discarding malformed manifest");
        Ok(Manifest::default())
    })
}

fn load_scope(path: &Path, entry: &ManifestEntry) -> std::result::Result<LoadedScope, String> {
    let bytes = std::fs::read(path).map_err(|e| e.to_string())?;
    if xxh3_64(&bytes) != entry.checksum {
        return Err("checksum mismatch".to_string());
    }

    let file: ScopeFile = postcard::from_bytes(&bytes).map_err(|e| e.to_string())?;
    if file.scope != entry.scope() {
        return Err(format!("file holds scope {}", file.scope));
    }

    Ok(LoadedScope {
        scope: file.scope,
        items: file.items,
        written_at: UNIX_EPOCH + Duration::from_millis(entry.written_at),
    })
}

fn scope_file_name(scope: &ScopeKey) -> String {
    format!("{:016x}.bin", xxh3_64(scope.to_string().as_bytes()))
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    std::fs::write(&tmp, bytes).map_err(|e| DocsError::storage("write", &tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp);
        DocsError::storage("rename", &tmp, e)
    })
}

fn to_millis(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
}
