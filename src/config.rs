//! Server configuration: defaults, `RUST_DOCS_*` environment overrides and an
//! optional TOML/JSON file.
//!
//! Precedence is defaults, then environment, then file. Unparsable environment
//! values are ignored with a warning; the merged result is validated once.

use crate::error::{DocsError, Result};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_CACHE_SIZE_LIMIT: u64 = 1024 * 1024 * 1024;
const DEFAULT_CACHE_TTL_SECS: u64 = 7 * 24 * 60 * 60;
const DEFAULT_MAX_SEARCH_RESULTS: usize = 10;
const DEFAULT_FUZZY_MATCH_THRESHOLD: f64 = 0.7;
const DEFAULT_GENERATION_TIMEOUT_SECS: u64 = 600;
const DEFAULT_MAX_SCAN_CANDIDATES: usize = 200_000;
const DEFAULT_SEARCH_TIME_BUDGET_MS: u64 = 2_000;
const DEFAULT_EVICTION_INTERVAL_SECS: u64 = 3_600;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Root directory of the persistent store and the generator's target dir.
    pub db_path: PathBuf,
    /// Maximum total size of stored scopes, in bytes.
    pub cache_size_limit: u64,
    /// Scopes not rewritten within this many seconds are evicted.
    pub cache_ttl: u64,
    /// Standard library crates ingested in the background at startup.
    pub default_crates: Vec<String>,
    /// Upper bound on `max_results` for a single search.
    pub max_search_results: usize,
    pub fuzzy_match_threshold: f64,
    /// Seconds before an ingestion run is abandoned.
    pub generation_timeout: u64,
    pub max_scan_candidates: usize,
    pub search_time_budget_ms: u64,
    /// Seconds between background eviction passes.
    pub eviction_interval: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            cache_size_limit: DEFAULT_CACHE_SIZE_LIMIT,
            cache_ttl: DEFAULT_CACHE_TTL_SECS,
            default_crates: vec!["std".to_string()],
            max_search_results: DEFAULT_MAX_SEARCH_RESULTS,
            fuzzy_match_threshold: DEFAULT_FUZZY_MATCH_THRESHOLD,
            generation_timeout: DEFAULT_GENERATION_TIMEOUT_SECS,
            max_scan_candidates: DEFAULT_MAX_SCAN_CANDIDATES,
            search_time_budget_ms: DEFAULT_SEARCH_TIME_BUDGET_MS,
            eviction_interval: DEFAULT_EVICTION_INTERVAL_SECS,
        }
    }
}

fn default_db_path() -> PathBuf {
    dirs::cache_dir()
        .map(|dir| dir.join("rust-docs-mcp"))
        .unwrap_or_else(|| PathBuf::from("./rust_docs_db"))
}

/// Configuration file contents; every field is optional and overrides the
/// environment when present.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    db_path: Option<PathBuf>,
    cache_size_limit: Option<u64>,
    cache_ttl: Option<u64>,
    default_crates: Option<Vec<String>>,
    max_search_results: Option<usize>,
    fuzzy_match_threshold: Option<f64>,
    generation_timeout: Option<u64>,
    max_scan_candidates: Option<usize>,
    search_time_budget_ms: Option<u64>,
    eviction_interval: Option<u64>,
}

impl ServerConfig {
    /// Loads configuration from the process environment and an optional file.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, |key| std::env::var(key).ok())
    }

    /// Loads configuration with an injectable environment lookup.
    pub fn load_with_env(path: Option<&Path>, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        config.apply_env(&env);

        if let Some(path) = path {
            let file = read_config_file(path)?;
            config.apply_file(file);
            tracing::debug!(path = %path.display(), "Loaded configuration file");
        }

        config.db_path = PathBuf::from(expand_tilde(&config.db_path.to_string_lossy()).as_ref());
        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self, env: &impl Fn(&str) -> Option<String>) {
        if let Some(value) = env("RUST_DOCS_DB_PATH").filter(|v| !v.trim().is_empty()) {
            self.db_path = PathBuf::from(value.trim());
        }
        if let Some(value) = parse_env(env, "RUST_DOCS_CACHE_SIZE_LIMIT") {
            self.cache_size_limit = value;
        }
        if let Some(value) = parse_env(env, "RUST_DOCS_CACHE_TTL") {
            self.cache_ttl = value;
        }
        if let Some(value) = env("RUST_DOCS_DEFAULT_CRATES") {
            self.default_crates = value
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(value) = parse_env(env, "RUST_DOCS_MAX_SEARCH_RESULTS") {
            self.max_search_results = value;
        }
        if let Some(value) = parse_env(env, "RUST_DOCS_FUZZY_MATCH_THRESHOLD") {
            self.fuzzy_match_threshold = value;
        }
        if let Some(value) = parse_env(env, "RUST_DOCS_GENERATION_TIMEOUT") {
            self.generation_timeout = value;
        }
    }

    fn apply_file(&mut self, file: ConfigFile) {
        let ConfigFile {
            db_path,
            cache_size_limit,
            cache_ttl,
            default_crates,
            max_search_results,
            fuzzy_match_threshold,
            generation_timeout,
            max_scan_candidates,
            search_time_budget_ms,
            eviction_interval,
        } = file;

        if let Some(v) = db_path {
            self.db_path = v;
        }
        if let Some(v) = cache_size_limit {
            self.cache_size_limit = v;
        }
        if let Some(v) = cache_ttl {
            self.cache_ttl = v;
        }
        if let Some(v) = default_crates {
            self.default_crates = v;
        }
        if let Some(v) = max_search_results {
            self.max_search_results = v;
        }
        if let Some(v) = fuzzy_match_threshold {
            self.fuzzy_match_threshold = v;
        }
        if let Some(v) = generation_timeout {
            self.generation_timeout = v;
        }
        if let Some(v) = max_scan_candidates {
            self.max_scan_candidates = v;
        }
        if let Some(v) = search_time_budget_ms {
            self.search_time_budget_ms = v;
        }
        if let Some(v) = eviction_interval {
            self.eviction_interval = v;
        }
    }

    /// Checks value ranges. Called once after all sources are merged.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.fuzzy_match_threshold) {
            return Err(DocsError::config(format!(
                "fuzzy_match_threshold must be between 0 and 1, got {}",
                self.fuzzy_match_threshold
            )));
        }
        if self.max_search_results == 0 {
            return Err(DocsError::config("max_search_results must be at least 1"));
        }
        if self.max_scan_candidates == 0 {
            return Err(DocsError::config("max_scan_candidates must be at least 1"));
        }
        for (name, value) in [
            ("generation_timeout", self.generation_timeout),
            ("search_time_budget_ms", self.search_time_budget_ms),
            ("eviction_interval", self.eviction_interval),
            ("cache_ttl", self.cache_ttl),
        ] {
            if value == 0 {
                return Err(DocsError::config(format!("{} must be non-zero", name)));
            }
        }
        if self.db_path.as_os_str().is_empty() {
            return Err(DocsError::config("db_path must not be empty"));
        }
        Ok(())
    }

    pub const fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl)
    }

    pub const fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation_timeout)
    }

    pub const fn search_time_budget(&self) -> Duration {
        Duration::from_millis(self.search_time_budget_ms)
    }

    pub const fn eviction_interval(&self) -> Duration {
        Duration::from_secs(self.eviction_interval)
    }
}

fn parse_env<T: std::str::FromStr>(env: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = env(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Ignoring unparsable environment override");
            None
        }
    }
}

fn read_config_file(path: &Path) -> Result<ConfigFile> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        DocsError::config(format!("failed to read {}: {}", path.display(), e))
    })?;

    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_json {
        serde_json::from_str(&contents)
            .map_err(|e| DocsError::config(format!("invalid JSON in {}: {}", path.display(), e)))
    } else {
        toml::from_str(&contents)
            .map_err(|e| DocsError::config(format!("invalid TOML in {}: {}", path.display(), e)))
    }
}

/// Expands tilde (`~`) in a path to the user's home directory.
///
/// - `~/foo` becomes `/home/user/foo`
/// - `~` becomes `/home/user`
/// - Other paths are returned unchanged
pub fn expand_tilde(path: &str) -> Cow<'_, str> {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return Cow::Owned(home.join(stripped).display().to_string());
        }
    } else if path == "~"
        && let Some(home) = dirs::home_dir()
    {
        return Cow::Owned(home.display().to_string());
    }
    Cow::Borrowed(path)
}
