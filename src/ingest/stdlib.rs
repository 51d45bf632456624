//! Standard library documentation discovery and ingestion.
//!
//! Pre-generated rustdoc JSON for std, core, alloc and the other standard
//! library crates ships with the nightly toolchain's `rust-docs-json`
//! component.

use super::{IngestReport, Ingestor};
use crate::error::{DocsError, Result};
use crate::types::{STDLIB_CRATES, ScopeKey, normalize_crate_name};
use std::path::{Path, PathBuf};

/// Location of the JSON docs inside a sysroot.
const JSON_DOCS_DIR: &str = "share/doc/rust/json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StdlibDocs {
    json_dir: PathBuf,
    /// Toolchain version used as the scope version, e.g. `1.86.0-nightly`.
    version: String,
}

impl StdlibDocs {
    /// Finds the nightly sysroot and verifies that `rust-docs-json` is installed.
    pub async fn discover() -> Result<Self> {
        let sysroot = rustc_output(&["+nightly", "--print", "sysroot"]).await?;
        let json_dir = PathBuf::from(sysroot).join(JSON_DOCS_DIR);

        if !tokio::fs::try_exists(json_dir.join("std.json")).await.unwrap_or(false) {
            return Err(DocsError::generation(format!(
                "std.json not found in {}. Install with: rustup component add rust-docs-json --toolchain nightly",
                json_dir.display()
            )));
        }

        let version_line = rustc_output(&["+nightly", "--version"]).await?;
        let version = parse_rustc_version(&version_line).ok_or_else(|| {
            DocsError::generation(format!("unrecognized rustc version output: {}", version_line))
        })?;

        tracing::info!(
            path = %json_dir.display(),
            version = %version,
            "Discovered stdlib docs"
        );

        Ok(Self::from_dir(json_dir, version))
    }

    pub fn from_dir(json_dir: impl Into<PathBuf>, version: impl Into<String>) -> Self {
        Self {
            json_dir: json_dir.into(),
            version: version.into(),
        }
    }

    pub fn json_dir(&self) -> &Path {
        &self.json_dir
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn doc_path(&self, crate_name: &str) -> PathBuf {
        self.json_dir.join(format!("{}.json", crate_name))
    }

    pub fn scope(&self, crate_name: &str) -> ScopeKey {
        ScopeKey::new(crate_name, self.version.clone())
    }

    pub fn is_stdlib_crate(crate_name: &str) -> bool {
        STDLIB_CRATES.contains(&normalize_crate_name(crate_name).as_str())
    }

    /// Ingests one stdlib crate unless its scope is already stored.
    /// Returns `None` when nothing had to be done.
    pub async fn ingest(&self, ingestor: &Ingestor, crate_name: &str) -> Result<Option<IngestReport>> {
        let crate_name = normalize_crate_name(crate_name);
        if !Self::is_stdlib_crate(&crate_name) {
            return Err(DocsError::config(format!(
                "'{}' is not a standard library crate",
                crate_name
            )));
        }

        let scope = self.scope(&crate_name);
        if ingestor.store().contains_scope(&scope) {
            tracing::debug!(scope = %scope, "Stdlib scope already stored");
            return Ok(None);
        }

        let path = self.doc_path(&crate_name);
        let bytes = tokio::fs::read(&path).await.map_err(|e| {
            DocsError::generation(format!(
                "standard library docs for '{}' not readable at {}: {}",
                crate_name,
                path.display(),
                e
            ))
        })?;

        ingestor.ingest_json(scope, bytes).await.map(Some)
    }

    /// Ingests every stdlib crate in `crates` that is not stored yet. Failures
    /// are logged per crate.
    pub async fn ingest_defaults(&self, ingestor: &Ingestor, crates: &[String]) {
        for crate_name in crates {
            if !Self::is_stdlib_crate(crate_name) {
                tracing::warn!(crate_name = %crate_name, "Skipping non-stdlib default crate");
                continue;
            }
            match self.ingest(ingestor, crate_name).await {
                Ok(Some(report)) => tracing::info!(
                    crate_name = %crate_name,
                    doc_count = report.doc_count,
                    "Ingested stdlib crate"
                ),
                Ok(None) => {}
                Err(e) => tracing::warn!(
                    crate_name = %crate_name,
                    error = %e,
                    "Failed to ingest stdlib crate"
                ),
            }
        }
    }
}

async fn rustc_output(args: &[&str]) -> Result<String> {
    let output = tokio::process::Command::new("rustc")
        .args(args)
        .output()
        .await
        .map_err(|e| DocsError::generation(format!("failed to run rustc: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(DocsError::generation(format!(
            "nightly toolchain not available: {}",
            stderr.trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// `rustc 1.86.0-nightly (abc 2025-01-01)` → `1.86.0-nightly`.
fn parse_rustc_version(line: &str) -> Option<String> {
    let mut words = line.split_whitespace();
    (words.next()? == "rustc").then_some(())?;
    words.next().map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::check;
    use rstest::rstest;

    #[rstest]
    #[case("std", true)]
    #[case("core", true)]
    #[case("alloc", true)]
    #[case("proc-macro", true)]
    #[case("serde", false)]
    #[case("tokio", false)]
    fn stdlib_crates_are_recognized(#[case] name: &str, #[case] expected: bool) {
        check!(StdlibDocs::is_stdlib_crate(name) == expected);
    }

    #[rstest]
    #[case("rustc 1.86.0-nightly (854f22563 2025-01-31)", Some("1.86.0-nightly"))]
    #[case("rustc 1.80.0", Some("1.80.0"))]
    #[case("cargo 1.80.0", None)]
    #[case("", None)]
    fn rustc_version_is_parsed(#[case] line: &str, #[case] expected: Option<&str>) {
        check!(parse_rustc_version(line).as_deref() == expected);
    }

    #[test]
    fn doc_path_and_scope() {
        let stdlib = StdlibDocs::from_dir("/sysroot/share/doc/rust/json", "1.86.0-nightly");
        check!(stdlib.doc_path("core") == PathBuf::from("/sysroot/share/doc/rust/json/core.json"));
        check!(stdlib.scope("std").to_string() == "std@1.86.0-nightly");
    }

    #[tokio::test]
    async fn discover_reports_missing_toolchain_as_error() {
        // Requires nightly with rust-docs-json; otherwise discovery must fail cleanly.
        match StdlibDocs::discover().await {
            Ok(stdlib) => { check!(stdlib.doc_path("std").exists()); }
            Err(e) => { check!(e.error_type() == "GenerationError"); }
        }
    }
}
