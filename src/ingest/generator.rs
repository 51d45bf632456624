//! Seam to the external documentation tool.

use crate::error::{DocsError, Result};
use crate::types::ScopeKey;
use futures::FutureExt;
use futures::future::BoxFuture;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::LazyLock;
use tokio_util::sync::CancellationToken;

static CRATE_NAME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_-]+$").unwrap());
static VERSION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+(\.\d+){0,2}").unwrap());

/// Where a crate came from relative to the project being documented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrateOrigin {
    /// The project itself (or a member of its workspace).
    Local,
    /// A normal dependency resolved by cargo.
    External,
    /// A standard library crate shipped with the toolchain.
    Standard,
}

/// A crate to generate documentation for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrateTarget {
    /// Package name as written in `Cargo.toml`.
    pub name: String,
    pub version: String,
    /// Library target name; rustdoc names the JSON file and the root module after it.
    pub lib_name: String,
    /// Directory containing the package's `Cargo.toml`.
    pub manifest_dir: PathBuf,
    pub origin: CrateOrigin,
}

impl CrateTarget {
    pub fn scope(&self) -> ScopeKey {
        ScopeKey::new(&self.lib_name, self.version.clone())
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.manifest_dir.join("Cargo.toml")
    }
}

/// Produces raw rustdoc JSON for a crate.
///
/// Implementations must stop promptly once `cancel` fires; the returned bytes
/// are then ignored.
pub trait DocGenerator: Send + Sync + 'static {
    fn generate(
        &self,
        target: &CrateTarget,
        cancel: CancellationToken,
    ) -> BoxFuture<'static, Result<Vec<u8>>>;
}

/// Runs `cargo +nightly rustdoc` with JSON output.
#[derive(Debug, Clone)]
pub struct CargoRustdocGenerator {
    target_dir: PathBuf,
}

impl CargoRustdocGenerator {
    pub fn new(target_dir: impl Into<PathBuf>) -> Self {
        Self {
            target_dir: target_dir.into(),
        }
    }

    /// JSON file rustdoc writes for `lib_name`.
    pub fn output_path(&self, lib_name: &str) -> PathBuf {
        self.target_dir
            .join("doc")
            .join(format!("{}.json", lib_name.replace('-', "_")))
    }
}

impl DocGenerator for CargoRustdocGenerator {
    fn generate(
        &self,
        target: &CrateTarget,
        cancel: CancellationToken,
    ) -> BoxFuture<'static, Result<Vec<u8>>> {
        let target = target.clone();
        let target_dir = self.target_dir.clone();
        let output_path = self.output_path(&target.lib_name);

        async move {
            validate_target(&target)?;
            run_rustdoc(&target, &target_dir, cancel).await?;

            tokio::fs::read(&output_path).await.map_err(|e| {
                DocsError::generation(format!(
                    "rustdoc succeeded for {} but {} could not be read: {}",
                    target.name,
                    output_path.display(),
                    e
                ))
            })
        }
        .boxed()
    }
}

/// Guards the arguments passed to the subprocess.
fn validate_target(target: &CrateTarget) -> Result<()> {
    if !CRATE_NAME.is_match(&target.name) || !CRATE_NAME.is_match(&target.lib_name) {
        return Err(DocsError::generation(format!(
            "invalid crate name '{}': must contain only alphanumeric characters, hyphens, and underscores",
            target.name
        )));
    }
    if !VERSION.is_match(&target.version) {
        return Err(DocsError::generation(format!(
            "invalid version '{}': must be in semver format (e.g., 1.0.0)",
            target.version
        )));
    }
    Ok(())
}

async fn run_rustdoc(target: &CrateTarget, target_dir: &Path, cancel: CancellationToken) -> Result<()> {
    let manifest_path = target.manifest_path();

    tracing::info!(
        crate_name = %target.name,
        version = %target.version,
        manifest = %manifest_path.display(),
        "Running cargo rustdoc"
    );

    let child = tokio::process::Command::new("cargo")
        .current_dir(&target.manifest_dir)
        .arg("+nightly")
        .arg("rustdoc")
        .arg("--lib")
        .arg("--manifest-path")
        .arg(&manifest_path)
        .arg("--target-dir")
        .arg(target_dir)
        .arg("--")
        .arg("-Z")
        .arg("unstable-options")
        .arg("--output-format")
        .arg("json")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| DocsError::generation(format!("failed to execute cargo rustdoc: {}", e)))?;

    let output = tokio::select! {
        output = child.wait_with_output() => output
            .map_err(|e| DocsError::generation(format!("cargo rustdoc did not complete: {}", e)))?,
        () = cancel.cancelled() => {
            tracing::info!(crate_name = %target.name, "Cancelled cargo rustdoc");
            return Err(DocsError::Cancelled { scope: target.scope().to_string() });
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        tracing::error!(
            crate_name = %target.name,
            manifest = %manifest_path.display(),
            stderr = %stderr,
            "Documentation generation failed"
        );
        let last_line = stderr.lines().rev().find(|line| !line.trim().is_empty()).unwrap_or_default();
        return Err(DocsError::generation(format!(
            "cargo rustdoc failed for '{}' ({}): {}",
            target.name,
            output.status,
            last_line.trim()
        )));
    }

    Ok(())
}
