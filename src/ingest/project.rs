//! Documenting a local Cargo project and its dependencies.

use super::{CrateOrigin, CrateTarget, IngestReport, Ingestor};
use crate::config::expand_tilde;
use crate::error::{DocsError, Result};
use cargo_metadata::{DependencyKind, Metadata, MetadataCommand, Package};
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrateReport {
    #[serde(rename = "crate")]
    pub crate_name: String,
    pub version: String,
    pub origin: CrateOrigin,
    pub doc_count: usize,
    /// Already stored from an earlier run; not regenerated.
    pub cached: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrateFailure {
    #[serde(rename = "crate")]
    pub crate_name: String,
    pub version: String,
    pub error_type: &'static str,
    pub message: String,
}

/// Outcome of documenting a project. Dependency failures are collected here;
/// a failure of the project itself is returned as an error instead.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GenerationSummary {
    pub crates: Vec<CrateReport>,
    pub failures: Vec<CrateFailure>,
}

impl GenerationSummary {
    pub fn doc_count(&self) -> usize {
        self.crates.iter().map(|report| report.doc_count).sum()
    }
}

impl Ingestor {
    /// Documents the Cargo project at `crate_path` and, when
    /// `include_dependencies` is set, its normal dependencies.
    pub async fn generate_crate_docs(
        &self,
        crate_path: &str,
        include_dependencies: bool,
    ) -> Result<GenerationSummary> {
        let manifest_path = locate_manifest(crate_path).await?;
        let metadata = load_metadata(&manifest_path).await?;
        let (roots, dependencies) = resolve_targets(&metadata, &manifest_path, include_dependencies)?;

        tracing::info!(
            manifest = %manifest_path.display(),
            roots = roots.len(),
            dependencies = dependencies.len(),
            "Generating crate documentation"
        );

        let mut summary = GenerationSummary::default();
        for target in roots {
            let report = self.ingest_target(target.clone()).await?;
            summary.crates.push(crate_report(&target, &report));
        }

        for target in dependencies {
            if self.store().contains_scope(&target.scope()) {
                let doc_count = self
                    .store()
                    .snapshot(&target.scope())
                    .map_or(0, |snapshot| snapshot.len());
                tracing::debug!(scope = %target.scope(), "Dependency already stored");
                summary.crates.push(CrateReport {
                    crate_name: target.scope().crate_name().to_string(),
                    version: target.version.clone(),
                    origin: target.origin,
                    doc_count,
                    cached: true,
                });
                continue;
            }

            match self.ingest_target(target.clone()).await {
                Ok(report) => summary.crates.push(crate_report(&target, &report)),
                Err(e) => {
                    tracing::warn!(
                        crate_name = %target.name,
                        version = %target.version,
                        error = %e,
                        "Dependency documentation failed"
                    );
                    summary.failures.push(CrateFailure {
                        crate_name: target.name.clone(),
                        version: target.version.clone(),
                        error_type: e.error_type(),
                        message: e.to_string(),
                    });
                }
            }
        }

        Ok(summary)
    }
}

fn crate_report(target: &CrateTarget, report: &IngestReport) -> CrateReport {
    CrateReport {
        crate_name: report.crate_name.clone(),
        version: report.version.clone(),
        origin: target.origin,
        doc_count: report.doc_count,
        cached: false,
    }
}

/// Expands `~`, canonicalizes the path and requires a `Cargo.toml` in it.
async fn locate_manifest(crate_path: &str) -> Result<PathBuf> {
    let expanded = expand_tilde(crate_path.trim());
    let dir = tokio::fs::canonicalize(expanded.as_ref())
        .await
        .map_err(|e| DocsError::generation(format!("crate path '{}' is not accessible: {}", crate_path, e)))?;

    let manifest_path = dir.join("Cargo.toml");
    if !tokio::fs::try_exists(&manifest_path).await.unwrap_or(false) {
        return Err(DocsError::generation(format!(
            "no Cargo.toml found in {}",
            dir.display()
        )));
    }
    Ok(manifest_path)
}

async fn load_metadata(manifest_path: &Path) -> Result<Metadata> {
    let manifest_path = manifest_path.to_path_buf();
    tokio::task::spawn_blocking(move || {
        MetadataCommand::new()
            .manifest_path(&manifest_path)
            .exec()
            .map_err(|e| DocsError::generation(format!("cargo metadata failed: {}", e)))
    })
    .await
    .map_err(|e| DocsError::generation(format!("cargo metadata task failed: {}", e)))?
}

/// The project's own library crates, and their normal dependencies.
fn resolve_targets(
    metadata: &Metadata,
    manifest_path: &Path,
    include_dependencies: bool,
) -> Result<(Vec<CrateTarget>, Vec<CrateTarget>)> {
    let root_packages: Vec<&Package> = match metadata.root_package() {
        Some(package) => vec![package],
        None => metadata.workspace_packages(),
    };

    let roots: Vec<CrateTarget> = root_packages
        .iter()
        .filter_map(|package| crate_target(package, CrateOrigin::Local))
        .collect();
    if roots.is_empty() {
        return Err(DocsError::generation(format!(
            "{} has no library target to document",
            manifest_path.display()
        )));
    }

    if !include_dependencies {
        return Ok((roots, Vec::new()));
    }

    let local: HashSet<_> = metadata.workspace_members.iter().collect();
    let mut seen = HashSet::new();
    let mut dependencies = Vec::new();

    if let Some(resolve) = &metadata.resolve {
        for package in &root_packages {
            let Some(node) = resolve.nodes.iter().find(|node| node.id == package.id) else {
                continue;
            };
            for dep in &node.deps {
                let normal = dep.dep_kinds.iter().any(|info| info.kind == DependencyKind::Normal);
                if !normal || local.contains(&dep.pkg) || !seen.insert(dep.pkg.clone()) {
                    continue;
                }
                if let Some(target) = metadata
                    .packages
                    .iter()
                    .find(|candidate| candidate.id == dep.pkg)
                    .and_then(|package| crate_target(package, CrateOrigin::External))
                {
                    dependencies.push(target);
                }
            }
        }
    }

    dependencies.sort_by(|a, b| (&a.name, &a.version).cmp(&(&b.name, &b.version)));
    Ok((roots, dependencies))
}

fn crate_target(package: &Package, origin: CrateOrigin) -> Option<CrateTarget> {
    let lib = package
        .targets
        .iter()
        .find(|target| target.is_lib() || target.is_proc_macro())?;
    let manifest_dir = package.manifest_path.parent()?.as_std_path().to_path_buf();

    Some(CrateTarget {
        name: package.name.to_string(),
        version: package.version.to_string(),
        lib_name: lib.name.replace('-', "_"),
        manifest_dir,
        origin,
    })
}
