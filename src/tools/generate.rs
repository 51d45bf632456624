//! `generate_crate_docs`: document a local project and its dependencies.

use super::{DocState, default_true};
use crate::error::Result;
use crate::ingest::{CrateFailure, CrateReport};
use rmcp::schemars;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Deserialize, schemars::JsonSchema)]
pub struct GenerateRequest {
    /// Path to the project directory containing Cargo.toml (`~` is expanded)
    pub crate_path: String,
    /// Also document the project's normal dependencies (default: true)
    #[serde(default = "default_true")]
    pub include_dependencies: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerateResponse {
    pub message: String,
    pub doc_count: usize,
    pub crates: Vec<CrateReport>,
    pub failures: Vec<CrateFailure>,
}

pub async fn handle_generate(state: &Arc<DocState>, request: GenerateRequest) -> Result<GenerateResponse> {
    let summary = state
        .ingestor()
        .generate_crate_docs(&request.crate_path, request.include_dependencies)
        .await?;

    let doc_count = summary.doc_count();
    let mut message = format!(
        "Documented {} crate{} ({} items)",
        summary.crates.len(),
        if summary.crates.len() == 1 { "" } else { "s" },
        doc_count
    );
    if !summary.failures.is_empty() {
        message.push_str(&format!("; {} dependencies failed", summary.failures.len()));
    }

    Ok(GenerateResponse {
        message,
        doc_count,
        crates: summary.crates,
        failures: summary.failures,
    })
}
