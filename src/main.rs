use clap::Parser;
use rust_docs_mcp::cli::{Cli, Commands};
use rust_docs_mcp::config::ServerConfig;
use rust_docs_mcp::server;
use rust_docs_mcp::store::EvictionPolicy;
use rust_docs_mcp::tools::{
    DocState, GenerateRequest, SearchRequest, ToolResponse, handle_generate, handle_search,
};
use serde::Serialize;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    rust_docs_mcp::tracing::init(&cli.log_level, cli.log_format);

    let config = ServerConfig::load(cli.config.as_deref())?;
    tracing::info!(db_path = %config.db_path.display(), "Starting rust-docs-mcp");

    let state = Arc::new(DocState::open(config)?);

    match cli.command() {
        Commands::Serve => server::serve(state).await?,
        Commands::Generate { path, no_deps } => {
            let request = GenerateRequest {
                crate_path: path,
                include_dependencies: !no_deps,
            };
            let response = ToolResponse::from_result(handle_generate(&state, request).await);
            finish(&response)?;
        }
        Commands::Search {
            query,
            crate_name,
            limit,
            no_std,
        } => {
            let request = SearchRequest {
                query,
                crate_name,
                max_results: limit,
                include_std: !no_std,
            };
            let response = ToolResponse::from_result(handle_search(&state, request).await);
            finish(&response)?;
        }
        Commands::Evict => {
            let store = state.store().clone();
            let policy = EvictionPolicy::from_config(state.config());
            let report = tokio::task::spawn_blocking(move || store.evict(&policy)).await?;
            let response = ToolResponse::from_result(report.map(|report| EvictSummary {
                removed: report.removed.iter().map(ToString::to_string).collect(),
                freed_bytes: report.freed_bytes,
                remaining_bytes: report.remaining_bytes,
            }));
            finish(&response)?;
        }
    }

    Ok(())
}

#[derive(Serialize)]
struct EvictSummary {
    removed: Vec<String>,
    freed_bytes: u64,
    remaining_bytes: u64,
}

/// Prints the tagged document; an error response becomes a failing exit.
fn finish<T: Serialize>(response: &ToolResponse<T>) -> anyhow::Result<()> {
    println!("{}", response.to_json());
    if response.is_success() {
        Ok(())
    } else {
        anyhow::bail!("command failed")
    }
}
