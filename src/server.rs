//! MCP server: the three documentation tools over stdio.

use crate::error::DocsError;
use crate::ingest::StdlibDocs;
use crate::schema::inline_schema_for_type;
use crate::store::eviction::{self, EvictionPolicy};
use crate::tools::{
    DetailsRequest, DocState, GenerateRequest, SearchRequest, ToolResponse, handle_details,
    handle_generate, handle_search,
};
use rmcp::{
    ServerHandler, ServiceExt,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::*,
    tool, tool_handler, tool_router,
    transport::stdio,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// MCP server for Rust documentation queries
#[derive(Clone)]
pub struct DocsServer {
    state: Arc<DocState>,
    tool_router: ToolRouter<Self>,
}

impl std::fmt::Debug for DocsServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocsServer")
            .field("state", &self.state)
            .finish()
    }
}

#[tool_router]
impl DocsServer {
    pub fn new(state: Arc<DocState>) -> Self {
        Self {
            state,
            tool_router: Self::tool_router(),
        }
    }

    pub const fn state(&self) -> &Arc<DocState> {
        &self.state
    }

    #[tool(
        description = "Fuzzy search over ingested Rust documentation. Matches item names, paths, descriptions and example captions; typos are tolerated. Returns ranked results with relevance scores. When nothing clears the match threshold, near misses are returned with match_type \"suggested\".",
        input_schema = inline_schema_for_type::<SearchRequest>()
    )]
    async fn search_rust_docs(
        &self,
        Parameters(request): Parameters<SearchRequest>,
    ) -> std::result::Result<String, String> {
        ToolResponse::from_result(handle_search(&self.state, request).await).into_tool_result()
    }

    #[tool(
        description = "Get the full documentation of a Rust item by its fully-qualified path (e.g. 'std::vec::Vec::push'): signature, parameters, return type, examples, notes, and summaries of its methods, fields and trait implementations.",
        input_schema = inline_schema_for_type::<DetailsRequest>()
    )]
    async fn get_rust_doc_details(
        &self,
        Parameters(request): Parameters<DetailsRequest>,
    ) -> std::result::Result<String, String> {
        ToolResponse::from_result(handle_details(&self.state, request).await).into_tool_result()
    }

    #[tool(
        description = "Generate and ingest documentation for a local Rust project (the directory containing Cargo.toml) and, by default, its dependencies. Requires the nightly toolchain. Concurrent requests for the same crate share one generation run.",
        input_schema = inline_schema_for_type::<GenerateRequest>()
    )]
    async fn generate_crate_docs(
        &self,
        Parameters(request): Parameters<GenerateRequest>,
    ) -> std::result::Result<String, String> {
        ToolResponse::from_result(handle_generate(&self.state, request).await).into_tool_result()
    }
}

#[tool_handler]
impl ServerHandler for DocsServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo::new(ServerCapabilities::builder().enable_tools().build())
            .with_protocol_version(ProtocolVersion::V_2024_11_05)
            .with_server_info(Implementation::from_build_env())
            .with_instructions(
                "rust-docs-mcp: fuzzy search over Rust documentation. \
                 Use generate_crate_docs on a project first, then search_rust_docs to find items \
                 and get_rust_doc_details to read one. The standard library is ingested \
                 automatically when rust-docs-json is installed."
                    .to_string(),
            )
    }
}

/// Runs the server on stdio until the client disconnects.
///
/// Periodic eviction and stdlib ingestion run in the background for the
/// lifetime of the server.
pub async fn serve(state: Arc<DocState>) -> anyhow::Result<()> {
    let shutdown = CancellationToken::new();

    let config = state.config();
    let evictor = eviction::spawn_periodic(
        state.store().clone(),
        EvictionPolicy::from_config(config),
        config.eviction_interval(),
        shutdown.child_token(),
    );
    spawn_stdlib_ingestion(state.clone(), shutdown.child_token());

    let server = DocsServer::new(state);
    let service = server.serve(stdio()).await.inspect_err(|e| {
        tracing::error!("Error serving MCP server: {:?}", e);
    })?;

    let result = service.waiting().await;
    shutdown.cancel();
    if let Err(e) = evictor.await {
        tracing::warn!(error = %e, "Eviction task ended abnormally");
    }
    result?;

    tracing::info!("MCP server stopped");
    Ok(())
}

fn spawn_stdlib_ingestion(state: Arc<DocState>, cancel: CancellationToken) {
    if state.config().default_crates.is_empty() {
        return;
    }

    tokio::spawn(async move {
        let work = async {
            let stdlib = StdlibDocs::discover().await?;
            stdlib
                .ingest_defaults(state.ingestor(), &state.config().default_crates)
                .await;
            Ok::<(), DocsError>(())
        };

        tokio::select! {
            () = cancel.cancelled() => {}
            result = work => {
                if let Err(e) = result {
                    tracing::warn!(
                        error = %e,
                        "Standard library docs unavailable; search covers generated crates only"
                    );
                }
            }
        }
    });
}
