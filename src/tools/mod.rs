//! The three tool operations and their tagged JSON responses.
//!
//! Every handler returns `Result<T>`; [`ToolResponse`] turns that into
//! `{"status": "success", ...}` or `{"status": "error", "error_type", "message", "suggestion"}`.

pub mod details;
pub mod generate;
pub mod search;

pub use details::{ChildSummary, DetailsRequest, DetailsResponse, Documentation, handle_details};
pub use generate::{GenerateRequest, GenerateResponse, handle_generate};
pub use search::{SearchRequest, SearchResponse, handle_search};

use crate::config::ServerConfig;
use crate::error::{DocsError, Result};
use crate::ingest::{CargoRustdocGenerator, DocGenerator, Ingestor};
use crate::search::{SearchEngine, SearchOptions};
use crate::store::DocStore;
use serde::Serialize;
use std::sync::Arc;

/// Shared state behind every tool call.
pub struct DocState {
    config: ServerConfig,
    store: Arc<DocStore>,
    engine: Arc<SearchEngine>,
    ingestor: Ingestor,
}

impl std::fmt::Debug for DocState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocState")
            .field("db_path", &self.config.db_path)
            .field("scopes", &self.store.scopes().len())
            .finish_non_exhaustive()
    }
}

impl DocState {
    pub fn new(config: ServerConfig, store: Arc<DocStore>, generator: Arc<dyn DocGenerator>) -> Self {
        let engine = Arc::new(SearchEngine::new(store.clone(), SearchOptions::from_config(&config)));
        let ingestor = Ingestor::new(store.clone(), generator, config.generation_timeout());
        Self {
            config,
            store,
            engine,
            ingestor,
        }
    }

    /// Opens the persistent store under `db_path/store` and generates with
    /// `cargo rustdoc` into `db_path/build`.
    pub fn open(config: ServerConfig) -> Result<Self> {
        let store = Arc::new(DocStore::open(&config.db_path.join("store"))?);
        let generator = Arc::new(CargoRustdocGenerator::new(config.db_path.join("build")));
        Ok(Self::new(config, store, generator))
    }

    pub const fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub const fn store(&self) -> &Arc<DocStore> {
        &self.store
    }

    pub const fn engine(&self) -> &Arc<SearchEngine> {
        &self.engine
    }

    pub const fn ingestor(&self) -> &Ingestor {
        &self.ingestor
    }
}

/// Error half of a tool response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub error_type: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl From<&DocsError> for ErrorBody {
    fn from(error: &DocsError) -> Self {
        Self {
            error_type: error.error_type(),
            message: error.to_string(),
            suggestion: error.suggestion(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ToolResponse<T> {
    Success(T),
    Error(ErrorBody),
}

impl<T: Serialize> ToolResponse<T> {
    pub fn from_result(result: Result<T>) -> Self {
        match result {
            Ok(body) => Self::Success(body),
            Err(e) => {
                tracing::debug!(error_type = e.error_type(), error = %e, "Tool call failed");
                Self::Error(ErrorBody::from(&e))
            }
        }
    }

    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| {
            tracing::error!(error = %e, "Failed to serialize tool response");
            let body = ErrorBody {
                error_type: "SerializationError",
                message: e.to_string(),
                suggestion: None,
            };
            serde_json::to_string(&ToolResponse::<()>::Error(body))
                .unwrap_or_else(|_| String::from(r#"{"status":"error"}"#))
        })
    }

    /// Shape expected by the MCP tool router: the JSON document either way,
    /// with errors on the `Err` side so clients flag them.
    pub fn into_tool_result(self) -> std::result::Result<String, String> {
        let json = self.to_json();
        if self.is_success() { Ok(json) } else { Err(json) }
    }
}

const fn default_true() -> bool {
    true
}
