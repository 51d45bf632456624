//! Error taxonomy shared by every fallible operation.
//!
//! All failures are variants of [`DocsError`], which carries a machine-readable
//! type tag ([`DocsError::error_type`]), a human message (its `Display`), and an
//! optional remediation hint ([`DocsError::suggestion`]). The type is `Clone` so
//! that the result of one ingestion run can be handed to every caller awaiting it.

use std::fmt::Display;
use std::path::Path;

/// A specialized Result type for rust-docs-mcp operations.
pub type Result<T, E = DocsError> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DocsError {
    /// The external documentation tool could not be run or exited unsuccessfully.
    #[error("documentation generation failed: {message}")]
    Generation { message: String },

    #[error("documentation generation for {scope} timed out after {seconds}s")]
    GenerationTimeout { scope: String, seconds: u64 },

    #[error("documentation generation for {scope} was cancelled")]
    Cancelled { scope: String },

    /// Structural problems in the raw rustdoc JSON.
    #[error("malformed rustdoc input: {message}")]
    MalformedInput { message: String },

    /// A normalized item violated the path-uniqueness invariant.
    #[error("normalization failed at `{path}`: {message}")]
    Normalization { path: String, message: String },

    #[error("storage failure: {message}")]
    Storage { message: String },

    #[error("search failed: {message}")]
    Search { message: String },

    #[error("{}", unknown_scope_message(.crate_name, .version.as_deref()))]
    UnknownScope {
        crate_name: String,
        version: Option<String>,
    },

    #[error("no documentation item found at `{path}`")]
    NotFound {
        path: String,
        suggestions: Vec<String>,
    },

    #[error("invalid configuration: {message}")]
    Configuration { message: String },
}

fn unknown_scope_message(crate_name: &str, version: Option<&str>) -> String {
    match version {
        Some(version) => format!(
            "no documentation has been ingested for crate `{}` version {}",
            crate_name, version
        ),
        None => format!(
            "no documentation has been ingested for crate `{}`",
            crate_name
        ),
    }
}

impl DocsError {
    /// Machine-readable tag used in `{status: "error", error_type, ...}` responses.
    pub const fn error_type(&self) -> &'static str {
        match self {
            Self::Generation { .. } => "GenerationError",
            Self::GenerationTimeout { .. } => "GenerationTimeout",
            Self::Cancelled { .. } => "GenerationCancelled",
            Self::MalformedInput { .. } => "MalformedInput",
            Self::Normalization { .. } => "NormalizationError",
            Self::Storage { .. } => "StorageError",
            Self::Search { .. } => "SearchError",
            Self::UnknownScope { .. } => "UnknownScope",
            Self::NotFound { .. } => "NotFound",
            Self::Configuration { .. } => "ConfigurationError",
        }
    }

    /// Remediation hint for the caller, if one applies.
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::Generation { .. } => Some(
                "Make sure the nightly toolchain is installed (rustup install nightly) \
                 and that the crate builds with `cargo +nightly rustdoc`."
                    .to_string(),
            ),
            Self::GenerationTimeout { .. } => Some(
                "Increase `generation_timeout` in the configuration or retry once the build cache is warm."
                    .to_string(),
            ),
            Self::UnknownScope { crate_name, .. } => Some(format!(
                "Run generate_crate_docs on the project containing `{}` first.",
                crate_name
            )),
            Self::NotFound { suggestions, .. } if !suggestions.is_empty() => {
                Some(format!("Did you mean: {}?", suggestions.join(", ")))
            }
            Self::NotFound { .. } => Some(
                "Use search_rust_docs to find the fully-qualified item path.".to_string(),
            ),
            Self::Configuration { .. } => {
                Some("Check the configuration file and RUST_DOCS_* environment variables.".to_string())
            }
            Self::Search { .. } => {
                Some("Use a non-empty query and a max_results of at least 1.".to_string())
            }
            Self::Cancelled { .. }
            | Self::MalformedInput { .. }
            | Self::Normalization { .. }
            | Self::Storage { .. } => None,
        }
    }

    pub(crate) fn generation(message: impl Into<String>) -> Self {
        Self::Generation {
            message: message.into(),
        }
    }

    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedInput {
            message: message.into(),
        }
    }

    pub(crate) fn search(message: impl Into<String>) -> Self {
        Self::Search {
            message: message.into(),
        }
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Storage failure with the offending path and the underlying cause.
    pub(crate) fn storage(action: &str, path: &Path, cause: impl Display) -> Self {
        Self::Storage {
            message: format!("failed to {} {}: {}", action, path.display(), cause),
        }
    }
}
