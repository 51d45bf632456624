//! Fuzzy search over normalized rustdoc JSON, served as MCP tools.
//!
//! Raw rustdoc output is parsed ([`raw`]), flattened into path-addressed
//! [`types::DocItem`]s ([`normalize`]), kept per `(crate, version)` scope in
//! the [`store`], and ranked by the [`search`] engine. [`ingest`] drives the
//! external generator and [`tools`] exposes the three operations.

pub mod cli;
pub mod config;
pub mod error;
pub mod ingest;
pub mod normalize;
pub mod raw;
pub mod schema;
pub mod search;
pub mod server;
pub mod store;
pub mod tools;
pub mod tracing;
pub mod types;

pub use config::ServerConfig;
pub use error::{DocsError, Result};
pub use types::{DocItem, ItemKind, MatchType, ScopeKey, SearchResult};
