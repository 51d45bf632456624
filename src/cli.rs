use crate::tracing::LogFormat;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "rust-docs-mcp")]
#[command(about = "Fuzzy search over Rust documentation, served over MCP", long_about = None)]
pub struct Cli {
    /// Configuration file (TOML, or JSON with a .json extension)
    #[arg(long, global = true, env = "RUST_DOCS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level or filter directive; RUST_LOG takes precedence
    #[arg(long, global = true, env = "RUST_DOCS_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Commands {
    /// Serve the MCP tools over stdio (default)
    Serve,
    /// Generate and store documentation for a local project
    Generate {
        path: String,
        /// Skip the project's dependencies
        #[arg(long)]
        no_deps: bool,
    },
    /// Search stored documentation
    Search {
        query: String,
        #[arg(short = 'c', long = "crate")]
        crate_name: Option<String>,
        #[arg(short = 'n', long, default_value = "5")]
        limit: usize,
        /// Leave the standard library out when no crate is given
        #[arg(long)]
        no_std: bool,
    },
    /// Apply the eviction policy once and report what was removed
    Evict,
}

impl Cli {
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Serve)
    }
}
