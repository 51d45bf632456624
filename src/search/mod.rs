//! Fuzzy search over the documentation store.
//!
//! Scoring compares the query against each item's name, path, description
//! and example captions; see [`scoring`] for the weights.

pub mod engine;
pub mod scoring;
pub(crate) mod tokenize;

pub use engine::{RELAXED_MARGIN, SearchEngine, SearchOptions};
pub use scoring::{PreparedQuery, SearchKeys};
