//! campus-search: hybrid product search for a campus marketplace.
//!
//! Full-text relevance and embedding similarity are fused into one ranked,
//! paginated result list. The catalog sits behind [`catalog::CatalogStore`];
//! embeddings come from an OpenAI-compatible API or an offline hash backend.

pub mod app;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod search;
pub mod test_utils;

pub use error::{CsError, Result};
