//! Catalog store: the black-box score provider consulted by search.
//!
//! The search service only sees the [`CatalogStore`] trait. [`SqliteCatalog`]
//! is the bundled implementation (FTS5 for full-text scores, stored vectors
//! for semantic scores).

use crate::error::Result;
use crate::search::hybrid::ScoreSet;
use crate::search::types::{SearchFilters, SearchRecommendation};

pub mod indexer;
pub mod product;
pub mod sqlite;

pub use indexer::{IndexOptions, IndexStats, index_embeddings};
pub use product::Product;
pub use sqlite::SqliteCatalog;

pub trait CatalogStore: Send + Sync {
    /// Full-text relevance per matching product id (higher is better).
    fn full_text_scores(
        &self,
        query: &str,
        filters: &SearchFilters,
        limit: usize,
    ) -> Result<ScoreSet>;

    /// Vector similarity per product id against `embedding` (higher is better).
    fn semantic_scores(
        &self,
        embedding: &[f32],
        filters: &SearchFilters,
        limit: usize,
    ) -> Result<ScoreSet>;

    /// Load available products by id. Missing ids are skipped.
    fn products(&self, ids: &[String]) -> Result<Vec<Product>>;

    /// Deterministically ordered type-ahead candidates, at most `limit`.
    fn recommendation_candidates(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<SearchRecommendation>>;
}
