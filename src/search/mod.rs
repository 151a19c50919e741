//! Product search for the campus marketplace
//!
//! Hybrid search: bm25 full-text scores + embedding similarity, fused with
//! per-set min-max normalization and a weighted blend.

pub mod embeddings;
pub mod hybrid;
pub mod pagination;
pub mod query;
pub mod recommend;
pub mod service;
pub mod types;

pub use embeddings::{ApiEmbedder, Embedder, EmbeddingResult, HashEmbedder, build_embedder};
pub use hybrid::{HybridResult, ScoreSet};
pub use query::{HybridWeights, NormalizedQuery, QueryDefaults, normalize};
pub use service::{AuthSession, CancelToken, RequestContext, SearchService};
pub use types::{
    Pagination, SearchFilters, SearchMode, SearchParams, SearchRecommendation, SearchResponse,
    SearchResultProduct,
};
