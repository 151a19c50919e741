//! Request and response shapes for catalog search.
//!
//! These are the types exchanged with the UI layer, so they serialize with
//! camelCase keys. Product projections keep the catalog's snake_case column
//! names.

use serde::{Deserialize, Serialize};

/// Which signals a search should consult.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    /// Full-text and semantic scores, fused.
    #[default]
    Hybrid,
    /// Full-text only. The embedder is never called.
    FullText,
    /// Semantic only. Full-text scores are never requested.
    Semantic,
}

impl SearchMode {
    #[must_use]
    pub const fn uses_full_text(self) -> bool {
        matches!(self, Self::Hybrid | Self::FullText)
    }

    #[must_use]
    pub const fn uses_semantic(self) -> bool {
        matches!(self, Self::Hybrid | Self::Semantic)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub university_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_price: Option<f64>,
}

impl SearchFilters {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.category_id.is_none()
            && self.university_id.is_none()
            && self.min_price.is_none()
            && self.max_price.is_none()
    }
}

/// Caller-supplied search request.
///
/// Paging values are signed so that out-of-range input from the UI can be
/// clamped instead of failing deserialization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<SearchFilters>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_text_weight: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semantic_weight: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<SearchMode>,
}

impl SearchParams {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }
}

/// A catalog product as returned by search, with its fused score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResultProduct {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: f64,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub category_name: Option<String>,
    #[serde(default)]
    pub university_id: Option<String>,
    #[serde(default)]
    pub vendor_id: Option<String>,
    #[serde(default)]
    pub vendor_name: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    pub relevance_score: f64,
}

/// Paging metadata for a ranked result list.
///
/// `total` counts the fused candidates, not every matching product. Each
/// signal contributes at most `max(search.candidate_limit, page * limit)`
/// candidates, so a broad query reports a bounded total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub success: bool,
    pub data: Vec<SearchResultProduct>,
    pub pagination: Pagination,
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SearchResponse {
    /// Failed search envelope: no data, zero totals, the error message.
    #[must_use]
    pub fn failure(query: &str, page: u32, limit: u32, error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: Vec::new(),
            pagination: Pagination {
                page,
                limit,
                total: 0,
                total_pages: 0,
            },
            query: query.to_string(),
            error: Some(error.into()),
        }
    }
}

/// Type-ahead suggestion; a strict subset of [`SearchResultProduct`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRecommendation {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub category_name: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    pub price: f64,
}
