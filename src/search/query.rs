//! Query normalization.
//!
//! Turns caller-supplied [`SearchParams`] into a [`NormalizedQuery`]: a
//! cleaned query string, sanitized filters, clamped paging and a weight pair
//! that sums to 1.

use serde::Serialize;
use unicode_normalization::UnicodeNormalization;

use crate::config::SearchConfig;
use crate::error::{CsError, Result};
use crate::search::types::{SearchFilters, SearchMode, SearchParams};

/// Weight pair applied by the hybrid scorer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HybridWeights {
    pub full_text: f32,
    pub semantic: f32,
}

impl HybridWeights {
    pub const EQUAL: Self = Self {
        full_text: 0.5,
        semantic: 0.5,
    };

    pub const FULL_TEXT_ONLY: Self = Self {
        full_text: 1.0,
        semantic: 0.0,
    };

    pub const SEMANTIC_ONLY: Self = Self {
        full_text: 0.0,
        semantic: 1.0,
    };

    /// Scale a pair so it sums to 1. A zero pair falls back to equal weights.
    #[must_use]
    pub fn normalized(full_text: f32, semantic: f32) -> Self {
        let full_text = clamp_unit(full_text).unwrap_or(0.0);
        let semantic = clamp_unit(semantic).unwrap_or(0.0);
        let total = full_text + semantic;
        if total <= f32::EPSILON {
            return Self::EQUAL;
        }
        Self {
            full_text: full_text / total,
            semantic: semantic / total,
        }
    }
}

impl Default for HybridWeights {
    fn default() -> Self {
        Self::EQUAL
    }
}

/// Defaults the normalizer falls back on, usually taken from `[search]`.
#[derive(Debug, Clone, Copy)]
pub struct QueryDefaults {
    pub default_limit: u32,
    pub max_limit: u32,
    pub weights: HybridWeights,
    pub use_embeddings: bool,
}

impl Default for QueryDefaults {
    fn default() -> Self {
        Self::from(&SearchConfig::default())
    }
}

impl From<&SearchConfig> for QueryDefaults {
    fn from(config: &SearchConfig) -> Self {
        let default_limit = config.default_limit.max(1);
        Self {
            default_limit,
            max_limit: config.max_limit.max(default_limit),
            weights: HybridWeights::normalized(config.full_text_weight, config.semantic_weight),
            use_embeddings: config.use_embeddings,
        }
    }
}

/// Canonical search request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedQuery {
    pub text: String,
    pub filters: SearchFilters,
    pub page: u32,
    pub limit: u32,
    pub weights: HybridWeights,
    pub mode: SearchMode,
}

/// Validate and canonicalize a search request.
///
/// Fails only when the query is blank after cleaning, or when semantic-only
/// search is requested while embeddings are disabled.
pub fn normalize(params: &SearchParams, defaults: &QueryDefaults) -> Result<NormalizedQuery> {
    let text = clean_query(&params.query);
    if text.is_empty() {
        return Err(CsError::ValidationFailed(
            "search query must not be empty".to_string(),
        ));
    }

    let requested_mode = params.mode.unwrap_or_default();
    let mode = match (requested_mode, defaults.use_embeddings) {
        (mode, true) => mode,
        (SearchMode::Semantic, false) => {
            return Err(CsError::ValidationFailed(
                "semantic search requested but embeddings are disabled".to_string(),
            ));
        }
        (_, false) => SearchMode::FullText,
    };

    let weights = match mode {
        SearchMode::Hybrid => resolve_weights(
            params.full_text_weight,
            params.semantic_weight,
            defaults.weights,
        ),
        SearchMode::FullText => HybridWeights::FULL_TEXT_ONLY,
        SearchMode::Semantic => HybridWeights::SEMANTIC_ONLY,
    };

    Ok(NormalizedQuery {
        text,
        filters: normalize_filters(params.filters.as_ref()),
        page: clamp_page(params.page),
        limit: clamp_limit(params.limit, defaults),
        weights,
        mode,
    })
}

/// NFKC-normalize, trim and collapse internal whitespace.
#[must_use]
pub fn clean_query(raw: &str) -> String {
    let normalized: String = raw.nfkc().collect();
    normalized.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Resolve the caller's weights against the defaults.
///
/// Non-finite inputs count as absent. One given weight determines the other
/// as its complement; two given weights are scaled to sum to 1.
#[must_use]
pub fn resolve_weights(
    full_text: Option<f32>,
    semantic: Option<f32>,
    defaults: HybridWeights,
) -> HybridWeights {
    match (full_text.and_then(clamp_unit), semantic.and_then(clamp_unit)) {
        (None, None) => defaults,
        (Some(full_text), None) => HybridWeights {
            full_text,
            semantic: 1.0 - full_text,
        },
        (None, Some(semantic)) => HybridWeights {
            full_text: 1.0 - semantic,
            semantic,
        },
        (Some(full_text), Some(semantic)) => {
            if full_text + semantic <= f32::EPSILON {
                defaults
            } else {
                HybridWeights::normalized(full_text, semantic)
            }
        }
    }
}

fn clamp_unit(value: f32) -> Option<f32> {
    value.is_finite().then(|| value.clamp(0.0, 1.0))
}

fn clamp_page(page: Option<i64>) -> u32 {
    match page {
        Some(page) if page >= 1 => u32::try_from(page).unwrap_or(u32::MAX),
        _ => 1,
    }
}

fn clamp_limit(limit: Option<i64>, defaults: &QueryDefaults) -> u32 {
    match limit {
        Some(limit) if limit >= 1 => u32::try_from(limit)
            .unwrap_or(u32::MAX)
            .min(defaults.max_limit),
        _ => defaults.default_limit,
    }
}

fn normalize_filters(filters: Option<&SearchFilters>) -> SearchFilters {
    let Some(filters) = filters else {
        return SearchFilters::default();
    };

    let mut min_price = filters.min_price.filter(|p| p.is_finite() && *p >= 0.0);
    let mut max_price = filters.max_price.filter(|p| p.is_finite() && *p >= 0.0);
    if let (Some(min), Some(max)) = (min_price, max_price) {
        if min > max {
            min_price = Some(max);
            max_price = Some(min);
        }
    }

    SearchFilters {
        category_id: clean_id(filters.category_id.as_deref()),
        university_id: clean_id(filters.university_id.as_deref()),
        min_price,
        max_price,
    }
}

fn clean_id(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
}
