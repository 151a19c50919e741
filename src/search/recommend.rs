//! Type-ahead recommendations.

use crate::catalog::CatalogStore;
use crate::error::Result;
use crate::search::query::clean_query;
use crate::search::types::SearchRecommendation;

/// Short, deterministic suggestion list for `query`.
///
/// Blank queries, non-positive limits and queries with no matching product
/// all yield an empty list. The result never exceeds `min(limit, cap)`.
pub fn recommend(
    store: &dyn CatalogStore,
    query: &str,
    limit: i64,
    cap: usize,
) -> Result<Vec<SearchRecommendation>> {
    if limit <= 0 || cap == 0 {
        return Ok(Vec::new());
    }
    let query = clean_query(query);
    if query.is_empty() {
        return Ok(Vec::new());
    }

    let limit = usize::try_from(limit).unwrap_or(usize::MAX).min(cap);
    let mut candidates = store.recommendation_candidates(&query, limit)?;
    candidates.truncate(limit);
    Ok(candidates)
}
