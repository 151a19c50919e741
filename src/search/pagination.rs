//! Page slicing over ranked results.

use crate::search::types::Pagination;

/// One page of ranked results plus its metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub pagination: Pagination,
}

/// Slice `ranked` into the requested page.
///
/// `page` and `limit` below 1 are treated as 1. A page past the end yields
/// empty data with accurate totals.
#[must_use]
pub fn paginate<T: Clone>(ranked: &[T], page: i64, limit: i64) -> Page<T> {
    let page = clamp_to_u32(page);
    let limit = clamp_to_u32(limit);
    let total = ranked.len() as u64;
    let total_pages = total.div_ceil(u64::from(limit));

    let offset = u64::from(page - 1) * u64::from(limit);
    let data = usize::try_from(offset)
        .ok()
        .and_then(|start| ranked.get(start..))
        .map(|rest| rest.iter().take(limit as usize).cloned().collect())
        .unwrap_or_default();

    Page {
        data,
        pagination: Pagination {
            page,
            limit,
            total,
            total_pages,
        },
    }
}

fn clamp_to_u32(value: i64) -> u32 {
    u32::try_from(value.max(1)).unwrap_or(u32::MAX)
}
