//! Weighted score fusion for hybrid search.
//!
//! Full-text (bm25) and semantic (cosine) scores live on unrelated scales, so
//! each set is min-max normalized into `[0, 1]` on its own before blending.
//! An item missing from one source contributes 0 for that source.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

use serde::Serialize;

use crate::error::{CsError, Result};
use crate::search::query::HybridWeights;

/// Raw per-item scores from one signal, keyed by item id.
pub type ScoreSet = HashMap<String, f64>;

/// One fused result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HybridResult {
    pub id: String,
    pub score: f64,
    /// Normalized full-text score, if the item had one.
    pub full_text: Option<f64>,
    /// Normalized semantic score, if the item had one.
    pub semantic: Option<f64>,
}

/// Fuse two score sets into a ranked list.
///
/// Sorted by descending score, ties by ascending id. Fails with
/// [`CsError::EmptyResult`] only when both inputs are empty.
pub fn score(
    full_text: &ScoreSet,
    semantic: &ScoreSet,
    weights: HybridWeights,
) -> Result<Vec<HybridResult>> {
    if full_text.is_empty() && semantic.is_empty() {
        return Err(CsError::EmptyResult);
    }

    let full_text_norm = min_max_normalize(full_text);
    let semantic_norm = min_max_normalize(semantic);
    let ft_weight = f64::from(weights.full_text);
    let sem_weight = f64::from(weights.semantic);

    let ids: BTreeSet<&String> = full_text.keys().chain(semantic.keys()).collect();
    let mut results: Vec<HybridResult> = ids
        .into_iter()
        .map(|id| {
            let ft = full_text_norm.get(id).copied();
            let sem = semantic_norm.get(id).copied();
            HybridResult {
                id: id.clone(),
                score: ft_weight * ft.unwrap_or(0.0) + sem_weight * sem.unwrap_or(0.0),
                full_text: ft,
                semantic: sem,
            }
        })
        .collect();

    results.sort_by(compare_ranked);
    Ok(results)
}

/// Descending score, then ascending id.
#[must_use]
pub fn compare_ranked(a: &HybridResult, b: &HybridResult) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.id.cmp(&b.id))
}

/// Min-max normalize into `[0, 1]`.
///
/// A set whose finite values are all equal maps to 1.0 everywhere.
/// Non-finite raw scores are treated as the set minimum.
#[must_use]
pub fn min_max_normalize(scores: &ScoreSet) -> HashMap<String, f64> {
    let finite = scores.values().copied().filter(|v| v.is_finite());
    let (min, max) = finite.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });

    if !min.is_finite() {
        // No finite values at all.
        return scores.keys().map(|id| (id.clone(), 0.0)).collect();
    }

    let range = max - min;
    scores
        .iter()
        .map(|(id, &raw)| {
            let normalized = if range <= f64::EPSILON {
                1.0
            } else if raw.is_finite() {
                (raw - min) / range
            } else {
                0.0
            };
            (id.clone(), normalized)
        })
        .collect()
}
