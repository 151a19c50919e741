//! Backfill product embeddings.
//!
//! Products whose stored embedding is missing, stale (content hash changed)
//! or from another model are embedded in batches, one upstream call per
//! batch. A rate limit stops the run; batches already stored are kept.

use serde::Serialize;
use tracing::{info, warn};

use crate::catalog::sqlite::SqliteCatalog;
use crate::error::{CsError, Result};
use crate::search::embeddings::Embedder;
use crate::search::service::CancelToken;

#[derive(Debug, Clone)]
pub struct IndexOptions {
    pub batch_size: usize,
    /// Re-embed every product regardless of stored hashes.
    pub force: bool,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            batch_size: 64,
            force: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    /// Products that needed an embedding when the run started.
    pub pending: usize,
    pub embedded: usize,
    pub batches: usize,
    pub model: String,
}

pub fn index_embeddings(
    catalog: &SqliteCatalog,
    embedder: &dyn Embedder,
    options: &IndexOptions,
    cancel: &CancelToken,
) -> Result<IndexStats> {
    let model = embedder.model().to_string();
    let pending = catalog.products_needing_embeddings(&model, options.force)?;
    let mut stats = IndexStats {
        pending: pending.len(),
        model,
        ..IndexStats::default()
    };

    if pending.is_empty() {
        info!(model = %stats.model, "all product embeddings are current");
        return Ok(stats);
    }

    for batch in pending.chunks(options.batch_size.max(1)) {
        if cancel.is_cancelled() {
            return Err(CsError::Cancelled);
        }

        let texts: Vec<String> = batch.iter().map(|p| p.embedding_text()).collect();
        let vectors = embedder.embed_batch(&texts).inspect_err(|err| {
            if err.is_retryable() {
                warn!(
                    embedded = stats.embedded,
                    remaining = stats.pending - stats.embedded,
                    "embedding backfill stopped: {err}"
                );
            }
        })?;

        for (product, vector) in batch.iter().zip(vectors) {
            catalog.store_embedding(&product.id, &stats.model, &vector, &product.content_hash())?;
        }
        stats.embedded += batch.len();
        stats.batches += 1;
        info!(
            embedded = stats.embedded,
            pending = stats.pending,
            "stored embedding batch"
        );
    }

    Ok(stats)
}
