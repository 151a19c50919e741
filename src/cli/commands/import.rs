//! campus-search import - Load products into the catalog
//!
//! Accepts a JSON array of products, or JSON Lines when the file extension is
//! `.jsonl`/`.ndjson`. Every record is validated before anything is written.

use std::path::{Path, PathBuf};

use clap::Args;
use serde::Serialize;

use crate::app::AppContext;
use crate::catalog::{IndexOptions, IndexStats, Product, index_embeddings};
use crate::cli::output::{HumanLayout, emit_human, emit_robot, robot_ok};
use crate::error::{CsError, Result};
use crate::search::CancelToken;

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Product file (JSON array or JSON Lines)
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Backfill embeddings for the imported products afterwards
    #[arg(long)]
    pub index: bool,
}

#[derive(Serialize)]
struct ImportReport {
    path: String,
    imported: usize,
    total_products: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    index: Option<IndexStats>,
}

pub fn run(ctx: &AppContext, args: &ImportArgs) -> Result<()> {
    let products = read_products(&args.path)?;
    for (i, product) in products.iter().enumerate() {
        product
            .validate()
            .map_err(|err| CsError::ValidationFailed(format!("record {i}: {err}")))?;
    }

    let imported = ctx.catalog.upsert_products(&products)?;
    tracing::info!(path = %args.path.display(), imported, "imported products");

    let index = if args.index {
        let options = IndexOptions {
            batch_size: ctx.config.embedding.batch_size.max(1) as usize,
            force: false,
        };
        Some(index_embeddings(
            &ctx.catalog,
            ctx.embedder.as_ref(),
            &options,
            &CancelToken::new(),
        )?)
    } else {
        None
    };

    let report = ImportReport {
        path: args.path.display().to_string(),
        imported,
        total_products: ctx.catalog.product_count()?,
        index,
    };

    if ctx.robot_mode() {
        return emit_robot(&robot_ok(&report));
    }
    let mut layout = HumanLayout::new();
    layout
        .section("Import")
        .kv("file", &report.path)
        .kv("imported", &report.imported.to_string())
        .kv("catalog size", &report.total_products.to_string());
    if let Some(stats) = &report.index {
        layout.kv("embedded", &format!("{} ({})", stats.embedded, stats.model));
    }
    emit_human(layout);
    Ok(())
}

/// Parse a product file by extension.
pub fn read_products(path: &Path) -> Result<Vec<Product>> {
    let raw = std::fs::read_to_string(path).map_err(|err| {
        if err.kind() == std::io::ErrorKind::NotFound {
            CsError::NotFound(format!("product file {}", path.display()))
        } else {
            CsError::Io(err)
        }
    })?;

    let is_lines = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("jsonl") || ext.eq_ignore_ascii_case("ndjson"));

    if is_lines {
        raw.lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(n, line)| {
                serde_json::from_str(line).map_err(|err| {
                    CsError::Serialization(format!("{}:{}: {err}", path.display(), n + 1))
                })
            })
            .collect()
    } else {
        serde_json::from_str(&raw)
            .map_err(|err| CsError::Serialization(format!("{}: {err}", path.display())))
    }
}
