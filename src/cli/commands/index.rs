//! campus-search index - Backfill product embeddings

use clap::Args;

use crate::app::AppContext;
use crate::catalog::{IndexOptions, index_embeddings};
use crate::cli::output::{HumanLayout, emit_human, emit_robot, robot_ok};
use crate::error::Result;
use crate::search::CancelToken;

#[derive(Args, Debug)]
pub struct IndexArgs {
    /// Re-embed every product, even when the stored embedding is current
    #[arg(long, short)]
    pub force: bool,

    /// Texts per upstream request (overrides embedding.batch_size)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub batch_size: Option<u32>,
}

pub fn run(ctx: &AppContext, args: &IndexArgs) -> Result<()> {
    let options = IndexOptions {
        batch_size: args.batch_size.unwrap_or(ctx.config.embedding.batch_size).max(1) as usize,
        force: args.force,
    };
    let stats = index_embeddings(
        &ctx.catalog,
        ctx.embedder.as_ref(),
        &options,
        &CancelToken::new(),
    )?;

    if ctx.robot_mode() {
        return emit_robot(&robot_ok(&stats));
    }

    let mut layout = HumanLayout::new();
    layout
        .section("Embedding index")
        .kv("model", &stats.model)
        .kv("pending", &stats.pending.to_string())
        .kv("embedded", &stats.embedded.to_string())
        .kv("batches", &stats.batches.to_string())
        .kv("stored vectors", &ctx.catalog.embedding_count()?.to_string());
    emit_human(layout);
    Ok(())
}
