//! CLI command implementations
//!
//! Each subcommand has its own module with:
//! - Args struct for command-line arguments
//! - run() function to execute the command

use clap::Subcommand;

pub mod config;
pub mod embed;
pub mod import;
pub mod index;
pub mod recommend;
pub mod search;

use crate::app::AppContext;
use crate::error::Result;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Search products (hybrid, full-text or semantic)
    Search(search::SearchArgs),

    /// Type-ahead product suggestions
    Recommend(recommend::RecommendArgs),

    /// Embed text with the configured backend
    Embed(embed::EmbedArgs),

    /// Import products from a JSON or JSONL file
    Import(import::ImportArgs),

    /// Backfill product embeddings
    Index(index::IndexArgs),

    /// Show effective configuration
    Config(config::ConfigArgs),
}

/// Dispatch a command to its handler
pub fn run(ctx: &AppContext, command: &Commands) -> Result<()> {
    match command {
        Commands::Search(args) => search::run(ctx, args),
        Commands::Recommend(args) => recommend::run(ctx, args),
        Commands::Embed(args) => embed::run(ctx, args),
        Commands::Import(args) => import::run(ctx, args),
        Commands::Index(args) => index::run(ctx, args),
        Commands::Config(args) => config::run(ctx, args),
    }
}
