//! campus-search recommend - Type-ahead suggestions

use clap::Args;

use crate::app::AppContext;
use crate::cli::formatters::format_recommendations;
use crate::cli::output::{emit_robot, robot_ok};
use crate::error::Result;

#[derive(Args, Debug)]
pub struct RecommendArgs {
    /// Partial query
    pub query: String,

    /// Maximum suggestions (capped by search.max_recommendations)
    #[arg(long, short, default_value = "5", allow_hyphen_values = true)]
    pub limit: i64,
}

pub fn run(ctx: &AppContext, args: &RecommendArgs) -> Result<()> {
    let recommendations = ctx.search_service().recommend(&args.query, args.limit)?;
    tracing::debug!(query = %args.query, count = recommendations.len(), "recommendations");

    if ctx.robot_mode() {
        emit_robot(&robot_ok(&recommendations))
    } else {
        println!("{}", format_recommendations(&args.query, &recommendations));
        Ok(())
    }
}
