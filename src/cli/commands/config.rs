//! campus-search config - Show effective configuration

use clap::Args;
use serde::Serialize;

use crate::app::AppContext;
use crate::cli::output::{emit_robot, robot_ok};
use crate::config::Config;
use crate::error::{CsError, Result};

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Print only the config file path
    #[arg(long)]
    pub path: bool,
}

#[derive(Serialize)]
struct ConfigReport<'a> {
    config_path: String,
    root: String,
    api_key_present: bool,
    config: &'a Config,
}

pub fn run(ctx: &AppContext, args: &ConfigArgs) -> Result<()> {
    if args.path {
        if ctx.robot_mode() {
            return emit_robot(&robot_ok(
                serde_json::json!({ "config_path": ctx.config_path.display().to_string() }),
            ));
        }
        println!("{}", ctx.config_path.display());
        return Ok(());
    }

    if ctx.robot_mode() {
        return emit_robot(&robot_ok(ConfigReport {
            config_path: ctx.config_path.display().to_string(),
            root: ctx.root.display().to_string(),
            api_key_present: ctx.config.embedding.resolve_api_key().is_some(),
            config: &ctx.config,
        }));
    }

    let rendered = toml::to_string_pretty(&ctx.config)
        .map_err(|err| CsError::Serialization(format!("render config: {err}")))?;
    println!("# {}", ctx.config_path.display());
    print!("{rendered}");
    Ok(())
}
