//! campus-search embed - Embed text with the configured backend

use clap::Args;
use serde::Serialize;

use crate::app::AppContext;
use crate::cli::output::{HumanLayout, emit_human, emit_robot, robot_ok};
use crate::error::Result;
use crate::search::EmbeddingResult;

#[derive(Args, Debug)]
pub struct EmbedArgs {
    /// Text(s) to embed; more than one is sent as a single batch
    #[arg(required = true)]
    pub texts: Vec<String>,

    /// Print full vectors in human mode
    #[arg(long)]
    pub full: bool,
}

#[derive(Serialize)]
struct BatchOutput<'a> {
    model: &'a str,
    dimensions: usize,
    embeddings: Vec<Vec<f32>>,
}

pub fn run(ctx: &AppContext, args: &EmbedArgs) -> Result<()> {
    if let [text] = args.texts.as_slice() {
        let result = ctx.embedder.embed(text)?;
        return if ctx.robot_mode() {
            emit_robot(&robot_ok(&result))
        } else {
            emit_human(single_layout(&result, args.full));
            Ok(())
        };
    }

    let embeddings = ctx.embedder.embed_batch(&args.texts)?;
    let output = BatchOutput {
        model: ctx.embedder.model(),
        dimensions: ctx.embedder.dimensions(),
        embeddings,
    };
    if ctx.robot_mode() {
        return emit_robot(&robot_ok(&output));
    }

    let mut layout = HumanLayout::new();
    layout
        .section("Embeddings")
        .kv("model", output.model)
        .kv("dimensions", &output.dimensions.to_string())
        .kv("inputs", &output.embeddings.len().to_string())
        .blank();
    for (text, vector) in args.texts.iter().zip(&output.embeddings) {
        layout.bullet(&format!("{text}: {}", preview(vector, args.full)));
    }
    emit_human(layout);
    Ok(())
}

fn single_layout(result: &EmbeddingResult, full: bool) -> HumanLayout {
    let mut layout = HumanLayout::new();
    layout
        .section("Embedding")
        .kv("model", &result.model)
        .kv("dimensions", &result.embedding.len().to_string())
        .kv("prompt tokens", &result.usage.prompt_tokens.to_string())
        .kv("total tokens", &result.usage.total_tokens.to_string())
        .kv("vector", &preview(&result.embedding, full));
    layout
}

fn preview(vector: &[f32], full: bool) -> String {
    let shown = if full { vector.len() } else { vector.len().min(6) };
    let values: Vec<String> = vector[..shown].iter().map(|v| format!("{v:.4}")).collect();
    if shown < vector.len() {
        format!("[{}, ... {} more]", values.join(", "), vector.len() - shown)
    } else {
        format!("[{}]", values.join(", "))
    }
}
