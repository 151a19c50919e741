//! Search results formatter
//!
//! Renders a [`SearchResponse`] or a recommendation list for the terminal.
//! Robot mode bypasses this module and emits the response as JSON.

use console::style;

use crate::cli::output::HumanLayout;
use crate::search::types::{SearchRecommendation, SearchResponse, SearchResultProduct};

const DESCRIPTION_WIDTH: usize = 72;

/// Render a search response as human-readable text.
#[must_use]
pub fn format_search_response(response: &SearchResponse) -> String {
    let mut layout = HumanLayout::new();

    if !response.success {
        layout.push_line(format!(
            "{} search for '{}' failed: {}",
            style("x").red().bold(),
            response.query,
            response.error.as_deref().unwrap_or("unknown error")
        ));
        return layout.build();
    }

    if response.data.is_empty() {
        layout
            .push_line(format!("! No products found for '{}'", response.query))
            .blank()
            .push_line("Try:")
            .bullet("Using different keywords")
            .bullet("Removing filters (--category, --university, --min-price, --max-price)");
        return layout.build();
    }

    let p = &response.pagination;
    layout.title(&format!(
        "Results for '{}' (page {} of {}, {} total)",
        response.query, p.page, p.total_pages, p.total
    ));

    let offset = (p.page.saturating_sub(1) as usize) * p.limit as usize;
    for (i, product) in response.data.iter().enumerate() {
        push_product(&mut layout, offset + i + 1, product);
    }

    if u64::from(p.page) < p.total_pages {
        layout.push_line(
            style(format!("Next page: --page {}", p.page + 1))
                .dim()
                .to_string(),
        );
    }
    layout.build()
}

fn push_product(layout: &mut HumanLayout, rank: usize, product: &SearchResultProduct) {
    layout.push_line(format!(
        "{:>3}. {}  {}  {}",
        rank,
        style(&product.title).bold(),
        style(format!("${:.2}", product.price)).green(),
        style(format!("[{:.3}]", product.relevance_score)).dim()
    ));

    let meta: Vec<&str> = [
        product.category_name.as_deref(),
        product.vendor_name.as_deref(),
        product.university_id.as_deref(),
    ]
    .into_iter()
    .flatten()
    .collect();
    if !meta.is_empty() {
        layout.push_line(format!("     {}", style(meta.join(" · ")).cyan()));
    }
    if let Some(description) = product.description.as_deref() {
        layout.push_line(format!("     {}", truncate(description, DESCRIPTION_WIDTH)));
    }
    layout.push_line(format!("     {}", style(&product.id).dim()));
    layout.blank();
}

/// Render recommendations as a compact list.
#[must_use]
pub fn format_recommendations(query: &str, recommendations: &[SearchRecommendation]) -> String {
    let mut layout = HumanLayout::new();
    if recommendations.is_empty() {
        layout.push_line(format!("No suggestions for '{query}'"));
        return layout.build();
    }
    layout.section(&format!("Suggestions for '{query}'"));
    for rec in recommendations {
        let category = rec
            .category_name
            .as_deref()
            .map(|c| format!(" ({c})"))
            .unwrap_or_default();
        layout.bullet(&format!("{}{} ${:.2}", rec.title, category, rec.price));
    }
    layout.build()
}

fn truncate(text: &str, max_chars: usize) -> String {
    let single_line = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if single_line.chars().count() <= max_chars {
        return single_line;
    }
    let cut: String = single_line.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", cut.trim_end())
}
