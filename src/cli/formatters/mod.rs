//! Human-readable renderers for command output.

pub mod search_results;

pub use search_results::{format_recommendations, format_search_response};
