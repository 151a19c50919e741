//! Error types for campus-search.

use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, CsError>;

#[derive(Debug, Error)]
pub enum CsError {
    /// Bad caller input. Surfaced immediately, never retried.
    #[error("validation failed: {0}")]
    ValidationFailed(String),

    /// Upstream throttling (HTTP 429). The caller owns the retry policy.
    #[error("rate limited by upstream{}", retry_hint(.retry_after_secs))]
    RateLimited { retry_after_secs: Option<u64> },

    /// Non-success upstream response, or a transport failure (status 0).
    #[error("upstream error ({status}): {message}")]
    Upstream { status: u16, message: String },

    /// Neither the full-text nor the semantic signal produced any candidate.
    #[error("no full-text or semantic candidates")]
    EmptyResult,

    #[error("operation cancelled")]
    Cancelled,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("missing configuration: {0}")]
    MissingConfig(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl CsError {
    /// Stable machine-readable code used in robot output.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::ValidationFailed(_) => "validation_failed",
            Self::RateLimited { .. } => "rate_limited",
            Self::Upstream { .. } => "upstream_error",
            Self::EmptyResult => "empty_result",
            Self::Cancelled => "cancelled",
            Self::Config(_) | Self::MissingConfig(_) => "config_error",
            Self::NotFound(_) => "not_found",
            Self::Serialization(_) => "serialization_error",
            Self::Database(_) => "database_error",
            Self::Io(_) => "io_error",
        }
    }

    /// True for failures the caller may retry later without changing input.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}

impl From<serde_json::Error> for CsError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

fn retry_hint(retry_after_secs: &Option<u64>) -> String {
    retry_after_secs.map_or_else(String::new, |secs| format!(", retry after {secs}s"))
}
