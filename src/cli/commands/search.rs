//! campus-search search - Search products

use clap::{Args, ValueEnum};
use tracing::warn;

use crate::app::AppContext;
use crate::cli::formatters::format_search_response;
use crate::cli::output::{emit_robot, robot_error_with, robot_ok};
use crate::error::Result;
use crate::search::{AuthSession, RequestContext, SearchFilters, SearchMode, SearchParams};

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum ModeArg {
    #[default]
    Hybrid,
    FullText,
    Semantic,
}

impl From<ModeArg> for SearchMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Hybrid => Self::Hybrid,
            ModeArg::FullText => Self::FullText,
            ModeArg::Semantic => Self::Semantic,
        }
    }
}

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Search query
    pub query: String,

    /// Page number (1-based)
    #[arg(long, short)]
    pub page: Option<i64>,

    /// Results per page
    #[arg(long, short)]
    pub limit: Option<i64>,

    /// Retrieval mode
    #[arg(long, value_enum, default_value_t = ModeArg::Hybrid)]
    pub mode: ModeArg,

    /// Filter by category id
    #[arg(long)]
    pub category: Option<String>,

    /// Filter by university id
    #[arg(long)]
    pub university: Option<String>,

    #[arg(long)]
    pub min_price: Option<f64>,

    #[arg(long)]
    pub max_price: Option<f64>,

    /// Weight of the full-text signal in hybrid mode (0-1)
    #[arg(long)]
    pub full_text_weight: Option<f32>,

    /// Weight of the semantic signal in hybrid mode (0-1)
    #[arg(long)]
    pub semantic_weight: Option<f32>,

    /// Act as this user (for request logging and university scoping)
    #[arg(long, env = "CS_USER_ID")]
    pub user_id: Option<String>,

    /// University of the acting user
    #[arg(long, env = "CS_USER_UNIVERSITY", requires = "user_id")]
    pub user_university: Option<String>,
}

impl SearchArgs {
    #[must_use]
    pub fn to_params(&self) -> SearchParams {
        let filters = SearchFilters {
            category_id: self.category.clone(),
            university_id: self.university.clone(),
            min_price: self.min_price,
            max_price: self.max_price,
        };
        SearchParams {
            query: self.query.clone(),
            filters: (!filters.is_empty()).then_some(filters),
            page: self.page,
            limit: self.limit,
            full_text_weight: self.full_text_weight,
            semantic_weight: self.semantic_weight,
            mode: Some(self.mode.into()),
        }
    }

    fn request_context(&self) -> RequestContext {
        let ctx = RequestContext::new();
        match &self.user_id {
            Some(user_id) => ctx.with_session(AuthSession {
                user_id: user_id.clone(),
                university_id: self.user_university.clone(),
            }),
            None => ctx,
        }
    }

    /// Notices about how the request will actually be served.
    fn warnings(&self, use_embeddings: bool) -> Vec<String> {
        let mut warnings = Vec::new();
        let weighted = self.full_text_weight.is_some() || self.semantic_weight.is_some();
        match self.mode {
            ModeArg::Hybrid if !use_embeddings => {
                warnings
                    .push("embeddings are disabled; hybrid search ran full-text only".to_string());
            }
            ModeArg::FullText | ModeArg::Semantic if weighted => {
                warnings.push("signal weights are ignored outside hybrid mode".to_string());
            }
            _ => {}
        }
        warnings
    }
}

pub fn run(ctx: &AppContext, args: &SearchArgs) -> Result<()> {
    let service = ctx.search_service();
    let response = service.search(&args.to_params(), &args.request_context())?;
    let warnings = args.warnings(ctx.config.search.use_embeddings);

    if ctx.robot_mode() {
        let envelope = if response.success {
            robot_ok(&response)
        } else {
            let message = response.error.clone().unwrap_or_default();
            robot_error_with("search_failed", message, &response)
        };
        emit_robot(
            &warnings
                .into_iter()
                .fold(envelope, |envelope, warning| envelope.with_warning(warning)),
        )
    } else {
        for warning in &warnings {
            warn!("{warning}");
        }
        println!("{}", format_search_response(&response));
        Ok(())
    }
}
