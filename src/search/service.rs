//! Search orchestration.
//!
//! `SearchParams` → normalize → (embed query ‖ full-text scores) → semantic
//! scores → fuse → paginate → hydrate the page from the catalog.
//!
//! Only top-level validation surfaces as `Err`. Every later failure becomes a
//! `success: false` [`SearchResponse`] with no data.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info_span, warn};

use crate::catalog::{CatalogStore, Product};
use crate::config::SearchConfig;
use crate::error::{CsError, Result};
use crate::search::embeddings::Embedder;
use crate::search::hybrid::{self, HybridResult, ScoreSet};
use crate::search::pagination::{Page, paginate};
use crate::search::query::{NormalizedQuery, QueryDefaults, normalize};
use crate::search::recommend;
use crate::search::types::{
    SearchMode, SearchParams, SearchRecommendation, SearchResponse, SearchResultProduct,
};

/// Cooperative cancellation flag.
///
/// A child token observes its parent's cancellation, but cancelling a child
/// never cancels the parent.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    parent: Option<Arc<AtomicBool>>,
}

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn child(&self) -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            parent: Some(Arc::clone(&self.flag)),
        }
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
            || self
                .parent
                .as_ref()
                .is_some_and(|parent| parent.load(Ordering::SeqCst))
    }

    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(CsError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Authenticated user, injected per request by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub user_id: String,
    #[serde(default)]
    pub university_id: Option<String>,
}

/// Per-request state handed to the service explicitly.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: String,
    pub session: Option<AuthSession>,
    pub cancel: CancelToken,
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestContext {
    #[must_use]
    pub fn new() -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            session: None,
            cancel: CancelToken::new(),
        }
    }

    #[must_use]
    pub fn with_session(mut self, session: AuthSession) -> Self {
        self.session = Some(session);
        self
    }

    #[must_use]
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }
}

pub struct SearchService {
    store: Arc<dyn CatalogStore>,
    embedder: Arc<dyn Embedder>,
    defaults: QueryDefaults,
    candidate_limit: usize,
    max_recommendations: usize,
    scope_to_session_university: bool,
}

impl SearchService {
    pub fn new(
        store: Arc<dyn CatalogStore>,
        embedder: Arc<dyn Embedder>,
        config: &SearchConfig,
    ) -> Self {
        Self {
            store,
            embedder,
            defaults: QueryDefaults::from(config),
            candidate_limit: config.candidate_limit.max(1) as usize,
            max_recommendations: config.max_recommendations as usize,
            scope_to_session_university: config.scope_to_session_university,
        }
    }

    /// Run a search.
    ///
    /// Returns `Err` only for an invalid top-level request, before any I/O.
    pub fn search(&self, params: &SearchParams, ctx: &RequestContext) -> Result<SearchResponse> {
        let mut query = normalize(params, &self.defaults)?;
        self.apply_session_scope(&mut query, ctx);

        let user_id = ctx.session.as_ref().map_or("", |s| s.user_id.as_str());
        let span = info_span!("search", request_id = %ctx.request_id, user_id, mode = ?query.mode);
        let _guard = span.enter();

        let started = Instant::now();
        let response = match self.execute(&query, &ctx.cancel) {
            Ok(response) => response,
            Err(CsError::EmptyResult) => {
                debug!("no candidates from any signal");
                let empty =
                    paginate::<HybridResult>(&[], i64::from(query.page), i64::from(query.limit));
                assemble(&query, &empty, HashMap::new())
            }
            Err(err) => {
                warn!(code = err.code(), "search failed: {err}");
                SearchResponse::failure(&query.text, query.page, query.limit, failure_message(&err))
            }
        };
        debug!(
            elapsed_ms = started.elapsed().as_millis(),
            total = response.pagination.total,
            returned = response.data.len(),
            "search finished"
        );
        Ok(response)
    }

    /// Type-ahead suggestions capped by `[search].max_recommendations`.
    pub fn recommend(&self, query: &str, limit: i64) -> Result<Vec<SearchRecommendation>> {
        recommend::recommend(self.store.as_ref(), query, limit, self.max_recommendations)
    }

    fn apply_session_scope(&self, query: &mut NormalizedQuery, ctx: &RequestContext) {
        if !self.scope_to_session_university || query.filters.university_id.is_some() {
            return;
        }
        if let Some(university) = ctx.session.as_ref().and_then(|s| s.university_id.clone()) {
            query.filters.university_id = Some(university);
        }
    }

    fn execute(&self, query: &NormalizedQuery, cancel: &CancelToken) -> Result<SearchResponse> {
        let (full_text, semantic) = self.gather(query, cancel)?;
        debug!(
            full_text = full_text.len(),
            semantic = semantic.len(),
            "collected candidate scores"
        );
        let ranked = hybrid::score(&full_text, &semantic, query.weights)?;

        let page = paginate(&ranked, i64::from(query.page), i64::from(query.limit));
        let ids: Vec<String> = page.data.iter().map(|r| r.id.clone()).collect();
        cancel.check()?;
        let products = self
            .store
            .products(&ids)?
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect();

        Ok(assemble(query, &page, products))
    }

    /// Collect the score sets the query's mode asks for.
    ///
    /// In hybrid mode the query embedding and the full-text lookup run
    /// concurrently. A failing branch cancels its sibling.
    fn gather(&self, query: &NormalizedQuery, cancel: &CancelToken) -> Result<(ScoreSet, ScoreSet)> {
        match query.mode {
            SearchMode::FullText => Ok((self.full_text(query, cancel)?, ScoreSet::new())),
            SearchMode::Semantic => Ok((ScoreSet::new(), self.semantic(query, cancel)?)),
            SearchMode::Hybrid => {
                let branch = cancel.child();
                let (full_text, semantic) = rayon::join(
                    || self.full_text(query, &branch).inspect_err(|_| branch.cancel()),
                    || self.semantic(query, &branch).inspect_err(|_| branch.cancel()),
                );
                match (full_text, semantic) {
                    (Ok(ft), Ok(sem)) => Ok((ft, sem)),
                    // Prefer the root cause over the sibling's cancellation.
                    (Err(CsError::Cancelled), Err(err)) | (Err(err), _) | (_, Err(err)) => {
                        Err(err)
                    }
                }
            }
        }
    }

    /// Candidates fetched per signal: the configured limit, widened so the
    /// requested page is always inside the window.
    fn candidate_window(&self, query: &NormalizedQuery) -> usize {
        let page_end = (query.page as usize).saturating_mul(query.limit as usize);
        self.candidate_limit.max(page_end)
    }

    fn full_text(&self, query: &NormalizedQuery, cancel: &CancelToken) -> Result<ScoreSet> {
        cancel.check()?;
        self.store
            .full_text_scores(&query.text, &query.filters, self.candidate_window(query))
    }

    fn semantic(&self, query: &NormalizedQuery, cancel: &CancelToken) -> Result<ScoreSet> {
        cancel.check()?;
        let embedding = self.embedder.embed(&query.text)?;
        debug!(
            model = %embedding.model,
            tokens = embedding.usage.total_tokens,
            "embedded query"
        );
        cancel.check()?;
        self.store
            .semantic_scores(&embedding.embedding, &query.filters, self.candidate_window(query))
    }
}

fn assemble(
    query: &NormalizedQuery,
    page: &Page<HybridResult>,
    mut products: HashMap<String, Product>,
) -> SearchResponse {
    let data: Vec<SearchResultProduct> = page
        .data
        .iter()
        .filter_map(|result| {
            let product = products.remove(&result.id);
            if product.is_none() {
                debug!(id = %result.id, "ranked product missing from catalog");
            }
            product.map(|p| p.into_result(result.score))
        })
        .collect();

    SearchResponse {
        success: true,
        data,
        pagination: page.pagination,
        query: query.text.clone(),
        error: None,
    }
}

fn failure_message(err: &CsError) -> String {
    match err {
        CsError::Cancelled => "search cancelled".to_string(),
        other => other.to_string(),
    }
}
