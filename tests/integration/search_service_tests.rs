use std::sync::Arc;
use std::time::Duration;

use httpmock::prelude::*;
use tracing::Level;

use campus_search::catalog::{IndexOptions, SqliteCatalog, index_embeddings};
use campus_search::config::{EmbeddingConfig, SearchConfig};
use campus_search::search::{
    ApiEmbedder, AuthSession, CancelToken, HashEmbedder, RequestContext, SearchFilters,
    SearchMode, SearchParams, SearchResponse, SearchService,
};
use campus_search::test_utils::fixtures::seeded_catalog;
use campus_search::test_utils::logging::capture_logs;

const DIMS: usize = 1024;

fn indexed_catalog(embedder: &HashEmbedder) -> Arc<SqliteCatalog> {
    let catalog = seeded_catalog();
    index_embeddings(
        &catalog,
        embedder,
        &IndexOptions::default(),
        &CancelToken::new(),
    )
    .expect("index embeddings");
    catalog
}

fn service_with(config: &SearchConfig) -> SearchService {
    let embedder = Arc::new(HashEmbedder::new(DIMS));
    let catalog = indexed_catalog(&embedder);
    SearchService::new(catalog, embedder, config)
}

fn service() -> SearchService {
    service_with(&SearchConfig::default())
}

fn ids(response: &SearchResponse) -> Vec<&str> {
    response.data.iter().map(|p| p.id.as_str()).collect()
}

fn full_text(query: &str) -> SearchParams {
    SearchParams {
        mode: Some(SearchMode::FullText),
        ..SearchParams::new(query)
    }
}

#[test]
fn full_text_search_finds_only_matching_products() {
    let response = service()
        .search(&full_text("lamp"), &RequestContext::new())
        .unwrap();
    assert!(response.success);
    assert_eq!(response.pagination.total, 2);
    let mut found = ids(&response);
    found.sort_unstable();
    assert_eq!(found, vec!["p1", "p6"]);
    assert!(response.data.iter().all(|p| p.relevance_score <= 1.0));
}

#[test]
fn hybrid_search_ranks_lexical_and_semantic_matches_first() {
    let response = service()
        .search(&SearchParams::new("lamp"), &RequestContext::new())
        .unwrap();
    assert!(response.success);
    let top: Vec<&str> = ids(&response).into_iter().take(2).collect();
    assert!(top.contains(&"p1") && top.contains(&"p6"), "{top:?}");
    for pair in response.data.windows(2) {
        assert!(pair[0].relevance_score >= pair[1].relevance_score);
    }
}

#[test]
fn filters_narrow_results() {
    let svc = service();
    let ctx = RequestContext::new();

    let by_university = SearchParams {
        filters: Some(SearchFilters {
            university_id: Some("uni-b".to_string()),
            ..SearchFilters::default()
        }),
        ..full_text("lamp")
    };
    assert_eq!(ids(&svc.search(&by_university, &ctx).unwrap()), vec!["p6"]);

    let by_price = SearchParams {
        filters: Some(SearchFilters {
            max_price: Some(30.0),
            ..SearchFilters::default()
        }),
        ..full_text("lamp")
    };
    assert_eq!(ids(&svc.search(&by_price, &ctx).unwrap()), vec!["p1"]);

    let by_category = SearchParams {
        filters: Some(SearchFilters {
            category_id: Some("books".to_string()),
            ..SearchFilters::default()
        }),
        ..full_text("lamp")
    };
    let response = svc.search(&by_category, &ctx).unwrap();
    assert!(response.success);
    assert!(response.data.is_empty());
}

#[test]
fn session_university_scopes_when_enabled() {
    let config = SearchConfig {
        scope_to_session_university: true,
        ..SearchConfig::default()
    };
    let svc = service_with(&config);
    let ctx = RequestContext::new().with_session(AuthSession {
        user_id: "u1".to_string(),
        university_id: Some("uni-a".to_string()),
    });
    assert_eq!(ids(&svc.search(&full_text("lamp"), &ctx).unwrap()), vec!["p1"]);

    // An explicit filter wins over the session default.
    let explicit = SearchParams {
        filters: Some(SearchFilters {
            university_id: Some("uni-b".to_string()),
            ..SearchFilters::default()
        }),
        ..full_text("lamp")
    };
    assert_eq!(ids(&svc.search(&explicit, &ctx).unwrap()), vec!["p6"]);

    // Disabled by default.
    let unscoped = service().search(&full_text("lamp"), &ctx).unwrap();
    assert_eq!(unscoped.pagination.total, 2);
}

#[test]
fn pagination_walks_the_ranking() {
    let svc = service();
    let ctx = RequestContext::new();
    let page = |n| SearchParams {
        page: Some(n),
        limit: Some(1),
        ..full_text("lamp")
    };

    let first = svc.search(&page(1), &ctx).unwrap();
    let second = svc.search(&page(2), &ctx).unwrap();
    let third = svc.search(&page(3), &ctx).unwrap();

    assert_eq!(first.pagination.total_pages, 2);
    assert_eq!(first.data.len(), 1);
    assert_eq!(second.data.len(), 1);
    assert_ne!(first.data[0].id, second.data[0].id);
    assert!(third.success);
    assert!(third.data.is_empty());
    assert_eq!(third.pagination.total, 2);
}

#[test]
fn no_match_is_a_successful_empty_response() {
    let response = service()
        .search(&full_text("kayak"), &RequestContext::new())
        .unwrap();
    assert!(response.success);
    assert!(response.data.is_empty());
    assert_eq!(response.pagination.total, 0);
    assert_eq!(response.query, "kayak");
}

#[test]
fn rate_limited_embedding_fails_the_whole_search() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST).path("/v1/embeddings");
        then.status(429).header("retry-after", "30");
    });
    let embedder = ApiEmbedder::from_config(&EmbeddingConfig {
        endpoint: server.url("/v1/embeddings"),
        dimensions: DIMS as u32,
        timeout: Duration::from_secs(5),
        ..EmbeddingConfig::default()
    })
    .unwrap();
    let svc = SearchService::new(seeded_catalog(), Arc::new(embedder), &SearchConfig::default());

    let (response, logs) = capture_logs("campus_search=debug", || {
        svc.search(&SearchParams::new("lamp"), &RequestContext::new())
            .unwrap()
    });
    mock.assert();
    assert!(!response.success);
    assert!(response.data.is_empty());
    assert_eq!(response.pagination.total, 0);
    assert!(response.error.unwrap().contains("retry after 30s"));
    assert!(logs.contains(Level::WARN, "search failed"), "{}", logs.display());

    // Full-text mode never reaches the embedder.
    let (ok, logs) = capture_logs("campus_search=debug", || {
        svc.search(&full_text("lamp"), &RequestContext::new())
            .unwrap()
    });
    assert!(ok.success);
    assert!(!logs.has_warnings(), "{}", logs.display());
    assert!(logs.contains(Level::DEBUG, "search finished"));
    mock.assert_calls(1);
}

#[test]
fn cancelled_request_reports_cancellation() {
    let cancel = CancelToken::new();
    cancel.cancel();
    let response = service()
        .search(
            &SearchParams::new("lamp"),
            &RequestContext::new().with_cancel(cancel),
        )
        .unwrap();
    assert!(!response.success);
    assert_eq!(response.error.as_deref(), Some("search cancelled"));
}

#[test]
fn recommendations_are_capped_and_deterministic() {
    let config = SearchConfig {
        max_recommendations: 2,
        ..SearchConfig::default()
    };
    let svc = service_with(&config);
    let recs = svc.recommend("la", 10).unwrap();
    assert_eq!(recs.len(), 2);
    assert_eq!(recs, svc.recommend("la", 10).unwrap());
    assert!(svc.recommend("lamp", 0).unwrap().is_empty());
    assert!(svc.recommend("   ", 5).unwrap().is_empty());

    let furniture = service().recommend("furn", 10).unwrap();
    let titles: Vec<_> = furniture.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, vec!["Desk Chair", "Desk Lamp", "Floor Lamp"]);
}

#[test]
fn candidate_window_bounds_total_but_reaches_deep_pages() {
    let config = SearchConfig {
        candidate_limit: 1,
        ..SearchConfig::default()
    };
    let svc = service_with(&config);
    let ctx = RequestContext::new();
    let page = |n| SearchParams {
        page: Some(n),
        limit: Some(1),
        ..full_text("lamp")
    };

    let first = svc.search(&page(1), &ctx).unwrap();
    assert_eq!(first.pagination.total, 1);
    assert_eq!(first.data.len(), 1);

    let second = svc.search(&page(2), &ctx).unwrap();
    assert_eq!(second.pagination.total, 2);
    assert_eq!(second.data.len(), 1);
    assert_ne!(first.data[0].id, second.data[0].id);
}
