use std::time::Duration;

use httpmock::prelude::*;
use serde_json::json;

use campus_search::CsError;
use campus_search::config::EmbeddingConfig;
use campus_search::search::{ApiEmbedder, Embedder};

const PATH: &str = "/v1/embeddings";

fn embedder(server: &MockServer) -> ApiEmbedder {
    let config = EmbeddingConfig {
        endpoint: server.url(PATH),
        model: "text-embedding-3-small".to_string(),
        dimensions: 3,
        api_key: Some("test-key".to_string()),
        timeout: Duration::from_secs(5),
        ..EmbeddingConfig::default()
    };
    ApiEmbedder::from_config(&config).expect("build embedder")
}

#[test]
fn single_embedding_returns_vector_model_and_usage() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path(PATH)
            .header("authorization", "Bearer test-key")
            .body_includes("\"input\":\"desk lamp\"")
            .body_includes("\"dimensions\":3");
        then.status(200).json_body(json!({
            "data": [{"embedding": [0.1, 0.2, 0.3], "index": 0}],
            "model": "text-embedding-3-small",
            "usage": {"prompt_tokens": 2, "total_tokens": 2}
        }));
    });

    let result = embedder(&server).embed("  desk\r\n\nlamp ").unwrap();
    mock.assert();
    assert_eq!(result.embedding, vec![0.1, 0.2, 0.3]);
    assert_eq!(result.model, "text-embedding-3-small");
    assert_eq!(result.usage.total_tokens, 2);
}

#[test]
fn rate_limit_carries_retry_after() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST).path(PATH);
        then.status(429)
            .header("retry-after", "7")
            .json_body(json!({"error": {"message": "slow down"}}));
    });

    let err = embedder(&server).embed("desk lamp").unwrap_err();
    mock.assert();
    assert!(matches!(
        err,
        CsError::RateLimited {
            retry_after_secs: Some(7)
        }
    ));
    assert!(err.is_retryable());
    assert_eq!(err.code(), "rate_limited");
}

#[test]
fn server_error_surfaces_upstream_message() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path(PATH);
        then.status(500)
            .json_body(json!({"error": {"message": "model overloaded"}}));
    });

    match embedder(&server).embed("desk lamp").unwrap_err() {
        CsError::Upstream { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "model overloaded");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn wrong_dimensions_are_rejected() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path(PATH);
        then.status(200).json_body(json!({
            "data": [{"embedding": [0.1, 0.2], "index": 0}],
            "model": "text-embedding-3-small"
        }));
    });

    let err = embedder(&server).embed("desk lamp").unwrap_err();
    assert!(matches!(err, CsError::Upstream { ref message, .. } if message.contains("dimensions")));
}

#[test]
fn batch_is_one_call_reordered_by_index() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path(PATH)
            .body_includes("\"input\":[\"lamp\",\"chair\"]");
        then.status(200).json_body(json!({
            "data": [
                {"embedding": [0.0, 1.0, 0.0], "index": 1},
                {"embedding": [1.0, 0.0, 0.0], "index": 0}
            ],
            "model": "text-embedding-3-small",
            "usage": {"prompt_tokens": 2, "total_tokens": 2}
        }));
    });

    let vectors = embedder(&server)
        .embed_batch(&["lamp".to_string(), "chair".to_string()])
        .unwrap();
    mock.assert_calls(1);
    assert_eq!(vectors, vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]]);
}

#[test]
fn empty_batch_and_blank_inputs_never_call_upstream() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST).path(PATH);
        then.status(500);
    });
    let embedder = embedder(&server);

    assert!(embedder.embed_batch(&[]).unwrap().is_empty());
    let err = embedder
        .embed_batch(&["lamp".to_string(), "\n\n".to_string()])
        .unwrap_err();
    assert!(matches!(err, CsError::ValidationFailed(ref msg) if msg.contains("[1]")));
    assert!(matches!(
        embedder.embed("   "),
        Err(CsError::ValidationFailed(_))
    ));
    mock.assert_calls(0);
}

#[test]
fn unreachable_endpoint_is_upstream_error() {
    let config = EmbeddingConfig {
        endpoint: "http://127.0.0.1:9/v1/embeddings".to_string(),
        dimensions: 3,
        timeout: Duration::from_secs(2),
        ..EmbeddingConfig::default()
    };
    let err = ApiEmbedder::from_config(&config)
        .unwrap()
        .embed("desk lamp")
        .unwrap_err();
    assert!(matches!(err, CsError::Upstream { status: 0, .. }));
}
