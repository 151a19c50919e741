use std::path::PathBuf;
use std::time::Duration;

use campus_search::CsError;
use campus_search::config::{Config, EmbeddingBackend};
use campus_search::test_utils::{TestCase, run_table_tests};

fn fixture_path(relative: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(relative)
}

fn load_fixture(relative: &str) -> Result<Config, CsError> {
    let root = tempfile::tempdir().expect("tempdir");
    Config::load(Some(&fixture_path(relative)), root.path())
}

#[test]
fn config_search_section_from_fixture() -> Result<(), String> {
    let cases = vec![
        TestCase {
            name: "custom",
            input: "tests/fixtures/configs/custom.toml",
            expected: (10u32, 50u32, 0.7f32, 0.3f32, 400u32, 8u32, true, true),
            should_panic: false,
        },
        TestCase {
            name: "partial",
            input: "tests/fixtures/configs/partial.toml",
            expected: (20u32, 100u32, 0.5f32, 0.5f32, 200u32, 10u32, false, false),
            should_panic: false,
        },
    ];

    run_table_tests(cases, |relative_path| {
        let config = load_fixture(relative_path).expect("load config");
        let s = config.search;
        (
            s.default_limit,
            s.max_limit,
            s.full_text_weight,
            s.semantic_weight,
            s.candidate_limit,
            s.max_recommendations,
            s.scope_to_session_university,
            s.use_embeddings,
        )
    })?;
    Ok(())
}

#[test]
fn config_embedding_section_from_fixture() {
    let config = load_fixture("tests/fixtures/configs/custom.toml").unwrap();
    assert_eq!(config.embedding.backend, EmbeddingBackend::Hash);
    assert_eq!(config.embedding.model, "fnv1a-hash");
    assert_eq!(config.embedding.dimensions, 256);
    assert_eq!(config.embedding.timeout, Duration::from_secs(5));
    assert_eq!(config.embedding.batch_size, 16);
    assert_eq!(
        config.catalog.path,
        Some(PathBuf::from("/tmp/campus-search/catalog.db"))
    );

    let partial = load_fixture("tests/fixtures/configs/partial.toml").unwrap();
    assert_eq!(partial.embedding.timeout, Duration::from_secs(90));
    assert_eq!(partial.embedding.backend, EmbeddingBackend::Api);
    assert_eq!(partial.embedding.dimensions, 1536);
}

#[test]
fn config_rejects_inverted_limits() {
    let err = load_fixture("tests/fixtures/configs/invalid_limits.toml").unwrap_err();
    assert!(matches!(err, CsError::Config(ref msg) if msg.contains("max_limit")));
    assert_eq!(err.code(), "config_error");
}

#[test]
fn missing_explicit_config_keeps_defaults() {
    let root = tempfile::tempdir().unwrap();
    let config = Config::load(Some(&root.path().join("absent.toml")), root.path()).unwrap();
    assert_eq!(config.search.default_limit, 20);
    assert_eq!(config.search.max_limit, 100);
    assert_eq!(config.embedding.model, "text-embedding-3-small");
}

#[test]
fn config_round_trips_through_toml_without_api_key() {
    let mut config = Config::from_toml_str("[embedding]\napi_key = \"sk-secret\"\n").unwrap();
    assert_eq!(config.embedding.api_key.as_deref(), Some("sk-secret"));
    let rendered = toml::to_string(&config).unwrap();
    assert!(!rendered.contains("sk-secret"));

    config.embedding.api_key = None;
    let reparsed = Config::from_toml_str(&rendered).unwrap();
    assert_eq!(reparsed.search.default_limit, config.search.default_limit);
    assert_eq!(reparsed.embedding.timeout, config.embedding.timeout);
}
