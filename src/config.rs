use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CsError, Result};

/// Default embeddings endpoint (OpenAI-compatible).
pub const DEFAULT_EMBEDDING_ENDPOINT: &str = "https://api.openai.com/v1/embeddings";

/// Default embedding model.
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Maximum characters submitted to the embeddings API per input.
pub const MAX_EMBEDDING_INPUT_CHARS: usize = 8000;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
}

impl Config {
    pub fn load(explicit_path: Option<&Path>, root: &Path) -> Result<Self> {
        let mut config = Self::default();

        let explicit = explicit_path
            .map(PathBuf::from)
            .or_else(|| std::env::var("CS_CONFIG").ok().map(PathBuf::from));

        if let Some(path) = explicit {
            if let Some(patch) = Self::load_patch(&path)? {
                config.merge_patch(patch);
            }
        } else {
            if let Some(global) = Self::load_global()? {
                config.merge_patch(global);
            }
            if let Some(project) = Self::load_project(root)? {
                config.merge_patch(project);
            }
        }

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Parse a single TOML document on top of the defaults.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let patch: ConfigPatch =
            toml::from_str(raw).map_err(|err| CsError::Config(format!("parse config: {err}")))?;
        let mut config = Self::default();
        config.merge_patch(patch);
        config.validate()?;
        Ok(config)
    }

    fn load_global() -> Result<Option<ConfigPatch>> {
        let Some(dir) = dirs::config_dir() else {
            return Ok(None);
        };
        Self::load_patch(&dir.join("campus-search/config.toml"))
    }

    fn load_project(root: &Path) -> Result<Option<ConfigPatch>> {
        Self::load_patch(&root.join("config.toml"))
    }

    fn load_patch(path: &Path) -> Result<Option<ConfigPatch>> {
        if !path.exists() {
            return Ok(None);
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|err| CsError::Config(format!("read config {}: {err}", path.display())))?;
        let patch = toml::from_str(&raw)
            .map_err(|err| CsError::Config(format!("parse config {}: {err}", path.display())))?;
        Ok(Some(patch))
    }

    fn merge_patch(&mut self, patch: ConfigPatch) {
        if let Some(patch) = patch.search {
            self.search.merge(patch);
        }
        if let Some(patch) = patch.embedding {
            self.embedding.merge(patch);
        }
        if let Some(patch) = patch.catalog {
            self.catalog.merge(patch);
        }
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(value) = env_u32("CS_SEARCH_DEFAULT_LIMIT")? {
            self.search.default_limit = value;
        }
        if let Some(value) = env_u32("CS_SEARCH_MAX_LIMIT")? {
            self.search.max_limit = value;
        }
        if let Some(value) = env_f32("CS_SEARCH_FULL_TEXT_WEIGHT")? {
            self.search.full_text_weight = value;
        }
        if let Some(value) = env_f32("CS_SEARCH_SEMANTIC_WEIGHT")? {
            self.search.semantic_weight = value;
        }
        if let Some(value) = env_bool("CS_SEARCH_USE_EMBEDDINGS") {
            self.search.use_embeddings = value;
        }
        if let Some(value) = env_u32("CS_SEARCH_CANDIDATE_LIMIT")? {
            self.search.candidate_limit = value;
        }
        if let Some(value) = env_bool("CS_SEARCH_SCOPE_TO_SESSION_UNIVERSITY") {
            self.search.scope_to_session_university = value;
        }

        if let Some(value) = env_string("CS_EMBEDDING_BACKEND") {
            self.embedding.backend = parse_backend(&value)?;
        }
        if let Some(value) = env_string("CS_EMBEDDING_ENDPOINT") {
            self.embedding.endpoint = value;
        }
        if let Some(value) = env_string("CS_EMBEDDING_MODEL") {
            self.embedding.model = value;
        }
        if let Some(value) = env_u32("CS_EMBEDDING_DIMENSIONS")? {
            self.embedding.dimensions = value;
        }
        if let Some(value) = env_string("CS_EMBEDDING_API_KEY") {
            self.embedding.api_key = Some(value);
        }
        if let Some(value) = env_string("CS_EMBEDDING_TIMEOUT") {
            self.embedding.timeout = humantime_serde::re::humantime::parse_duration(&value)
                .map_err(|err| {
                    CsError::Config(format!("invalid CS_EMBEDDING_TIMEOUT value {value}: {err}"))
                })?;
        }
        if let Some(value) = env_u32("CS_EMBEDDING_BATCH_SIZE")? {
            self.embedding.batch_size = value;
        }

        if let Some(value) = env_string("CS_CATALOG_PATH") {
            self.catalog.path = Some(PathBuf::from(value));
        }

        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.search.default_limit == 0 {
            return Err(CsError::Config(
                "search.default_limit must be at least 1".to_string(),
            ));
        }
        if self.search.max_limit < self.search.default_limit {
            return Err(CsError::Config(format!(
                "search.max_limit ({}) is below search.default_limit ({})",
                self.search.max_limit, self.search.default_limit
            )));
        }
        for (name, weight) in [
            ("search.full_text_weight", self.search.full_text_weight),
            ("search.semantic_weight", self.search.semantic_weight),
        ] {
            if !weight.is_finite() || !(0.0..=1.0).contains(&weight) {
                return Err(CsError::Config(format!(
                    "{name} must be within [0, 1], got {weight}"
                )));
            }
        }
        if self.embedding.dimensions == 0 {
            return Err(CsError::Config(
                "embedding.dimensions must be at least 1".to_string(),
            ));
        }
        if self.embedding.batch_size == 0 {
            return Err(CsError::Config(
                "embedding.batch_size must be at least 1".to_string(),
            ));
        }
        if self.embedding.max_input_chars == 0 {
            return Err(CsError::Config(
                "embedding.max_input_chars must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub default_limit: u32,
    pub max_limit: u32,
    pub full_text_weight: f32,
    pub semantic_weight: f32,
    pub use_embeddings: bool,
    /// Candidates requested from each signal before fusion. Also bounds
    /// `pagination.total`; deeper pages widen the window as needed.
    pub candidate_limit: u32,
    pub max_recommendations: u32,
    pub scope_to_session_university: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: 20,
            max_limit: 100,
            full_text_weight: 0.5,
            semantic_weight: 0.5,
            use_embeddings: true,
            candidate_limit: 200,
            max_recommendations: 10,
            scope_to_session_university: false,
        }
    }
}

impl SearchConfig {
    fn merge(&mut self, patch: SearchPatch) {
        if let Some(value) = patch.default_limit {
            self.default_limit = value;
        }
        if let Some(value) = patch.max_limit {
            self.max_limit = value;
        }
        if let Some(value) = patch.full_text_weight {
            self.full_text_weight = value;
        }
        if let Some(value) = patch.semantic_weight {
            self.semantic_weight = value;
        }
        if let Some(value) = patch.use_embeddings {
            self.use_embeddings = value;
        }
        if let Some(value) = patch.candidate_limit {
            self.candidate_limit = value;
        }
        if let Some(value) = patch.max_recommendations {
            self.max_recommendations = value;
        }
        if let Some(value) = patch.scope_to_session_university {
            self.scope_to_session_university = value;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Remote OpenAI-compatible embeddings API.
    Api,
    /// Deterministic offline FNV-1a hash embeddings.
    Hash,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub backend: EmbeddingBackend,
    pub endpoint: String,
    pub model: String,
    pub dimensions: u32,
    /// Inline key. Prefer `api_key_env` so keys stay out of config files.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub api_key_env: String,
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    pub max_input_chars: usize,
    pub batch_size: u32,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::Api,
            endpoint: DEFAULT_EMBEDDING_ENDPOINT.to_string(),
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            dimensions: 1536,
            api_key: None,
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout: Duration::from_secs(30),
            max_input_chars: MAX_EMBEDDING_INPUT_CHARS,
            batch_size: 64,
        }
    }
}

impl EmbeddingConfig {
    /// Resolve the API key from the inline value or the configured env var.
    #[must_use]
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| {
                std::env::var(&self.api_key_env)
                    .ok()
                    .filter(|key| !key.trim().is_empty())
            })
    }

    fn merge(&mut self, patch: EmbeddingPatch) {
        if let Some(value) = patch.backend {
            self.backend = value;
        }
        if let Some(value) = patch.endpoint {
            self.endpoint = value;
        }
        if let Some(value) = patch.model {
            self.model = value;
        }
        if let Some(value) = patch.dimensions {
            self.dimensions = value;
        }
        if let Some(value) = patch.api_key {
            self.api_key = Some(value);
        }
        if let Some(value) = patch.api_key_env {
            self.api_key_env = value;
        }
        if let Some(value) = patch.timeout {
            self.timeout = value;
        }
        if let Some(value) = patch.max_input_chars {
            self.max_input_chars = value;
        }
        if let Some(value) = patch.batch_size {
            self.batch_size = value;
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// SQLite catalog path. Defaults to `<root>/catalog.db`.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl CatalogConfig {
    fn merge(&mut self, patch: CatalogPatch) {
        if let Some(value) = patch.path {
            self.path = Some(value);
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigPatch {
    pub search: Option<SearchPatch>,
    pub embedding: Option<EmbeddingPatch>,
    pub catalog: Option<CatalogPatch>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct SearchPatch {
    pub default_limit: Option<u32>,
    pub max_limit: Option<u32>,
    pub full_text_weight: Option<f32>,
    pub semantic_weight: Option<f32>,
    pub use_embeddings: Option<bool>,
    pub candidate_limit: Option<u32>,
    pub max_recommendations: Option<u32>,
    pub scope_to_session_university: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct EmbeddingPatch {
    pub backend: Option<EmbeddingBackend>,
    pub endpoint: Option<String>,
    pub model: Option<String>,
    pub dimensions: Option<u32>,
    pub api_key: Option<String>,
    pub api_key_env: Option<String>,
    #[serde(default, with = "humantime_serde::option")]
    pub timeout: Option<Duration>,
    pub max_input_chars: Option<usize>,
    pub batch_size: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct CatalogPatch {
    pub path: Option<PathBuf>,
}

fn parse_backend(value: &str) -> Result<EmbeddingBackend> {
    match value.to_lowercase().as_str() {
        "api" | "openai" | "remote" => Ok(EmbeddingBackend::Api),
        "hash" | "local" => Ok(EmbeddingBackend::Hash),
        _ => Err(CsError::Config(format!(
            "invalid embedding backend {value} (expected api|hash)"
        ))),
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .map(|value| matches!(value.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}

fn env_u32(key: &str) -> Result<Option<u32>> {
    match std::env::var(key) {
        Ok(value) => value
            .parse::<u32>()
            .map(Some)
            .map_err(|err| CsError::Config(format!("invalid {key} value {value}: {err}"))),
        Err(_) => Ok(None),
    }
}

fn env_f32(key: &str) -> Result<Option<f32>> {
    match std::env::var(key) {
        Ok(value) => value
            .parse::<f32>()
            .map(Some)
            .map_err(|err| CsError::Config(format!("invalid {key} value {value}: {err}"))),
        Err(_) => Ok(None),
    }
}
