//! Text embeddings.
//!
//! Two backends share the [`Embedder`] trait:
//! - [`ApiEmbedder`]: an OpenAI-compatible HTTP embeddings endpoint.
//! - [`HashEmbedder`]: FNV-1a hash embeddings. No model, no network, fully
//!   deterministic. Used offline and in tests.
//!
//! Both clean their input the same way and neither retries nor caches.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use reqwest::StatusCode;
use reqwest::header::RETRY_AFTER;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{EmbeddingBackend, EmbeddingConfig};
use crate::error::{CsError, Result};

static NEWLINE_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\r\n]+").expect("static newline pattern"));

/// Longest upstream error body echoed back in an error message.
const MAX_ERROR_BODY_CHARS: usize = 512;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddingUsage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbeddingResult {
    pub embedding: Vec<f32>,
    pub model: String,
    pub usage: EmbeddingUsage,
}

pub trait Embedder: Send + Sync {
    /// Model identifier reported with each embedding.
    fn model(&self) -> &str;

    /// Length of every vector this embedder produces.
    fn dimensions(&self) -> usize;

    fn embed(&self, text: &str) -> Result<EmbeddingResult>;

    /// Embed many texts in one call. Output order matches input order and an
    /// empty input slice never touches the backend.
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

impl<T: Embedder + ?Sized> Embedder for Arc<T> {
    fn model(&self) -> &str {
        (**self).model()
    }

    fn dimensions(&self) -> usize {
        (**self).dimensions()
    }

    fn embed(&self, text: &str) -> Result<EmbeddingResult> {
        (**self).embed(text)
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        (**self).embed_batch(texts)
    }
}

/// Build the embedder selected by `[embedding].backend`.
pub fn build_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    match config.backend {
        EmbeddingBackend::Api => Ok(Arc::new(ApiEmbedder::from_config(config)?)),
        EmbeddingBackend::Hash => Ok(Arc::new(
            HashEmbedder::new(config.dimensions as usize).with_max_input_chars(config.max_input_chars),
        )),
    }
}

/// Trim, fold newline runs into single spaces and truncate to `max_chars`.
#[must_use]
pub fn clean_text(text: &str, max_chars: usize) -> String {
    let collapsed = NEWLINE_RUNS.replace_all(text.trim(), " ");
    let truncated: String = collapsed.chars().take(max_chars).collect();
    truncated.trim_end().to_string()
}

/// Clean a single input, rejecting it if nothing is left.
pub fn prepare_input(text: &str, max_chars: usize) -> Result<String> {
    let cleaned = clean_text(text, max_chars);
    if cleaned.is_empty() {
        return Err(CsError::ValidationFailed(
            "embedding input is empty after cleaning".to_string(),
        ));
    }
    Ok(cleaned)
}

/// Clean a batch. Every empty input is reported by index in one error.
pub fn prepare_batch(texts: &[String], max_chars: usize) -> Result<Vec<String>> {
    let cleaned: Vec<String> = texts.iter().map(|t| clean_text(t, max_chars)).collect();
    let empty: Vec<String> = cleaned
        .iter()
        .enumerate()
        .filter(|(_, t)| t.is_empty())
        .map(|(i, _)| i.to_string())
        .collect();
    if !empty.is_empty() {
        return Err(CsError::ValidationFailed(format!(
            "embedding batch has empty inputs at indices [{}]",
            empty.join(", ")
        )));
    }
    Ok(cleaned)
}

/// Cosine similarity; 0.0 for mismatched lengths or zero vectors.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

// =============================================================================
// HTTP EMBEDDER
// =============================================================================

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: EmbeddingInput<'a>,
    dimensions: u32,
}

#[derive(Serialize)]
#[serde(untagged)]
enum EmbeddingInput<'a> {
    Single(&'a str),
    Batch(&'a [String]),
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
    #[serde(default)]
    model: String,
    #[serde(default)]
    usage: EmbeddingUsage,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
    index: usize,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Client for an OpenAI-compatible `/embeddings` endpoint.
pub struct ApiEmbedder {
    client: reqwest::blocking::Client,
    endpoint: String,
    model: String,
    dimensions: u32,
    api_key: Option<String>,
    max_input_chars: usize,
}

impl ApiEmbedder {
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self> {
        if config.endpoint.trim().is_empty() {
            return Err(CsError::Config(
                "embedding endpoint is empty; set [embedding].endpoint".to_string(),
            ));
        }
        if config.model.trim().is_empty() {
            return Err(CsError::Config(
                "embedding model is empty; set [embedding].model".to_string(),
            ));
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| CsError::Config(format!("embedding http client: {err}")))?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            dimensions: config.dimensions,
            api_key: config.resolve_api_key(),
            max_input_chars: config.max_input_chars,
        })
    }

    fn request(&self, input: EmbeddingInput<'_>, expected: usize) -> Result<EmbeddingResponse> {
        let body = EmbeddingRequest {
            model: &self.model,
            input,
            dimensions: self.dimensions,
        };

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        debug!(endpoint = %self.endpoint, model = %self.model, inputs = expected, "embedding request");
        let response = request.send().map_err(|err| CsError::Upstream {
            status: 0,
            message: format!("embedding request failed: {err}"),
        })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|value| value.to_str().ok())
                .and_then(parse_retry_after);
            warn!(?retry_after_secs, "embedding API rate limited");
            return Err(CsError::RateLimited { retry_after_secs });
        }

        let text = response.text().map_err(|err| CsError::Upstream {
            status: status.as_u16(),
            message: format!("read embedding response: {err}"),
        })?;

        if !status.is_success() {
            return Err(CsError::Upstream {
                status: status.as_u16(),
                message: upstream_message(&text),
            });
        }

        let parsed: EmbeddingResponse =
            serde_json::from_str(&text).map_err(|err| CsError::Upstream {
                status: status.as_u16(),
                message: format!("invalid embedding response: {err}"),
            })?;
        self.check_shape(&parsed, expected, status)?;
        Ok(parsed)
    }

    fn check_shape(
        &self,
        response: &EmbeddingResponse,
        expected: usize,
        status: StatusCode,
    ) -> Result<()> {
        if response.data.len() != expected {
            return Err(CsError::Upstream {
                status: status.as_u16(),
                message: format!(
                    "expected {expected} embeddings, received {}",
                    response.data.len()
                ),
            });
        }
        let dims = self.dimensions as usize;
        if let Some(bad) = response.data.iter().find(|d| d.embedding.len() != dims) {
            return Err(CsError::Upstream {
                status: status.as_u16(),
                message: format!(
                    "embedding {} has {} dimensions, expected {dims}",
                    bad.index,
                    bad.embedding.len()
                ),
            });
        }
        Ok(())
    }
}

impl Embedder for ApiEmbedder {
    fn model(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions as usize
    }

    fn embed(&self, text: &str) -> Result<EmbeddingResult> {
        let input = prepare_input(text, self.max_input_chars)?;
        let mut response = self.request(EmbeddingInput::Single(&input), 1)?;
        let datum = response.data.swap_remove(0);
        let model = if response.model.is_empty() {
            self.model.clone()
        } else {
            response.model
        };
        Ok(EmbeddingResult {
            embedding: datum.embedding,
            model,
            usage: response.usage,
        })
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let inputs = prepare_batch(texts, self.max_input_chars)?;
        let response = self.request(EmbeddingInput::Batch(&inputs), inputs.len())?;

        let mut slots: Vec<Option<Vec<f32>>> = vec![None; inputs.len()];
        for datum in response.data {
            let slot = slots.get_mut(datum.index).ok_or_else(|| CsError::Upstream {
                status: 200,
                message: format!("embedding index {} out of range", datum.index),
            })?;
            *slot = Some(datum.embedding);
        }
        slots
            .into_iter()
            .enumerate()
            .map(|(i, slot)| {
                slot.ok_or_else(|| CsError::Upstream {
                    status: 200,
                    message: format!("missing embedding for input {i}"),
                })
            })
            .collect()
    }
}

/// Parse a `Retry-After` value given in whole seconds.
#[must_use]
pub fn parse_retry_after(value: &str) -> Option<u64> {
    value.trim().parse::<u64>().ok()
}

fn upstream_message(body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ApiErrorBody>(body) {
        return parsed.error.message;
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "empty response body".to_string();
    }
    trimmed.chars().take(MAX_ERROR_BODY_CHARS).collect()
}

// =============================================================================
// HASH EMBEDDER
// =============================================================================

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Hash embedder using FNV-1a
pub struct HashEmbedder {
    /// Embedding dimension (default: 384)
    dim: usize,
    max_input_chars: usize,
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(384)
    }
}

impl HashEmbedder {
    /// Create embedder with specified dimension
    #[must_use]
    pub fn new(dim: usize) -> Self {
        Self {
            dim: dim.max(1),
            max_input_chars: crate::config::MAX_EMBEDDING_INPUT_CHARS,
        }
    }

    #[must_use]
    pub const fn with_max_input_chars(mut self, max_input_chars: usize) -> Self {
        self.max_input_chars = max_input_chars;
        self
    }

    /// Embed already-cleaned text into an L2-normalized vector.
    #[must_use]
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dim];
        for token in tokens(text) {
            let hash = fnv1a(token.as_bytes());
            #[allow(clippy::cast_possible_truncation)]
            let bucket = (hash % self.dim as u64) as usize;
            let sign = if hash >> 63 == 1 { -1.0 } else { 1.0 };
            vector[bucket] += sign;
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        }
        vector
    }

    /// Compute cosine similarity between two embeddings
    #[must_use]
    pub fn similarity(&self, a: &[f32], b: &[f32]) -> f32 {
        cosine_similarity(a, b)
    }
}

impl Embedder for HashEmbedder {
    fn model(&self) -> &str {
        "fnv1a-hash"
    }

    fn dimensions(&self) -> usize {
        self.dim
    }

    fn embed(&self, text: &str) -> Result<EmbeddingResult> {
        let input = prepare_input(text, self.max_input_chars)?;
        let token_count = u32::try_from(tokens(&input).count()).unwrap_or(u32::MAX);
        Ok(EmbeddingResult {
            embedding: self.embed_text(&input),
            model: self.model().to_string(),
            usage: EmbeddingUsage {
                prompt_tokens: token_count,
                total_tokens: token_count,
            },
        })
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let inputs = prepare_batch(texts, self.max_input_chars)?;
        Ok(inputs.iter().map(|t| self.embed_text(t)).collect())
    }
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(FNV_PRIME)
    })
}
