use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::types::EmbeddingModel;
use super::StorageError;
use crate::config::AssistantConfig;
use crate::pipeline::rag::ollama::map_transport_error;
use crate::pipeline::rag::ModelError;

/// Output dimension of the offline hashing embedder.
pub const HASHING_EMBEDDING_DIM: usize = 384;

/// Default dimension of `nomic-embed-text`.
pub const OLLAMA_EMBEDDING_DIM: usize = 768;

/// Deterministic bag-of-words embedder.
///
/// Lowercased word tokens are hashed (FNV-1a) into signed buckets and the
/// vector is L2-normalized. Texts sharing vocabulary land close together,
/// which is enough for offline use and tests; it has no notion of meaning.
pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    pub fn new() -> Self {
        Self::with_dimension(HASHING_EMBEDDING_DIM)
    }

    pub fn with_dimension(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

impl EmbeddingModel for HashingEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, StorageError> {
        Ok(hashed_vector(text, self.dimension))
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, StorageError> {
        Ok(texts.iter().map(|t| hashed_vector(t, self.dimension)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

fn hashed_vector(text: &str, dim: usize) -> Vec<f32> {
    let mut vec = vec![0.0f32; dim];
    let lowered = text.to_lowercase();

    for token in lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
    {
        let h = fnv1a(token.as_bytes());
        let slot = (h % dim as u64) as usize;
        let sign = if (h >> 63) & 1 == 0 { 1.0 } else { -1.0 };
        vec[slot] += sign;
    }

    // L2 normalize
    let norm: f32 = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for val in &mut vec {
            *val /= norm;
        }
    }

    vec
}

fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    bytes.iter().fold(OFFSET, |h, b| (h ^ *b as u64).wrapping_mul(PRIME))
}

/// Embeddings from a local Ollama instance (`/api/embeddings`).
pub struct OllamaEmbedder {
    base_url: String,
    model: String,
    dimension: usize,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

/// Request body for Ollama /api/embeddings
#[derive(Serialize)]
struct OllamaEmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

/// Response body from Ollama /api/embeddings
#[derive(Deserialize)]
struct OllamaEmbeddingResponse {
    embedding: Vec<f32>,
}

impl OllamaEmbedder {
    pub fn new(
        base_url: &str,
        model: &str,
        dimension: usize,
        timeout_secs: u64,
    ) -> Result<Self, StorageError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ModelError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            dimension,
            client,
            timeout_secs,
        })
    }

    pub fn from_config(config: &AssistantConfig) -> Result<Self, StorageError> {
        Self::new(
            &config.ollama_url,
            &config.embedding_model,
            OLLAMA_EMBEDDING_DIM,
            config.model_timeout_secs,
        )
    }
}

impl EmbeddingModel for OllamaEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, StorageError> {
        let url = format!("{}/api/embeddings", self.base_url);
        let body = OllamaEmbeddingRequest {
            model: &self.model,
            prompt: text,
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .map_err(|e| map_transport_error(e, &self.base_url, self.timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ModelError::OllamaError {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let parsed: OllamaEmbeddingResponse = response
            .json()
            .map_err(|e| ModelError::ResponseParsing(e.to_string()))?;

        if parsed.embedding.len() != self.dimension {
            return Err(StorageError::DimensionMismatch {
                expected: self.dimension,
                actual: parsed.embedding.len(),
            });
        }

        Ok(parsed.embedding)
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, StorageError> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
