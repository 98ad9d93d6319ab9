pub mod ollama;
pub mod prompt;
pub mod resolver;
pub mod composer;
pub mod orchestrator;

pub use ollama::{LlmGenerate, MockLlm, OllamaClient};

use thiserror::Error;

use crate::db::DatabaseError;
use crate::pipeline::storage::StorageError;

/// Transport-level failure talking to the generative or embedding model.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Ollama is not running at {0}")]
    OllamaConnection(String),

    #[error("Model request timed out after {0}s")]
    Timeout(u64),

    #[error("Ollama returned error (status {status}): {body}")]
    OllamaError { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),
}

impl ModelError {
    /// Whether the same call may succeed if simply repeated later.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::OllamaConnection(_) | Self::Timeout(_) | Self::HttpClient(_) => true,
            Self::OllamaError { status, .. } => *status >= 500,
            Self::ResponseParsing(_) => false,
        }
    }
}

/// Infrastructure failure while answering a question.
///
/// Safe refusals (rejected input, missing knowledge, ungrounded therapy,
/// ambiguous patient) are outcomes, not errors.
#[derive(Error, Debug)]
pub enum QaError {
    #[error("Model unavailable: {0}")]
    ModelUnavailable(#[from] ModelError),

    #[error("Knowledge index error: {0}")]
    Storage(#[from] StorageError),

    #[error("Record store error: {0}")]
    Database(#[from] DatabaseError),
}

impl QaError {
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ModelUnavailable(e) => e.is_retryable(),
            Self::Storage(StorageError::Model(e)) => e.is_retryable(),
            Self::Storage(_) | Self::Database(_) => false,
        }
    }

    /// Safe fixed message for the user. Never contains model output.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::ModelUnavailable(_) | Self::Storage(StorageError::Model(_)) => {
                prompt::MODEL_UNAVAILABLE
            }
            _ => "Si è verificato un errore interno. La richiesta non è stata elaborata.",
        }
    }
}
