//! Generative model access.
//!
//! Everything above this module sees the model as `prompt in, text out`
//! through [`LlmGenerate`].

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::ModelError;
use crate::config::AssistantConfig;

/// Black-box text generation. One call, one complete reply.
pub trait LlmGenerate: Send + Sync {
    fn generate(&self, prompt: &str) -> Result<String, ModelError>;
}

/// Ollama HTTP client bound to one generation model.
pub struct OllamaClient {
    base_url: String,
    model: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl OllamaClient {
    pub fn new(base_url: &str, model: &str, timeout_secs: u64) -> Result<Self, ModelError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ModelError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            client,
            timeout_secs,
        })
    }

    pub fn from_config(config: &AssistantConfig) -> Result<Self, ModelError> {
        Self::new(
            &config.ollama_url,
            &config.generation_model,
            config.model_timeout_secs,
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// Request body for Ollama /api/generate
#[derive(Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

/// Response body from Ollama /api/generate
#[derive(Deserialize)]
struct OllamaGenerateResponse {
    response: String,
}

impl LlmGenerate for OllamaClient {
    fn generate(&self, prompt: &str) -> Result<String, ModelError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = OllamaGenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
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
            });
        }

        let parsed: OllamaGenerateResponse = response
            .json()
            .map_err(|e| ModelError::ResponseParsing(e.to_string()))?;

        tracing::debug!(
            model = %self.model,
            prompt_len = prompt.len(),
            response_len = parsed.response.len(),
            "Ollama generation complete"
        );

        Ok(parsed.response)
    }
}

pub(crate) fn map_transport_error(e: reqwest::Error, base_url: &str, timeout_secs: u64) -> ModelError {
    if e.is_connect() {
        ModelError::OllamaConnection(base_url.to_string())
    } else if e.is_timeout() {
        ModelError::Timeout(timeout_secs)
    } else {
        ModelError::HttpClient(e.to_string())
    }
}

/// Scripted model for tests and offline runs.
///
/// Replies with the first rule whose needle occurs in the prompt, otherwise
/// with the fallback. Every prompt is recorded.
pub struct MockLlm {
    rules: Vec<(String, String)>,
    fallback: String,
    failures: Mutex<VecDeque<ModelError>>,
    prompts: Mutex<Vec<String>>,
}

impl MockLlm {
    pub fn new(fallback: &str) -> Self {
        Self {
            rules: Vec::new(),
            fallback: fallback.to_string(),
            failures: Mutex::new(VecDeque::new()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Reply `response` to any prompt containing `needle`.
    pub fn with_rule(mut self, needle: &str, response: &str) -> Self {
        self.rules.push((needle.to_string(), response.to_string()));
        self
    }

    /// Fail the next call with `error` (queued in order).
    pub fn fail_next(self, error: ModelError) -> Self {
        if let Ok(mut failures) = self.failures.lock() {
            failures.push_back(error);
        }
        self
    }

    /// Every prompt received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().map(|p| p.len()).unwrap_or(0)
    }
}

impl LlmGenerate for MockLlm {
    fn generate(&self, prompt: &str) -> Result<String, ModelError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        if let Some(err) = self.failures.lock().ok().and_then(|mut f| f.pop_front()) {
            return Err(err);
        }
        let reply = self
            .rules
            .iter()
            .find(|(needle, _)| prompt.contains(needle.as_str()))
            .map(|(_, response)| response.clone())
            .unwrap_or_else(|| self.fallback.clone());
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ollama_client_trims_trailing_slash() {
        let client = OllamaClient::new("http://localhost:11434/", "qwen3:1.7b", 5).unwrap();
        assert_eq!(client.base_url(), "http://localhost:11434");
        assert_eq!(client.model(), "qwen3:1.7b");
    }

    #[test]
    fn ollama_client_from_config() {
        let client = OllamaClient::from_config(&AssistantConfig::default()).unwrap();
        assert_eq!(client.model(), "qwen3:1.7b");
    }

    #[test]
    fn unreachable_ollama_is_retryable() {
        // Port 9 (discard) is closed on test hosts.
        let client = OllamaClient::new("http://127.0.0.1:9", "qwen3:1.7b", 2).unwrap();
        let err = client.generate("ciao").unwrap_err();
        assert!(err.is_retryable(), "unexpected error: {err}");
    }

    #[test]
    fn mock_matches_rules_in_order() {
        let llm = MockLlm::new("default")
            .with_rule("TERAPIA", "NON_TERAPIA")
            .with_rule("TER", "never reached");
        assert_eq!(llm.generate("... TERAPIA ...").unwrap(), "NON_TERAPIA");
        assert_eq!(llm.generate("altro").unwrap(), "default");
        assert_eq!(llm.call_count(), 2);
    }

    #[test]
    fn mock_queued_failure_then_recovers() {
        let llm = MockLlm::new("ok").fail_next(ModelError::Timeout(1));
        assert!(llm.generate("a").is_err());
        assert_eq!(llm.generate("b").unwrap(), "ok");
        assert_eq!(llm.prompts(), vec!["a".to_string(), "b".to_string()]);
    }
}
