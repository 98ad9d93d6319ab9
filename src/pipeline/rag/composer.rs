//! Grounded answer generation.

use std::sync::Arc;

use super::prompt::build_answer_prompt;
use super::{LlmGenerate, ModelError};
use crate::models::ChatTurn;
use crate::pipeline::safety::sanitize_llm_output;

/// What the composer is asked to answer.
pub struct AnswerRequest<'a> {
    /// Normalized question text.
    pub query: &'a str,
    /// Retrieved chunks, most similar first.
    pub chunks: &'a [String],
    pub patient_name: Option<&'a str>,
    pub context_has_therapy: bool,
    pub history: &'a [ChatTurn],
}

/// Builds the single structured prompt and calls the model once.
pub struct AnswerComposer {
    llm: Arc<dyn LlmGenerate>,
}

impl AnswerComposer {
    pub fn new(llm: Arc<dyn LlmGenerate>) -> Self {
        Self { llm }
    }

    /// Raw model answer with reasoning blocks removed. Not yet gated or redacted.
    pub fn compose(&self, request: &AnswerRequest<'_>) -> Result<String, ModelError> {
        let prompt = build_answer_prompt(
            request.query,
            request.chunks,
            request.patient_name,
            request.context_has_therapy,
            request.history,
        );

        let start = std::time::Instant::now();
        let raw = self.llm.generate(&prompt)?;
        tracing::debug!(
            chunks = request.chunks.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Answer generated"
        );

        Ok(sanitize_llm_output(&raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::rag::MockLlm;

    #[test]
    fn single_call_with_context_and_patient() {
        let llm = Arc::new(MockLlm::new("<think>ragiono</think>Emoglobina nella norma [Estratto 1]."));
        let composer = AnswerComposer::new(llm.clone());
        let chunks = vec!["Emoglobina 13.5 g/dL (12.0 - 16.0)".to_string()];

        let answer = composer
            .compose(&AnswerRequest {
                query: "Com'è l'emoglobina?",
                chunks: &chunks,
                patient_name: Some("Maria Rossi"),
                context_has_therapy: false,
                history: &[],
            })
            .unwrap();

        assert_eq!(answer, "Emoglobina nella norma [Estratto 1].");
        assert_eq!(llm.call_count(), 1);
        let prompt = &llm.prompts()[0];
        assert!(prompt.contains("PAZIENTE: Maria Rossi"));
        assert!(prompt.contains("Emoglobina 13.5 g/dL"));
        assert!(prompt.contains("non suggerire, inventare o dedurre farmaci"));
    }

    #[test]
    fn history_reaches_prompt() {
        let llm = Arc::new(MockLlm::new("ok"));
        let composer = AnswerComposer::new(llm.clone());
        let history = vec![ChatTurn::user("E la creatinina?"), ChatTurn::assistant("0.9 mg/dL")];

        composer
            .compose(&AnswerRequest {
                query: "E rispetto al mese scorso?",
                chunks: &[],
                patient_name: None,
                context_has_therapy: true,
                history: &history,
            })
            .unwrap();

        let prompt = &llm.prompts()[0];
        assert!(prompt.contains("Utente: E la creatinina?"));
        assert!(prompt.contains("MyNurse: 0.9 mg/dL"));
        assert!(!prompt.contains("PAZIENTE:"));
    }

    #[test]
    fn model_error_propagates() {
        let llm = Arc::new(MockLlm::new("ok").fail_next(ModelError::Timeout(120)));
        let composer = AnswerComposer::new(llm);
        let result = composer.compose(&AnswerRequest {
            query: "q",
            chunks: &[],
            patient_name: None,
            context_has_therapy: false,
            history: &[],
        });
        assert!(matches!(result, Err(ModelError::Timeout(120))));
    }
}
