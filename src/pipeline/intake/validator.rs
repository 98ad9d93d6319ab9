//! Document intake validation: extraction, text heuristics, then a
//! model-based domain check.

use std::sync::Arc;

use super::extract::extract_document_text;
use super::heuristics::run_text_checks;
use super::types::{FindingKind, IntakeFinding, IntakeReport};
use super::IntakeError;
use crate::config::AssistantConfig;
use crate::pipeline::rag::prompt::build_domain_prompt;
use crate::pipeline::rag::{LlmGenerate, ModelError};
use crate::pipeline::safety::verdict::parse_domain_verdict;
use crate::pipeline::safety::{canonicalize, ModelVerdict};

const NON_MEDICAL_PRIMARY_WEIGHT: f32 = 0.6;
const NON_MEDICAL_CONFIRMATION_WEIGHT: f32 = 0.4;
const NON_MEDICAL_REASON: &str = "Il documento non appare medico (classificazione LLM).";
const CLASSIFICATION_FAILED_REASON: &str = "Errore durante la classificazione LLM";
const EXTRACTION_FAILED_REASON: &str = "Impossibile estrarre il testo dal documento.";

/// Decides whether an upload may enter a patient's knowledge index.
pub struct DocumentIntakeValidator {
    llm: Arc<dyn LlmGenerate>,
    score_threshold: f32,
    confirmation_threshold: f32,
    min_text_length: usize,
    strict: bool,
}

impl DocumentIntakeValidator {
    pub fn new(llm: Arc<dyn LlmGenerate>, config: &AssistantConfig) -> Self {
        Self {
            llm,
            score_threshold: config.intake_score_threshold,
            confirmation_threshold: config.intake_llm_confirmation_threshold,
            min_text_length: config.intake_min_text_length,
            strict: config.intake_strict,
        }
    }

    /// Validate raw upload bytes.
    ///
    /// Suspicious content yields a rejected report, not an error. An error
    /// means the domain check could not run on an otherwise clean document.
    pub fn validate(&self, bytes: &[u8]) -> Result<IntakeReport, IntakeError> {
        let text = match extract_document_text(bytes) {
            Ok(text) => text,
            Err(e) => {
                tracing::info!(error = %e, size = bytes.len(), "Document text extraction failed");
                let finding =
                    IntakeFinding::new(FindingKind::ExtractionFailed, 0.0, EXTRACTION_FAILED_REASON);
                return Ok(IntakeReport {
                    accepted: false,
                    suspicion_score: 0.0,
                    findings: vec![finding],
                    extracted_text: String::new(),
                });
            }
        };

        let canonical = canonicalize(&text);
        let mut findings = run_text_checks(&canonical, self.min_text_length);
        let heuristic_score: f32 = findings.iter().map(|f| f.weight).sum();

        match self.classify_domain(&canonical) {
            Ok(verdict) => {
                if verdict != ModelVerdict::Positive {
                    let weight = if heuristic_score < self.confirmation_threshold {
                        NON_MEDICAL_PRIMARY_WEIGHT
                    } else {
                        NON_MEDICAL_CONFIRMATION_WEIGHT
                    };
                    findings.push(IntakeFinding::new(FindingKind::NonMedical, weight, NON_MEDICAL_REASON));
                }
            }
            Err(e) => {
                // Without the domain check a clean document cannot be judged;
                // an already-rejected one stays rejected.
                if !self.rejects(heuristic_score, &findings) {
                    tracing::warn!(error = %e, "Domain classification failed on intake");
                    return Err(IntakeError::ModelUnavailable(e));
                }
                findings.push(IntakeFinding::new(
                    FindingKind::ClassificationFailed,
                    0.0,
                    CLASSIFICATION_FAILED_REASON,
                ));
            }
        }

        let suspicion_score: f32 = findings.iter().map(|f| f.weight).sum();
        let accepted = !self.rejects(suspicion_score, &findings);

        tracing::debug!(
            accepted,
            suspicion_score,
            findings = findings.len(),
            chars = text.chars().count(),
            "Intake validation complete"
        );

        Ok(IntakeReport {
            accepted,
            suspicion_score,
            findings,
            extracted_text: text,
        })
    }

    fn classify_domain(&self, text: &str) -> Result<ModelVerdict, ModelError> {
        let raw = self.llm.generate(&build_domain_prompt(text))?;
        Ok(parse_domain_verdict(&raw))
    }

    fn rejects(&self, score: f32, findings: &[IntakeFinding]) -> bool {
        score >= self.score_threshold
            || findings.iter().any(|f| f.kind.is_hard_error())
            || (self.strict && !findings.is_empty())
    }
}
