//! Question answering: risk gate → patient → retrieval → therapy
//! classification → generation → therapy gate → redaction → grounding.

use std::sync::Arc;

use super::composer::{AnswerComposer, AnswerRequest};
use super::prompt::{
    DISAMBIGUATION_REQUEST, INPUT_REFUSAL, NO_KNOWLEDGE_RESPONSE, THERAPY_REFUSAL,
};
use super::resolver::PatientResolver;
use super::{LlmGenerate, QaError};
use crate::config::AssistantConfig;
use crate::db::RecordStore;
use crate::models::{Patient, User};
use crate::pipeline::safety::therapy::is_therapy_related;
use crate::pipeline::safety::{
    canonicalize, classify_context_and_query, normalize, redact, therapy_gate, verify_grounding,
    ContentRiskScorer, GateDecision, GroundingReport, RiskAssessment, TherapyTarget,
};
use crate::pipeline::storage::KnowledgeIndex;
use crate::session::SessionContext;

/// Result of one question. Every variant renders to a safe display text.
#[derive(Debug, Clone, PartialEq)]
pub enum AnswerOutcome {
    /// Generated, gated and redacted answer.
    Answered {
        text: String,
        /// `None` when verification is disabled.
        grounding: Option<GroundingReport>,
    },
    /// The question tripped the risk scorer and never reached the model.
    InputRejected { assessment: RiskAssessment },
    NoKnowledge,
    /// Therapy content requested or produced without therapy in the context.
    UngroundedTherapy,
    AmbiguousPatient,
}

impl AnswerOutcome {
    pub fn display_text(&self) -> String {
        match self {
            Self::Answered { text, grounding } => match grounding {
                Some(report) if !report.supported => format!("{text}\n\n{}", report.feedback),
                _ => text.clone(),
            },
            Self::InputRejected { .. } => INPUT_REFUSAL.to_string(),
            Self::NoKnowledge => NO_KNOWLEDGE_RESPONSE.to_string(),
            Self::UngroundedTherapy => THERAPY_REFUSAL.to_string(),
            Self::AmbiguousPatient => DISAMBIGUATION_REQUEST.to_string(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Answered { .. } => "answered",
            Self::InputRejected { .. } => "input_rejected",
            Self::NoKnowledge => "no_knowledge",
            Self::UngroundedTherapy => "ungrounded_therapy",
            Self::AmbiguousPatient => "ambiguous_patient",
        }
    }
}

/// Whose documents a question is answered from.
enum PatientSelection {
    Selected(Patient),
    Ambiguous,
    NoPatients,
}

/// Full question-answering pipeline over one record store and index.
pub struct QaPipeline {
    llm: Arc<dyn LlmGenerate>,
    records: Arc<dyn RecordStore>,
    index: Arc<KnowledgeIndex>,
    scorer: ContentRiskScorer,
    resolver: PatientResolver,
    composer: AnswerComposer,
    top_k: usize,
    strict_answer_check: bool,
    verify_grounding: bool,
}

impl QaPipeline {
    pub fn new(
        llm: Arc<dyn LlmGenerate>,
        records: Arc<dyn RecordStore>,
        index: Arc<KnowledgeIndex>,
        config: &AssistantConfig,
    ) -> Self {
        Self {
            composer: AnswerComposer::new(llm.clone()),
            llm,
            records,
            index,
            scorer: ContentRiskScorer::from_config(config),
            resolver: PatientResolver::new(config.resolver_cutoff),
            top_k: config.top_k,
            strict_answer_check: config.strict_answer_check,
            verify_grounding: config.verify_grounding,
        }
    }

    /// Answer `query` for the session's user and log the exchange.
    ///
    /// Rejected input is not logged, so it can never reach the model
    /// through the history window.
    pub fn answer_question(
        &self,
        session: &mut SessionContext,
        query: &str,
    ) -> Result<AnswerOutcome, QaError> {
        let outcome = self.run(session, query)?;

        tracing::info!(outcome = outcome.kind(), "Question handled");

        if !matches!(outcome, AnswerOutcome::InputRejected { .. }) {
            session.record_exchange(&normalize(query), &outcome.display_text());
        }
        Ok(outcome)
    }

    fn run(&self, session: &SessionContext, query: &str) -> Result<AnswerOutcome, QaError> {
        // Step 1: Risk gate. Nothing below runs on blocked input.
        let assessment = self.scorer.score(query);
        if !assessment.is_accepted() {
            tracing::warn!(
                score = assessment.score,
                categories = ?assessment.categories,
                "Question blocked by risk scorer"
            );
            return Ok(AnswerOutcome::InputRejected { assessment });
        }

        let canonical = canonicalize(query);
        let prompt_query = normalize(query);

        // Step 2: Patient selection
        let patient = match self.select_patient(session.current_user(), &canonical)? {
            PatientSelection::Selected(p) => p,
            PatientSelection::Ambiguous => return Ok(AnswerOutcome::AmbiguousPatient),
            PatientSelection::NoPatients => return Ok(AnswerOutcome::NoKnowledge),
        };

        // Step 3: Retrieval, scoped to the patient's namespace
        let hits = self.index.retrieve(&patient.email, &canonical, self.top_k)?;
        if hits.is_empty() {
            return Ok(AnswerOutcome::NoKnowledge);
        }
        let chunks: Vec<String> = hits.into_iter().map(|h| h.content).collect();

        // Step 4: Therapy classification of context and query
        let flags = classify_context_and_query(self.llm.as_ref(), &chunks, &prompt_query)?;

        // Step 5: Generation
        let patient_name = patient.full_name();
        let answer = self.composer.compose(&AnswerRequest {
            query: &prompt_query,
            chunks: &chunks,
            patient_name: Some(&patient_name),
            context_has_therapy: flags.context_has_therapy,
            history: session.recent_turns(),
        })?;

        // Step 6: Therapy gate, independent of what the model produced
        let answer_is_therapy = if self.strict_answer_check && !flags.context_has_therapy {
            Some(is_therapy_related(self.llm.as_ref(), &answer, TherapyTarget::Answer)?)
        } else {
            None
        };
        if therapy_gate(flags, answer_is_therapy) == GateDecision::Refuse {
            tracing::info!(
                query_is_therapy = flags.query_is_therapy,
                answer_is_therapy = ?answer_is_therapy,
                "Answer replaced by therapy refusal"
            );
            return Ok(AnswerOutcome::UngroundedTherapy);
        }

        // Step 7: Redaction
        let text = redact(&answer);

        // Step 8: Grounding
        let grounding = self.verify_grounding.then(|| self.grounding_report(&text, &chunks));

        Ok(AnswerOutcome::Answered { text, grounding })
    }

    fn select_patient(&self, user: &User, query: &str) -> Result<PatientSelection, QaError> {
        match user {
            User::Patient(p) => Ok(PatientSelection::Selected(p.clone())),
            User::Clinician(c) => {
                let mut patients = self.records.find_patients_by_clinician_email(&c.email)?;
                match patients.len() {
                    0 => Ok(PatientSelection::NoPatients),
                    1 => Ok(PatientSelection::Selected(patients.remove(0))),
                    n => match self.resolver.resolve(query, &patients) {
                        Some(p) => Ok(PatientSelection::Selected(p.clone())),
                        None => {
                            tracing::debug!(candidates = n, "Patient not resolved from query");
                            Ok(PatientSelection::Ambiguous)
                        }
                    },
                }
            }
        }
    }

    /// A verifier that cannot be reached leaves the answer marked unsupported.
    fn grounding_report(&self, answer: &str, chunks: &[String]) -> GroundingReport {
        match verify_grounding(self.llm.as_ref(), answer, chunks) {
            Ok(report) => report,
            Err(e) => {
                tracing::warn!(error = %e, "Grounding verification failed");
                GroundingReport {
                    supported: false,
                    feedback: super::prompt::GROUNDING_WARNING.to_string(),
                }
            }
        }
    }
}
