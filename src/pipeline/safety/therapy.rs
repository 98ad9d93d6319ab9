//! Therapy-content classification and the therapy gate.
//!
//! Therapy, medication, or dosage content may only reach the user when the
//! retrieved context itself contains therapy content.

use super::types::{ModelVerdict, TherapyTarget};
use super::verdict::parse_therapy_verdict;
use crate::pipeline::rag::prompt::build_therapy_prompt;
use crate::pipeline::rag::{LlmGenerate, ModelError};

/// Ask the model whether `text` concerns therapy. One call.
pub fn classify_therapy(llm: &dyn LlmGenerate, text: &str) -> Result<ModelVerdict, ModelError> {
    let raw = llm.generate(&build_therapy_prompt(text))?;
    Ok(parse_therapy_verdict(&raw))
}

/// Collapse a verdict to a boolean in the safe direction for `target`.
///
/// An unreadable context verdict means "no therapy in context" (forbid
/// citing therapy); an unreadable query or answer verdict means "therapy"
/// (subject to the gate).
pub fn resolve_therapy_verdict(verdict: ModelVerdict, target: TherapyTarget) -> bool {
    match verdict {
        ModelVerdict::Positive => true,
        ModelVerdict::Negative => false,
        ModelVerdict::Unparseable => {
            tracing::warn!(classified = ?target, "Unparseable therapy verdict, resolving conservatively");
            !matches!(target, TherapyTarget::Context)
        }
    }
}

pub fn is_therapy_related(
    llm: &dyn LlmGenerate,
    text: &str,
    target: TherapyTarget,
) -> Result<bool, ModelError> {
    Ok(resolve_therapy_verdict(classify_therapy(llm, text)?, target))
}

/// Therapy flags for the retrieved context and the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TherapyFlags {
    pub context_has_therapy: bool,
    pub query_is_therapy: bool,
}

/// Classify context and query concurrently; both finish before returning.
///
/// An empty context has no therapy content and costs no model call.
pub fn classify_context_and_query(
    llm: &dyn LlmGenerate,
    chunks: &[String],
    query: &str,
) -> Result<TherapyFlags, ModelError> {
    if chunks.is_empty() {
        let query_is_therapy = is_therapy_related(llm, query, TherapyTarget::Query)?;
        return Ok(TherapyFlags {
            context_has_therapy: false,
            query_is_therapy,
        });
    }

    let context = chunks.join("\n\n");
    let (context_result, query_result) = std::thread::scope(|s| {
        let context_job = s.spawn(|| is_therapy_related(llm, &context, TherapyTarget::Context));
        let query_result = is_therapy_related(llm, query, TherapyTarget::Query);
        let context_result = context_job
            .join()
            .unwrap_or_else(|_| Err(ModelError::ResponseParsing("therapy classifier panicked".into())));
        (context_result, query_result)
    });

    Ok(TherapyFlags {
        context_has_therapy: context_result?,
        query_is_therapy: query_result?,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Release,
    /// Replace the answer with the fixed therapy refusal.
    Refuse,
}

/// Post-generation gate. Independent of what the model produced.
///
/// `answer_is_therapy` is only supplied in strict mode.
pub fn therapy_gate(flags: TherapyFlags, answer_is_therapy: Option<bool>) -> GateDecision {
    if flags.context_has_therapy {
        return GateDecision::Release;
    }
    if flags.query_is_therapy || answer_is_therapy == Some(true) {
        GateDecision::Refuse
    } else {
        GateDecision::Release
    }
}
