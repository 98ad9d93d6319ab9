//! Second-pass grounding check of a generated answer.

use super::types::{GroundingReport, ModelVerdict};
use super::verdict::{parse_grounding_verdict, FULLY_SUPPORTED_MARKER};
use crate::pipeline::rag::prompt::{build_grounding_prompt, GROUNDING_WARNING};
use crate::pipeline::rag::{LlmGenerate, ModelError};

/// Ask the model whether every claim of `answer` appears in `chunks`.
///
/// Only an explicit "TUTTO SUPPORTATO" counts as supported; an empty or
/// unreadable reply is treated as unsupported.
pub fn verify_grounding(
    llm: &dyn LlmGenerate,
    answer: &str,
    chunks: &[String],
) -> Result<GroundingReport, ModelError> {
    let raw = llm.generate(&build_grounding_prompt(answer, chunks))?;
    let verdict = parse_grounding_verdict(&raw);

    if verdict == ModelVerdict::Unparseable {
        tracing::warn!("Unparseable grounding verdict, treating answer as unsupported");
    }

    Ok(report_for(verdict))
}

fn report_for(verdict: ModelVerdict) -> GroundingReport {
    match verdict {
        ModelVerdict::Positive => GroundingReport {
            supported: true,
            feedback: FULLY_SUPPORTED_MARKER.to_string(),
        },
        ModelVerdict::Negative | ModelVerdict::Unparseable => GroundingReport {
            supported: false,
            feedback: GROUNDING_WARNING.to_string(),
        },
    }
}
