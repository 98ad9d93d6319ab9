//! Reading classifier replies from the generative model.
//!
//! Small models pad their one-word answers with punctuation, quotes, or a
//! sentence of explanation, so every parser works on lowercase substrings.

use super::output_sanitize::sanitize_llm_output;
use super::types::ModelVerdict;

/// Marker the grounding verifier must emit for a fully supported answer.
pub const FULLY_SUPPORTED_MARKER: &str = "TUTTO SUPPORTATO";

/// `TERAPIA` / `NON_TERAPIA`. Any "non" alongside the label reads as negative.
pub fn parse_therapy_verdict(raw: &str) -> ModelVerdict {
    let out = sanitize_llm_output(raw).to_lowercase();
    if !out.contains("terapia") {
        return ModelVerdict::Unparseable;
    }
    if out.contains("non") {
        ModelVerdict::Negative
    } else {
        ModelVerdict::Positive
    }
}

/// `medico` / `non medico`. Positive means the text is medical.
pub fn parse_domain_verdict(raw: &str) -> ModelVerdict {
    let out = sanitize_llm_output(raw).to_lowercase();
    if out.contains("non medico") || out.contains("non-medico") || out.contains("non_medico") {
        ModelVerdict::Negative
    } else if out.contains("medico") && !out.contains("non") {
        ModelVerdict::Positive
    } else {
        ModelVerdict::Unparseable
    }
}

/// Positive only when the marker is present.
pub fn parse_grounding_verdict(raw: &str) -> ModelVerdict {
    let out = sanitize_llm_output(raw).to_uppercase();
    if out.contains(FULLY_SUPPORTED_MARKER) {
        ModelVerdict::Positive
    } else if out.trim().is_empty() {
        ModelVerdict::Unparseable
    } else {
        ModelVerdict::Negative
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn therapy_labels() {
        assert_eq!(parse_therapy_verdict("TERAPIA"), ModelVerdict::Positive);
        assert_eq!(parse_therapy_verdict("  \"Terapia\".  "), ModelVerdict::Positive);
        assert_eq!(parse_therapy_verdict("NON_TERAPIA"), ModelVerdict::Negative);
        assert_eq!(parse_therapy_verdict("non terapia"), ModelVerdict::Negative);
        assert_eq!(parse_therapy_verdict("Non saprei"), ModelVerdict::Unparseable);
        assert_eq!(parse_therapy_verdict(""), ModelVerdict::Unparseable);
    }

    #[test]
    fn therapy_label_after_thinking_block() {
        let raw = "<think>il testo cita un farmaco, non è un referto</think>\nTERAPIA";
        assert_eq!(parse_therapy_verdict(raw), ModelVerdict::Positive);
    }

    #[test]
    fn domain_labels() {
        assert_eq!(parse_domain_verdict("medico"), ModelVerdict::Positive);
        assert_eq!(parse_domain_verdict("Medico."), ModelVerdict::Positive);
        assert_eq!(parse_domain_verdict("non medico"), ModelVerdict::Negative);
        assert_eq!(parse_domain_verdict("NON-MEDICO"), ModelVerdict::Negative);
        assert_eq!(parse_domain_verdict("forse"), ModelVerdict::Unparseable);
    }

    #[test]
    fn grounding_marker() {
        assert_eq!(parse_grounding_verdict("Tutto supportato."), ModelVerdict::Positive);
        assert_eq!(
            parse_grounding_verdict("La frase sul dosaggio non è presente."),
            ModelVerdict::Negative
        );
        assert_eq!(parse_grounding_verdict("   "), ModelVerdict::Unparseable);
    }
}
