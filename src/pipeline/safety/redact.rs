//! PII redaction of model output.
//!
//! Runs on every path that returns generated text to a user. Placeholders
//! contain no digits or `@`, so redacting twice changes nothing.

use std::sync::LazyLock;

use regex::Regex;

/// One redaction rule: matches are replaced with `placeholder`.
struct PiiPattern {
    regex: Regex,
    placeholder: &'static str,
}

// Order matters: IBANs and fiscal codes contain digit runs that the phone
// patterns would otherwise claim first.
static PII_PATTERNS: LazyLock<Vec<PiiPattern>> = LazyLock::new(|| {
    vec![
        PiiPattern {
            regex: Regex::new(r"(?i)\b[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}\b").expect("valid regex"),
            placeholder: "[EMAIL]",
        },
        PiiPattern {
            regex: Regex::new(r"(?i)\b[a-z]{2}\d{2}(?:\s?[a-z0-9]{4}){3,7}(?:\s?[a-z0-9]{1,3})?\b")
                .expect("valid regex"),
            placeholder: "[IBAN]",
        },
        PiiPattern {
            // Codice fiscale: 6 letters, 2 digits, month letter, 2 digits, letter, 3 digits, check letter
            regex: Regex::new(r"(?i)\b[a-z]{6}\d{2}[abcdehlmprst]\d{2}[a-z]\d{3}[a-z]\b")
                .expect("valid regex"),
            placeholder: "[CODICE_FISCALE]",
        },
        PiiPattern {
            regex: Regex::new(r"(?:\+|\b00)\d{1,3}[\s.-]?\d{2,4}(?:[\s.-]?\d{2,4}){2,3}\b")
                .expect("valid regex"),
            placeholder: "[TELEFONO]",
        },
        PiiPattern {
            // Italian mobile (3xx) and landline (0x) numbers
            regex: Regex::new(r"\b(?:3\d{2}|0\d{1,3})[\s.-]?\d{3,4}[\s.-]?\d{3,4}\b")
                .expect("valid regex"),
            placeholder: "[TELEFONO]",
        },
        PiiPattern {
            // Street keyword, capitalized name, house number ("per via orale 1" is not an address)
            regex: Regex::new(
                r"\b(?i:via|viale|piazza|piazzale|corso|largo|vicolo|strada)\s+(?:\p{Lu}[\w'.]*\s+){1,4}?\d{1,4}(?:/?[a-zA-Z])?\b",
            )
            .expect("valid regex"),
            placeholder: "[INDIRIZZO]",
        },
    ]
});

/// Replace identifying fragments with typed placeholders. Idempotent.
pub fn redact(text: &str) -> String {
    let mut out = text.to_string();
    let mut redactions = 0usize;
    for p in PII_PATTERNS.iter() {
        let hits = p.regex.find_iter(&out).count();
        if hits > 0 {
            redactions += hits;
            out = p.regex.replace_all(&out, p.placeholder).into_owned();
        }
    }
    if redactions > 0 {
        tracing::info!(redactions, "PII redacted from model output");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_email() {
        assert_eq!(
            redact("Scrivere a maria.rossi@example.it per il referto."),
            "Scrivere a [EMAIL] per il referto."
        );
    }

    #[test]
    fn redacts_phone_numbers() {
        assert_eq!(redact("Chiamare il 347 1234567."), "Chiamare il [TELEFONO].");
        assert_eq!(redact("Tel. +39 06 1234 5678"), "Tel. [TELEFONO]");
        assert_eq!(redact("Centralino 02-4567890"), "Centralino [TELEFONO]");
    }

    #[test]
    fn redacts_codice_fiscale() {
        assert_eq!(redact("CF: RSSMRA85T10A562S"), "CF: [CODICE_FISCALE]");
    }

    #[test]
    fn redacts_iban() {
        assert_eq!(
            redact("IBAN IT60 X054 2811 1010 0000 0123 456"),
            "IBAN [IBAN]"
        );
    }

    #[test]
    fn redacts_street_address() {
        assert_eq!(
            redact("Residente in Via Giuseppe Garibaldi 12, Roma."),
            "Residente in [INDIRIZZO], Roma."
        );
        assert_eq!(redact("piazza Duomo 3/b"), "[INDIRIZZO]");
    }

    #[test]
    fn clinical_values_untouched() {
        let text = "Emoglobina 13.5 g/dL, creatinina 0.9 mg/dL il 14/03/2025, amoxicillina 500mg per via orale 3 volte al giorno.";
        assert_eq!(redact(text), text);
    }

    #[test]
    fn redaction_is_idempotent() {
        let samples = [
            "maria.rossi@example.it, 347 1234567, RSSMRA85T10A562S",
            "Via Roma 1, IT60 X054 2811 1010 0000 0123 456",
            "Nessun dato personale.",
        ];
        for s in samples {
            let once = redact(s);
            assert_eq!(redact(&once), once);
        }
    }
}
