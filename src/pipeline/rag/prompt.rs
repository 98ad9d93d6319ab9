use crate::models::{ChatTurn, Speaker};

// ── User-facing fixed messages ─────────────────────────────

pub const INPUT_REFUSAL: &str =
    "⚠️ La richiesta contiene elementi non consentiti e non può essere elaborata. \
     Riformula la domanda usando solo testo semplice.";

pub const NO_KNOWLEDGE_RESPONSE: &str =
    "Non ho trovato informazioni pertinenti nei documenti caricati per questo paziente.";

pub const THERAPY_REFUSAL: &str =
    "I documenti disponibili non contengono informazioni su terapie o farmaci per questo paziente. \
     Per indicazioni terapeutiche rivolgiti al medico curante.";

pub const DISAMBIGUATION_REQUEST: &str =
    "Non riesco a capire a quale paziente si riferisce la domanda. \
     Indica nome e cognome del paziente.";

pub const MODEL_UNAVAILABLE: &str =
    "Il servizio di risposta non è al momento raggiungibile. Riprova tra qualche istante.";

pub const GROUNDING_WARNING: &str =
    "⚠️ Alcune parti della risposta potrebbero non essere supportate dai documenti";

/// Context placeholder handed to the verifier when nothing was retrieved.
pub const EMPTY_CONTEXT: &str = "(Nessun documento disponibile)";

/// Characters of document text sent to the domain classifier.
pub const DOMAIN_SAMPLE_CHARS: usize = 2_000;

// ── Answer ─────────────────────────────────────────────────

const ANSWER_ROLE: &str = "Sei MyNurse, un infermiere virtuale che aiuta medici e pazienti a \
consultare la documentazione clinica. Rispondi in italiano, in modo chiaro e sintetico, \
basandoti ESCLUSIVAMENTE sugli estratti di contesto forniti.";

const THERAPY_PERMITTED: &str = "Il contesto contiene informazioni su terapie o farmaci: puoi \
riportarle solo come compaiono negli estratti, citando l'estratto, senza modificare dosaggi o \
posologia.";

const THERAPY_FORBIDDEN: &str = "Il contesto NON contiene informazioni su terapie: non suggerire, \
inventare o dedurre farmaci, dosaggi o trattamenti di alcun tipo.";

const ANSWER_RULES: &str = "REGOLE:
- Se gli estratti non contengono l'informazione richiesta, dichiaralo esplicitamente.
- Cita gli estratti usati nel formato [Estratto N].
- Non riportare indirizzi, numeri di telefono, email o codici identificativi.
- Non formulare diagnosi nuove rispetto a quanto scritto nei documenti.";

/// Single structured prompt for a grounded answer.
pub fn build_answer_prompt(
    query: &str,
    chunks: &[String],
    patient_name: Option<&str>,
    context_has_therapy: bool,
    history: &[ChatTurn],
) -> String {
    let mut prompt = String::new();

    prompt.push_str(ANSWER_ROLE);
    prompt.push_str("\n\n");

    if let Some(name) = patient_name {
        prompt.push_str(&format!("PAZIENTE: {name}\n\n"));
    }

    prompt.push_str(if context_has_therapy {
        THERAPY_PERMITTED
    } else {
        THERAPY_FORBIDDEN
    });
    prompt.push_str("\n\n");
    prompt.push_str(ANSWER_RULES);
    prompt.push_str("\n\n");

    if !history.is_empty() {
        prompt.push_str("<STORICO_CONVERSAZIONE>\n");
        for turn in history {
            let speaker = match turn.speaker {
                Speaker::User => "Utente",
                Speaker::Assistant => "MyNurse",
            };
            prompt.push_str(&format!("{speaker}: {}\n", turn.text));
        }
        prompt.push_str("</STORICO_CONVERSAZIONE>\n\n");
    }

    prompt.push_str("CONTESTO:\n");
    for (i, chunk) in chunks.iter().enumerate() {
        prompt.push_str(&format!("[Estratto {}]\n{}\n\n", i + 1, chunk));
    }

    prompt.push_str(&format!("DOMANDA: {query}\n\nRISPOSTA:"));
    prompt
}

// ── Classifiers ───────────────────────────────────────────

const THERAPY_FEW_SHOT: &str = "Sei un assistente clinico. Devi stabilire se il testo fornito \
contiene riferimenti a TERAPIE, TRATTAMENTI o FARMACI.

Classifica il testo come:
- \"TERAPIA\" se contiene riferimenti a cure, farmaci, dosaggi, prescrizioni o trattamenti.
- \"NON_TERAPIA\" se parla solo di diagnosi, sintomi, controlli o referti generici.

Esempi:
1. \"Il paziente assume amoxicillina 500mg ogni 8 ore.\" → TERAPIA
2. \"Diagnosi di bronchite acuta, follow-up tra 7 giorni.\" → NON_TERAPIA
3. \"Ha sospeso la cura antibiotica per effetti collaterali.\" → TERAPIA
4. \"Il paziente lamenta tosse persistente, in attesa di referto.\" → NON_TERAPIA
5. \"Terapia fisica riabilitativa 3 volte a settimana.\" → TERAPIA

Rispondi SOLO con \"TERAPIA\" o \"NON_TERAPIA\".";

/// Few-shot therapy classification. The text goes last, fenced.
pub fn build_therapy_prompt(text: &str) -> String {
    format!("{THERAPY_FEW_SHOT}\n\nTesto da classificare:\n<<<\n{text}\n>>>")
}

/// Medical-domain classification of an uploaded document.
pub fn build_domain_prompt(document_text: &str) -> String {
    let sample: String = document_text.chars().take(DOMAIN_SAMPLE_CHARS).collect();
    format!(
        "Sei un classificatore testuale.\n\
         Determina se il seguente testo appartiene al dominio medico-sanitario.\n\
         Rispondi esclusivamente con una parola: \"medico\" o \"non medico\".\n\n\
         Testo:\n<<<\n{sample}\n>>>"
    )
}

/// Claim-by-claim support check of a generated answer.
pub fn build_grounding_prompt(answer: &str, chunks: &[String]) -> String {
    let context = if chunks.is_empty() {
        EMPTY_CONTEXT.to_string()
    } else {
        chunks.join("\n\n")
    };
    format!(
        "Sei un verificatore automatico.\n\
         Analizza la risposta fornita e verifica se tutte le informazioni riportate sono presenti nel contesto.\n\
         Contesto:\n{context}\n\n\
         Risposta generata:\n{answer}\n\n\
         Istruzioni:\n\
         - Restituisci solo le frasi o segmenti della risposta NON presenti nel contesto.\n\
         - Se tutta la risposta è supportata, scrivi \"TUTTO SUPPORTATO\"."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunks() -> Vec<String> {
        vec![
            "Emoglobina 13.5 g/dL".to_string(),
            "Creatinina 0.9 mg/dL".to_string(),
        ]
    }

    #[test]
    fn answer_prompt_contains_all_sections() {
        let prompt = build_answer_prompt("Com'è l'emoglobina?", &chunks(), Some("Maria Rossi"), false, &[]);
        assert!(prompt.contains("PAZIENTE: Maria Rossi"));
        assert!(prompt.contains(THERAPY_FORBIDDEN));
        assert!(prompt.contains("[Estratto 1]\nEmoglobina 13.5 g/dL"));
        assert!(prompt.contains("[Estratto 2]\nCreatinina 0.9 mg/dL"));
        assert!(prompt.contains("DOMANDA: Com'è l'emoglobina?"));
        assert!(!prompt.contains("STORICO"));
    }

    #[test]
    fn answer_prompt_permits_therapy_when_context_has_it() {
        let prompt = build_answer_prompt("q", &chunks(), None, true, &[]);
        assert!(prompt.contains(THERAPY_PERMITTED));
        assert!(!prompt.contains("PAZIENTE:"));
    }

    #[test]
    fn answer_prompt_includes_history() {
        let history = vec![ChatTurn::user("Prima domanda"), ChatTurn::assistant("Prima risposta")];
        let prompt = build_answer_prompt("q", &chunks(), None, false, &history);
        assert!(prompt.contains("Utente: Prima domanda\nMyNurse: Prima risposta"));
    }

    #[test]
    fn therapy_prompt_fences_text_last() {
        let prompt = build_therapy_prompt("Assume ramipril 5mg");
        assert!(prompt.ends_with("<<<\nAssume ramipril 5mg\n>>>"));
        assert!(prompt.contains("NON_TERAPIA"));
    }

    #[test]
    fn domain_prompt_truncates_on_char_boundary() {
        let text = "è".repeat(DOMAIN_SAMPLE_CHARS + 500);
        let prompt = build_domain_prompt(&text);
        assert_eq!(prompt.matches('è').count(), DOMAIN_SAMPLE_CHARS);
    }

    #[test]
    fn grounding_prompt_uses_placeholder_without_context() {
        let prompt = build_grounding_prompt("Risposta", &[]);
        assert!(prompt.contains(EMPTY_CONTEXT));
        assert!(prompt.contains("TUTTO SUPPORTATO"));
    }
}
