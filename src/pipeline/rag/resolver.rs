//! Patient disambiguation for clinicians with several patients.

use strsim::normalized_levenshtein;

use crate::models::Patient;

/// Default minimum similarity for an approximate name match.
pub const DEFAULT_CUTOFF: f64 = 0.6;

/// Finds the patient a free-text question is about.
///
/// An exact `"first last"` mention wins. Otherwise every one-to-three word
/// window of the question is compared with each name; the best window must
/// clear the cutoff and belong to a single patient.
#[derive(Debug, Clone)]
pub struct PatientResolver {
    cutoff: f64,
}

impl Default for PatientResolver {
    fn default() -> Self {
        Self::new(DEFAULT_CUTOFF)
    }
}

impl PatientResolver {
    pub fn new(cutoff: f64) -> Self {
        Self { cutoff }
    }

    pub fn resolve<'a>(&self, query: &str, candidates: &'a [Patient]) -> Option<&'a Patient> {
        if candidates.is_empty() {
            return None;
        }

        let words = words_of(query);
        let padded_query = format!(" {} ", words.join(" "));

        let keys: Vec<String> = candidates
            .iter()
            .map(|p| words_of(&p.full_name()).join(" "))
            .collect();

        // Exact mention
        let exact: Vec<usize> = keys
            .iter()
            .enumerate()
            .filter(|(_, key)| !key.is_empty() && padded_query.contains(&format!(" {key} ")))
            .map(|(i, _)| i)
            .collect();
        if let Some(index) = single_patient(&exact, candidates) {
            return Some(&candidates[index]);
        }
        if !exact.is_empty() {
            tracing::debug!(matches = exact.len(), "Several patients named in query");
            return None;
        }

        // Approximate mention
        let windows = word_windows(&words, 3);
        let mut best_score = 0.0_f64;
        let mut best: Vec<usize> = Vec::new();
        for (i, key) in keys.iter().enumerate() {
            let score = windows
                .iter()
                .map(|w| normalized_levenshtein(w, key))
                .fold(0.0_f64, f64::max);
            if score < self.cutoff {
                continue;
            }
            if score > best_score + f64::EPSILON {
                best_score = score;
                best = vec![i];
            } else if (score - best_score).abs() <= f64::EPSILON {
                best.push(i);
            }
        }

        let resolved = single_patient(&best, candidates);
        tracing::debug!(resolved = resolved.is_some(), best_score, "Approximate patient match");
        resolved.map(|i| &candidates[i])
    }
}

/// The one patient behind `indices`, if they all share an email.
fn single_patient(indices: &[usize], candidates: &[Patient]) -> Option<usize> {
    let first = *indices.first()?;
    indices
        .iter()
        .all(|&i| candidates[i].email.eq_ignore_ascii_case(&candidates[first].email))
        .then_some(first)
}

/// Lowercase words with surrounding punctuation removed. Apostrophes and
/// hyphens inside names are kept.
fn words_of(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
        .filter(|w| !w.is_empty())
        .collect()
}

/// Every run of 1..=max consecutive words, space-joined.
fn word_windows(words: &[String], max: usize) -> Vec<String> {
    let mut out = Vec::new();
    for size in 1..=max.min(words.len()) {
        for window in words.windows(size) {
            out.push(window.join(" "));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patient(first: &str, last: &str) -> Patient {
        Patient {
            email: format!("{}.{}@example.it", first.to_lowercase(), last.to_lowercase()),
            first_name: first.into(),
            last_name: last.into(),
            associated_clinician_email: Some("dr.verdi@example.it".into()),
        }
    }

    fn roster() -> Vec<Patient> {
        vec![
            patient("Maria", "Rossi"),
            patient("Giovanni", "Bianchi"),
            patient("Lucia", "Esposito"),
        ]
    }

    #[test]
    fn exact_name_in_query() {
        let patients = roster();
        let found = PatientResolver::default()
            .resolve("Quali sono gli ultimi esami del sangue di Maria Rossi?", &patients)
            .unwrap();
        assert_eq!(found.email, "maria.rossi@example.it");
    }

    #[test]
    fn generic_reference_is_ambiguous() {
        let patients = roster();
        assert!(PatientResolver::default().resolve("the patient", &patients).is_none());
        assert!(PatientResolver::default()
            .resolve("Come sta il paziente?", &patients)
            .is_none());
    }

    #[test]
    fn misspelled_name_matches_approximately() {
        let patients = roster();
        let found = PatientResolver::default()
            .resolve("emoglobina di giovani bianci", &patients)
            .unwrap();
        assert_eq!(found.last_name, "Bianchi");
    }

    #[test]
    fn name_must_be_whole_words() {
        let patients = vec![patient("Anna", "Neri"), patient("Marianna", "Neri")];
        let found = PatientResolver::default()
            .resolve("referti di Marianna Neri", &patients)
            .unwrap();
        assert_eq!(found.first_name, "Marianna");
    }

    #[test]
    fn two_exact_mentions_are_ambiguous() {
        let patients = roster();
        assert!(PatientResolver::default()
            .resolve("confronta Maria Rossi e Lucia Esposito", &patients)
            .is_none());
    }

    #[test]
    fn tied_approximate_matches_are_ambiguous() {
        let patients = vec![patient("Mario", "Rossi"), patient("Marta", "Rossi")];
        assert!(PatientResolver::default()
            .resolve("esami di Mar Rossi", &patients)
            .is_none());
    }

    #[test]
    fn no_candidates() {
        assert!(PatientResolver::default().resolve("Maria Rossi", &[]).is_none());
    }
}
