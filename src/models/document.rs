use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::enums::DocumentVerdict;

/// An uploaded clinical document. Immutable once accepted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub filename: String,
    pub patient_email: String,
    #[serde(skip_serializing)]
    pub content: Vec<u8>,
    /// SHA-256 of `content`, hex encoded.
    pub content_hash: String,
    pub verdict: DocumentVerdict,
    /// Itemized rejection reasons; empty when accepted.
    pub reason: String,
    pub uploaded_at: NaiveDateTime,
}

impl Document {
    /// A freshly uploaded document, stamped now.
    pub fn new(
        filename: impl Into<String>,
        patient_email: impl Into<String>,
        content: Vec<u8>,
        verdict: DocumentVerdict,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            filename: filename.into(),
            patient_email: patient_email.into(),
            content_hash: content_hash(&content),
            content,
            verdict,
            reason: reason.into(),
            uploaded_at: chrono::Local::now().naive_local(),
        }
    }

    pub fn is_accepted(&self) -> bool {
        self.verdict == DocumentVerdict::Accepted
    }
}

/// Hex-encoded SHA-256 of the raw bytes.
pub fn content_hash(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}
