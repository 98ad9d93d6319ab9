use serde::{Deserialize, Serialize};

/// Which intake stage raised a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    TooShort,
    EmbeddedCode,
    EncodedPayload,
    HighEntropy,
    CodeLikeLines,
    JailbreakKeywords,
    NonMedical,
    /// Text could not be extracted at all.
    ExtractionFailed,
    /// The domain classifier failed after the document was already rejected.
    ClassificationFailed,
}

impl FindingKind {
    /// Hard errors reject regardless of the score.
    pub fn is_hard_error(&self) -> bool {
        matches!(self, Self::ExtractionFailed | Self::ClassificationFailed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntakeFinding {
    pub kind: FindingKind,
    /// Suspicion added by this finding.
    pub weight: f32,
    /// User-facing reason (Italian).
    pub reason: String,
}

impl IntakeFinding {
    pub fn new(kind: FindingKind, weight: f32, reason: impl Into<String>) -> Self {
        Self {
            kind,
            weight,
            reason: reason.into(),
        }
    }
}

/// Outcome of document intake validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntakeReport {
    pub accepted: bool,
    pub suspicion_score: f32,
    pub findings: Vec<IntakeFinding>,
    /// Text extracted from all pages; what gets indexed on acceptance.
    #[serde(skip)]
    pub extracted_text: String,
}

impl IntakeReport {
    /// Triggered reasons joined by `"; "`. Empty when accepted.
    pub fn reason(&self) -> String {
        if self.accepted {
            return String::new();
        }
        let reasons: Vec<&str> = self.findings.iter().map(|f| f.reason.as_str()).collect();
        if reasons.is_empty() {
            "Documento sospetto.".to_string()
        } else {
            reasons.join("; ")
        }
    }

    pub fn has_finding(&self, kind: FindingKind) -> bool {
        self.findings.iter().any(|f| f.kind == kind)
    }
}
