use std::fmt;

use serde::{Deserialize, Serialize};

/// Pattern family that contributed to a risk score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskCategory {
    InstructionOverride,
    ScriptMarkup,
    CodeExecution,
    EncodedPayload,
    HexBinary,
    ShellCommand,
    Url,
    TooLong,
    LongNonAlphaToken,
    ShellSymbols,
    FileOrDataUri,
}

impl RiskCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InstructionOverride => "instruction_override",
            Self::ScriptMarkup => "script_markup",
            Self::CodeExecution => "code_execution",
            Self::EncodedPayload => "encoded_payload",
            Self::HexBinary => "hex_binary",
            Self::ShellCommand => "shell_command",
            Self::Url => "url",
            Self::TooLong => "too_long",
            Self::LongNonAlphaToken => "long_non_alpha_token",
            Self::ShellSymbols => "shell_symbols",
            Self::FileOrDataUri => "file_or_data_uri",
        }
    }
}

impl fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskVerdict {
    Accept,
    Warn,
    Block,
}

/// Heuristic injection/payload estimate for one input. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Clamped to [0, 1].
    pub score: f32,
    /// Triggered categories, in catalogue order, without duplicates.
    pub categories: Vec<RiskCategory>,
    pub verdict: RiskVerdict,
}

impl RiskAssessment {
    /// Whether the raw text may be forwarded to the model.
    pub fn is_accepted(&self) -> bool {
        self.verdict != RiskVerdict::Block
    }
}

/// Three-way reading of a classifier-style model reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelVerdict {
    Positive,
    Negative,
    /// The reply matched neither label.
    Unparseable,
}

/// Which text a therapy classification was computed for.
/// Each target resolves an unparseable reply in its own conservative direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TherapyTarget {
    Context,
    Query,
    Answer,
}

/// Outcome of the grounding verifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundingReport {
    pub supported: bool,
    /// Text to show alongside the answer; the positive marker when supported.
    pub feedback: String,
}
