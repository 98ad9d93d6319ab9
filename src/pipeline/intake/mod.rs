pub mod types;
pub mod extract;
pub mod entropy;
pub mod heuristics;
pub mod validator;

pub use extract::{extract_document_text, ExtractionError};
pub use types::*;
pub use validator::DocumentIntakeValidator;

use thiserror::Error;

use crate::pipeline::rag::ModelError;

/// Validation could not reach a verdict.
///
/// Suspicious or unreadable documents are not errors: they produce a
/// rejected [`IntakeReport`].
#[derive(Error, Debug)]
pub enum IntakeError {
    #[error("Domain classification unavailable: {0}")]
    ModelUnavailable(#[from] ModelError),
}
