pub mod types;
pub mod normalize;
pub mod risk;
pub mod verdict;
pub mod therapy;
pub mod redact;
pub mod grounding;
pub mod output_sanitize;

pub use grounding::verify_grounding;
pub use normalize::{canonicalize, normalize};
pub use output_sanitize::sanitize_llm_output;
pub use redact::redact;
pub use risk::ContentRiskScorer;
pub use therapy::{classify_context_and_query, therapy_gate, GateDecision, TherapyFlags};
pub use types::*;
