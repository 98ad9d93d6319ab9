use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Application-level constants
pub const APP_NAME: &str = "MyNurse";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get the application data directory.
/// ~/MyNurse/ on all platforms, falling back to the working directory
/// when no home directory can be determined.
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// SQLite file holding users and uploaded documents.
pub const RECORDS_DB_FILE: &str = "records.db";

/// SQLite file holding the per-patient knowledge index.
/// Kept apart from the record store so the index can be dropped and rebuilt.
pub const INDEX_DB_FILE: &str = "knowledge.db";

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    if cfg!(debug_assertions) {
        "mynurse=debug,info"
    } else {
        "mynurse=info,warn"
    }
}

/// Every tunable of the question-answering and intake pipelines.
///
/// Defaults reproduce the thresholds the product shipped with. Use
/// [`AssistantConfig::from_env`] to override individual values with
/// `MYNURSE_*` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    // ── Prompt risk scoring ──────────────────────────────
    /// Inputs longer than this (in characters) receive a length penalty.
    pub max_input_length: usize,
    /// Scores at or above this are at least a warning.
    pub warn_threshold: f32,
    /// Scores at or above this are always blocked.
    pub block_threshold: f32,
    /// Any warning is escalated to a block.
    pub treat_warn_as_block: bool,

    // ── Document intake ──────────────────────────────────
    /// Cumulative suspicion at which a document is rejected.
    pub intake_score_threshold: f32,
    /// Below this score the model classification is the primary domain check;
    /// at or above it the call is only a confirmation pass.
    pub intake_llm_confirmation_threshold: f32,
    /// Extracted text shorter than this is treated as unreadable.
    pub intake_min_text_length: usize,
    /// Reject on any triggered finding, not only on the score threshold.
    pub intake_strict: bool,

    // ── Retrieval ────────────────────────────────────────
    /// Characters per knowledge chunk.
    pub chunk_size: usize,
    /// Chunks retrieved per question.
    pub top_k: usize,

    // ── Patient disambiguation ───────────────────────────
    /// Minimum similarity for an approximate name match.
    pub resolver_cutoff: f64,

    // ── Answer gating ────────────────────────────────────
    /// Also classify the generated answer and refuse therapy content that the
    /// context cannot back.
    pub strict_answer_check: bool,
    /// Run the grounding verifier after generation.
    pub verify_grounding: bool,

    // ── Model access ─────────────────────────────────────
    pub ollama_url: String,
    pub generation_model: String,
    pub embedding_model: String,
    pub model_timeout_secs: u64,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            max_input_length: 2_000,
            warn_threshold: 0.1,
            block_threshold: 0.6,
            treat_warn_as_block: true,
            intake_score_threshold: 2.2,
            intake_llm_confirmation_threshold: 1.6,
            intake_min_text_length: 300,
            intake_strict: true,
            chunk_size: 1_000,
            top_k: 3,
            resolver_cutoff: 0.6,
            strict_answer_check: false,
            verify_grounding: true,
            ollama_url: "http://localhost:11434".into(),
            generation_model: "qwen3:1.7b".into(),
            embedding_model: "nomic-embed-text".into(),
            model_timeout_secs: 120,
        }
    }
}

impl AssistantConfig {
    /// Defaults overridden by any `MYNURSE_*` variables present in the environment.
    /// Unparseable values are ignored with a warning.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();

        override_parsed(&lookup, "MYNURSE_MAX_INPUT_LENGTH", &mut cfg.max_input_length);
        override_parsed(&lookup, "MYNURSE_WARN_THRESHOLD", &mut cfg.warn_threshold);
        override_parsed(&lookup, "MYNURSE_BLOCK_THRESHOLD", &mut cfg.block_threshold);
        override_parsed(&lookup, "MYNURSE_TREAT_WARN_AS_BLOCK", &mut cfg.treat_warn_as_block);
        override_parsed(&lookup, "MYNURSE_INTAKE_THRESHOLD", &mut cfg.intake_score_threshold);
        override_parsed(&lookup, "MYNURSE_INTAKE_STRICT", &mut cfg.intake_strict);
        override_parsed(&lookup, "MYNURSE_CHUNK_SIZE", &mut cfg.chunk_size);
        override_parsed(&lookup, "MYNURSE_TOP_K", &mut cfg.top_k);
        override_parsed(&lookup, "MYNURSE_RESOLVER_CUTOFF", &mut cfg.resolver_cutoff);
        override_parsed(&lookup, "MYNURSE_STRICT_ANSWER_CHECK", &mut cfg.strict_answer_check);
        override_parsed(&lookup, "MYNURSE_VERIFY_GROUNDING", &mut cfg.verify_grounding);
        override_parsed(&lookup, "MYNURSE_MODEL_TIMEOUT_SECS", &mut cfg.model_timeout_secs);

        if let Some(url) = lookup("MYNURSE_OLLAMA_URL") {
            cfg.ollama_url = url;
        }
        if let Some(model) = lookup("MYNURSE_GENERATION_MODEL") {
            cfg.generation_model = model;
        }
        if let Some(model) = lookup("MYNURSE_EMBEDDING_MODEL") {
            cfg.embedding_model = model;
        }

        cfg
    }
}

fn override_parsed<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    slot: &mut T,
) {
    let Some(raw) = lookup(key) else { return };
    match raw.trim().parse::<T>() {
        Ok(value) => *slot = value,
        Err(_) => tracing::warn!(key, "Ignoring unparseable configuration value"),
    }
}
