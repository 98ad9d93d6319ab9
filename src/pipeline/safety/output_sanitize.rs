//! Post-LLM output cleanup.
//!
//! Reasoning models (qwen3, deepseek-r1) wrap their chain of thought in
//! `<think>` tags. It must never reach the gates or the user.

use std::sync::LazyLock;

use regex::Regex;

static THINK_BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<think>.*?</think>").expect("valid regex"));

static UNTERMINATED_THINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<think>.*").expect("valid regex"));

static STRAY_THINK_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</?think>").expect("valid regex"));

/// Strip reasoning blocks and surrounding whitespace from raw model output.
///
/// An unterminated `<think>` (generation cut short) drops everything after it.
pub fn sanitize_llm_output(raw: &str) -> String {
    let text = THINK_BLOCK_RE.replace_all(raw, "");
    let text = UNTERMINATED_THINK_RE.replace_all(&text, "");
    let text = STRAY_THINK_TAG_RE.replace_all(&text, "");
    text.trim().to_string()
}
