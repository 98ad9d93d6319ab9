//! Content heuristics run on the extracted text of an upload.
//!
//! Each check returns at most one finding. Weights are additive.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use super::entropy::{mean_window_entropy, shannon_entropy};
use super::types::{FindingKind, IntakeFinding};

pub const TOO_SHORT_WEIGHT: f32 = 0.6;
pub const EMBEDDED_CODE_WEIGHT: f32 = 0.9;
pub const ENCODED_PAYLOAD_WEIGHT: f32 = 1.0;
pub const HIGH_ENTROPY_WEIGHT: f32 = 1.0;
pub const CODE_LINES_WEIGHT: f32 = 0.5;
pub const KEYWORDS_WEIGHT: f32 = 1.2;

const BASE64_MIN_RUN: usize = 80;
const BASE64_ENTROPY_LIMIT: f64 = 4.5;
const ENTROPY_WINDOW: usize = 200;
const ENTROPY_MIN_WINDOW: usize = 50;
const ENTROPY_LIMIT: f64 = 5.5;
const CODE_LINE_LIMIT: usize = 15;

static EMBEDDED_CODE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(<script|javascript:|eval\(|base64,|import )").expect("valid regex")
});

static BASE64_RUN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z0-9+/]{80,}={0,2}").expect("valid regex"));

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

// Unit tokens (ng/mL, mUI/L, umol/L, x10^3/uL), reference ranges "(30 - 400)"
// and common lab vocabulary.
static CLINICAL_VOCABULARY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(\b[a-zµ]{1,5}/(d?l|ml|ul|µl|l|kg|h|24h|min)\b|/(u|µ)l\b|\(\s*[<>]?\s*[\d.,]+\s*[-–]\s*[\d.,]+\s*\)|\b(creatinina|emoglobina|globuli|bilirubina|sodio|potassio|esame|referto|diagnosi)\b)",
    )
    .expect("valid regex")
});

static CODE_SYMBOL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[{}<>;=()/\\]").expect("valid regex"));

static CODE_KEYWORD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(import|def|class|printf|var|function)\b").expect("valid regex")
});

static NON_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9\s]").expect("valid regex"));

/// Jailbreak markers, written without spacing or punctuation.
const JAILBREAK_KEYWORDS: &[&str] = &[
    "ignorepreviousinstructions",
    "ignoreprevious",
    "ignoreinstructions",
    "youarenow",
    "actas",
    "jailbreak",
    "dan",
    "systemprompt",
    "openaiapikey",
    "openai",
    "grantaccess",
];

/// Longest keyword, in tokens.
const MAX_KEYWORD_TOKENS: usize = 4;

/// Extracted text (trimmed) shorter than `min_chars`.
pub fn check_length(text: &str, min_chars: usize) -> Option<IntakeFinding> {
    (text.trim().chars().count() < min_chars).then(|| {
        IntakeFinding::new(
            FindingKind::TooShort,
            TOO_SHORT_WEIGHT,
            "Documento troppo breve o privo di testo leggibile.",
        )
    })
}

/// Script tags, JS URIs, eval calls, data URIs, import statements.
pub fn check_embedded_code(text: &str) -> Option<IntakeFinding> {
    EMBEDDED_CODE_RE.is_match(text).then(|| {
        IntakeFinding::new(
            FindingKind::EmbeddedCode,
            EMBEDDED_CODE_WEIGHT,
            "Trovato contenuto sospetto o codice embedded nel PDF.",
        )
    })
}

/// A run of 80+ base64 alphabet chars with entropy above 4.5 bits/char.
///
/// Line breaks are removed first so that payloads wrapped at 64 or 76
/// columns still form one run; spaces are kept, so prose never does.
pub fn check_encoded_payload(text: &str) -> Option<IntakeFinding> {
    let unwrapped: String = text.chars().filter(|c| *c != '\n' && *c != '\r').collect();

    let found = BASE64_RUN_RE
        .find_iter(&unwrapped)
        .any(|m| m.as_str().len() >= BASE64_MIN_RUN && shannon_entropy(m.as_str()) > BASE64_ENTROPY_LIMIT);

    found.then(|| {
        IntakeFinding::new(
            FindingKind::EncodedPayload,
            ENCODED_PAYLOAD_WEIGHT,
            "Pattern compatibile con Base64 o testo codificato rilevato.",
        )
    })
}

/// Mean 200-char window entropy or whole-text entropy above 5.5 bits/char.
pub fn check_entropy(text: &str) -> Option<IntakeFinding> {
    if text.trim().is_empty() {
        return None;
    }

    let windowed = mean_window_entropy(text, ENTROPY_WINDOW, ENTROPY_MIN_WINDOW);
    let total = shannon_entropy(&WHITESPACE_RE.replace_all(text, ""));

    (windowed > ENTROPY_LIMIT || total > ENTROPY_LIMIT).then(|| {
        IntakeFinding::new(
            FindingKind::HighEntropy,
            HIGH_ENTROPY_WEIGHT,
            "Entropia elevata: possibile testo codificato o anomalo.",
        )
    })
}

/// Share of ASCII letters in `s`.
fn alpha_ratio(s: &str) -> f64 {
    let total = s.chars().count();
    if total == 0 {
        return 0.0;
    }
    let letters = s.chars().filter(|c| c.is_ascii_alphabetic()).count();
    letters as f64 / total as f64
}

/// Whether a single line looks like source code rather than report text.
fn is_code_like(line: &str) -> bool {
    let line = line.trim();
    if line.chars().count() < 10 || alpha_ratio(line) < 0.35 {
        return false;
    }
    if CLINICAL_VOCABULARY_RE.is_match(line) {
        return false;
    }
    CODE_SYMBOL_RE.find_iter(line).count() >= 3 || CODE_KEYWORD_RE.is_match(line)
}

pub fn count_code_like_lines(text: &str) -> usize {
    text.lines().filter(|l| is_code_like(l)).count()
}

/// More than 15 code-like lines.
pub fn check_code_lines(text: &str) -> Option<IntakeFinding> {
    let n = count_code_like_lines(text);
    (n > CODE_LINE_LIMIT).then(|| {
        IntakeFinding::new(
            FindingKind::CodeLikeLines,
            CODE_LINES_WEIGHT,
            format!("Rilevate {n} righe con pattern simili a codice."),
        )
    })
}

/// Jailbreak markers spelled by one to four consecutive tokens, so that
/// "System-Prompt" and "ignore previous instructions" both match.
pub fn find_jailbreak_keywords(text: &str) -> Vec<&'static str> {
    let lower = text.to_lowercase();
    let cleaned = NON_TOKEN_RE.replace_all(&lower, " ");
    let tokens: Vec<&str> = cleaned.split_whitespace().collect();

    let mut spans: HashSet<String> = HashSet::new();
    for start in 0..tokens.len() {
        let mut joined = String::new();
        for token in tokens.iter().skip(start).take(MAX_KEYWORD_TOKENS) {
            joined.push_str(token);
            spans.insert(joined.clone());
        }
    }

    JAILBREAK_KEYWORDS
        .iter()
        .copied()
        .filter(|kw| spans.contains(*kw))
        .collect()
}

pub fn check_jailbreak_keywords(text: &str) -> Option<IntakeFinding> {
    let found = find_jailbreak_keywords(text);
    (!found.is_empty()).then(|| {
        IntakeFinding::new(
            FindingKind::JailbreakKeywords,
            KEYWORDS_WEIGHT,
            format!("Parole chiave potenzialmente malevole rilevate: {}", found.join(", ")),
        )
    })
}

/// Every text heuristic, in order.
pub fn run_text_checks(text: &str, min_chars: usize) -> Vec<IntakeFinding> {
    [
        check_length(text, min_chars),
        check_embedded_code(text),
        check_encoded_payload(text),
        check_entropy(text),
        check_code_lines(text),
        check_jailbreak_keywords(text),
    ]
    .into_iter()
    .flatten()
    .collect()
}
