//! Canonical form of untrusted text.
//!
//! `canonicalize` folds look-alike code points and removes invisible ones;
//! `normalize` additionally HTML-escapes for display. Both are idempotent
//! and never fail.

use unicode_normalization::UnicodeNormalization;

/// Invisible stripping, NFKC folding, then invisible stripping again.
///
/// Stripping first keeps a removed joiner from licensing a new composition
/// on a second pass.
pub fn canonicalize(text: &str) -> String {
    let stripped = remove_invisible(text);
    let folded: String = stripped.nfkc().collect();
    remove_invisible(&folded)
}

/// Canonical text, HTML-escaped.
pub fn normalize(text: &str) -> String {
    escape_html(&canonicalize(text))
}

/// Remove zero-width, bidi, and control characters (newline and tab kept).
fn remove_invisible(text: &str) -> String {
    text.chars()
        .filter(|c| !is_invisible(*c))
        .collect()
}

fn is_invisible(c: char) -> bool {
    matches!(
        c,
        '\u{200B}'..='\u{200F}'  // Zero-width chars
        | '\u{202A}'..='\u{202E}' // Directional formatting
        | '\u{2060}'..='\u{2064}' // Invisible operators
        | '\u{2066}'..='\u{2069}' // Directional isolates
        | '\u{FEFF}'              // BOM
        | '\u{00AD}'              // Soft hyphen
        | '\u{034F}'              // Combining grapheme joiner
        | '\u{061C}'              // Arabic letter mark
        | '\u{180E}'              // Mongolian vowel separator
    ) || (c.is_control() && c != '\n' && c != '\t')
}

const ENTITIES: [&str; 6] = ["amp;", "lt;", "gt;", "quot;", "#x27;", "#39;"];

/// Escape `& < > " '`. An `&` that already opens one of our entities is left
/// alone so escaping twice is a no-op.
fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for (i, c) in text.char_indices() {
        match c {
            '&' => {
                let rest = &text[i + 1..];
                if ENTITIES.iter().any(|e| rest.starts_with(e)) {
                    out.push('&');
                } else {
                    out.push_str("&amp;");
                }
            }
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folds_fullwidth_letters() {
        assert_eq!(canonicalize("ｉｇｎｏｒｅ"), "ignore");
    }

    #[test]
    fn strips_zero_width_characters() {
        assert_eq!(canonicalize("ig\u{200B}no\u{FEFF}re"), "ignore");
        assert_eq!(canonicalize("a\u{202E}b\u{00AD}c"), "abc");
    }

    #[test]
    fn keeps_newlines_and_tabs() {
        assert_eq!(canonicalize("riga 1\n\triga 2"), "riga 1\n\triga 2");
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(
            normalize("<b>\"ciao\"</b> & 'tu'"),
            "&lt;b&gt;&quot;ciao&quot;&lt;/b&gt; &amp; &#x27;tu&#x27;"
        );
    }

    #[test]
    fn normalize_is_idempotent() {
        let samples = [
            "",
            "Emoglobina 13.5 g/dL",
            "<script>alert('x')</script> && rm -rf /",
            "e\u{200B}\u{0301} composto",
            "&amp; già escapato &lt;",
            "ＡＢＣ ﬁ ① ㎎",
            "<\u{0338} &unknown; \u{FEFF}",
        ];
        for s in samples {
            let once = normalize(s);
            assert_eq!(normalize(&once), once, "not idempotent for {s:?}");
        }
    }

    #[test]
    fn canonicalize_is_idempotent() {
        for s in ["e\u{200B}\u{0301}", "ＡＢＣ", "x\u{0007}y"] {
            let once = canonicalize(s);
            assert_eq!(canonicalize(&once), once);
        }
    }
}
