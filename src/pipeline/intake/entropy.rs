use std::collections::HashMap;

/// Shannon entropy of `s` in bits per char.
pub fn shannon_entropy(s: &str) -> f64 {
    let mut counts: HashMap<char, usize> = HashMap::new();
    let mut total = 0usize;
    for c in s.chars() {
        *counts.entry(c).or_insert(0) += 1;
        total += 1;
    }
    if total == 0 {
        return 0.0;
    }

    let total = total as f64;
    counts
        .values()
        .map(|&n| {
            let p = n as f64 / total;
            -p * p.log2()
        })
        .sum()
}

/// Mean entropy over consecutive `window`-char slices longer than `min_len`.
/// 0.0 when no slice qualifies.
pub fn mean_window_entropy(text: &str, window: usize, min_len: usize) -> f64 {
    let chars: Vec<char> = text.chars().collect();
    let values: Vec<f64> = chars
        .chunks(window.max(1))
        .filter(|w| w.len() > min_len)
        .map(|w| shannon_entropy(&w.iter().collect::<String>()))
        .collect();

    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string_has_zero_entropy() {
        assert_eq!(shannon_entropy(""), 0.0);
    }

    #[test]
    fn uniform_string_has_zero_entropy() {
        assert_eq!(shannon_entropy("aaaaaaaa"), 0.0);
    }

    #[test]
    fn two_symbols_one_bit() {
        assert!((shannon_entropy("abababab") - 1.0).abs() < 1e-9);
    }

    #[test]
    fn sixty_four_symbols_six_bits() {
        let alphabet = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
        assert!((shannon_entropy(alphabet) - 6.0).abs() < 1e-9);
    }

    #[test]
    fn short_windows_are_ignored() {
        // 250 chars: one full window of 200 and a 50-char tail that does not count
        let text = format!("{}{}", "ab".repeat(100), "c".repeat(50));
        assert!((mean_window_entropy(&text, 200, 50) - 1.0).abs() < 1e-9);
        assert_eq!(mean_window_entropy("breve", 200, 50), 0.0);
    }
}
