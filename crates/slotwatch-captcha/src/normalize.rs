//! Cleanup of raw OCR output.

/// Longest accepted reading. The CAPTCHA itself is usually four characters.
pub const MAX_LEN: usize = 6;

/// Strip whitespace and anything outside `[A-Za-z0-9_#+-]`, keep at most
/// [`MAX_LEN`] characters.
#[must_use]
pub fn normalize(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '#' | '+' | '-'))
        .take(MAX_LEN)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_whitespace_and_noise() {
        assert_eq!(normalize(" A b\n1 2 "), "Ab12");
        assert_eq!(normalize("‘X7.k|"), "X7k");
        assert_eq!(normalize("a#b+c-d_"), "a#b+c-");
    }

    #[test]
    fn test_truncates_to_max_len() {
        assert_eq!(normalize("ABCDEFGHIJ"), "ABCDEF");
    }

    #[test]
    fn test_drops_non_ascii_letters() {
        assert_eq!(normalize("źdź1234"), "d1234");
    }

    #[test]
    fn test_idempotent() {
        for raw in ["", "  ", "AB 12", "x!y@z#1+2-3", "ąęABCDEFG", "\t9\r\n8 7"] {
            let once = normalize(raw);
            assert_eq!(normalize(&once), once, "input {raw:?}");
        }
    }
}
