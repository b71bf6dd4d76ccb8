//! # Input Coercion
//!
//! Text-to-number handling for the boundary between user-entered fields and
//! the numeric core. The calculations only ever see `f64`; this decides what
//! an empty or malformed field means.

/// Parse `text` as a finite number; empty or malformed fields are `None`.
///
/// Surrounding whitespace is ignored. Comma decimal separators are not
/// translated: `"12,5"` is unparseable.
///
/// ```rust
/// use jig_core::numbers::parse_finite;
///
/// assert_eq!(parse_finite(" 12.5 "), Some(12.5));
/// assert_eq!(parse_finite(""), None);
/// assert_eq!(parse_finite("inf"), None);
/// ```
pub fn parse_finite(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_finite() {
        assert_eq!(parse_finite("159.99"), Some(159.99));
        assert_eq!(parse_finite("-3.25"), Some(-3.25));
        assert_eq!(parse_finite("   "), None);
        assert_eq!(parse_finite("x"), None);
        assert_eq!(parse_finite("12,5"), None);
        assert_eq!(parse_finite("NaN"), None);
        assert_eq!(parse_finite("1e400"), None);
    }
}
