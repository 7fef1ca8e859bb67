//! Small string helpers for log previews.

/// Truncate `s` to at most `max_bytes`, backing off to a char boundary.
pub fn truncate_str(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_strings_untouched() {
        assert_eq!(truncate_str("abc", 10), "abc");
    }

    #[test]
    fn truncates_on_char_boundary() {
        assert_eq!(truncate_str("abcdef", 3), "abc");
        // "é" is two bytes; cutting inside it backs off
        assert_eq!(truncate_str("aé", 2), "a");
    }
}
