//! Utility functions and helpers

/// Truncate a string to a maximum byte length, ensuring valid UTF-8 boundaries
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        let mut end = max_len.saturating_sub(3);
        while !s.is_char_boundary(end) {
            end = end.saturating_sub(1);
        }
        format!("{}...", &s[..end])
    }
}

/// First `max_chars` characters of `s`, counted in chars rather than bytes
pub fn take_chars(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

/// Join `base` and `segment` with exactly one `/`
pub fn join_url(base: &str, segment: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        segment.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world", 8), "hello...");
        assert_eq!(truncate("test", 3), "...");
    }

    #[test]
    fn test_take_chars_counts_multibyte() {
        assert_eq!(take_chars("Привет мир", 6), "Привет");
        assert_eq!(take_chars("short", 60), "short");
    }

    #[test]
    fn test_join_url() {
        assert_eq!(join_url("ws://h/api/", "/abc"), "ws://h/api/abc");
        assert_eq!(join_url("http://h", "api/v1/chat"), "http://h/api/v1/chat");
    }
}
