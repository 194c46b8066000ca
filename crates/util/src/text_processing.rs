//! # Text Processing Utilities
//!
//! Secret redaction for log output and keyword normalization shared by the
//! resolver and the planner.

use once_cell::sync::Lazy;
use regex::Regex;

static REDACT_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)(authorization:\s+)([^\s]+(?:\s+[^\s,}]+)?)").unwrap(),
        Regex::new(r"(?i)((?:^|\b)Bearer\s+)([A-Za-z0-9\-._~+/]+=*)").unwrap(),
        Regex::new(r#"(?i)("?[A-Za-z0-9_]*(?:token|secret|password|api_key)[A-Za-z0-9_]*"?\s*[:=]\s*"?)([^\s",}]+)"#)
            .unwrap(),
    ]
});

/// Redacts values that look like secrets in a string.
///
/// Key names and header prefixes are preserved so redacted output stays
/// useful for debugging.
///
/// ```rust
/// use tollgate_util::redact_sensitive;
///
/// assert_eq!(redact_sensitive("Authorization: Bearer abc.def"), "Authorization: [REDACTED]");
/// assert_eq!(redact_sensitive("API_TOKEN=xyz789"), "API_TOKEN=[REDACTED]");
/// ```
pub fn redact_sensitive(input: &str) -> String {
    redact_sensitive_with(input, "[REDACTED]")
}

/// Redacts sensitive-looking values, using a custom replacement token.
pub fn redact_sensitive_with(input: &str, replacement: &str) -> String {
    let mut redacted = input.to_string();
    for pattern in REDACT_PATTERNS.iter() {
        redacted = pattern
            .replace_all(&redacted, |captures: &regex::Captures| {
                let prefix = captures.get(1).map(|m| m.as_str()).unwrap_or("");
                format!("{}{}", prefix, replacement)
            })
            .to_string();
    }
    redacted
}

/// Trims and lowercases a keyword; returns `None` for blank input.
pub fn normalize_keyword(keyword: &str) -> Option<String> {
    let normalized = keyword.trim().to_lowercase();
    if normalized.is_empty() { None } else { Some(normalized) }
}

/// Counts characters rather than bytes, so CJK text measures as humans read it.
pub fn char_length(text: &str) -> usize {
    text.chars().count()
}

/// Shortens `text` to at most `max_chars` characters, appending an ellipsis when cut.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if char_length(text) <= max_chars {
        return text.to_string();
    }
    let mut shortened: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    shortened.push('…');
    shortened
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_authorization_header() {
        assert_eq!(
            redact_sensitive("authorization: Bearer eyJhbGciOi.payload"),
            "authorization: [REDACTED]"
        );
    }

    #[test]
    fn redacts_json_style_token_entries() {
        let redacted = redact_sensitive(r#"{"api_token": "s3cr3t", "name": "小明"}"#);
        assert!(!redacted.contains("s3cr3t"));
        assert!(redacted.contains("小明"));
    }

    #[test]
    fn normalizes_keywords() {
        assert_eq!(normalize_keyword("  Student "), Some("student".to_string()));
        assert_eq!(normalize_keyword("   "), None);
    }

    #[test]
    fn measures_and_truncates_by_character() {
        assert_eq!(char_length("查询班级"), 4);
        assert_eq!(truncate_chars("查询班级信息", 4), "查询班…");
        assert_eq!(truncate_chars("short", 10), "short");
    }
}
