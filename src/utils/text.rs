use regex::Regex;
use std::sync::OnceLock;

/// Collapses runs of whitespace into single spaces and trims the ends.
pub fn normalize_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncates on a char boundary, appending an ellipsis when anything was cut.
pub fn truncate_chars(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    let mut out: String = value.chars().take(max_chars).collect();
    out.push('…');
    out
}

pub fn char_len(value: &str) -> usize {
    value.chars().count()
}

pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Compiles `pattern` once per call site. Patterns are literals, so a
/// compile failure only ever disables the caller's match.
pub fn cached_regex(
    cell: &'static OnceLock<Option<Regex>>,
    pattern: &str,
) -> Option<&'static Regex> {
    cell.get_or_init(|| Regex::new(pattern).ok()).as_ref()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_and_truncates() {
        assert_eq!(normalize_whitespace("  Save \n\t changes "), "Save changes");
        assert_eq!(truncate_chars("héllo wörld", 5), "héllo…");
        assert_eq!(truncate_chars("short", 10), "short");
        assert!(contains_ignore_case("Sign In", "sign in"));
    }
}
