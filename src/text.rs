//! Text cleanup shared by the page backends and the field parser.

/// Collapse runs of whitespace (including newlines and NBSP) to one space and trim.
pub fn normalize_ws(s: &str) -> String {
    s.split(char::is_whitespace)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
