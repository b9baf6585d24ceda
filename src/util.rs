/// Truncate `s` to at most `max_chars` characters, appending `...` when cut.
pub fn truncate_with_ellipsis(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

/// Shorten a session id for log output (first 20 chars + `...`).
pub fn sanitize_session_id(session_id: &str) -> String {
    if session_id.is_empty() {
        return "unknown".to_string();
    }
    truncate_with_ellipsis(session_id, 20)
}
