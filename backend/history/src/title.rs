/// Fallback title when nothing usable is left after sanitizing.
pub const DEFAULT_TITLE: &str = "session";

/// Make a session title safe for use in a file name.
///
/// Every character that is not alphanumeric, `-` or `_` becomes `-`, then
/// leading and trailing `-` are trimmed. An empty result becomes `"session"`.
pub fn sanitize_title(title: &str) -> String {
    let replaced: String = title
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect();

    let trimmed = replaced.trim_matches('-');
    if trimmed.is_empty() {
        DEFAULT_TITLE.to_string()
    } else {
        trimmed.to_string()
    }
}
