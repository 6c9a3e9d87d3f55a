//! POSIX shell quoting for values embedded in command strings.

fn is_safe(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || "@%+=:,./_-".contains(ch)
}

/// Quote `s` so that `sh` reads it back as exactly one word.
///
/// Plain words pass through unchanged; everything else is single-quoted
/// with embedded `'` rendered as `'"'"'`.
pub fn quote(s: &str) -> String {
    if s.is_empty() {
        "''".to_string()
    } else if s.chars().all(is_safe) {
        s.to_string()
    } else {
        format!("'{}'", s.replace('\'', "'\"'\"'"))
    }
}
