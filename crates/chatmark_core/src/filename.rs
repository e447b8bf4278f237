/// Name used when a conversation title sanitizes down to nothing.
pub const FALLBACK_TITLE: &str = "Chat_Export";

/// Filesystem-safe artifact name for a conversation title: `{sanitized}.md`.
pub fn artifact_filename(title: &str) -> String {
    format!("{}.md", sanitize_title(title))
}

/// Make a conversation title safe as a filename on common filesystems.
///
/// Characters forbidden on Windows (`< > : " / \ | ? *` plus control
/// characters) become `_`, whitespace runs collapse to a single space and the
/// result is trimmed. A title consisting of nothing but replacements falls
/// back to [`FALLBACK_TITLE`].
pub fn sanitize_title(input: &str) -> String {
    let mut cleaned = String::with_capacity(input.len());
    let mut pending_space = false;
    for c in input.chars() {
        if c.is_whitespace() {
            pending_space = !cleaned.is_empty();
            continue;
        }
        if pending_space {
            cleaned.push(' ');
            pending_space = false;
        }
        cleaned.push(if is_forbidden(c) { '_' } else { c });
    }

    if cleaned.chars().all(|c| c == '_' || c == ' ') {
        return FALLBACK_TITLE.to_string();
    }
    if is_reserved_windows_name(&cleaned) {
        cleaned.push('_');
    }
    cleaned
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0'..='\u{1F}'
    )
}

fn is_reserved_windows_name(name: &str) -> bool {
    const RESERVED: &[&str] = &[
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(name))
}
