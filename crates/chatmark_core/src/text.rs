/// Collapse runs of three or more newlines down to exactly two.
pub fn collapse_blank_runs(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut newline_run = 0usize;
    for ch in text.chars() {
        if ch == '\n' {
            newline_run += 1;
            if newline_run <= 2 {
                out.push(ch);
            }
        } else {
            newline_run = 0;
            out.push(ch);
        }
    }
    out
}

/// Final whitespace pass on converted output: blank-run collapse plus a trim
/// of the whole string.
pub fn normalize_markdown(text: &str) -> String {
    collapse_blank_runs(text).trim().to_string()
}

/// Strip leading whitespace from every line. User bubbles render with
/// indentation artifacts that would otherwise read as Markdown code blocks.
pub fn strip_line_indent(text: &str) -> String {
    text.split('\n')
        .map(str::trim_start)
        .collect::<Vec<_>>()
        .join("\n")
}
