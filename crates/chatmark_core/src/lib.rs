//! Chatmark core: pure export logic with no DOM, no IO and no async.
mod document;
mod filename;
mod recovery;
mod text;

pub use document::{build_export_document, MessageSection, Role};
pub use filename::{artifact_filename, sanitize_title, FALLBACK_TITLE};
pub use recovery::{RecoveryDecision, RecoveryPolicy, RecoverySettings, StopReason};
pub use text::{collapse_blank_runs, normalize_markdown, strip_line_indent};
