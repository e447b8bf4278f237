use std::fmt;

/// Which side of the conversation a message belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn heading(&self) -> &'static str {
        match self {
            Role::User => "## User",
            Role::Assistant => "## Assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// One converted message, ready for document assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageSection {
    pub role: Role,
    pub markdown: String,
}

/// Assemble the final export artifact: a title header followed by one
/// role-labelled section per message, each closed with a horizontal rule.
///
/// Sections with empty content are skipped so the document never carries an
/// orphan role heading.
pub fn build_export_document(title: &str, sections: &[MessageSection]) -> String {
    let mut doc = format!("# Conversation: {title}\n\n---\n\n");
    for section in sections {
        let content = section.markdown.trim();
        if content.is_empty() {
            continue;
        }
        doc.push_str(section.role.heading());
        doc.push_str("\n\n");
        doc.push_str(content);
        doc.push_str("\n\n---\n\n");
    }
    doc
}
