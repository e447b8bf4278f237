use chatmark_core::Role;
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;

use crate::types::ExportError;

/// The closed set of supported chat front-ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    ChatGpt,
    Gemini,
}

impl Platform {
    /// Classify a page by its host name.
    pub fn from_host(host: &str) -> Option<Platform> {
        let host = host.to_ascii_lowercase();
        if host.contains("chatgpt") {
            Some(Platform::ChatGpt)
        } else if host.contains("gemini") {
            Some(Platform::Gemini)
        } else {
            None
        }
    }

    /// Classify a page by its full URL.
    pub fn from_page_url(page_url: &str) -> Option<Platform> {
        let parsed = url::Url::parse(page_url).ok()?;
        parsed.host_str().and_then(Platform::from_host)
    }
}

/// How a matched message element maps to user vs assistant.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RoleRule {
    /// The turn is the user's when `attr` equals `value`.
    AttributeEquals { attr: String, value: String },
    /// The turn is the user's when the element's tag or one of its classes
    /// matches.
    TagOrClass { tags: Vec<String>, classes: Vec<String> },
}

impl RoleRule {
    pub fn classify(&self, element: ElementRef<'_>) -> Role {
        let is_user = match self {
            RoleRule::AttributeEquals { attr, value } => {
                element.value().attr(attr) == Some(value.as_str())
            }
            RoleRule::TagOrClass { tags, classes } => {
                let tag = element.value().name();
                tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
                    || element
                        .value()
                        .classes()
                        .any(|c| classes.iter().any(|wanted| wanted == c))
            }
        };
        if is_user {
            Role::User
        } else {
            Role::Assistant
        }
    }
}

/// Per-platform selector glue: pure configuration data, external to the
/// converter and the loader. A custom profile can be supplied as JSON.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PlatformProfile {
    /// Selectors tried in order for the sidebar conversation title.
    pub title_selectors: Vec<String>,
    /// Affixes stripped from the document `<title>` fallback.
    pub title_affixes: Vec<String>,
    /// Selectors tried in order for the lazy-loading scroll container.
    /// Consumed by live-page drivers; replay drivers ignore them.
    pub scroller_selectors: Vec<String>,
    /// Selector list matching one element per conversational turn.
    pub message_selector: String,
    /// Role classification for matched messages.
    pub role_rule: RoleRule,
}

impl PlatformProfile {
    pub fn builtin(platform: Platform) -> Self {
        match platform {
            Platform::ChatGpt => Self {
                title_selectors: vec![
                    r#"nav li div[aria-current="page"]"#.to_string(),
                    r#"nav li div[class*="bg-token-sidebar"]"#.to_string(),
                ],
                title_affixes: vec!["ChatGPT".to_string()],
                scroller_selectors: vec![
                    r#"div[class*="react-scroll-to-bottom"] > div"#.to_string(),
                    "main div.overflow-y-auto".to_string(),
                ],
                message_selector: "div[data-message-id], article".to_string(),
                role_rule: RoleRule::AttributeEquals {
                    attr: "data-message-author-role".to_string(),
                    value: "user".to_string(),
                },
            },
            Platform::Gemini => Self {
                title_selectors: vec![
                    "conversations-list .selected .conversation-title".to_string(),
                    "conversations-list div.selected".to_string(),
                ],
                title_affixes: vec!["Gemini".to_string()],
                scroller_selectors: vec![
                    "infinite-scroller.chat-history".to_string(),
                    "main mat-sidenav-content".to_string(),
                ],
                message_selector: "user-query, model-response, .question-block, ucs-summary"
                    .to_string(),
                role_rule: RoleRule::TagOrClass {
                    tags: vec!["user-query".to_string()],
                    classes: vec!["question-block".to_string()],
                },
            },
        }
    }

    /// Deserialize a custom profile, e.g. to point the exporter at a chat
    /// layout the builtins do not cover.
    pub fn from_json(json: &str) -> Result<Self, ExportError> {
        serde_json::from_str(json).map_err(|e| ExportError::InvalidProfile(e.to_string()))
    }

    /// Resolve the conversation title: platform selectors first, then the
    /// document `<title>` with platform affixes stripped. Titles shorter than
    /// two characters are treated as missing.
    pub fn locate_title(&self, doc: &Html) -> Option<String> {
        for raw in &self.title_selectors {
            let Ok(selector) = Selector::parse(raw) else {
                continue;
            };
            if let Some(node) = doc.select(&selector).next() {
                let text = collapse_text(node);
                if text.chars().count() >= 2 {
                    return Some(text);
                }
            }
        }

        let title_selector = Selector::parse("title").ok()?;
        let raw = collapse_text(doc.select(&title_selector).next()?);
        let trimmed = self.strip_affixes(&raw);
        (trimmed.chars().count() >= 2).then_some(trimmed)
    }

    /// Select all message containers in document order.
    pub fn select_messages<'a>(
        &self,
        doc: &'a Html,
    ) -> Result<Vec<ElementRef<'a>>, ExportError> {
        let selector = Selector::parse(&self.message_selector)
            .map_err(|e| ExportError::InvalidProfile(e.to_string()))?;
        Ok(doc.select(&selector).collect())
    }

    fn strip_affixes(&self, title: &str) -> String {
        let mut title = title.trim().to_string();
        for affix in &self.title_affixes {
            let suffix = format!(" - {affix}");
            let prefix = format!("{affix} - ");
            if ends_with_ignore_case(&title, &suffix) {
                title.truncate(title.len() - suffix.len());
            } else if starts_with_ignore_case(&title, &prefix) {
                title.drain(..prefix.len());
            }
        }
        title.trim().to_string()
    }
}

fn collapse_text(node: ElementRef<'_>) -> String {
    node.text().collect::<String>().trim().to_string()
}

fn ends_with_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.len() >= needle.len()
        && haystack.is_char_boundary(haystack.len() - needle.len())
        && haystack[haystack.len() - needle.len()..].eq_ignore_ascii_case(needle)
}

fn starts_with_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.len() >= needle.len()
        && haystack.is_char_boundary(needle.len())
        && haystack[..needle.len()].eq_ignore_ascii_case(needle)
}
