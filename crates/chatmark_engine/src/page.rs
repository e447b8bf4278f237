use async_trait::async_trait;

use crate::types::PageError;

/// Handle on the scrollable container that lazily renders chat history.
///
/// All operations are best-effort: a driver that loses the container should
/// report a frozen extent rather than fail, which the recovery loop reads as
/// convergence.
#[async_trait]
pub trait ScrollRegion: Send + Sync {
    /// Total scrollable extent of the container.
    async fn extent(&self) -> u64;
    /// Move the scroll offset to the origin, toward the oldest content.
    async fn reset_to_origin(&self);
    /// Emit a synthetic wheel gesture so the page's lazy-load listener fires.
    async fn nudge(&self);
}

/// The live-page surface the exporter reads from.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Host name of the page, used for platform detection.
    fn host(&self) -> &str;
    /// The history scroll container, when the page exposes one.
    fn scroll_region(&self) -> Option<&dyn ScrollRegion>;
    /// Current document markup.
    async fn snapshot(&self) -> Result<String, PageError>;
}

/// Driver over a saved page snapshot. No scroll region: history recovery is
/// a no-op and the snapshot is served as-is.
#[derive(Debug, Clone)]
pub struct ReplayPage {
    host: String,
    html: String,
}

impl ReplayPage {
    pub fn new(host: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            html: html.into(),
        }
    }
}

#[async_trait]
impl PageDriver for ReplayPage {
    fn host(&self) -> &str {
        &self.host
    }

    fn scroll_region(&self) -> Option<&dyn ScrollRegion> {
        None
    }

    async fn snapshot(&self) -> Result<String, PageError> {
        Ok(self.html.clone())
    }
}
