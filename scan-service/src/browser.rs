use alert_core::{BrowserError, CoreError, MatchRecord, ScanRequest, ScanResponse, TabId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A browser tab as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabInfo {
    pub id: TabId,
    pub url: String,
}

impl TabInfo {
    pub fn new(id: TabId, url: impl Into<String>) -> Self {
        Self {
            id,
            url: url.into(),
        }
    }
}

/// Browser capabilities the orchestrator drives.
///
/// Implementations bridge to the real browser (extension messaging, a
/// devtools connection, ...). None of these calls carry their own timeout;
/// the orchestrator bounds `send_scan` itself.
#[async_trait]
pub trait BrowserHost: Send + Sync {
    async fn query_tabs(&self) -> Result<Vec<TabInfo>, CoreError>;

    /// Asks the page scanner in `tab_id` to scan with `request`.
    async fn send_scan(
        &self,
        tab_id: TabId,
        request: &ScanRequest,
    ) -> Result<ScanResponse, CoreError>;

    /// Opens `url` in a background tab and returns its id.
    async fn open_tab(&self, url: &str) -> Result<TabId, CoreError>;

    async fn close_tab(&self, tab_id: TabId) -> Result<(), CoreError>;

    async fn reload_tab(&self, tab_id: TabId) -> Result<(), CoreError>;
}

/// Typed result of one page-scan request.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanOutcome {
    Matches(Vec<MatchRecord>),
    Empty,
    Failed(BrowserError),
    TimedOut,
    Cancelled,
}

impl ScanOutcome {
    /// Interprets a page scanner reply. Records are clamped on the way in.
    pub fn from_response(tab_id: TabId, response: ScanResponse) -> Self {
        if let Some(reason) = response.error.filter(|e| !e.trim().is_empty()) {
            return ScanOutcome::Failed(BrowserError::ScanFailed { tab_id, reason });
        }
        if response.matches.is_empty() {
            return ScanOutcome::Empty;
        }
        ScanOutcome::Matches(
            response
                .matches
                .into_iter()
                .map(MatchRecord::clamped)
                .collect(),
        )
    }

    /// A request that never got a reply. Host errors that are not already
    /// browser errors count as a closed channel.
    pub fn from_error(tab_id: TabId, error: CoreError) -> Self {
        match error {
            CoreError::Browser(e) => ScanOutcome::Failed(e),
            other => ScanOutcome::Failed(BrowserError::ChannelClosed {
                tab_id,
                reason: other.to_string(),
            }),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ScanOutcome::Matches(_) => "matches",
            ScanOutcome::Empty => "empty",
            ScanOutcome::Failed(_) => "failed",
            ScanOutcome::TimedOut => "timed out",
            ScanOutcome::Cancelled => "cancelled",
        }
    }
}
