//! Browser host capability surface.
//!
//! The dispatcher never talks to a browser directly. It goes through
//! [`TabHost`], which covers exactly what the extension platform offers:
//! reading the active tab, opening and closing tabs, and a stream of tab
//! update events. [`crate::bridge::NativeHost`] implements it over a
//! native-messaging channel; [`memory::MemoryBrowser`] simulates it in-process.

pub mod memory;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedReceiver;

use crate::bridge::FrameError;

/// Opaque tab handle issued by the browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(pub i64);

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Subset of a browser tab descriptor. Unknown fields are ignored on decode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<TabId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Load status reported by tab update events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TabStatus {
    Loading,
    Complete,
}

/// What changed in a tab update event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TabStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// One tab update event: `(tab id, change descriptor, tab descriptor)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabUpdate {
    pub tab_id: TabId,
    #[serde(default)]
    pub change: ChangeInfo,
    #[serde(default)]
    pub tab: TabInfo,
}

impl TabUpdate {
    /// True once the tab has fully loaded.
    pub fn is_complete(&self) -> bool {
        self.change.status == Some(TabStatus::Complete)
    }
}

/// Failure of a host capability call.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("no active tab")]
    NoActiveTab,
    #[error("no tab with id {0}")]
    NoSuchTab(TabId),
    #[error("{method} rejected by browser: {message}")]
    Rejected { method: &'static str, message: String },
    #[error("{method} returned a tab without an id")]
    MissingTabId { method: &'static str },
    #[error("unexpected reply to {method}: {source}")]
    BadReply {
        method: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("cannot send {method}: {source}")]
    Encode {
        method: &'static str,
        #[source]
        source: FrameError,
    },
    #[error("tab updates are already subscribed")]
    AlreadySubscribed,
    #[error("browser disconnected")]
    Disconnected,
}

/// Capabilities the dispatcher needs from the browser.
#[async_trait]
pub trait TabHost: Send + Sync {
    /// Active tab of the current window.
    async fn query_active_tab(&self) -> Result<TabInfo, HostError>;

    /// Opens `url` in a new tab; `active = false` keeps focus where it is.
    async fn create_tab(&self, url: &str, active: bool) -> Result<TabId, HostError>;

    async fn remove_tab(&self, tab: TabId) -> Result<(), HostError>;

    /// Stream of tab update events for every tab. Can be taken only once.
    fn subscribe_updates(&self) -> Result<UnboundedReceiver<TabUpdate>, HostError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tab_update_decodes_browser_shape() {
        let json = r#"{
            "tab_id": 12,
            "change": {"status": "complete"},
            "tab": {"id": 12, "url": "http://h:8908/download?v=a", "active": false, "title": "x"}
        }"#;
        let update: TabUpdate = serde_json::from_str(json).unwrap();
        assert_eq!(update.tab_id, TabId(12));
        assert!(update.is_complete());
        assert_eq!(update.tab.url.as_deref(), Some("http://h:8908/download?v=a"));
    }

    #[test]
    fn tab_update_without_status_is_not_complete() {
        let update: TabUpdate =
            serde_json::from_str(r#"{"tab_id": 3, "change": {"url": "https://a"}}"#).unwrap();
        assert!(!update.is_complete());
        assert_eq!(update.tab, TabInfo::default());
    }

    #[test]
    fn unknown_status_is_rejected() {
        let err = serde_json::from_str::<ChangeInfo>(r#"{"status": "unloaded"}"#);
        assert!(err.is_err());
    }
}
