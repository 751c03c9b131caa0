//! Message schema exchanged with the extension.
//!
//! Every message is a JSON object tagged by `"type"`. The extension sends
//! triggers, tab update events and replies; ytdt sends host calls.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::host::{TabId, TabUpdate};
use crate::request::DownloadOptions;

/// Extension → ytdt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Inbound {
    /// The user pressed the download button.
    Trigger {
        #[serde(default)]
        options: DownloadOptions,
    },
    /// Forwarded tab update event.
    TabUpdated(TabUpdate),
    /// Result of an earlier [`HostCall`]. Exactly one of `result`/`error` is meaningful.
    Reply {
        id: u64,
        #[serde(default)]
        result: Option<Value>,
        #[serde(default)]
        error: Option<String>,
    },
    /// The extension is going away; end the session.
    Unload,
}

/// ytdt → extension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outbound {
    Call {
        id: u64,
        #[serde(flatten)]
        call: HostCall,
    },
}

/// Browser capability the extension should invoke on ytdt's behalf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum HostCall {
    /// Reply: array of tab descriptors (the active tab of the current window).
    QueryActiveTab,
    /// Reply: the created tab descriptor.
    CreateTab { url: String, active: bool },
    /// Reply: anything; only success or error matters.
    RemoveTab { tab_id: TabId },
}

impl HostCall {
    pub fn method(&self) -> &'static str {
        match self {
            HostCall::QueryActiveTab => "query_active_tab",
            HostCall::CreateTab { .. } => "create_tab",
            HostCall::RemoveTab { .. } => "remove_tab",
        }
    }
}
