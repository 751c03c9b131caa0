//! Native-messaging host manifest, the JSON file the browser reads to find `ytdt bridge`.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Name the extension uses in `chrome.runtime.connectNative`.
pub const NATIVE_HOST_NAME: &str = "ytdt.download_trigger";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostManifest {
    pub name: String,
    pub description: String,
    /// Absolute path of the host executable.
    pub path: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub allowed_origins: Vec<String>,
}

impl HostManifest {
    /// Manifest allowing exactly one extension to launch `exe`.
    ///
    /// The browser starts the host with the caller's origin as the only
    /// argument; see [`is_browser_launch`].
    pub fn for_extension(extension_id: &str, exe: &Path) -> Self {
        Self {
            name: NATIVE_HOST_NAME.to_string(),
            description: "ytdt: dispatches YouTube downloads to the download server".to_string(),
            path: exe.display().to_string(),
            kind: "stdio".to_string(),
            allowed_origins: vec![format!("chrome-extension://{}/", extension_id.trim())],
        }
    }
}

/// True if `first_arg` is what a browser passes when it launches a native host.
pub fn is_browser_launch(first_arg: &str) -> bool {
    first_arg.starts_with("chrome-extension://")
}

/// Extension ids are 32 characters in `a`..=`p`.
pub fn is_valid_extension_id(id: &str) -> bool {
    id.len() == 32 && id.bytes().all(|b| (b'a'..=b'p').contains(&b))
}
