use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

use crate::request::{parse_server_base, ServerBaseError};
use crate::video_url::DEFAULT_VIDEO_HOST;

/// Download server the trigger talks to unless configured otherwise.
pub const DEFAULT_SERVER_BASE: &str = "http://192.168.1.121:8908";

/// Which completed tabs the cleanup listener closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanupScope {
    /// Any tab whose URL contains the server address, whoever opened it.
    #[default]
    AnyMatching,
    /// Only tabs this process opened through a dispatch.
    TrackedOnly,
}

/// Global configuration loaded from `~/.config/ytdt/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YtdtConfig {
    /// Base address of the download server, e.g. `http://host:port`.
    pub server_base: String,
    /// Substring the active tab's origin must contain.
    #[serde(default = "default_video_host")]
    pub video_host: String,
    /// Cleanup scope: "any_matching" (default) or "tracked_only".
    #[serde(default)]
    pub cleanup: CleanupScope,
}

fn default_video_host() -> String {
    DEFAULT_VIDEO_HOST.to_string()
}

impl Default for YtdtConfig {
    fn default() -> Self {
        Self {
            server_base: DEFAULT_SERVER_BASE.to_string(),
            video_host: default_video_host(),
            cleanup: CleanupScope::default(),
        }
    }
}

impl YtdtConfig {
    /// The server address as a URL, checked for an http(s) scheme.
    pub fn server_base_url(&self) -> Result<Url, ServerBaseError> {
        parse_server_base(&self.server_base)
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("ytdt")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<YtdtConfig> {
    load_or_init_at(&config_path()?)
}

/// Like [`load_or_init`] but for an explicit path.
pub fn load_or_init_at(path: &Path) -> Result<YtdtConfig> {
    if !path.exists() {
        let default_cfg = YtdtConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml).with_context(|| format!("write {}", path.display()))?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: YtdtConfig =
        toml::from_str(&data).with_context(|| format!("parse {}", path.display()))?;
    cfg.server_base_url()
        .with_context(|| format!("server_base in {}", path.display()))?;
    Ok(cfg)
}
