//! Request dispatcher: turns a trigger into a background tab on the download server.
//!
//! Opening a tab instead of issuing an HTTP request from the extension keeps
//! the request clear of cross-origin restrictions; the server sees a plain GET.

use std::sync::Arc;

use url::Url;

use crate::config::YtdtConfig;
use crate::host::{HostError, TabHost, TabId};
use crate::request::{DownloadOptions, DownloadRequest, ServerBaseError};
use crate::tracked::TrackedTabs;
use crate::video_url::{inspect_page, SkipReason};

/// What a trigger did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A background tab was opened on `url`.
    Dispatched { tab: TabId, url: Url },
    /// Nothing was done.
    Skipped(SkipReason),
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Host(#[from] HostError),
    #[error(transparent)]
    ServerBase(#[from] ServerBaseError),
}

pub struct Dispatcher<H: ?Sized> {
    host: Arc<H>,
    server_base: Url,
    video_host: String,
    tracked: Arc<TrackedTabs>,
}

impl<H: TabHost + ?Sized> Dispatcher<H> {
    pub fn new(host: Arc<H>, cfg: &YtdtConfig) -> Result<Self, DispatchError> {
        Ok(Self {
            host,
            server_base: cfg.server_base_url()?,
            video_host: cfg.video_host.clone(),
            tracked: Arc::new(TrackedTabs::new()),
        })
    }

    pub fn server_base(&self) -> &Url {
        &self.server_base
    }

    /// Tabs this dispatcher has opened and not yet seen closed.
    pub fn tracked(&self) -> Arc<TrackedTabs> {
        Arc::clone(&self.tracked)
    }

    /// Handles one user trigger.
    ///
    /// Reads the active tab; if it is a video page, opens the dispatch URL in a
    /// non-focused tab. Pages that are not video pages are skipped silently.
    /// Host failures are returned as-is; nothing is retried.
    pub async fn trigger(&self, options: DownloadOptions) -> Result<DispatchOutcome, DispatchError> {
        let active = self.host.query_active_tab().await?;

        let video_id = match inspect_page(active.url.as_deref(), &self.video_host) {
            Ok(id) => id,
            Err(reason) => {
                tracing::debug!(%reason, "trigger skipped");
                return Ok(DispatchOutcome::Skipped(reason));
            }
        };

        let request = DownloadRequest::new(video_id, options);
        let url = request.dispatch_url(&self.server_base);
        let tab = self.host.create_tab(url.as_str(), false).await?;
        self.tracked.track(tab);

        tracing::info!(
            tab = %tab,
            video_id = %request.video_id,
            "dispatched {}",
            url
        );
        Ok(DispatchOutcome::Dispatched { tab, url })
    }
}
