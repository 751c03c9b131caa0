//! Cleanup listener: closes download tabs once they finish loading.
//!
//! The listener is a long-lived task fed by the host's tab update stream. It
//! is owned by a [`CleanupSubscription`] and lives until that is shut down or
//! dropped, which callers do at the extension's unload boundary.

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use url::Url;

use crate::config::CleanupScope;
use crate::host::{HostError, TabHost, TabId, TabUpdate};
use crate::tracked::TrackedTabs;

/// Decides which tab updates lead to a tab being closed.
#[derive(Debug, Clone)]
pub struct CleanupRule {
    server_base: String,
    scope: CleanupScope,
}

impl CleanupRule {
    pub fn new(server_base: &Url, scope: CleanupScope) -> Self {
        Self {
            server_base: server_base.as_str().to_string(),
            scope,
        }
    }

    pub fn scope(&self) -> CleanupScope {
        self.scope
    }

    /// True if the tab finished loading and its URL contains the server address.
    ///
    /// This holds for tabs opened by anyone, e.g. a user visiting the server
    /// by hand. In `TrackedOnly` scope the listener additionally claims the
    /// tab from [`TrackedTabs`].
    pub fn matches(&self, update: &TabUpdate) -> bool {
        update.is_complete()
            && update
                .tab
                .url
                .as_deref()
                .is_some_and(|url| url.contains(&self.server_base))
    }
}

/// Handle to the running cleanup listener. Dropping it stops the listener.
pub struct CleanupSubscription {
    handle: Option<JoinHandle<()>>,
}

impl CleanupSubscription {
    /// Subscribes to `host`'s tab updates and starts the listener task.
    ///
    /// Fails if the host's update stream was already taken.
    pub fn spawn<H>(
        host: Arc<H>,
        rule: CleanupRule,
        tracked: Arc<TrackedTabs>,
    ) -> Result<Self, HostError>
    where
        H: TabHost + ?Sized + 'static,
    {
        let updates = host.subscribe_updates()?;
        tracing::debug!(scope = ?rule.scope(), "cleanup listener subscribed");
        let handle = tokio::spawn(run_cleanup(host, updates, rule, tracked));
        Ok(Self {
            handle: Some(handle),
        })
    }

    /// True once the update stream has ended or the task was stopped.
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, |h| h.is_finished())
    }

    /// Stops the listener and waits for the task to go away.
    pub async fn shutdown(mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            let _ = handle.await;
            tracing::debug!("cleanup listener stopped");
        }
    }
}

impl Drop for CleanupSubscription {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

async fn run_cleanup<H>(
    host: Arc<H>,
    mut updates: UnboundedReceiver<TabUpdate>,
    rule: CleanupRule,
    tracked: Arc<TrackedTabs>,
) where
    H: TabHost + ?Sized,
{
    loop {
        tokio::select! {
            update = updates.recv() => {
                let Some(update) = update else { break };
                if !rule.matches(&update) {
                    continue;
                }
                match rule.scope() {
                    CleanupScope::AnyMatching => {
                        tracked.forget(update.tab_id);
                    }
                    CleanupScope::TrackedOnly => {
                        if !tracked.claim_or_park(update.tab_id) {
                            continue;
                        }
                    }
                }
                close_tab(&*host, update.tab_id).await;
            }
            _ = tracked.ready() => {
                for tab in tracked.take_ready() {
                    close_tab(&*host, tab).await;
                }
            }
        }
    }
    tracing::debug!("tab update stream ended");
}

async fn close_tab<H>(host: &H, tab: TabId)
where
    H: TabHost + ?Sized,
{
    match host.remove_tab(tab).await {
        Ok(()) => tracing::debug!(%tab, "closed download tab"),
        Err(e) => tracing::warn!(%tab, "closing download tab failed: {}", e),
    }
}
