//! In-process simulated browser.
//!
//! Keeps a tab list, an active tab and an update stream. Navigation only
//! advances when the caller says so ([`MemoryBrowser::finish_loading`]), which
//! makes trigger/cleanup ordering deterministic for dry runs and tests.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::Notify;

use super::{ChangeInfo, HostError, TabHost, TabId, TabInfo, TabStatus, TabUpdate};

/// Snapshot of one simulated tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryTab {
    pub id: TabId,
    pub url: String,
    pub status: TabStatus,
    /// True for tabs opened through [`TabHost::create_tab`].
    pub opened_by_host_call: bool,
}

#[derive(Default)]
struct BrowserState {
    tabs: BTreeMap<TabId, MemoryTab>,
    active: Option<TabId>,
    next_id: i64,
    updates_tx: Option<UnboundedSender<TabUpdate>>,
    subscribed: bool,
    removed: Vec<TabId>,
}

impl BrowserState {
    fn emit(&self, update: TabUpdate) {
        if let Some(tx) = &self.updates_tx {
            // Events before a subscription exists are dropped, as a browser would.
            let _ = tx.send(update);
        }
    }

    fn open(&mut self, url: &str, opened_by_host_call: bool) -> TabId {
        self.next_id += 1;
        let id = TabId(self.next_id);
        self.tabs.insert(
            id,
            MemoryTab {
                id,
                url: url.to_string(),
                status: TabStatus::Loading,
                opened_by_host_call,
            },
        );
        self.emit(TabUpdate {
            tab_id: id,
            change: ChangeInfo {
                status: Some(TabStatus::Loading),
                url: Some(url.to_string()),
            },
            tab: TabInfo {
                id: Some(id),
                url: Some(url.to_string()),
            },
        });
        id
    }
}

/// Simulated browser implementing [`TabHost`].
#[derive(Default)]
pub struct MemoryBrowser {
    state: Mutex<BrowserState>,
    removed_notify: Notify,
}

impl MemoryBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Browser with one tab at `url`, focused.
    pub fn with_active_tab(url: &str) -> Self {
        let browser = Self::new();
        let id = browser.open_tab(url);
        browser.state.lock().unwrap().active = Some(id);
        browser
    }

    /// Opens a tab as if the user did it. It does not take focus.
    pub fn open_tab(&self, url: &str) -> TabId {
        self.state.lock().unwrap().open(url, false)
    }

    /// Focuses an existing tab.
    pub fn activate(&self, tab: TabId) -> Result<(), HostError> {
        let mut state = self.state.lock().unwrap();
        if !state.tabs.contains_key(&tab) {
            return Err(HostError::NoSuchTab(tab));
        }
        state.active = Some(tab);
        Ok(())
    }

    /// Marks the tab loaded and emits a `complete` update.
    pub fn finish_loading(&self, tab: TabId) -> Result<(), HostError> {
        let mut state = self.state.lock().unwrap();
        let entry = state.tabs.get_mut(&tab).ok_or(HostError::NoSuchTab(tab))?;
        entry.status = TabStatus::Complete;
        let url = entry.url.clone();
        state.emit(TabUpdate {
            tab_id: tab,
            change: ChangeInfo {
                status: Some(TabStatus::Complete),
                url: None,
            },
            tab: TabInfo {
                id: Some(tab),
                url: Some(url),
            },
        });
        Ok(())
    }

    pub fn tab(&self, tab: TabId) -> Option<MemoryTab> {
        self.state.lock().unwrap().tabs.get(&tab).cloned()
    }

    /// Open tabs in creation order.
    pub fn tabs(&self) -> Vec<MemoryTab> {
        self.state.lock().unwrap().tabs.values().cloned().collect()
    }

    /// Still-open tabs that were created through [`TabHost::create_tab`].
    pub fn host_opened_tabs(&self) -> Vec<MemoryTab> {
        self.tabs()
            .into_iter()
            .filter(|t| t.opened_by_host_call)
            .collect()
    }

    /// Every successful `remove_tab`, in order.
    pub fn removed(&self) -> Vec<TabId> {
        self.state.lock().unwrap().removed.clone()
    }

    /// Waits until `tab` has been removed through [`TabHost::remove_tab`].
    pub async fn wait_removed(&self, tab: TabId) {
        loop {
            let notified = self.removed_notify.notified();
            if self.state.lock().unwrap().removed.contains(&tab) {
                return;
            }
            notified.await;
        }
    }
}

#[async_trait]
impl TabHost for MemoryBrowser {
    async fn query_active_tab(&self) -> Result<TabInfo, HostError> {
        let state = self.state.lock().unwrap();
        let id = state.active.ok_or(HostError::NoActiveTab)?;
        let tab = state.tabs.get(&id).ok_or(HostError::NoActiveTab)?;
        Ok(TabInfo {
            id: Some(id),
            url: Some(tab.url.clone()),
        })
    }

    async fn create_tab(&self, url: &str, active: bool) -> Result<TabId, HostError> {
        let mut state = self.state.lock().unwrap();
        let id = state.open(url, true);
        if active {
            state.active = Some(id);
        }
        Ok(id)
    }

    async fn remove_tab(&self, tab: TabId) -> Result<(), HostError> {
        {
            let mut state = self.state.lock().unwrap();
            if state.tabs.remove(&tab).is_none() {
                return Err(HostError::NoSuchTab(tab));
            }
            if state.active == Some(tab) {
                state.active = None;
            }
            state.removed.push(tab);
        }
        self.removed_notify.notify_waiters();
        Ok(())
    }

    fn subscribe_updates(&self) -> Result<UnboundedReceiver<TabUpdate>, HostError> {
        let mut state = self.state.lock().unwrap();
        if state.subscribed {
            return Err(HostError::AlreadySubscribed);
        }
        let (tx, rx) = mpsc::unbounded_channel();
        state.updates_tx = Some(tx);
        state.subscribed = true;
        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn active_tab_and_background_create() {
        let browser = MemoryBrowser::with_active_tab("https://www.youtube.com/watch?v=a");
        let created = browser.create_tab("http://h/download", false).await.unwrap();

        let active = browser.query_active_tab().await.unwrap();
        assert_eq!(active.url.as_deref(), Some("https://www.youtube.com/watch?v=a"));
        assert_ne!(active.id, Some(created));
        assert_eq!(browser.host_opened_tabs().len(), 1);
        assert_eq!(browser.tab(created).unwrap().status, TabStatus::Loading);
    }

    #[tokio::test]
    async fn updates_flow_after_subscribe() {
        let browser = MemoryBrowser::new();
        browser.open_tab("https://before.example");
        let mut rx = browser.subscribe_updates().unwrap();
        let tab = browser.create_tab("https://after.example", false).await.unwrap();
        browser.finish_loading(tab).unwrap();

        let loading = rx.recv().await.unwrap();
        assert_eq!(loading.tab_id, tab);
        assert_eq!(loading.change.status, Some(TabStatus::Loading));
        let complete = rx.recv().await.unwrap();
        assert!(complete.is_complete());
        assert_eq!(complete.tab.url.as_deref(), Some("https://after.example"));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn subscription_is_not_restartable() {
        let browser = MemoryBrowser::new();
        let _rx = browser.subscribe_updates().unwrap();
        assert!(matches!(
            browser.subscribe_updates(),
            Err(HostError::AlreadySubscribed)
        ));
    }

    #[tokio::test]
    async fn remove_unknown_tab_fails() {
        let browser = MemoryBrowser::with_active_tab("https://a.example");
        let active = browser.query_active_tab().await.unwrap().id.unwrap();
        browser.remove_tab(active).await.unwrap();
        assert!(matches!(
            browser.remove_tab(active).await,
            Err(HostError::NoSuchTab(_))
        ));
        assert!(matches!(
            browser.query_active_tab().await,
            Err(HostError::NoActiveTab)
        ));
        assert_eq!(browser.removed(), vec![active]);
    }
}
