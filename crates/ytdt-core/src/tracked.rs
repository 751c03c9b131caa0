//! Registry of tabs the dispatcher opened.
//!
//! The dispatcher records each tab handle it gets back from `create_tab`; the
//! cleanup listener consults the registry when running in `tracked_only` scope.
//!
//! A download tab can finish loading before its handle is recorded: the
//! `complete` event and the `create_tab` reply travel on different paths. The
//! listener therefore parks completed server tabs it does not know yet, and
//! recording such a tab later hands it back through [`TrackedTabs::take_ready`].

use std::collections::{HashSet, VecDeque};
use std::sync::RwLock;

use tokio::sync::Notify;

use crate::host::TabId;

/// Completed-but-unknown tabs kept around; user-opened server tabs end up
/// here too, so the list is bounded and the oldest entries fall off.
const MAX_PARKED: usize = 256;

#[derive(Debug, Default)]
struct Registry {
    tabs: HashSet<TabId>,
    parked: VecDeque<TabId>,
    ready: Vec<TabId>,
}

#[derive(Debug, Default)]
pub struct TrackedTabs {
    inner: RwLock<Registry>,
    ready_notify: Notify,
}

impl TrackedTabs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a tab opened by a dispatch.
    ///
    /// If the tab already finished loading, it is queued for the cleanup
    /// listener instead.
    pub fn track(&self, tab: TabId) {
        let mut reg = self.inner.write().unwrap();
        if let Some(pos) = reg.parked.iter().position(|t| *t == tab) {
            reg.parked.remove(pos);
            reg.ready.push(tab);
            drop(reg);
            tracing::debug!(%tab, "tab completed before it was tracked; queued for cleanup");
            self.ready_notify.notify_one();
            return;
        }
        reg.tabs.insert(tab);
    }

    pub fn is_tracked(&self, tab: TabId) -> bool {
        self.inner.read().unwrap().tabs.contains(&tab)
    }

    /// Called for a completed tab on the server. Returns true, and stops
    /// tracking the tab, if it is ours; otherwise parks it until [`track`]
    /// claims it.
    ///
    /// [`track`]: TrackedTabs::track
    pub fn claim_or_park(&self, tab: TabId) -> bool {
        let mut reg = self.inner.write().unwrap();
        if reg.tabs.remove(&tab) {
            return true;
        }
        if !reg.parked.contains(&tab) {
            if reg.parked.len() == MAX_PARKED {
                reg.parked.pop_front();
            }
            reg.parked.push_back(tab);
        }
        false
    }

    /// Stops tracking `tab`. Returns false if it was not tracked.
    pub fn forget(&self, tab: TabId) -> bool {
        self.inner.write().unwrap().tabs.remove(&tab)
    }

    /// Waits until [`take_ready`](TrackedTabs::take_ready) has something.
    pub async fn ready(&self) {
        self.ready_notify.notified().await;
    }

    /// Tracked tabs that completed before they were tracked.
    pub fn take_ready(&self) -> Vec<TabId> {
        std::mem::take(&mut self.inner.write().unwrap().ready)
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap().tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn track_and_claim() {
        let tracked = TrackedTabs::new();
        assert!(tracked.is_empty());
        tracked.track(TabId(4));
        tracked.track(TabId(4));
        assert_eq!(tracked.len(), 1);
        assert!(tracked.is_tracked(TabId(4)));
        assert!(!tracked.is_tracked(TabId(5)));

        assert!(tracked.claim_or_park(TabId(4)));
        // Claimed once; a second complete event does not close it again.
        assert!(!tracked.claim_or_park(TabId(4)));
        assert!(tracked.is_empty());

        tracked.track(TabId(6));
        assert!(tracked.forget(TabId(6)));
        assert!(!tracked.forget(TabId(6)));
    }

    #[tokio::test]
    async fn completed_before_tracked_is_handed_back() {
        let tracked = TrackedTabs::new();
        assert!(!tracked.claim_or_park(TabId(55)));
        assert!(tracked.take_ready().is_empty());

        tracked.track(TabId(55));
        tokio::time::timeout(std::time::Duration::from_secs(1), tracked.ready())
            .await
            .expect("ready signalled");
        assert_eq!(tracked.take_ready(), vec![TabId(55)]);
        assert!(!tracked.is_tracked(TabId(55)));
        assert!(tracked.take_ready().is_empty());
    }

    #[test]
    fn parked_tabs_are_bounded() {
        let tracked = TrackedTabs::new();
        for id in 0..(MAX_PARKED as i64 + 1) {
            assert!(!tracked.claim_or_park(TabId(id)));
        }
        // The oldest entry fell off, so tracking it later is a plain track.
        tracked.track(TabId(0));
        assert!(tracked.is_tracked(TabId(0)));
        tracked.track(TabId(1));
        assert_eq!(tracked.take_ready(), vec![TabId(1)]);
    }
}
