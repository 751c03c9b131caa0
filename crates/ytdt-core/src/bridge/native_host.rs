//! [`TabHost`] over the native-messaging channel.
//!
//! Each capability call is sent as a numbered [`HostCall`] and parked until the
//! extension replies with the same id. Tab update events arriving from the
//! extension are pushed into the single update stream.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::oneshot;

use super::frame::encode_message;
use super::message::{HostCall, Outbound};
use crate::host::{HostError, TabHost, TabId, TabInfo, TabUpdate};

type ReplyResult = Result<Option<Value>, String>;

pub struct NativeHost {
    /// Encoded frames for the writer task.
    outbound: UnboundedSender<Vec<u8>>,
    pending: Mutex<HashMap<u64, oneshot::Sender<ReplyResult>>>,
    next_id: AtomicU64,
    /// Set by `disconnect`; checked under the `pending` lock.
    closed: AtomicBool,
    updates_tx: UnboundedSender<TabUpdate>,
    updates_rx: Mutex<Option<UnboundedReceiver<TabUpdate>>>,
}

impl NativeHost {
    pub fn new(outbound: UnboundedSender<Vec<u8>>) -> Self {
        let (updates_tx, updates_rx) = mpsc::unbounded_channel();
        Self {
            outbound,
            pending: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            closed: AtomicBool::new(false),
            updates_tx,
            updates_rx: Mutex::new(Some(updates_rx)),
        }
    }

    async fn call(&self, call: HostCall) -> Result<Option<Value>, HostError> {
        let method = call.method();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let frame = encode_message(&Outbound::Call { id, call })
            .map_err(|source| HostError::Encode { method, source })?;

        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.pending.lock().unwrap();
            if self.closed.load(Ordering::Relaxed) {
                return Err(HostError::Disconnected);
            }
            pending.insert(id, tx);
        }
        if self.outbound.send(frame).is_err() {
            self.pending.lock().unwrap().remove(&id);
            return Err(HostError::Disconnected);
        }
        tracing::trace!(id, method, "host call sent");

        match rx.await {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(message)) => Err(HostError::Rejected { method, message }),
            Err(_) => Err(HostError::Disconnected),
        }
    }

    /// Completes the call `id`. Returns false if no such call is waiting.
    pub fn resolve_reply(&self, id: u64, result: Option<Value>, error: Option<String>) -> bool {
        let Some(tx) = self.pending.lock().unwrap().remove(&id) else {
            return false;
        };
        let reply = match error {
            Some(message) => Err(message),
            None => Ok(result),
        };
        // The caller may have gone away; nothing to do then.
        let _ = tx.send(reply);
        true
    }

    /// Feeds a tab update event from the extension into the update stream.
    pub fn deliver_update(&self, update: TabUpdate) {
        let _ = self.updates_tx.send(update);
    }

    /// Fails every outstanding and future call with [`HostError::Disconnected`].
    pub fn disconnect(&self) {
        let dropped = {
            let mut pending = self.pending.lock().unwrap();
            self.closed.store(true, Ordering::Relaxed);
            let n = pending.len();
            pending.clear();
            n
        };
        if dropped > 0 {
            tracing::debug!(dropped, "dropped pending host calls on disconnect");
        }
    }

    pub fn pending_calls(&self) -> usize {
        self.pending.lock().unwrap().len()
    }
}

fn decode<T: serde::de::DeserializeOwned>(
    method: &'static str,
    result: Option<Value>,
) -> Result<T, HostError> {
    serde_json::from_value(result.unwrap_or(Value::Null))
        .map_err(|source| HostError::BadReply { method, source })
}

#[async_trait]
impl TabHost for NativeHost {
    async fn query_active_tab(&self) -> Result<TabInfo, HostError> {
        let result = self.call(HostCall::QueryActiveTab).await?;
        let tabs: Vec<TabInfo> = decode("query_active_tab", result)?;
        tabs.into_iter().next().ok_or(HostError::NoActiveTab)
    }

    async fn create_tab(&self, url: &str, active: bool) -> Result<TabId, HostError> {
        let result = self
            .call(HostCall::CreateTab {
                url: url.to_string(),
                active,
            })
            .await?;
        let tab: TabInfo = decode("create_tab", result)?;
        tab.id.ok_or(HostError::MissingTabId {
            method: "create_tab",
        })
    }

    async fn remove_tab(&self, tab: TabId) -> Result<(), HostError> {
        self.call(HostCall::RemoveTab { tab_id: tab }).await?;
        Ok(())
    }

    fn subscribe_updates(&self) -> Result<UnboundedReceiver<TabUpdate>, HostError> {
        self.updates_rx
            .lock()
            .unwrap()
            .take()
            .ok_or(HostError::AlreadySubscribed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    fn sent(rx: &mut UnboundedReceiver<Vec<u8>>) -> Value {
        serde_json::from_slice(&rx.try_recv().expect("frame sent")).unwrap()
    }

    #[tokio::test]
    async fn create_tab_round_trip() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let host = Arc::new(NativeHost::new(tx));

        let h = Arc::clone(&host);
        let call = tokio::spawn(async move { h.create_tab("http://h/download?v=a", false).await });
        while host.pending_calls() == 0 {
            tokio::task::yield_now().await;
        }

        let frame = sent(&mut rx);
        assert_eq!(frame["method"], "create_tab");
        assert_eq!(frame["active"], false);
        let id = frame["id"].as_u64().unwrap();
        assert!(host.resolve_reply(id, Some(json!({"id": 77, "url": "http://h/download?v=a"})), None));

        assert_eq!(call.await.unwrap().unwrap(), TabId(77));
        assert_eq!(host.pending_calls(), 0);
    }

    #[tokio::test]
    async fn rejected_and_malformed_replies() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let host = Arc::new(NativeHost::new(tx));

        let h = Arc::clone(&host);
        let remove = tokio::spawn(async move { h.remove_tab(TabId(5)).await });
        while host.pending_calls() == 0 {
            tokio::task::yield_now().await;
        }
        let id = sent(&mut rx)["id"].as_u64().unwrap();
        host.resolve_reply(id, None, Some("No tab with id: 5.".to_string()));
        assert!(matches!(
            remove.await.unwrap(),
            Err(HostError::Rejected { method: "remove_tab", .. })
        ));

        let h = Arc::clone(&host);
        let query = tokio::spawn(async move { h.query_active_tab().await });
        while host.pending_calls() == 0 {
            tokio::task::yield_now().await;
        }
        let id = sent(&mut rx)["id"].as_u64().unwrap();
        host.resolve_reply(id, Some(json!("not a list")), None);
        assert!(matches!(
            query.await.unwrap(),
            Err(HostError::BadReply { .. })
        ));
    }

    #[tokio::test]
    async fn empty_tab_list_means_no_active_tab() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let host = Arc::new(NativeHost::new(tx));
        let h = Arc::clone(&host);
        let query = tokio::spawn(async move { h.query_active_tab().await });
        while host.pending_calls() == 0 {
            tokio::task::yield_now().await;
        }
        let id = sent(&mut rx)["id"].as_u64().unwrap();
        host.resolve_reply(id, Some(json!([])), None);
        assert!(matches!(query.await.unwrap(), Err(HostError::NoActiveTab)));
    }

    #[tokio::test]
    async fn disconnect_fails_pending_calls() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let host = Arc::new(NativeHost::new(tx));
        let h = Arc::clone(&host);
        let query = tokio::spawn(async move { h.query_active_tab().await });
        while host.pending_calls() == 0 {
            tokio::task::yield_now().await;
        }
        host.disconnect();
        assert!(matches!(query.await.unwrap(), Err(HostError::Disconnected)));
        assert!(matches!(
            host.remove_tab(TabId(1)).await,
            Err(HostError::Disconnected)
        ));
    }

    #[tokio::test]
    async fn closed_writer_is_disconnected() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let host = NativeHost::new(tx);
        assert!(matches!(
            host.remove_tab(TabId(1)).await,
            Err(HostError::Disconnected)
        ));
        assert_eq!(host.pending_calls(), 0);
    }

    #[test]
    fn unknown_reply_id_is_ignored() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let host = NativeHost::new(tx);
        assert!(!host.resolve_reply(99, None, None));
    }

    #[test]
    fn updates_can_be_taken_once() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let host = NativeHost::new(tx);
        let mut updates = host.subscribe_updates().unwrap();
        host.deliver_update(TabUpdate {
            tab_id: TabId(1),
            change: Default::default(),
            tab: Default::default(),
        });
        assert_eq!(updates.try_recv().unwrap().tab_id, TabId(1));
        assert!(matches!(
            host.subscribe_updates(),
            Err(HostError::AlreadySubscribed)
        ));
    }
}
