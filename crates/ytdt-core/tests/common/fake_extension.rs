//! Scripted stand-in for the browser extension on the other end of a bridge session.
//!
//! Connects to `run_bridge` over an in-memory duplex pipe and speaks the
//! native-messaging framing, so tests can assert every call ytdt makes.

use std::time::Duration;

use serde_json::{json, Value};
use tokio::io::{DuplexStream, ReadHalf, WriteHalf};
use tokio::task::JoinHandle;
use ytdt_core::bridge::{self, BridgeSummary};
use ytdt_core::config::YtdtConfig;

const STEP_TIMEOUT: Duration = Duration::from_secs(5);

pub struct FakeExtension {
    reader: ReadHalf<DuplexStream>,
    writer: WriteHalf<DuplexStream>,
}

impl FakeExtension {
    /// Starts a bridge session with `cfg` and returns the extension side of it.
    pub fn connect(cfg: YtdtConfig) -> (Self, JoinHandle<anyhow::Result<BridgeSummary>>) {
        let (ext_side, host_side) = tokio::io::duplex(64 * 1024);
        let (host_reader, host_writer) = tokio::io::split(host_side);
        let session =
            tokio::spawn(async move { bridge::run_bridge(host_reader, host_writer, &cfg).await });
        let (reader, writer) = tokio::io::split(ext_side);
        (Self { reader, writer }, session)
    }

    pub async fn send(&mut self, msg: Value) {
        bridge::write_message(&mut self.writer, &msg)
            .await
            .expect("send to bridge");
    }

    pub async fn trigger(&mut self, subtitles: bool, audio: bool, video: bool) {
        self.send(json!({
            "type": "trigger",
            "options": {"subtitles": subtitles, "audio": audio, "video": video}
        }))
        .await;
    }

    pub async fn tab_updated(&mut self, tab_id: i64, status: &str, url: &str) {
        self.send(json!({
            "type": "tab_updated",
            "tab_id": tab_id,
            "change": {"status": status},
            "tab": {"id": tab_id, "url": url, "active": false}
        }))
        .await;
    }

    /// Next host call from ytdt; panics if none arrives in time.
    pub async fn next_call(&mut self) -> Value {
        let msg: Option<Value> = tokio::time::timeout(STEP_TIMEOUT, bridge::read_message(&mut self.reader))
            .await
            .expect("call within timeout")
            .expect("readable frame");
        let msg = msg.expect("bridge still open");
        assert_eq!(msg["type"], "call", "unexpected message {msg}");
        msg
    }

    pub async fn reply(&mut self, call: &Value, result: Value) {
        self.send(json!({"type": "reply", "id": call["id"], "result": result}))
            .await;
    }

    pub async fn reply_error(&mut self, call: &Value, error: &str) {
        self.send(json!({"type": "reply", "id": call["id"], "error": error}))
            .await;
    }

    pub async fn unload(mut self) {
        self.send(json!({"type": "unload"})).await;
    }
}
