//! One native-messaging session, from the extension connecting to it unloading.

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::task::JoinSet;

use super::frame::{read_frame, write_frame};
use super::message::Inbound;
use super::native_host::NativeHost;
use crate::cleanup::{CleanupRule, CleanupSubscription};
use crate::config::YtdtConfig;
use crate::dispatcher::{DispatchOutcome, Dispatcher};

/// How the session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The extension sent `unload`.
    Unload,
    /// The input stream closed at a frame boundary.
    Eof,
    /// Reading from the extension failed.
    ReadError,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeSummary {
    pub end: SessionEnd,
    /// Trigger messages received.
    pub triggers: usize,
    /// Triggers that opened a download tab.
    pub dispatched: usize,
}

/// Serves one session on `reader`/`writer` (stdin/stdout for a native host).
///
/// The cleanup listener is subscribed before the first message is read and is
/// torn down when the session ends. Each trigger runs as its own task so a
/// trigger waiting for the browser never blocks replies or tab events.
/// Malformed messages are logged and skipped.
pub async fn run_bridge<R, W>(
    mut reader: R,
    writer: W,
    cfg: &YtdtConfig,
) -> anyhow::Result<BridgeSummary>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (out_tx, out_rx) = mpsc::unbounded_channel();
    let writer_task = tokio::spawn(write_loop(writer, out_rx));

    let host = Arc::new(NativeHost::new(out_tx));
    let dispatcher = Arc::new(Dispatcher::new(Arc::clone(&host), cfg)?);
    let cleanup = CleanupSubscription::spawn(
        Arc::clone(&host),
        CleanupRule::new(dispatcher.server_base(), cfg.cleanup),
        dispatcher.tracked(),
    )?;
    tracing::info!(server = %dispatcher.server_base(), "bridge session started");

    let mut triggers: JoinSet<bool> = JoinSet::new();
    let mut triggers_seen = 0;
    let mut dispatched = 0;

    let end = loop {
        while let Some(done) = triggers.try_join_next() {
            dispatched += usize::from(done.unwrap_or(false));
        }

        let frame = match read_frame(&mut reader).await {
            Ok(Some(frame)) => frame,
            Ok(None) => break SessionEnd::Eof,
            Err(e) => {
                tracing::warn!("reading from extension failed: {}", e);
                break SessionEnd::ReadError;
            }
        };
        let msg: Inbound = match serde_json::from_slice(&frame) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::warn!("skipping malformed message: {}", e);
                continue;
            }
        };

        match msg {
            Inbound::Trigger { options } => {
                triggers_seen += 1;
                let dispatcher = Arc::clone(&dispatcher);
                triggers.spawn(async move {
                    match dispatcher.trigger(options).await {
                        Ok(DispatchOutcome::Dispatched { .. }) => true,
                        Ok(DispatchOutcome::Skipped(_)) => false,
                        Err(e) => {
                            tracing::warn!("trigger failed: {}", e);
                            false
                        }
                    }
                });
            }
            Inbound::TabUpdated(update) => host.deliver_update(update),
            Inbound::Reply { id, result, error } => {
                if !host.resolve_reply(id, result, error) {
                    tracing::debug!(id, "reply for unknown call");
                }
            }
            Inbound::Unload => break SessionEnd::Unload,
        }
    };

    cleanup.shutdown().await;
    host.disconnect();
    while let Some(done) = triggers.join_next().await {
        dispatched += usize::from(done.unwrap_or(false));
    }

    // Last senders go away here; the writer drains what is queued and stops.
    drop(dispatcher);
    drop(host);
    if let Err(e) = writer_task.await {
        tracing::warn!("writer task failed: {}", e);
    }

    let summary = BridgeSummary {
        end,
        triggers: triggers_seen,
        dispatched,
    };
    tracing::info!(
        end = ?summary.end,
        triggers = summary.triggers,
        dispatched = summary.dispatched,
        "bridge session ended"
    );
    Ok(summary)
}

async fn write_loop<W>(mut writer: W, mut frames: UnboundedReceiver<Vec<u8>>)
where
    W: AsyncWrite + Unpin,
{
    while let Some(frame) = frames.recv().await {
        if let Err(e) = write_frame(&mut writer, &frame).await {
            tracing::warn!("writing to extension failed: {}", e);
            break;
        }
    }
}
