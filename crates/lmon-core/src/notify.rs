//! The downstream notification sink contract: at-least-once delivery with
//! retry. Out of scope for the core's
//! correctness guarantees — a failed notification never affects a
//! settlement's persisted state.

use async_trait::async_trait;

use lmon_schemas::GroupKey;

#[derive(Debug, Clone)]
pub struct RecalculationNotice {
    pub group: GroupKey,
    pub ref_id: i64,
}

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, notice: RecalculationNotice);
}

/// Logs the notice and returns; the simplest sink satisfying the contract
/// without an external dependency. Default for deployments that haven't
/// wired a downstream consumer yet.
pub struct LoggingNotificationSink;

#[async_trait]
impl NotificationSink for LoggingNotificationSink {
    async fn notify(&self, notice: RecalculationNotice) {
        tracing::info!(group = %notice.group, ref_id = notice.ref_id, "group recalculated");
    }
}

/// Forwards notices onto an in-process channel — useful for wiring a real
/// at-least-once retrying dispatcher without coupling it to the ingestion
/// pipeline directly.
pub struct ChannelNotificationSink {
    sender: tokio::sync::mpsc::UnboundedSender<RecalculationNotice>,
}

impl ChannelNotificationSink {
    pub fn new() -> (Self, tokio::sync::mpsc::UnboundedReceiver<RecalculationNotice>) {
        let (sender, receiver) = tokio::sync::mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl NotificationSink for ChannelNotificationSink {
    async fn notify(&self, notice: RecalculationNotice) {
        // An unbounded channel with a dropped receiver is the only failure
        // mode here; at-least-once retry past that point is the downstream
        // consumer's responsibility per the external-collaborator contract.
        let _ = self.sender.send(notice);
    }
}
