//! The in-process event bus: fan-out of group-recalculation events for
//! audit/async consumers. Not on the critical
//! correctness path — the subtotal is already durable before an event is
//! published, and a lagging or absent subscriber never blocks ingestion.

use lmon_schemas::GroupKey;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct GroupRecalculated {
    pub group: GroupKey,
    pub ref_id: i64,
}

/// A `tokio::sync::broadcast`-backed bus: cheap fan-out to any number of
/// subscribers, each lagging or dropping independently of the others.
#[derive(Clone)]
pub struct EventBus {
    sender: tokio::sync::broadcast::Sender<GroupRecalculated>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = tokio::sync::broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes best-effort: if there are no subscribers, the event is
    /// dropped, which is fine since nothing correctness-relevant depends on
    /// delivery.
    pub fn publish(&self, event: GroupRecalculated) {
        let _ = self.sender.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}
