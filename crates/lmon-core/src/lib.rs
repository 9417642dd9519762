//! Core settlement-monitoring logic: ingestion pipeline, status deriver,
//! approval workflow, exposure-limit and notification contracts, and the
//! in-process event bus. Everything here is store/transport agnostic;
//! `lmon-daemon` is the only crate that knows about HTTP.

pub mod events;
pub mod exposure;
pub mod notify;
pub mod pipeline;
pub mod query;
pub mod status;
pub mod validate;
pub mod workflow;

pub use events::{EventBus, GroupRecalculated};
pub use exposure::{ExposureLimitProvider, FixedExposureLimitProvider};
pub use notify::{ChannelNotificationSink, LoggingNotificationSink, NotificationSink, RecalculationNotice};
pub use pipeline::Pipeline;
pub use query::{SettlementStatusView, StatusQuery};
pub use validate::IngestRequest;
pub use workflow::ApprovalWorkflow;
