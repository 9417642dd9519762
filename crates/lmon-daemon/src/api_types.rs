//! Request and response wire types for all lmon-daemon HTTP endpoints.
//!
//! No business logic lives here — handlers in `routes.rs` translate these
//! to/from the domain types in `lmon-core`/`lmon-schemas`.

use serde::{Deserialize, Serialize};

pub use lmon_core::IngestRequest;

// ---------------------------------------------------------------------------
// GET /health
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

// ---------------------------------------------------------------------------
// POST /api/settlements
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct IngestSuccessResponse {
    pub status: &'static str,
    pub message: String,
    #[serde(rename = "sequenceId")]
    pub sequence_id: i64,
}

// ---------------------------------------------------------------------------
// GET /api/settlements/{pts}/{processingEntity}/{settlementId}/status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementStatusResponse {
    pub settlement_id: String,
    pub settlement_version: i64,
    pub pts: String,
    pub processing_entity: String,
    pub counterparty_id: String,
    pub running_total: String,
    pub exposure_limit: String,
    pub status: &'static str,
    pub requesters: Vec<String>,
    pub authorisers: Vec<String>,
}

// ---------------------------------------------------------------------------
// POST /api/approvals
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalRequest {
    pub settlement_id: String,
    pub pts: String,
    pub processing_entity: String,
    pub user_id: String,
    pub user_name: String,
    /// `REQUEST_RELEASE` or `AUTHORISE`.
    pub action: String,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApprovalSuccessResponse {
    pub status: &'static str,
    pub message: String,
}

// ---------------------------------------------------------------------------
// GET /api/approvals/{pts}/{processingEntity}/{settlementId}/{version}
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowInfoResponse {
    pub requesters: Vec<String>,
    pub authorisers: Vec<String>,
}
