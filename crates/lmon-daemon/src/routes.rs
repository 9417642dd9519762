//! Axum router and all HTTP handlers for lmon-daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers. Handlers are `pub(crate)` so the scenario tests in
//! `tests/` can compose the router directly.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

use lmon_errors::Error;
use lmon_schemas::ActivityAction;

use crate::api_types::{
    ApprovalRequest, ApprovalSuccessResponse, HealthResponse, IngestRequest, IngestSuccessResponse,
    SettlementStatusResponse, WorkflowInfoResponse,
};
use crate::state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/settlements", post(ingest_settlement))
        .route(
            "/api/settlements/:pts/:processing_entity/:settlement_id/status",
            get(settlement_status),
        )
        .route("/api/approvals", post(record_approval))
        .route(
            "/api/approvals/:pts/:processing_entity/:settlement_id/:version",
            get(workflow_info),
        )
        .layer(middleware::from_fn_with_state(state.clone(), backpressure))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Backpressure: surfaces 429 once the in-flight request count
// reaches the DB pool size, instead of queuing unboundedly.
// ---------------------------------------------------------------------------

async fn backpressure(
    State(state): State<Arc<AppState>>,
    request: axum::extract::Request,
    next: Next,
) -> Response {
    match state.inflight.clone().try_acquire_owned() {
        Ok(permit) => {
            let response = next.run(request).await;
            drop(permit);
            response
        }
        Err(_) => (
            StatusCode::TOO_MANY_REQUESTS,
            Json(serde_json::json!({
                "status": "error",
                "message": "connection pool exhausted, retry later",
            })),
        )
            .into_response(),
    }
}

// ---------------------------------------------------------------------------
// GET /health
// ---------------------------------------------------------------------------

pub(crate) async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { status: "UP" }))
}

// ---------------------------------------------------------------------------
// POST /api/settlements
// ---------------------------------------------------------------------------

pub(crate) async fn ingest_settlement(
    State(state): State<Arc<AppState>>,
    Json(request): Json<IngestRequest>,
) -> Result<Response, Error> {
    let ref_id = state.pipeline.process(&request).await?;

    Ok((
        StatusCode::CREATED,
        Json(IngestSuccessResponse {
            status: "success",
            message: "settlement ingested".to_string(),
            sequence_id: ref_id,
        }),
    )
        .into_response())
}

// ---------------------------------------------------------------------------
// GET /api/settlements/{pts}/{processingEntity}/{settlementId}/status
// ---------------------------------------------------------------------------

pub(crate) async fn settlement_status(
    State(state): State<Arc<AppState>>,
    Path((pts, processing_entity, settlement_id)): Path<(String, String, String)>,
) -> Result<Response, Error> {
    let view = state
        .status_query
        .status_for(&settlement_id, &pts, &processing_entity)
        .await?;

    Ok((
        StatusCode::OK,
        Json(SettlementStatusResponse {
            settlement_id: view.settlement.settlement_id,
            settlement_version: view.settlement.settlement_version,
            pts: view.settlement.pts,
            processing_entity: view.settlement.processing_entity,
            counterparty_id: view.settlement.counterparty_id,
            running_total: view.running_total.to_string(),
            exposure_limit: view.exposure_limit.to_string(),
            status: view.status.as_str(),
            requesters: view.workflow.requesters,
            authorisers: view.workflow.authorisers,
        }),
    )
        .into_response())
}

// ---------------------------------------------------------------------------
// POST /api/approvals
// ---------------------------------------------------------------------------

pub(crate) async fn record_approval(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ApprovalRequest>,
) -> Result<Response, Error> {
    let action = ActivityAction::parse(&request.action).ok_or_else(|| {
        Error::validation_one("action", "must be one of REQUEST_RELEASE, AUTHORISE")
    })?;

    match action {
        ActivityAction::RequestRelease => {
            state
                .approvals
                .request_release(
                    &request.settlement_id,
                    &request.pts,
                    &request.processing_entity,
                    &request.user_id,
                    &request.user_name,
                    request.comment.as_deref(),
                )
                .await?;
        }
        ActivityAction::Authorise => {
            state
                .approvals
                .authorise(
                    &request.settlement_id,
                    &request.pts,
                    &request.processing_entity,
                    &request.user_id,
                    &request.user_name,
                    request.comment.as_deref(),
                )
                .await?;
        }
    }

    Ok((
        StatusCode::CREATED,
        Json(ApprovalSuccessResponse {
            status: "success",
            message: format!("{} recorded", request.action),
        }),
    )
        .into_response())
}

// ---------------------------------------------------------------------------
// GET /api/approvals/{pts}/{processingEntity}/{settlementId}/{version}
// ---------------------------------------------------------------------------

pub(crate) async fn workflow_info(
    State(state): State<Arc<AppState>>,
    Path((_pts, _processing_entity, settlement_id, version)): Path<(String, String, String, i64)>,
) -> Result<Response, Error> {
    let info = state.status_query.workflow_info(&settlement_id, version).await?;

    Ok((
        StatusCode::OK,
        Json(WorkflowInfoResponse {
            requesters: info.requesters,
            authorisers: info.authorisers,
        }),
    )
        .into_response())
}
