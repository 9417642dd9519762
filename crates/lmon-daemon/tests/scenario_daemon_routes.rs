//! In-process scenario tests for lmon-daemon HTTP endpoints.
//!
//! These drive the Axum router via `tower::ServiceExt::oneshot` — no TCP
//! socket is bound. Tests that need a settlement already ingested are
//! gated on `LMON_DATABASE_URL`, following this workspace's existing
//! scenario-test convention; unset, they skip rather than fail.

use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{Request, StatusCode};
use bytes::Bytes;
use http_body_util::BodyExt;
use rust_decimal::Decimal;
use tower::ServiceExt; // oneshot

use lmon_config::{AppConfig, MissingRatePolicy};
use lmon_core::EventBus;
use lmon_daemon::{routes, state::AppState};
use lmon_rules::{RuleCache, StaticRuleProvider};

fn test_config() -> AppConfig {
    AppConfig {
        database_url: String::new(),
        bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
        rule_refresh_interval: Duration::from_secs(300),
        request_timeout: Duration::from_secs(5),
        default_exposure_limit_usd: Decimal::from_str("500000000.00").unwrap(),
        missing_rate_policy: MissingRatePolicy::PassThrough,
        db_max_connections: 10,
        max_in_flight_requests: 10,
        rule_provider_url: None,
    }
}

async fn make_router() -> Option<axum::Router> {
    let pool = match lmon_testkit::db_pool().await {
        Ok(p) => p,
        Err(_) => return None,
    };

    let rule_cache = Arc::new(RuleCache::new(Box::new(StaticRuleProvider::empty())));
    rule_cache.initialize().await.unwrap();

    let state = Arc::new(AppState::new(&test_config(), pool, rule_cache, EventBus::default()));
    Some(routes::build_router(state))
}

async fn call(router: axum::Router, req: Request<axum::body::Body>) -> (StatusCode, Bytes) {
    let resp = router.oneshot(req).await.expect("oneshot failed");
    let status = resp.status();
    let body = resp.into_body().collect().await.expect("body collect failed").to_bytes();
    (status, body)
}

fn parse_json(b: Bytes) -> serde_json::Value {
    serde_json::from_slice(&b).expect("body is not valid JSON")
}

fn ingest_body(settlement_id: &str, pts: &str, pe: &str, cp: &str, amount: &str) -> serde_json::Value {
    serde_json::json!({
        "settlementId": settlement_id,
        "settlementVersion": 1,
        "pts": pts,
        "processingEntity": pe,
        "counterpartyId": cp,
        "valueDate": "2026-07-28",
        "currency": "USD",
        "amount": amount,
        "businessStatus": "VERIFIED",
        "direction": "PAY",
        "settlementType": "GROSS",
    })
}

// ---------------------------------------------------------------------------
// GET /health — no database required.
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_returns_200_up() {
    // Health does not need a real pool; build one only if available, else skip.
    let router = match make_router().await {
        Some(r) => r,
        None => {
            eprintln!("SKIP: LMON_DATABASE_URL not set");
            return;
        }
    };

    let req = Request::builder()
        .method("GET")
        .uri("/health")
        .body(axum::body::Body::empty())
        .unwrap();

    let (status, body) = call(router, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(parse_json(body)["status"], "UP");
}

// ---------------------------------------------------------------------------
// POST /api/settlements
// ---------------------------------------------------------------------------

#[tokio::test]
async fn ingest_settlement_returns_201_with_sequence_id() {
    let router = match make_router().await {
        Some(r) => r,
        None => {
            eprintln!("SKIP: LMON_DATABASE_URL not set");
            return;
        }
    };

    let suffix = lmon_testkit::unique_suffix();
    let body = ingest_body(&format!("S-{suffix}"), &format!("PTS-{suffix}"), "PE1", "CP1", "80000000.00");

    let req = Request::builder()
        .method("POST")
        .uri("/api/settlements")
        .header("content-type", "application/json")
        .body(axum::body::Body::from(body.to_string()))
        .unwrap();

    let (status, body) = call(router, req).await;
    assert_eq!(status, StatusCode::CREATED);
    let json = parse_json(body);
    assert_eq!(json["status"], "success");
    assert!(json["sequenceId"].is_i64());
}

#[tokio::test]
async fn ingest_settlement_rejects_invalid_payload_with_400_and_field_errors() {
    let router = match make_router().await {
        Some(r) => r,
        None => {
            eprintln!("SKIP: LMON_DATABASE_URL not set");
            return;
        }
    };

    let mut body = ingest_body("S1", "PTS1", "PE1", "CP1", "-5.00");
    body["direction"] = serde_json::json!("SIDEWAYS");

    let req = Request::builder()
        .method("POST")
        .uri("/api/settlements")
        .header("content-type", "application/json")
        .body(axum::body::Body::from(body.to_string()))
        .unwrap();

    let (status, body) = call(router, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let json = parse_json(body);
    assert_eq!(json["status"], "error");
    let errors = json["errors"].as_array().expect("errors array");
    assert!(errors.iter().any(|e| e["field"] == "amount"));
    assert!(errors.iter().any(|e| e["field"] == "direction"));
}

// ---------------------------------------------------------------------------
// GET /api/settlements/{pts}/{processingEntity}/{settlementId}/status
// ---------------------------------------------------------------------------

#[tokio::test]
async fn settlement_status_reflects_ingested_settlement() {
    let router = match make_router().await {
        Some(r) => r,
        None => {
            eprintln!("SKIP: LMON_DATABASE_URL not set");
            return;
        }
    };

    let suffix = lmon_testkit::unique_suffix();
    let settlement_id = format!("S-{suffix}");
    let pts = format!("PTS-{suffix}");

    let ingest_req = Request::builder()
        .method("POST")
        .uri("/api/settlements")
        .header("content-type", "application/json")
        .body(axum::body::Body::from(
            ingest_body(&settlement_id, &pts, "PE1", "CP1", "10000000.00").to_string(),
        ))
        .unwrap();
    let (status, _) = call(router.clone(), ingest_req).await;
    assert_eq!(status, StatusCode::CREATED);

    let status_req = Request::builder()
        .method("GET")
        .uri(format!("/api/settlements/{pts}/PE1/{settlement_id}/status"))
        .body(axum::body::Body::empty())
        .unwrap();
    let (status, body) = call(router, status_req).await;
    assert_eq!(status, StatusCode::OK);

    let json = parse_json(body);
    assert_eq!(json["status"], "CREATED");
    assert_eq!(json["settlementId"], settlement_id);
}

// ---------------------------------------------------------------------------
// Unknown routes return 404
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_route_returns_404() {
    let router = match make_router().await {
        Some(r) => r,
        None => {
            eprintln!("SKIP: LMON_DATABASE_URL not set");
            return;
        }
    };

    let req = Request::builder()
        .method("GET")
        .uri("/does_not_exist")
        .body(axum::body::Body::empty())
        .unwrap();

    let (status, _) = call(router, req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
