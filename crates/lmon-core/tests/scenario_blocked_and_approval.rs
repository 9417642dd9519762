//! Exceeding the exposure limit derives BLOCKED; the approval workflow
//! transitions it through PENDING_AUTHORISE to AUTHORISED, and segregation
//! of duties rejects self-authorisation. A new version starts with an
//! empty ledger.

use std::str::FromStr;
use std::sync::Arc;

use rust_decimal::Decimal;

use lmon_config::MissingRatePolicy;
use lmon_core::{ApprovalWorkflow, EventBus, FixedExposureLimitProvider, IngestRequest, LoggingNotificationSink, Pipeline, StatusQuery};
use lmon_errors::Error;
use lmon_rules::{RuleCache, StaticRuleProvider};
use lmon_schemas::SettlementStatus;

fn request(settlement_id: &str, version: i64, pts: &str, pe: &str, cp: &str, amount: &str) -> IngestRequest {
    IngestRequest {
        settlement_id: settlement_id.to_string(),
        settlement_version: version,
        pts: pts.to_string(),
        processing_entity: pe.to_string(),
        counterparty_id: cp.to_string(),
        value_date: "2026-07-28".to_string(),
        currency: "USD".to_string(),
        amount: amount.to_string(),
        business_status: "VERIFIED".to_string(),
        direction: "PAY".to_string(),
        settlement_type: "GROSS".to_string(),
    }
}

#[tokio::test]
async fn blocked_settlement_moves_through_approval_workflow() -> anyhow::Result<()> {
    let pool = match lmon_testkit::db_pool().await {
        Ok(p) => p,
        Err(_) => {
            eprintln!("SKIP: LMON_DATABASE_URL not set");
            return Ok(());
        }
    };

    let suffix = lmon_testkit::unique_suffix();
    let pts = format!("PTS-{suffix}");
    let pe = "PE1".to_string();
    let cp = "CP1".to_string();
    let settlement_id = format!("S-{suffix}");

    let rule_cache = Arc::new(RuleCache::new(Box::new(StaticRuleProvider::empty())));
    rule_cache.initialize().await?;

    let pipeline = Pipeline::new(
        pool.clone(),
        rule_cache,
        MissingRatePolicy::PassThrough,
        EventBus::default(),
        Arc::new(LoggingNotificationSink),
    );

    let limit = Arc::new(FixedExposureLimitProvider::new(Decimal::from_str("500000000.00")?));
    let status_query = StatusQuery::new(pool.clone(), limit.clone());
    let workflow = ApprovalWorkflow::new(pool.clone(), limit);

    pipeline
        .process(&request(&settlement_id, 1, &pts, &pe, &cp, "600000000.00"))
        .await?;

    let view = status_query.status_for(&settlement_id, &pts, &pe).await?;
    assert_eq!(view.status, SettlementStatus::Blocked);

    workflow
        .request_release(&settlement_id, &pts, &pe, "U1", "Alice", None)
        .await?;

    let view = status_query.status_for(&settlement_id, &pts, &pe).await?;
    assert_eq!(view.status, SettlementStatus::PendingAuthorise);

    let err = workflow
        .authorise(&settlement_id, &pts, &pe, "U1", "Alice", None)
        .await
        .expect_err("same-user authorise must be rejected");
    assert!(matches!(err, Error::Precondition(_)));

    workflow
        .authorise(&settlement_id, &pts, &pe, "U2", "Bob", None)
        .await?;

    let view = status_query.status_for(&settlement_id, &pts, &pe).await?;
    assert_eq!(view.status, SettlementStatus::Authorised);

    // A new version starts with an empty ledger, so it derives BLOCKED again
    // (still over the limit) rather than inheriting v1's approvals.
    pipeline
        .process(&request(&settlement_id, 2, &pts, &pe, &cp, "600000000.00"))
        .await?;

    let view = status_query.status_for(&settlement_id, &pts, &pe).await?;
    assert_eq!(view.status, SettlementStatus::Blocked);
    assert!(view.workflow.requesters.is_empty());
    assert!(view.workflow.authorisers.is_empty());

    Ok(())
}
