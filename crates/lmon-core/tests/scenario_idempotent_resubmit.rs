//! Resubmitting an identical payload is idempotent — both calls return
//! the same `ref_id` and the subtotal reflects exactly one contribution.

use std::str::FromStr;
use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use lmon_config::MissingRatePolicy;
use lmon_core::{EventBus, IngestRequest, LoggingNotificationSink, Pipeline};
use lmon_rules::{RuleCache, StaticRuleProvider};

fn request(settlement_id: &str, pts: &str, pe: &str, cp: &str, amount: &str) -> IngestRequest {
    IngestRequest {
        settlement_id: settlement_id.to_string(),
        settlement_version: 1,
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
async fn identical_resubmit_is_idempotent() -> anyhow::Result<()> {
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
    let settlement_id = format!("S4-{suffix}");

    let rule_cache = Arc::new(RuleCache::new(Box::new(StaticRuleProvider::empty())));
    rule_cache.initialize().await?;

    let pipeline = Pipeline::new(
        pool.clone(),
        rule_cache,
        MissingRatePolicy::PassThrough,
        EventBus::default(),
        Arc::new(LoggingNotificationSink),
    );

    let req = request(&settlement_id, &pts, &pe, &cp, "50000000.00");

    let ref_id_1 = pipeline.process(&req).await?;
    let ref_id_2 = pipeline.process(&req).await?;

    assert_eq!(ref_id_1, ref_id_2);

    let value_date = NaiveDate::from_ymd_opt(2026, 7, 28).unwrap();
    let group = lmon_db::subtotal::find_group_pool(&pool, &pts, &pe, &cp, value_date)
        .await?
        .expect("group row must exist");

    assert_eq!(group.running_total, Decimal::from_str("50000000.00")?);
    assert_eq!(group.settlement_count, 1);

    Ok(())
}
