//! A version that changes counterparty rebalances both groups
//! atomically.

use std::str::FromStr;
use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use lmon_config::MissingRatePolicy;
use lmon_core::{EventBus, IngestRequest, LoggingNotificationSink, Pipeline};
use lmon_rules::{RuleCache, StaticRuleProvider};

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
async fn counterparty_change_rebalances_both_groups() -> anyhow::Result<()> {
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
    let settlement_id = format!("S2-{suffix}");

    let rule_cache = Arc::new(RuleCache::new(Box::new(StaticRuleProvider::empty())));
    rule_cache.initialize().await?;

    let pipeline = Pipeline::new(
        pool.clone(),
        rule_cache,
        MissingRatePolicy::PassThrough,
        EventBus::default(),
        Arc::new(LoggingNotificationSink),
    );

    pipeline
        .process(&request(&settlement_id, 1, &pts, &pe, "A", "200000000.00"))
        .await?;
    pipeline
        .process(&request(&settlement_id, 2, &pts, &pe, "B", "210000000.00"))
        .await?;

    let value_date = NaiveDate::from_ymd_opt(2026, 7, 28).unwrap();

    let group_a = lmon_db::subtotal::find_group_pool(&pool, &pts, &pe, "A", value_date).await?;
    let total_a = group_a.map(|g| g.running_total).unwrap_or(Decimal::ZERO);
    assert_eq!(total_a, Decimal::ZERO);

    let group_b = lmon_db::subtotal::find_group_pool(&pool, &pts, &pe, "B", value_date)
        .await?
        .expect("group B must exist after migration");
    assert_eq!(group_b.running_total, Decimal::from_str("210000000.00")?);

    Ok(())
}
