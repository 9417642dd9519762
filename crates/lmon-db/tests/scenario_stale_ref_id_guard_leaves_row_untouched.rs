//! The subtotal engine's ref_id guard: a recompute call whose `ref_id` is
//! lower than the group row's stored `ref_id` must leave the row untouched,
//! regardless of what its own projection would compute.

use chrono::NaiveDate;
use lmon_config::MissingRatePolicy;
use lmon_schemas::CalculationRule;

#[tokio::test]
async fn stale_recompute_does_not_overwrite_a_fresher_row() -> anyhow::Result<()> {
    let pool = match lmon_db::testkit_db_pool().await {
        Ok(p) => p,
        Err(_) => {
            eprintln!("SKIP: LMON_DATABASE_URL not set");
            return Ok(());
        }
    };

    let suffix = uuid::Uuid::new_v4().simple().to_string();
    let pts = format!("PTS-{}", &suffix[..12]);
    let pe = "PE1";
    let cp = "CP1";
    let value_date = NaiveDate::from_ymd_opt(2026, 7, 28).unwrap();
    let rule = CalculationRule::default_for(&pts, pe);

    let mut tx = lmon_db::begin(&pool).await?;
    let settlement = lmon_testkit::settlement_fixture(
        format!("S-{suffix}"),
        1,
        pts.clone(),
        pe,
        cp,
        value_date,
        "USD",
        "100.00".parse().unwrap(),
    );
    let ref_id_1 = lmon_db::settlement::save(&mut tx, &settlement).await?;
    lmon_db::subtotal::recompute_group(
        &mut tx, &pts, pe, cp, value_date, ref_id_1, &rule, MissingRatePolicy::PassThrough,
    )
    .await?;

    let mut settlement_2 = settlement.clone();
    settlement_2.settlement_id = format!("S2-{suffix}");
    settlement_2.amount = "50.00".parse().unwrap();
    let ref_id_2 = lmon_db::settlement::save(&mut tx, &settlement_2).await?;
    lmon_db::subtotal::recompute_group(
        &mut tx, &pts, pe, cp, value_date, ref_id_2, &rule, MissingRatePolicy::PassThrough,
    )
    .await?;

    let fresh_total = lmon_db::subtotal::find_group(&mut tx, &pts, pe, cp, value_date)
        .await?
        .expect("group must exist")
        .running_total;
    assert_eq!(fresh_total, "150.00".parse().unwrap());

    // Replaying the first recompute with its stale ref_id must not revert
    // the group back to 100.00.
    lmon_db::subtotal::recompute_group(
        &mut tx, &pts, pe, cp, value_date, ref_id_1, &rule, MissingRatePolicy::PassThrough,
    )
    .await?;

    let after_stale_replay = lmon_db::subtotal::find_group(&mut tx, &pts, pe, cp, value_date)
        .await?
        .expect("group must exist");
    assert_eq!(after_stale_replay.running_total, "150.00".parse().unwrap());
    assert_eq!(after_stale_replay.ref_id, ref_id_2);

    tx.rollback().await?;
    Ok(())
}
