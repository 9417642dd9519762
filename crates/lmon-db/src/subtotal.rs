//! The subtotal engine: the single SQL statement that recomputes a group's
//! USD subtotal from the filtered latest-version settlement set and commits
//! it guarded by a reference-sequence.
//!
//! This is the hardest primitive in the system. The MERGE is
//! one statement so that selection and write are atomic relative to other
//! subtotal-engine writes against the same group row; the `ref_id` guard in
//! the `on conflict ... where` clause makes recomputation order-independent
//! (invariant 4 / invariant 1).
//!
//! The windowing inside the query identifies each settlement's true latest
//! version across the whole identity (`pts`, `processing_entity`, `ref_id <=
//! $ref_id`) first, and only afterward checks whether that latest version
//! belongs to this group (`counterparty_id`, `value_date`). Filtering group
//! membership before windowing would hide a settlement's migration to a
//! different counterparty from the group it just left.

use chrono::NaiveDate;
use sqlx::{Postgres, Transaction};

use lmon_config::MissingRatePolicy;
use lmon_errors::{Error, Result};
use lmon_schemas::CalculationRule;

/// Recomputes and upserts the subtotal for one group, guarded by `ref_id`.
///
/// When `missing_rate_policy` is `Reject`, a pre-check aborts the whole
/// recompute (and therefore the caller's transaction) if any contributing
/// row's currency has no entry in `EXCHANGE_RATE`; under `PassThrough` a
/// missing rate contributes as 1.0 and is logged as a warning by the caller.
pub async fn recompute_group(
    tx: &mut Transaction<'_, Postgres>,
    pts: &str,
    processing_entity: &str,
    counterparty_id: &str,
    value_date: NaiveDate,
    ref_id: i64,
    rule: &CalculationRule,
    missing_rate_policy: MissingRatePolicy,
) -> Result<()> {
    if missing_rate_policy == MissingRatePolicy::Reject {
        let missing = count_missing_rates(
            tx,
            pts,
            processing_entity,
            counterparty_id,
            value_date,
            ref_id,
            rule,
        )
        .await?;
        if missing > 0 {
            return Err(Error::Upstream(format!(
                "subtotal recompute rejected: {missing} contributing row(s) have no exchange rate \
                 for group ({pts}:{processing_entity}:{counterparty_id}:{value_date})"
            )));
        }
    } else if count_missing_rates(
        tx,
        pts,
        processing_entity,
        counterparty_id,
        value_date,
        ref_id,
        rule,
    )
    .await?
        > 0
    {
        tracing::warn!(
            pts, processing_entity, counterparty_id, %value_date,
            "subtotal recompute: passing through missing exchange rate(s) as 1.0"
        );
    }

    sqlx::query(
        r#"
        with latest as (
            select settlement_id, currency, amount, business_status, direction, settlement_type,
                   counterparty_id, value_date,
                   row_number() over (
                       partition by settlement_id
                       order by settlement_version desc, ref_id desc
                   ) as rn
            from settlement
            where pts = $1
              and processing_entity = $2
              and ref_id <= $5
        ),
        filtered as (
            select * from latest
            where rn = 1
              and counterparty_id = $3
              and value_date = $4
              and business_status = any($6)
              and direction = any($7)
              and settlement_type = any($8)
        ),
        priced as (
            select f.amount * coalesce(er.rate_to_usd, 1.0) as usd_amount
            from filtered f
            left join exchange_rate er on er.currency = f.currency
        ),
        agg as (
            select coalesce(sum(usd_amount), 0)::numeric(22, 2) as total, count(*) as cnt
            from priced
        )
        insert into running_total (
            pts, processing_entity, counterparty_id, value_date,
            running_total, settlement_count, ref_id, create_time, update_time
        )
        select $1, $2, $3, $4, agg.total, agg.cnt, $5, now(), now()
        from agg
        on conflict (pts, processing_entity, counterparty_id, value_date) do update
        set running_total = excluded.running_total,
            settlement_count = excluded.settlement_count,
            ref_id = excluded.ref_id,
            update_time = now()
        where running_total.ref_id <= excluded.ref_id
        "#,
    )
    .bind(pts)
    .bind(processing_entity)
    .bind(counterparty_id)
    .bind(value_date)
    .bind(ref_id)
    .bind(rule.business_status_codes())
    .bind(rule.direction_codes())
    .bind(rule.settlement_type_codes())
    .execute(&mut **tx)
    .await?;

    Ok(())
}

async fn count_missing_rates(
    tx: &mut Transaction<'_, Postgres>,
    pts: &str,
    processing_entity: &str,
    counterparty_id: &str,
    value_date: NaiveDate,
    ref_id: i64,
    rule: &CalculationRule,
) -> Result<i64> {
    let (missing,): (i64,) = sqlx::query_as(
        r#"
        with latest as (
            select settlement_id, currency, business_status, direction, settlement_type,
                   counterparty_id, value_date,
                   row_number() over (
                       partition by settlement_id
                       order by settlement_version desc, ref_id desc
                   ) as rn
            from settlement
            where pts = $1
              and processing_entity = $2
              and ref_id <= $5
        ),
        filtered as (
            select * from latest
            where rn = 1
              and counterparty_id = $3
              and value_date = $4
              and business_status = any($6)
              and direction = any($7)
              and settlement_type = any($8)
        )
        select count(*) from filtered f
        where not exists (select 1 from exchange_rate er where er.currency = f.currency)
        "#,
    )
    .bind(pts)
    .bind(processing_entity)
    .bind(counterparty_id)
    .bind(value_date)
    .bind(ref_id)
    .bind(rule.business_status_codes())
    .bind(rule.direction_codes())
    .bind(rule.settlement_type_codes())
    .fetch_one(&mut **tx)
    .await?;

    Ok(missing)
}

/// Reads back a group's current subtotal row, if any. Used by the status
/// deriver and by tests; not on the write path.
pub async fn find_group(
    tx: &mut Transaction<'_, Postgres>,
    pts: &str,
    processing_entity: &str,
    counterparty_id: &str,
    value_date: NaiveDate,
) -> Result<Option<lmon_schemas::GroupSubtotal>> {
    use sqlx::Row;

    let row = sqlx::query(
        r#"
        select pts, processing_entity, counterparty_id, value_date,
               running_total, settlement_count, ref_id, create_time, update_time
        from running_total
        where pts = $1 and processing_entity = $2 and counterparty_id = $3 and value_date = $4
        "#,
    )
    .bind(pts)
    .bind(processing_entity)
    .bind(counterparty_id)
    .bind(value_date)
    .fetch_optional(&mut **tx)
    .await?;

    let Some(row) = row else { return Ok(None) };

    Ok(Some(lmon_schemas::GroupSubtotal {
        pts: row.try_get("pts")?,
        processing_entity: row.try_get("processing_entity")?,
        counterparty_id: row.try_get("counterparty_id")?,
        value_date: row.try_get("value_date")?,
        running_total: row.try_get("running_total")?,
        settlement_count: row.try_get("settlement_count")?,
        ref_id: row.try_get("ref_id")?,
        create_time: row.try_get("create_time")?,
        update_time: row.try_get("update_time")?,
    }))
}

/// Same read as `find_group` but against a plain pool, for read-only status
/// queries outside an ingestion transaction.
pub async fn find_group_pool(
    pool: &sqlx::PgPool,
    pts: &str,
    processing_entity: &str,
    counterparty_id: &str,
    value_date: NaiveDate,
) -> Result<Option<lmon_schemas::GroupSubtotal>> {
    use sqlx::Row;

    let row = sqlx::query(
        r#"
        select pts, processing_entity, counterparty_id, value_date,
               running_total, settlement_count, ref_id, create_time, update_time
        from running_total
        where pts = $1 and processing_entity = $2 and counterparty_id = $3 and value_date = $4
        "#,
    )
    .bind(pts)
    .bind(processing_entity)
    .bind(counterparty_id)
    .bind(value_date)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else { return Ok(None) };

    Ok(Some(lmon_schemas::GroupSubtotal {
        pts: row.try_get("pts")?,
        processing_entity: row.try_get("processing_entity")?,
        counterparty_id: row.try_get("counterparty_id")?,
        value_date: row.try_get("value_date")?,
        running_total: row.try_get("running_total")?,
        settlement_count: row.try_get("settlement_count")?,
        ref_id: row.try_get("ref_id")?,
        create_time: row.try_get("create_time")?,
        update_time: row.try_get("update_time")?,
    }))
}
