//! Append-only persistence of versioned settlements: `save`, version-flag
//! maintenance, prior-counterparty lookup, and group reads.
//!
//! Every operation here accepts a transaction handle and performs no commit
//! of its own — the ingestion pipeline in `lmon-core` owns the transaction
//! boundary.

use chrono::NaiveDate;
use sqlx::{Postgres, Row, Transaction};

use lmon_errors::Result;
use lmon_schemas::{BusinessStatus, CalculationRule, Direction, NewSettlement, Settlement, SettlementType};

fn row_to_settlement(row: sqlx::postgres::PgRow) -> Result<Settlement> {
    let business_status: String = row.try_get("business_status")?;
    let direction: String = row.try_get("direction")?;
    let settlement_type: String = row.try_get("settlement_type")?;

    Ok(Settlement {
        ref_id: row.try_get("ref_id")?,
        settlement_id: row.try_get("settlement_id")?,
        settlement_version: row.try_get("settlement_version")?,
        pts: row.try_get("pts")?,
        processing_entity: row.try_get("processing_entity")?,
        counterparty_id: row.try_get("counterparty_id")?,
        value_date: row.try_get("value_date")?,
        currency: row.try_get("currency")?,
        amount: row.try_get("amount")?,
        business_status: BusinessStatus::parse(&business_status)
            .ok_or_else(|| lmon_errors::Error::Upstream(format!("unknown business_status: {business_status}")))?,
        direction: Direction::parse(&direction)
            .ok_or_else(|| lmon_errors::Error::Upstream(format!("unknown direction: {direction}")))?,
        settlement_type: SettlementType::parse(&settlement_type)
            .ok_or_else(|| lmon_errors::Error::Upstream(format!("unknown settlement_type: {settlement_type}")))?,
        is_old: row.try_get("is_old")?,
        create_time: row.try_get("create_time")?,
        update_time: row.try_get("update_time")?,
    })
}

const SETTLEMENT_COLUMNS: &str = "ref_id, settlement_id, settlement_version, pts, processing_entity, \
     counterparty_id, value_date, currency, amount, business_status, direction, settlement_type, \
     is_old, create_time, update_time";

/// Inserts one settlement row, returning its auto-sequence `ref_id`.
///
/// If a row with the same `(settlement_id, pts, processing_entity,
/// settlement_version)` already exists, the insert is a no-op and this
/// re-fetches and returns the existing row's `ref_id` — ingestion retries of
/// an identical payload are idempotent (invariant 3).
pub async fn save(tx: &mut Transaction<'_, Postgres>, settlement: &NewSettlement) -> Result<i64> {
    let inserted: Option<(i64,)> = sqlx::query_as(
        r#"
        insert into settlement (
            settlement_id, settlement_version, pts, processing_entity, counterparty_id,
            value_date, currency, amount, business_status, direction, settlement_type
        ) values (
            $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11
        )
        on conflict (settlement_id, pts, processing_entity, settlement_version) do nothing
        returning ref_id
        "#,
    )
    .bind(&settlement.settlement_id)
    .bind(settlement.settlement_version)
    .bind(&settlement.pts)
    .bind(&settlement.processing_entity)
    .bind(&settlement.counterparty_id)
    .bind(settlement.value_date)
    .bind(&settlement.currency)
    .bind(settlement.amount)
    .bind(settlement.business_status.as_str())
    .bind(settlement.direction.as_str())
    .bind(settlement.settlement_type.as_str())
    .fetch_optional(&mut **tx)
    .await?;

    if let Some((ref_id,)) = inserted {
        return Ok(ref_id);
    }

    let (ref_id,): (i64,) = sqlx::query_as(
        r#"
        select ref_id from settlement
        where settlement_id = $1 and pts = $2 and processing_entity = $3 and settlement_version = $4
        "#,
    )
    .bind(&settlement.settlement_id)
    .bind(&settlement.pts)
    .bind(&settlement.processing_entity)
    .bind(settlement.settlement_version)
    .fetch_one(&mut **tx)
    .await?;

    Ok(ref_id)
}

/// Sets `is_old = true` on every row whose `settlement_version` is strictly
/// less than the current maximum within the identity. Idempotent: rows
/// already `is_old` are left untouched by the `where` clause.
pub async fn mark_old_versions(
    tx: &mut Transaction<'_, Postgres>,
    settlement_id: &str,
    pts: &str,
    processing_entity: &str,
) -> Result<()> {
    sqlx::query(
        r#"
        update settlement s
        set is_old = true, update_time = now()
        where s.settlement_id = $1
          and s.pts = $2
          and s.processing_entity = $3
          and s.is_old = false
          and s.settlement_version < (
              select max(settlement_version) from settlement
              where settlement_id = $1 and pts = $2 and processing_entity = $3
          )
        "#,
    )
    .bind(settlement_id)
    .bind(pts)
    .bind(processing_entity)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// The counterparty of the row with the maximum `ref_id` strictly less than
/// `current_ref_id` for that identity, or `None` if no earlier row exists.
pub async fn find_previous_counterparty(
    tx: &mut Transaction<'_, Postgres>,
    settlement_id: &str,
    pts: &str,
    processing_entity: &str,
    current_ref_id: i64,
) -> Result<Option<String>> {
    let row: Option<(String,)> = sqlx::query_as(
        r#"
        select counterparty_id from settlement
        where settlement_id = $1 and pts = $2 and processing_entity = $3 and ref_id < $4
        order by ref_id desc
        limit 1
        "#,
    )
    .bind(settlement_id)
    .bind(pts)
    .bind(processing_entity)
    .bind(current_ref_id)
    .fetch_optional(&mut **tx)
    .await?;

    Ok(row.map(|(cp,)| cp))
}

/// The row with maximum `settlement_version` for the identity, ties broken
/// by maximum `ref_id` (the upstream version sequence is not guaranteed
/// tie-free, so ties are resolved this way — see `lmon_config`).
pub async fn find_latest_version(
    tx: &mut Transaction<'_, Postgres>,
    settlement_id: &str,
    pts: &str,
    processing_entity: &str,
) -> Result<Option<Settlement>> {
    let row = sqlx::query(&format!(
        r#"
        select {SETTLEMENT_COLUMNS} from settlement
        where settlement_id = $1 and pts = $2 and processing_entity = $3
        order by settlement_version desc, ref_id desc
        limit 1
        "#
    ))
    .bind(settlement_id)
    .bind(pts)
    .bind(processing_entity)
    .fetch_optional(&mut **tx)
    .await?;

    row.map(row_to_settlement).transpose()
}

/// Same lookup as `find_latest_version` but against a plain pool, for
/// read-only callers outside an ingestion transaction (status queries).
pub async fn find_latest_version_pool(
    pool: &sqlx::PgPool,
    settlement_id: &str,
    pts: &str,
    processing_entity: &str,
) -> Result<Option<Settlement>> {
    let row = sqlx::query(&format!(
        r#"
        select {SETTLEMENT_COLUMNS} from settlement
        where settlement_id = $1 and pts = $2 and processing_entity = $3
        order by settlement_version desc, ref_id desc
        limit 1
        "#
    ))
    .bind(settlement_id)
    .bind(pts)
    .bind(processing_entity)
    .fetch_optional(pool)
    .await?;

    row.map(row_to_settlement).transpose()
}

/// For each `settlement_id` whose true latest version (across the whole
/// identity, not just this group) has `ref_id <= max_ref_id` and belongs to
/// this group, returns that row, filtered by the rule's allowed
/// status/direction/type sets. Used only by the subtotal engine's
/// verification queries and by tests — the MERGE in `subtotal.rs` performs
/// the equivalent projection in one statement for production recomputation.
///
/// The window that picks each identity's latest version runs over
/// `(pts, processing_entity, ref_id <= max_ref_id)` only; `counterparty_id`
/// and `value_date` are applied afterward, against the already-selected
/// latest row. Filtering on group membership inside the window would match
/// against whichever version happens to fall in this group rather than each
/// settlement's actual latest version, silently hiding migrations out of the
/// group.
pub async fn find_group_latest_versions(
    tx: &mut Transaction<'_, Postgres>,
    pts: &str,
    processing_entity: &str,
    counterparty_id: &str,
    value_date: NaiveDate,
    max_ref_id: i64,
    rule: &CalculationRule,
) -> Result<Vec<Settlement>> {
    let rows = sqlx::query(&format!(
        r#"
        with latest as (
            select {SETTLEMENT_COLUMNS},
                   row_number() over (
                       partition by settlement_id
                       order by settlement_version desc, ref_id desc
                   ) as rn
            from settlement
            where pts = $1
              and processing_entity = $2
              and ref_id <= $5
        )
        select {SETTLEMENT_COLUMNS} from latest
        where rn = 1
          and counterparty_id = $3
          and value_date = $4
          and business_status = any($6)
          and direction = any($7)
          and settlement_type = any($8)
        order by settlement_id
        "#
    ))
    .bind(pts)
    .bind(processing_entity)
    .bind(counterparty_id)
    .bind(value_date)
    .bind(max_ref_id)
    .bind(rule.business_status_codes())
    .bind(rule.direction_codes())
    .bind(rule.settlement_type_codes())
    .fetch_all(&mut **tx)
    .await?;

    rows.into_iter().map(row_to_settlement).collect()
}
