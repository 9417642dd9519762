//! The approval ledger: append-only activity records, the segregation-of-
//! duties precondition, and the workflow-info read model.

use sqlx::{Postgres, Row, Transaction};

use lmon_errors::{Error, Result};
use lmon_schemas::{ActivityAction, WorkflowInfo};

/// Appends one activity row. Callers must re-verify the segregation-of-duties
/// precondition inside the same transaction immediately before calling this
/// — `record` itself does not re-check it, since the precondition depends on
/// which action is being recorded and the caller already branched on that.
pub async fn record(
    tx: &mut Transaction<'_, Postgres>,
    pts: &str,
    processing_entity: &str,
    settlement_id: &str,
    settlement_version: i64,
    user_id: &str,
    user_name: &str,
    action: ActivityAction,
    comment: Option<&str>,
) -> Result<i64> {
    let (id,): (i64,) = sqlx::query_as(
        r#"
        insert into activities (
            pts, processing_entity, settlement_id, settlement_version,
            user_id, user_name, action, comment
        ) values ($1, $2, $3, $4, $5, $6, $7, $8)
        returning id
        "#,
    )
    .bind(pts)
    .bind(processing_entity)
    .bind(settlement_id)
    .bind(settlement_version)
    .bind(user_id)
    .bind(user_name)
    .bind(action.as_str())
    .bind(comment)
    .fetch_one(&mut **tx)
    .await?;

    Ok(id)
}

/// Whether any AUTHORISE row exists for this `(settlement_id,
/// settlement_version)`, regardless of user.
pub async fn is_authorised(
    tx: &mut Transaction<'_, Postgres>,
    settlement_id: &str,
    settlement_version: i64,
) -> Result<bool> {
    let (exists,): (bool,) = sqlx::query_as(
        r#"
        select exists (
            select 1 from activities
            where settlement_id = $1 and settlement_version = $2 and action = 'AUTHORISE'
        )
        "#,
    )
    .bind(settlement_id)
    .bind(settlement_version)
    .fetch_one(&mut **tx)
    .await?;

    Ok(exists)
}

/// The full set of requesters and authorisers recorded for this exact
/// version — consumed by the status deriver and the read-only query layer.
/// A new `settlement_version` starts with an empty ledger, which is how a
/// new version implicitly invalidates prior approvals.
pub async fn workflow_info(
    tx: &mut Transaction<'_, Postgres>,
    settlement_id: &str,
    settlement_version: i64,
) -> Result<WorkflowInfo> {
    let rows = sqlx::query(
        r#"
        select user_id, action from activities
        where settlement_id = $1 and settlement_version = $2
        order by create_time asc
        "#,
    )
    .bind(settlement_id)
    .bind(settlement_version)
    .fetch_all(&mut **tx)
    .await?;

    let mut info = WorkflowInfo::default();
    for row in rows {
        let user_id: String = row.try_get("user_id")?;
        let action: String = row.try_get("action")?;
        match ActivityAction::parse(&action) {
            Some(ActivityAction::RequestRelease) => info.requesters.push(user_id),
            Some(ActivityAction::Authorise) => info.authorisers.push(user_id),
            None => {
                return Err(Error::Upstream(format!("unknown activity action: {action}")));
            }
        }
    }
    Ok(info)
}

/// Same read as `workflow_info` but against a plain pool, for read-only
/// callers outside an ingestion transaction (the status query endpoint).
pub async fn workflow_info_pool(
    pool: &sqlx::PgPool,
    settlement_id: &str,
    settlement_version: i64,
) -> Result<WorkflowInfo> {
    let rows = sqlx::query(
        r#"
        select user_id, action from activities
        where settlement_id = $1 and settlement_version = $2
        order by create_time asc
        "#,
    )
    .bind(settlement_id)
    .bind(settlement_version)
    .fetch_all(pool)
    .await?;

    let mut info = WorkflowInfo::default();
    for row in rows {
        let user_id: String = row.try_get("user_id")?;
        let action: String = row.try_get("action")?;
        match ActivityAction::parse(&action) {
            Some(ActivityAction::RequestRelease) => info.requesters.push(user_id),
            Some(ActivityAction::Authorise) => info.authorisers.push(user_id),
            None => {
                return Err(Error::Upstream(format!("unknown activity action: {action}")));
            }
        }
    }
    Ok(info)
}
