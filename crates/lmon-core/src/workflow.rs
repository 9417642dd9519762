//! Approval workflow operations: `request_release` and `authorise`. Both
//! re-verify their precondition inside the same transaction that writes the
//! activity row.

use std::sync::Arc;

use lmon_errors::{Error, Result};
use lmon_schemas::{ActivityAction, SettlementStatus};

use crate::exposure::ExposureLimitProvider;
use crate::status;

pub struct ApprovalWorkflow {
    pool: sqlx::PgPool,
    exposure_limits: Arc<dyn ExposureLimitProvider>,
}

impl ApprovalWorkflow {
    pub fn new(pool: sqlx::PgPool, exposure_limits: Arc<dyn ExposureLimitProvider>) -> Self {
        Self { pool, exposure_limits }
    }

    /// Accepted only when the settlement's current derived status is
    /// BLOCKED (which per the status table only happens for a PAY+VERIFIED
    /// settlement over its exposure limit).
    pub async fn request_release(
        &self,
        settlement_id: &str,
        pts: &str,
        processing_entity: &str,
        user_id: &str,
        user_name: &str,
        comment: Option<&str>,
    ) -> Result<()> {
        let mut tx = lmon_db::begin(&self.pool).await?;

        let settlement = lmon_db::settlement::find_latest_version(&mut tx, settlement_id, pts, processing_entity)
            .await?
            .ok_or_else(|| Error::Precondition(format!("no settlement found for {settlement_id}")))?;

        let derived = self.derive_status(&mut tx, &settlement).await?;
        if derived != SettlementStatus::Blocked {
            return Err(Error::Precondition(format!(
                "REQUEST_RELEASE rejected: settlement {settlement_id} v{} is not BLOCKED",
                settlement.settlement_version
            )));
        }

        lmon_db::approvals::record(
            &mut tx,
            pts,
            processing_entity,
            settlement_id,
            settlement.settlement_version,
            user_id,
            user_name,
            ActivityAction::RequestRelease,
            comment,
        )
        .await?;

        tx.commit().await.map_err(Error::from)?;
        Ok(())
    }

    /// Accepted only when a REQUEST_RELEASE exists for this exact
    /// `(settlement_id, settlement_version)` and `user_id` is not among its
    /// requesters (segregation of duties, invariant 6).
    pub async fn authorise(
        &self,
        settlement_id: &str,
        pts: &str,
        processing_entity: &str,
        user_id: &str,
        user_name: &str,
        comment: Option<&str>,
    ) -> Result<()> {
        let mut tx = lmon_db::begin(&self.pool).await?;

        let settlement = lmon_db::settlement::find_latest_version(&mut tx, settlement_id, pts, processing_entity)
            .await?
            .ok_or_else(|| Error::Precondition(format!("no settlement found for {settlement_id}")))?;

        let workflow = lmon_db::approvals::workflow_info(&mut tx, settlement_id, settlement.settlement_version).await?;

        if !workflow.has_request_release() {
            return Err(Error::Precondition(format!(
                "AUTHORISE rejected: no REQUEST_RELEASE exists for {settlement_id} v{}",
                settlement.settlement_version
            )));
        }

        if workflow.requesters.iter().any(|r| r == user_id) {
            return Err(Error::Precondition(format!(
                "AUTHORISE rejected: user {user_id} cannot authorise their own REQUEST_RELEASE (segregation of duties)"
            )));
        }

        lmon_db::approvals::record(
            &mut tx,
            pts,
            processing_entity,
            settlement_id,
            settlement.settlement_version,
            user_id,
            user_name,
            ActivityAction::Authorise,
            comment,
        )
        .await?;

        tx.commit().await.map_err(Error::from)?;
        Ok(())
    }

    async fn derive_status(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        settlement: &lmon_schemas::Settlement,
    ) -> Result<SettlementStatus> {
        let group = lmon_db::subtotal::find_group(
            tx,
            &settlement.pts,
            &settlement.processing_entity,
            &settlement.counterparty_id,
            settlement.value_date,
        )
        .await?;
        let running_total = group.map(|g| g.running_total).unwrap_or(rust_decimal::Decimal::ZERO);

        let limit = self.exposure_limits.limit_for(&settlement.counterparty_id).await;
        let workflow = lmon_db::approvals::workflow_info(tx, &settlement.settlement_id, settlement.settlement_version).await?;

        Ok(status::derive(settlement, running_total, limit, &workflow))
    }
}
