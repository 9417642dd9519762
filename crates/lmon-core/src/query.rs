//! Read-only status and workflow-info queries, used by the status and
//! workflow-info HTTP endpoints. These are thin read layers over the data
//! model and carry no invariants of their own.

use std::sync::Arc;

use lmon_errors::{Error, Result};
use lmon_schemas::{Settlement, SettlementStatus, WorkflowInfo};

use crate::exposure::ExposureLimitProvider;
use crate::status;

pub struct StatusQuery {
    pool: sqlx::PgPool,
    exposure_limits: Arc<dyn ExposureLimitProvider>,
}

#[derive(Debug, Clone)]
pub struct SettlementStatusView {
    pub settlement: Settlement,
    pub running_total: rust_decimal::Decimal,
    pub exposure_limit: rust_decimal::Decimal,
    pub workflow: WorkflowInfo,
    pub status: SettlementStatus,
}

impl StatusQuery {
    pub fn new(pool: sqlx::PgPool, exposure_limits: Arc<dyn ExposureLimitProvider>) -> Self {
        Self { pool, exposure_limits }
    }

    pub async fn status_for(
        &self,
        settlement_id: &str,
        pts: &str,
        processing_entity: &str,
    ) -> Result<SettlementStatusView> {
        let settlement = lmon_db::settlement::find_latest_version_pool(&self.pool, settlement_id, pts, processing_entity)
            .await?
            .ok_or_else(|| Error::Precondition(format!("no settlement found for {settlement_id}")))?;

        let group = lmon_db::subtotal::find_group_pool(
            &self.pool,
            &settlement.pts,
            &settlement.processing_entity,
            &settlement.counterparty_id,
            settlement.value_date,
        )
        .await?;
        let running_total = group.map(|g| g.running_total).unwrap_or(rust_decimal::Decimal::ZERO);

        let exposure_limit = self.exposure_limits.limit_for(&settlement.counterparty_id).await;
        let workflow =
            lmon_db::approvals::workflow_info_pool(&self.pool, &settlement.settlement_id, settlement.settlement_version)
                .await?;

        let status = status::derive(&settlement, running_total, exposure_limit, &workflow);

        Ok(SettlementStatusView {
            settlement,
            running_total,
            exposure_limit,
            workflow,
            status,
        })
    }

    pub async fn workflow_info(&self, settlement_id: &str, settlement_version: i64) -> Result<WorkflowInfo> {
        lmon_db::approvals::workflow_info_pool(&self.pool, settlement_id, settlement_version).await
    }
}
