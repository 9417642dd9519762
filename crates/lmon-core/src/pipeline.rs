//! The ingestion pipeline: `process(request) -> ref_id`, the five-step
//! five-step ingestion transaction.
//!
//! Recomputations for all affected groups run sequentially inside the one
//! transaction that persisted the settlement — never concurrently and never
//! after commit — so a single ingestion can never race itself (§4.4 step 6).

use std::sync::Arc;

use lmon_config::MissingRatePolicy;
use lmon_errors::Result;
use lmon_schemas::GroupKey;
use lmon_rules::RuleCache;

use crate::events::{EventBus, GroupRecalculated};
use crate::notify::{NotificationSink, RecalculationNotice};
use crate::validate::{self, IngestRequest};

pub struct Pipeline {
    pool: sqlx::PgPool,
    rule_cache: Arc<RuleCache>,
    missing_rate_policy: MissingRatePolicy,
    events: EventBus,
    notifications: Arc<dyn NotificationSink>,
}

impl Pipeline {
    pub fn new(
        pool: sqlx::PgPool,
        rule_cache: Arc<RuleCache>,
        missing_rate_policy: MissingRatePolicy,
        events: EventBus,
        notifications: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            pool,
            rule_cache,
            missing_rate_policy,
            events,
            notifications,
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Validates, persists, and recomputes subtotals for one settlement.
    /// Returns the assigned `ref_id`. On any failure the transaction is
    /// rolled back and the caller receives a typed error; no partial writes
    /// are ever observable.
    pub async fn process(&self, request: &IngestRequest) -> Result<i64> {
        let settlement = validate::validate(request)?;

        let mut tx = lmon_db::begin(&self.pool).await?;

        let ref_id = lmon_db::settlement::save(&mut tx, &settlement).await?;

        lmon_db::settlement::mark_old_versions(
            &mut tx,
            &settlement.settlement_id,
            &settlement.pts,
            &settlement.processing_entity,
        )
        .await?;

        let prev_cp = lmon_db::settlement::find_previous_counterparty(
            &mut tx,
            &settlement.settlement_id,
            &settlement.pts,
            &settlement.processing_entity,
            ref_id,
        )
        .await?;

        let current_group = GroupKey::new(
            settlement.pts.clone(),
            settlement.processing_entity.clone(),
            settlement.counterparty_id.clone(),
            settlement.value_date,
        );

        let mut affected_groups = vec![current_group.clone()];
        if let Some(prev_cp) = prev_cp {
            if prev_cp != settlement.counterparty_id {
                affected_groups.push(GroupKey::new(
                    settlement.pts.clone(),
                    settlement.processing_entity.clone(),
                    prev_cp,
                    settlement.value_date,
                ));
            }
        }

        let rule = self.rule_cache.get(&settlement.pts, &settlement.processing_entity);

        for group in &affected_groups {
            lmon_db::subtotal::recompute_group(
                &mut tx,
                &group.pts,
                &group.processing_entity,
                &group.counterparty_id,
                group.value_date,
                ref_id,
                &rule,
                self.missing_rate_policy,
            )
            .await?;
        }

        tx.commit().await.map_err(lmon_errors::Error::from)?;

        for group in affected_groups {
            self.events.publish(GroupRecalculated {
                group: group.clone(),
                ref_id,
            });
            self.notifications
                .notify(RecalculationNotice { group, ref_id })
                .await;
        }

        Ok(ref_id)
    }
}
