//! Shared runtime state for lmon-daemon.
//!
//! Handlers receive `State<Arc<AppState>>`; this module owns the database
//! pool and the long-lived collaborators (rule cache, pipeline, exposure
//! limits, approval workflow) that every request needs.

use std::sync::Arc;

use sqlx::PgPool;
use tokio::sync::Semaphore;

use lmon_config::AppConfig;
use lmon_core::{ApprovalWorkflow, EventBus, ExposureLimitProvider, FixedExposureLimitProvider, Pipeline, StatusQuery};
use lmon_rules::RuleCache;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub pipeline: Arc<Pipeline>,
    pub rule_cache: Arc<RuleCache>,
    pub status_query: Arc<StatusQuery>,
    pub approvals: Arc<ApprovalWorkflow>,
    /// Bounds concurrently in-flight requests to roughly the DB pool size;
    /// acquiring a permit fails (surfaced as 429) once the pool is
    /// effectively exhausted rather than queuing unboundedly.
    pub inflight: Arc<Semaphore>,
}

impl AppState {
    pub fn new(
        config: &AppConfig,
        pool: PgPool,
        rule_cache: Arc<RuleCache>,
        events: EventBus,
    ) -> Self {
        let exposure_limits: Arc<dyn ExposureLimitProvider> =
            Arc::new(FixedExposureLimitProvider::new(config.default_exposure_limit_usd));

        let notifications = Arc::new(lmon_core::LoggingNotificationSink);

        let pipeline = Arc::new(Pipeline::new(
            pool.clone(),
            rule_cache.clone(),
            config.missing_rate_policy,
            events,
            notifications,
        ));

        let status_query = Arc::new(StatusQuery::new(pool.clone(), exposure_limits.clone()));
        let approvals = Arc::new(ApprovalWorkflow::new(pool.clone(), exposure_limits));

        Self {
            pool,
            pipeline,
            rule_cache,
            status_query,
            approvals,
            inflight: Arc::new(Semaphore::new(config.max_in_flight_requests)),
        }
    }
}
