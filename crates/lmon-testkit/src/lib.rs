//! Shared fixtures for scenario tests against `lmon-db`/`lmon-core`: pool
//! bootstrap, unique-identity generators, and a settlement builder, mirroring
//! the fixture-loading shape this codebase uses for its other scenario
//! suites.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::PgPool;

use lmon_errors::Result;
use lmon_schemas::{BusinessStatus, Direction, NewSettlement, SettlementType};

/// Connects via `LMON_DATABASE_URL` and ensures migrations are applied.
/// Scenario tests call this first, then skip (not fail) if the env var is
/// unset — same convention the rest of this codebase's DB-backed tests use.
pub async fn db_pool() -> Result<PgPool> {
    lmon_db::testkit_db_pool().await
}

/// A short random suffix for building collision-free `settlement_id`/`pts`
/// values across concurrent test runs against a shared database.
pub fn unique_suffix() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..12].to_string()
}

/// Builds a `NewSettlement` with sensible defaults; override fields on the
/// returned struct for the scenario under test.
#[allow(clippy::too_many_arguments)]
pub fn settlement_fixture(
    settlement_id: impl Into<String>,
    settlement_version: i64,
    pts: impl Into<String>,
    processing_entity: impl Into<String>,
    counterparty_id: impl Into<String>,
    value_date: NaiveDate,
    currency: impl Into<String>,
    amount: Decimal,
) -> NewSettlement {
    NewSettlement {
        settlement_id: settlement_id.into(),
        settlement_version,
        pts: pts.into(),
        processing_entity: processing_entity.into(),
        counterparty_id: counterparty_id.into(),
        value_date,
        currency: currency.into(),
        amount,
        business_status: BusinessStatus::Verified,
        direction: Direction::Pay,
        settlement_type: SettlementType::Gross,
    }
}
