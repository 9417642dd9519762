//! Persistence layer for the settlement exposure monitor: schema migrations
//! plus one module per owned table group — settlement store, subtotal
//! engine, approval ledger, exchange-rate store.

pub mod approvals;
pub mod connect;
pub mod rates;
pub mod settlement;
pub mod subtotal;

pub use connect::{connect, migrate, status, testkit_db_pool, DbStatus};

use sqlx::{PgPool, Postgres, Transaction};

use lmon_errors::Result;

/// Opens a transaction on `pool`. Thin wrapper kept at the crate root so
/// callers in `lmon-core` don't need to know sqlx's transaction type lives
/// behind `Postgres`.
pub async fn begin(pool: &PgPool) -> Result<Transaction<'static, Postgres>> {
    Ok(pool.begin().await?)
}
