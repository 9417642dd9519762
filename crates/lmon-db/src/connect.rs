use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use lmon_errors::{Error, Result};

/// Connect to Postgres using the given URL and pool size.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
        .map_err(|e| Error::Fatal(format!("failed to connect to Postgres: {e}")))
}

/// Run the embedded SQLx migrations.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| Error::Fatal(format!("db migrate failed: {e}")))?;
    Ok(())
}

/// Test/CLI helper: connect using `LMON_DATABASE_URL` and ensure migrations
/// are applied.
pub async fn testkit_db_pool() -> Result<PgPool> {
    let url = std::env::var(lmon_config::ENV_DATABASE_URL)
        .map_err(|_| Error::Fatal(format!("missing env var {}", lmon_config::ENV_DATABASE_URL)))?;
    let pool = connect(&url, 5).await?;
    migrate(&pool).await?;
    Ok(pool)
}

#[derive(Debug, Clone)]
pub struct DbStatus {
    pub ok: bool,
    pub has_settlement_table: bool,
}

/// Simple status query: connectivity plus schema presence, used by the
/// health endpoint and the `lmon-cli db status` command.
pub async fn status(pool: &PgPool) -> Result<DbStatus> {
    let (one,): (i32,) = sqlx::query_as("select 1").fetch_one(pool).await?;

    let (exists,): (bool,) = sqlx::query_as(
        r#"
        select exists (
            select 1
            from information_schema.tables
            where table_schema = 'public' and table_name = 'settlement'
        )
        "#,
    )
    .fetch_one(pool)
    .await?;

    Ok(DbStatus {
        ok: one == 1,
        has_settlement_table: exists,
    })
}
