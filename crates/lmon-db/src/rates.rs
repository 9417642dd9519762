//! The exchange-rate store: idempotent upserts keyed by currency, and the
//! lookups the subtotal engine's missing-rate pre-check relies on.

use rust_decimal::Decimal;
use sqlx::PgPool;

use lmon_errors::Result;
use lmon_schemas::ExchangeRate;

/// USD is always rate 1 by convention.
pub const USD: &str = "USD";

/// Idempotent upsert of a currency's rate-to-USD.
pub async fn upsert(pool: &PgPool, currency: &str, rate_to_usd: Decimal) -> Result<()> {
    sqlx::query(
        r#"
        insert into exchange_rate (currency, rate_to_usd, update_time)
        values ($1, $2, now())
        on conflict (currency) do update
        set rate_to_usd = excluded.rate_to_usd, update_time = now()
        "#,
    )
    .bind(currency)
    .bind(rate_to_usd)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn find(pool: &PgPool, currency: &str) -> Result<Option<ExchangeRate>> {
    let row: Option<(String, Decimal, chrono::DateTime<chrono::Utc>)> = sqlx::query_as(
        r#"
        select currency, rate_to_usd, update_time from exchange_rate where currency = $1
        "#,
    )
    .bind(currency)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|(currency, rate_to_usd, update_time)| ExchangeRate {
        currency,
        rate_to_usd,
        update_time,
    }))
}

pub async fn list_all(pool: &PgPool) -> Result<Vec<ExchangeRate>> {
    let rows: Vec<(String, Decimal, chrono::DateTime<chrono::Utc>)> =
        sqlx::query_as("select currency, rate_to_usd, update_time from exchange_rate order by currency")
            .fetch_all(pool)
            .await?;

    Ok(rows
        .into_iter()
        .map(|(currency, rate_to_usd, update_time)| ExchangeRate {
            currency,
            rate_to_usd,
            update_time,
        })
        .collect())
}
