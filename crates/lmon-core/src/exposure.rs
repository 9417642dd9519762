//! Exposure limit lookup — the USD threshold above which a PAY+VERIFIED
//! settlement's group can derive BLOCKED.
//!
//! MVP mode returns one fixed limit for every counterparty; the trait exists
//! so a counterparty-keyed table can be substituted without touching the
//! status deriver.

use async_trait::async_trait;
use rust_decimal::Decimal;

#[async_trait]
pub trait ExposureLimitProvider: Send + Sync {
    async fn limit_for(&self, counterparty_id: &str) -> Decimal;
}

/// Returns the same configured limit regardless of `counterparty_id`.
pub struct FixedExposureLimitProvider {
    limit: Decimal,
}

impl FixedExposureLimitProvider {
    pub fn new(limit: Decimal) -> Self {
        Self { limit }
    }
}

#[async_trait]
impl ExposureLimitProvider for FixedExposureLimitProvider {
    async fn limit_for(&self, _counterparty_id: &str) -> Decimal {
        self.limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[tokio::test]
    async fn fixed_provider_ignores_counterparty() {
        let provider = FixedExposureLimitProvider::new(Decimal::from_str("500000000.00").unwrap());
        assert_eq!(provider.limit_for("CP1").await, provider.limit_for("CP2").await);
    }
}
