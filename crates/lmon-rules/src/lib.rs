//! The calculation-rule cache: fetch, cache, and serve per-(PTS, processing
//! entity) inclusion rules.
//!
//! - **Load path**: `RuleCache::initialize` blocks process start until the
//!   first successful fetch; failure is fatal.
//! - **Refresh path**: a periodic task calls `refresh_once`; on success it
//!   atomically replaces the in-memory map with a single `ArcSwap::store`,
//!   so a reader's `get` never observes a half-updated map (§5). On failure
//!   the last-good map is retained and the failure is logged.
//! - **Lookup**: `get` always succeeds, falling back to the default rule
//!   with a warning when the key isn't cached.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use async_trait::async_trait;

use lmon_errors::{Error, Result};
use lmon_schemas::CalculationRule;

/// The external collaborator contract for fetching the full rule set. The
/// production implementation calls an upstream HTTP endpoint; tests and
/// environments without one use `StaticRuleProvider`.
#[async_trait]
pub trait RuleProvider: Send + Sync {
    async fn fetch_rules(&self) -> Result<Vec<CalculationRule>>;
}

fn rule_key(pts: &str, processing_entity: &str) -> String {
    format!("{pts}:{processing_entity}")
}

type RuleMap = HashMap<String, CalculationRule>;

/// Fetches the rule list from an HTTP endpoint returning a JSON array
/// shaped as (`pts`, `processingEntity`, `includedBusinessStatuses[]`,
/// `includedDirections[]`, `includedSettlementTypes[]`).
pub struct HttpRuleProvider {
    client: reqwest::Client,
    url: String,
}

impl HttpRuleProvider {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .expect("reqwest client builder"),
            url: url.into(),
        }
    }
}

#[derive(serde::Deserialize)]
struct WireRule {
    pts: String,
    #[serde(rename = "processingEntity")]
    processing_entity: String,
    #[serde(rename = "includedBusinessStatuses")]
    included_business_statuses: Vec<String>,
    #[serde(rename = "includedDirections")]
    included_directions: Vec<String>,
    #[serde(rename = "includedSettlementTypes")]
    included_settlement_types: Vec<String>,
}

#[async_trait]
impl RuleProvider for HttpRuleProvider {
    async fn fetch_rules(&self) -> Result<Vec<CalculationRule>> {
        let wire: Vec<WireRule> = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        wire.into_iter()
            .map(|w| {
                let included_business_statuses = w
                    .included_business_statuses
                    .iter()
                    .map(|s| {
                        lmon_schemas::BusinessStatus::parse(s)
                            .ok_or_else(|| Error::Upstream(format!("rule provider: unknown business status {s}")))
                    })
                    .collect::<Result<Vec<_>>>()?;
                let included_directions = w
                    .included_directions
                    .iter()
                    .map(|s| {
                        lmon_schemas::Direction::parse(s)
                            .ok_or_else(|| Error::Upstream(format!("rule provider: unknown direction {s}")))
                    })
                    .collect::<Result<Vec<_>>>()?;
                let included_settlement_types = w
                    .included_settlement_types
                    .iter()
                    .map(|s| {
                        lmon_schemas::SettlementType::parse(s)
                            .ok_or_else(|| Error::Upstream(format!("rule provider: unknown settlement type {s}")))
                    })
                    .collect::<Result<Vec<_>>>()?;

                Ok(CalculationRule {
                    pts: w.pts,
                    processing_entity: w.processing_entity,
                    included_business_statuses,
                    included_directions,
                    included_settlement_types,
                })
            })
            .collect()
    }
}

/// A provider that always returns an empty rule set — every lookup then
/// resolves to the default rule. Used when no rule provider endpoint is
/// configured, and in tests.
pub struct StaticRuleProvider {
    rules: Vec<CalculationRule>,
}

impl StaticRuleProvider {
    pub fn new(rules: Vec<CalculationRule>) -> Self {
        Self { rules }
    }

    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }
}

#[async_trait]
impl RuleProvider for StaticRuleProvider {
    async fn fetch_rules(&self) -> Result<Vec<CalculationRule>> {
        Ok(self.rules.clone())
    }
}

/// Lock-free, atomically-swapped cache of calculation rules keyed by
/// `pts:processing_entity`.
pub struct RuleCache {
    provider: Box<dyn RuleProvider>,
    map: ArcSwap<RuleMap>,
}

impl RuleCache {
    pub fn new(provider: Box<dyn RuleProvider>) -> Self {
        Self {
            provider,
            map: ArcSwap::from_pointee(HashMap::new()),
        }
    }

    /// Blocks until the first fetch succeeds. Callers must treat a failure
    /// here as a fatal startup error.
    pub async fn initialize(&self) -> Result<()> {
        let rules = self
            .provider
            .fetch_rules()
            .await
            .map_err(|e| Error::Fatal(format!("rule cache initial load failed: {e}")))?;

        self.map.store(Arc::new(to_map(rules)));
        Ok(())
    }

    /// Attempts one refresh. On success, atomically replaces the map. On
    /// failure, logs a warning and leaves the last-good map untouched.
    pub async fn refresh_once(&self) {
        match self.provider.fetch_rules().await {
            Ok(rules) => {
                self.map.store(Arc::new(to_map(rules)));
                tracing::debug!("rule cache refreshed");
            }
            Err(e) => {
                tracing::warn!(error = %e, "rule cache refresh failed, retaining last-good map");
            }
        }
    }

    /// Spawns the periodic refresh task on the current Tokio runtime. The
    /// returned handle may be aborted to stop refreshing (e.g. on shutdown).
    pub fn spawn_refresh_task(self: Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await; // first tick fires immediately; skip it, initialize() already ran
            loop {
                ticker.tick().await;
                self.refresh_once().await;
            }
        })
    }

    /// Returns the cached rule for `(pts, processing_entity)`, or the
    /// default rule (with a warning) when nothing is cached for that key.
    /// Never fails.
    pub fn get(&self, pts: &str, processing_entity: &str) -> CalculationRule {
        let map = self.map.load();
        match map.get(&rule_key(pts, processing_entity)) {
            Some(rule) => rule.clone(),
            None => {
                tracing::warn!(pts, processing_entity, "no cached rule, using default rule");
                CalculationRule::default_for(pts, processing_entity)
            }
        }
    }
}

fn to_map(rules: Vec<CalculationRule>) -> RuleMap {
    rules
        .into_iter()
        .map(|r| (rule_key(&r.pts, &r.processing_entity), r))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use lmon_schemas::{BusinessStatus, Direction, SettlementType};

    #[tokio::test]
    async fn get_falls_back_to_default_rule_when_uncached() {
        let cache = RuleCache::new(Box::new(StaticRuleProvider::empty()));
        cache.initialize().await.unwrap();

        let rule = cache.get("PTS1", "PE1");
        assert_eq!(rule, CalculationRule::default_for("PTS1", "PE1"));
    }

    #[tokio::test]
    async fn get_returns_cached_rule_after_initialize() {
        let rule = CalculationRule {
            pts: "PTS1".into(),
            processing_entity: "PE1".into(),
            included_business_statuses: vec![BusinessStatus::Verified],
            included_directions: vec![Direction::Pay, Direction::Receive],
            included_settlement_types: vec![SettlementType::Net],
        };
        let cache = RuleCache::new(Box::new(StaticRuleProvider::new(vec![rule.clone()])));
        cache.initialize().await.unwrap();

        assert_eq!(cache.get("PTS1", "PE1"), rule);
    }

    #[tokio::test]
    async fn initialize_fails_fatally_when_provider_errors() {
        struct FailingProvider;
        #[async_trait]
        impl RuleProvider for FailingProvider {
            async fn fetch_rules(&self) -> Result<Vec<CalculationRule>> {
                Err(Error::Upstream("boom".into()))
            }
        }

        let cache = RuleCache::new(Box::new(FailingProvider));
        let err = cache.initialize().await.unwrap_err();
        assert!(matches!(err, Error::Fatal(_)));
    }

    #[tokio::test]
    async fn refresh_once_retains_last_good_map_on_failure() {
        struct FlakyProvider {
            calls: std::sync::atomic::AtomicUsize,
        }
        #[async_trait]
        impl RuleProvider for FlakyProvider {
            async fn fetch_rules(&self) -> Result<Vec<CalculationRule>> {
                let n = self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                if n == 0 {
                    Ok(vec![CalculationRule::default_for("PTS1", "PE1")])
                } else {
                    Err(Error::Upstream("transient".into()))
                }
            }
        }

        let cache = RuleCache::new(Box::new(FlakyProvider {
            calls: std::sync::atomic::AtomicUsize::new(0),
        }));
        cache.initialize().await.unwrap();
        cache.refresh_once().await;

        assert_eq!(cache.get("PTS1", "PE1"), CalculationRule::default_for("PTS1", "PE1"));
    }
}
