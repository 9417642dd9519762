//! Environment-driven configuration for the settlement exposure monitor.
//!
//! One `AppConfig::from_env()` call at startup: a typed constant per
//! variable, a documented default, and a single place callers go to find
//! out what's configurable.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use rust_decimal::Decimal;

pub const ENV_DATABASE_URL: &str = "LMON_DATABASE_URL";
pub const ENV_BIND_ADDR: &str = "LMON_BIND_ADDR";
pub const ENV_RULE_REFRESH_SECS: &str = "LMON_RULE_REFRESH_SECS";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "LMON_REQUEST_TIMEOUT_SECS";
pub const ENV_DEFAULT_EXPOSURE_LIMIT_USD: &str = "LMON_DEFAULT_EXPOSURE_LIMIT_USD";
pub const ENV_MISSING_RATE_POLICY: &str = "LMON_MISSING_RATE_POLICY";
pub const ENV_DB_MAX_CONNECTIONS: &str = "LMON_DB_MAX_CONNECTIONS";
pub const ENV_RULE_PROVIDER_URL: &str = "LMON_RULE_PROVIDER_URL";

/// How the subtotal engine treats a settlement whose currency has no row in
/// `EXCHANGE_RATE`. Passing through is observably benign only for USD; for
/// other currencies it silently understates exposure, so this is exposed as
/// an explicit choice rather than hardcoded. `PassThrough` is the literal
/// MERGE behavior; `Reject` is the stricter alternative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingRatePolicy {
    /// Treat a missing rate as 1.0 (USD passthrough). Default.
    PassThrough,
    /// Fail the recompute (and therefore the ingestion) if any contributing
    /// row's currency has no exchange rate.
    Reject,
}

impl MissingRatePolicy {
    fn parse(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "PASS_THROUGH" | "PASSTHROUGH" => Ok(MissingRatePolicy::PassThrough),
            "REJECT" => Ok(MissingRatePolicy::Reject),
            other => Err(anyhow!(
                "invalid {ENV_MISSING_RATE_POLICY} value: {other} (expected PASS_THROUGH or REJECT)"
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub rule_refresh_interval: Duration,
    pub request_timeout: Duration,
    pub default_exposure_limit_usd: Decimal,
    pub missing_rate_policy: MissingRatePolicy,
    pub db_max_connections: u32,
    /// Upper bound on concurrently in-flight ingestion requests, roughly
    /// matched to the DB pool size; requests beyond this surface 429 rather
    /// than queuing unboundedly (§5 backpressure).
    pub max_in_flight_requests: usize,
    /// Optional HTTP endpoint for `HttpRuleProvider`. When absent, the
    /// daemon falls back to a provider that only ever returns the empty
    /// rule set (every lookup then resolves to the default rule).
    pub rule_provider_url: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let database_url = std::env::var(ENV_DATABASE_URL)
            .with_context(|| format!("missing env var {ENV_DATABASE_URL}"))?;

        let bind_addr = env_parse_or(ENV_BIND_ADDR, SocketAddr::from(([127, 0, 0, 1], 8080)))?;

        let rule_refresh_interval =
            Duration::from_secs(env_parse_or::<u64>(ENV_RULE_REFRESH_SECS, 300)?);

        let request_timeout =
            Duration::from_secs(env_parse_or::<u64>(ENV_REQUEST_TIMEOUT_SECS, 5)?);

        let default_exposure_limit_usd = match std::env::var(ENV_DEFAULT_EXPOSURE_LIMIT_USD) {
            Ok(v) => Decimal::from_str(&v)
                .with_context(|| format!("invalid {ENV_DEFAULT_EXPOSURE_LIMIT_USD}: {v}"))?,
            Err(_) => Decimal::from_str("500000000.00").expect("literal is valid"),
        };

        let missing_rate_policy = match std::env::var(ENV_MISSING_RATE_POLICY) {
            Ok(v) => MissingRatePolicy::parse(&v)?,
            Err(_) => MissingRatePolicy::PassThrough,
        };

        let db_max_connections = env_parse_or::<u32>(ENV_DB_MAX_CONNECTIONS, 10)?;
        let max_in_flight_requests = db_max_connections as usize;

        let rule_provider_url = std::env::var(ENV_RULE_PROVIDER_URL).ok();

        Ok(Self {
            database_url,
            bind_addr,
            rule_refresh_interval,
            request_timeout,
            default_exposure_limit_usd,
            missing_rate_policy,
            db_max_connections,
            max_in_flight_requests,
            rule_provider_url,
        })
    }
}

fn env_parse_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(v) => v
            .parse::<T>()
            .map_err(|e| anyhow!("invalid {key}={v}: {e}")),
        Err(_) => Ok(default),
    }
}
