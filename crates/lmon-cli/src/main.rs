//! lmon-cli: operational commands for the settlement exposure monitor —
//! database migration/status, exchange-rate seeding, and a one-shot rule
//! cache warm-up, as a thin `clap` wrapper over the core crates.

use std::str::FromStr;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;

use lmon_rules::RuleProvider;

#[derive(Parser)]
#[command(name = "lmon")]
#[command(about = "Settlement exposure monitor operational CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Database commands
    Db {
        #[command(subcommand)]
        cmd: DbCmd,
    },
    /// Exchange-rate seeding
    Rates {
        #[command(subcommand)]
        cmd: RatesCmd,
    },
    /// Rule cache commands
    Rules {
        #[command(subcommand)]
        cmd: RulesCmd,
    },
}

#[derive(Subcommand)]
enum DbCmd {
    /// Connectivity and schema presence check
    Status,
    /// Apply pending migrations
    Migrate,
}

#[derive(Subcommand)]
enum RatesCmd {
    /// Idempotent upsert of one currency's rate-to-USD
    Seed {
        #[arg(long)]
        currency: String,
        #[arg(long)]
        rate: String,
    },
    /// List all seeded rates
    List,
}

#[derive(Subcommand)]
enum RulesCmd {
    /// Fetch the rule set once from the configured provider and print a
    /// summary, without starting the daemon's periodic refresh loop.
    Warm,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Db { cmd } => run_db(cmd).await,
        Commands::Rates { cmd } => run_rates(cmd).await,
        Commands::Rules { cmd } => run_rules(cmd).await,
    }
}

async fn connect() -> Result<sqlx::PgPool> {
    let database_url =
        std::env::var(lmon_config::ENV_DATABASE_URL).with_context(|| format!("missing env var {}", lmon_config::ENV_DATABASE_URL))?;
    lmon_db::connect(&database_url, 5).await.map_err(Into::into)
}

async fn run_db(cmd: DbCmd) -> Result<()> {
    let pool = connect().await?;
    match cmd {
        DbCmd::Status => {
            let s = lmon_db::status(&pool).await?;
            println!("db_ok={} has_settlement_table={}", s.ok, s.has_settlement_table);
        }
        DbCmd::Migrate => {
            lmon_db::migrate(&pool).await?;
            println!("migrations_applied=true");
        }
    }
    Ok(())
}

async fn run_rates(cmd: RatesCmd) -> Result<()> {
    let pool = connect().await?;
    match cmd {
        RatesCmd::Seed { currency, rate } => {
            let rate = Decimal::from_str(&rate).with_context(|| format!("invalid rate: {rate}"))?;
            lmon_db::rates::upsert(&pool, &currency.to_uppercase(), rate).await?;
            println!("seeded {}={}", currency.to_uppercase(), rate);
        }
        RatesCmd::List => {
            for rate in lmon_db::rates::list_all(&pool).await? {
                println!("{}\t{}\t{}", rate.currency, rate.rate_to_usd, rate.update_time);
            }
        }
    }
    Ok(())
}

async fn run_rules(cmd: RulesCmd) -> Result<()> {
    match cmd {
        RulesCmd::Warm => {
            // Deliberately does not go through `AppConfig::from_env` — warming
            // the rule cache has no database dependency and shouldn't require
            // LMON_DATABASE_URL to be set.
            let url = std::env::var(lmon_config::ENV_RULE_PROVIDER_URL).ok();
            let timeout_secs: u64 = std::env::var(lmon_config::ENV_REQUEST_TIMEOUT_SECS)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5);

            let rules = match url {
                Some(url) => {
                    let provider = lmon_rules::HttpRuleProvider::new(url, std::time::Duration::from_secs(timeout_secs));
                    provider.fetch_rules().await?
                }
                None => {
                    println!("no rule provider URL configured, nothing to warm");
                    return Ok(());
                }
            };
            println!("fetched {} rule(s)", rules.len());
            for rule in rules {
                println!(
                    "{}:{} statuses={:?} directions={:?} types={:?}",
                    rule.pts,
                    rule.processing_entity,
                    rule.business_status_codes(),
                    rule.direction_codes(),
                    rule.settlement_type_codes()
                );
            }
        }
    }
    Ok(())
}
