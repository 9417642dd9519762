//! lmon-daemon entry point.
//!
//! This file is intentionally thin: it loads configuration, connects to
//! Postgres, blocks on the rule cache's initial load (fatal on failure per
//! fatal on failure), wires middleware, and starts the HTTP server. All route
//! handlers live in `routes.rs`; all shared state lives in `state.rs`.

use std::sync::Arc;

use axum::http::Method;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{error, info, Level};

use lmon_config::AppConfig;
use lmon_core::EventBus;
use lmon_daemon::{routes, state::AppState};
use lmon_rules::{HttpRuleProvider, RuleCache, RuleProvider, StaticRuleProvider};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env.local if present (dev convenience). Silent if absent —
    // production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid configuration, refusing to start");
            std::process::exit(1);
        }
    };

    let pool = match lmon_db::connect(&config.database_url, config.db_max_connections).await {
        Ok(pool) => pool,
        Err(e) => {
            error!(error = %e, "failed to connect to database, refusing to start");
            std::process::exit(1);
        }
    };

    if let Err(e) = lmon_db::migrate(&pool).await {
        error!(error = %e, "failed to apply migrations, refusing to start");
        std::process::exit(1);
    }

    let rule_provider: Box<dyn RuleProvider> = match &config.rule_provider_url {
        Some(url) => Box::new(HttpRuleProvider::new(url.clone(), config.request_timeout)),
        None => {
            info!("no rule provider URL configured, all (pts, pe) pairs resolve to the default rule");
            Box::new(StaticRuleProvider::empty())
        }
    };
    let rule_cache = Arc::new(RuleCache::new(rule_provider));

    // Fatal startup failure: the rule cache's initial load
    // must succeed before the process accepts any traffic.
    if let Err(e) = rule_cache.initialize().await {
        error!(error = %e, "rule cache initial load failed, refusing to start");
        std::process::exit(1);
    }
    rule_cache.clone().spawn_refresh_task(config.rule_refresh_interval);

    let events = EventBus::default();
    let shared = Arc::new(AppState::new(&config, pool, rule_cache, events));

    let app = routes::build_router(shared)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_permissive());

    info!("lmon-daemon listening on http://{}", config.bind_addr);

    axum::serve(
        tokio::net::TcpListener::bind(config.bind_addr).await?,
        app.into_make_service(),
    )
    .await?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();
}

/// The HTTP framing/CORS/static UI are out of scope for this core; this
/// permissive default exists so the (unspecified) UI can call the API
/// during development.
fn cors_permissive() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(tower_http::cors::Any)
}
