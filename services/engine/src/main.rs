use anyhow::Result;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cache;
mod config;
mod delivery;
mod errors;
mod evaluator;
mod keys;
mod ledger;
mod period;
mod precalc;
mod selector;
mod store;

use cache::{CombinationCache, RedisCatalogSource};
use config::Config;
use delivery::{RedisQueueSettlementSink, ResultDelivery, SettlementSink};
use ledger::{ExposureLedger, RedisExposureLedger};
use precalc::lock::{PeriodLock, RedisPeriodLock};
use precalc::PreCalcScheduler;
use selector::OptimalSelector;
use store::{RedisResultStore, ResultStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured logging with JSON formatting (configurable via env)
    let use_json = std::env::var("LOG_FORMAT")
        .unwrap_or_else(|_| "json".to_string())
        .eq_ignore_ascii_case("json");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "engine=info".into());

    if use_json {
        // JSON structured logging for production
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        // Human-readable logging for development
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    tracing::info!(
        service = "engine",
        version = env!("CARGO_PKG_VERSION"),
        log_format = if use_json { "json" } else { "text" },
        "Starting exposure engine"
    );

    // Load configuration
    let config = Config::load()?;
    tracing::info!(
        durations = ?config.precalc.durations_secs,
        scan_chunks = config.scan.chunk_count,
        scan_deadline_ms = config.scan.deadline_ms,
        "Configuration loaded"
    );

    // Initialize Redis connection
    let redis_client = redis::Client::open(config.redis.url.clone())?;
    let redis_conn = redis_client.get_connection_manager().await?;
    tracing::info!("Redis connected");

    // Seed and load the combination catalog; a load failure degrades to
    // direct enumeration instead of refusing to start.
    let catalog_source = RedisCatalogSource::new(redis_conn.clone());
    if let Err(e) = catalog_source.seed_if_empty().await {
        tracing::warn!(error = %e, "Catalog seeding failed");
    }

    let cache = CombinationCache::new();
    match cache.load(&catalog_source).await {
        Ok(()) => tracing::info!("Combination catalog cached"),
        Err(e) => {
            tracing::warn!(error = %e, "Catalog cache unavailable, running in degraded enumeration mode");
            metrics::counter!("cache_degraded_mode_total").increment(1);
        }
    }

    // Wire the engine components
    let ledger: Arc<dyn ExposureLedger> = Arc::new(RedisExposureLedger::new(
        redis_conn.clone(),
        config.precalc.ledger_ttl_secs,
    ));
    let lock: Arc<dyn PeriodLock> = Arc::new(RedisPeriodLock::new(
        redis_conn.clone(),
        config.precalc.lock_ttl_ms,
    ));
    let result_store: Arc<dyn ResultStore> = Arc::new(RedisResultStore::new(
        redis_conn.clone(),
        config.precalc.result_ttl_secs,
    ));
    let sink: Arc<dyn SettlementSink> = Arc::new(RedisQueueSettlementSink::new(redis_conn));
    let selector = Arc::new(OptimalSelector::new(cache.view(), &config.scan));

    let delivery = Arc::new(ResultDelivery::new(
        ledger.clone(),
        result_store.clone(),
        selector.clone(),
        sink,
    ));

    let scheduler = Arc::new(PreCalcScheduler::new(
        ledger,
        lock,
        result_store,
        selector,
        delivery,
        config.precalc.clone(),
    ));

    // Start metrics server
    let metrics_handle = tokio::spawn(start_metrics_server(config.metrics_port));

    // Start the scheduler
    let scheduler_handle = tokio::spawn(scheduler.run());

    tracing::info!("Engine running");

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");

    scheduler_handle.abort();
    metrics_handle.abort();

    tracing::info!("Engine stopped");

    Ok(())
}

async fn start_metrics_server(port: u16) -> Result<()> {
    use axum::{routing::get, Router};
    use std::net::SocketAddr;

    let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    let handle = builder.install_recorder()?;

    let app = Router::new().route("/metrics", get(|| async move { handle.render() }));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Engine metrics listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
