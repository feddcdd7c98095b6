mod analytics;
mod api;
mod config;
mod engine;
mod error;
mod export;
mod fetcher;
mod scheduler;
mod state;
mod types;

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::api::health::HealthState;
use crate::api::routes::{router, ApiState};
use crate::config::{AnalysisConfig, Config};
use crate::engine::AccuracyEngine;
use crate::error::Result;
use crate::fetcher::{PendleClient, RetryPolicy};
use crate::scheduler::BatchScheduler;
use crate::state::ResultCache;

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    // --- Retrieval ---
    let client = PendleClient::new(&cfg, RetryPolicy::rate_limited())?;
    info!("Pendle API at {}", cfg.pendle_api_url);

    // --- Analysis engine ---
    let analysis = AnalysisConfig::default();
    info!(
        "Horizons {:?} days, match tolerance {}h, batches of {} with {}ms pause",
        analysis.horizons,
        analysis.match_tolerance.num_hours(),
        cfg.batch_size,
        cfg.batch_pause.as_millis(),
    );
    let engine = AccuracyEngine::new(
        Arc::new(client),
        analysis,
        BatchScheduler::new(cfg.batch_size, cfg.batch_pause),
    );

    // --- Result cache ---
    let cache = ResultCache::new(cfg.cache_ttl);
    info!("Result cache TTL {}s", cfg.cache_ttl.as_secs());

    // --- HTTP API server ---
    let api_state = ApiState {
        engine: Arc::new(engine),
        cache,
        health: Arc::new(HealthState::new()),
        default_chain_id: cfg.default_chain_id,
    };
    let app = router(api_state);
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr} (default chain {})", cfg.default_chain_id);

    axum::serve(listener, app).await?;

    Ok(())
}
