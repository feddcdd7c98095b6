use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::api::health::HealthState;
use crate::config::KNOWN_CHAINS;
use crate::engine::AccuracyEngine;
use crate::error::{AppError, Result};
use crate::export::render_csv;
use crate::state::ResultCache;
use crate::types::{DashboardSummary, MarketAnalysis, MarketSummary};

#[derive(Clone)]
pub struct ApiState {
    pub engine: Arc<AccuracyEngine>,
    pub cache: Arc<ResultCache>,
    pub health: Arc<HealthState>,
    pub default_chain_id: u64,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/markets", get(get_dashboard))
        .route("/markets/:address", get(get_market))
        .route("/export/csv", get(get_csv))
        .route("/chains", get(get_chains))
        .route("/cache/clear", post(clear_cache))
        .route("/health", get(get_health))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Query param structs
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainQuery {
    pub chain_id: Option<u64>,
    /// `false` bypasses the result cache.
    pub cache: Option<bool>,
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct Cached<T> {
    #[serde(flatten)]
    pub data: T,
    pub cached: bool,
}

#[derive(Serialize)]
pub struct ChainResponse {
    pub id: u64,
    pub name: &'static str,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub last_dashboard_at_ms: Option<i64>,
    pub dashboard_runs: u64,
    pub upstream_failures: u64,
    pub cache_entries: usize,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn get_dashboard(
    State(state): State<ApiState>,
    Query(params): Query<ChainQuery>,
) -> Result<Json<Cached<DashboardSummary>>> {
    let chain_id = params.chain_id.unwrap_or(state.default_chain_id);
    let (data, cached) = dashboard(&state, chain_id, params.cache.unwrap_or(true)).await?;
    Ok(Json(Cached { data, cached }))
}

async fn get_market(
    State(state): State<ApiState>,
    Path(address): Path<String>,
    Query(params): Query<ChainQuery>,
) -> Result<Json<Cached<MarketSummary>>> {
    let chain_id = params.chain_id.unwrap_or(state.default_chain_id);
    let use_cache = params.cache.unwrap_or(true);

    if use_cache {
        if let Some(data) = state.cache.get_market(chain_id, &address) {
            return Ok(Json(Cached { data, cached: true }));
        }
    }

    let market = observe(&state, state.engine.find_market(chain_id, &address).await)?
        .ok_or_else(|| AppError::NotFound(format!("market {address} on chain {chain_id}")))?;

    let analysis = observe(&state, state.engine.analyze_market(&market).await)?;
    let data = match analysis {
        MarketAnalysis::Analyzed(summary) => summary,
        MarketAnalysis::NotApplicable => {
            return Err(AppError::NotFound(format!("market {address} has not matured")))
        }
        MarketAnalysis::NoData => {
            return Err(AppError::NotFound(format!("no usable history for market {address}")))
        }
    };

    state.cache.put_market(data.clone());
    Ok(Json(Cached { data, cached: false }))
}

async fn get_csv(
    State(state): State<ApiState>,
    Query(params): Query<ChainQuery>,
) -> Result<impl IntoResponse> {
    let chain_id = params.chain_id.unwrap_or(state.default_chain_id);
    let (summary, _) = dashboard(&state, chain_id, params.cache.unwrap_or(true)).await?;
    let body = render_csv(&summary.markets)?;
    let disposition = format!("attachment; filename=\"pendle-yt-accuracy-chain{chain_id}.csv\"");

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    ))
}

async fn get_chains() -> Json<Vec<ChainResponse>> {
    Json(
        KNOWN_CHAINS
            .iter()
            .map(|&(id, name)| ChainResponse { id, name })
            .collect(),
    )
}

async fn clear_cache(State(state): State<ApiState>) -> Json<serde_json::Value> {
    let cleared = state.cache.entry_count();
    state.cache.clear();
    Json(serde_json::json!({ "cleared": cleared }))
}

async fn get_health(State(state): State<ApiState>) -> Json<HealthResponse> {
    let last = state.health.last_dashboard_at_ms();
    Json(HealthResponse {
        status: "ok",
        last_dashboard_at_ms: (last > 0).then_some(last),
        dashboard_runs: state.health.dashboard_runs(),
        upstream_failures: state.health.upstream_failures(),
        cache_entries: state.cache.entry_count(),
    })
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Read-through dashboard lookup shared by the JSON and CSV endpoints.
async fn dashboard(
    state: &ApiState,
    chain_id: u64,
    use_cache: bool,
) -> Result<(DashboardSummary, bool)> {
    if use_cache {
        if let Some(hit) = state.cache.get_dashboard(chain_id) {
            return Ok((hit, true));
        }
    }

    let summary = observe(state, state.engine.analyze_dashboard(chain_id).await)?;
    state
        .health
        .record_dashboard_run(summary.generated_at.timestamp_millis());
    state.cache.put_dashboard(summary.clone());
    Ok((summary, false))
}

fn observe<T>(state: &ApiState, result: Result<T>) -> Result<T> {
    if let Err(e) = &result {
        if matches!(
            e,
            AppError::Http(_) | AppError::RateLimited(_) | AppError::Upstream { .. }
        ) {
            state.health.inc_upstream_failures();
        }
        error!("Request failed: {e}");
    }
    result
}
