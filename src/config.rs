use std::time::Duration;

use crate::error::{AppError, Result};

pub const PENDLE_API_URL: &str = "https://api-v2.pendle.finance/core";

/// Lookback horizons (days before maturity), evaluated in this order.
pub const HORIZON_DAYS: &[u32] = &[90, 60, 30, 14, 7, 3, 1];

/// Maximum distance between a horizon instant and the observation used for it.
pub const MATCH_TOLERANCE_SECS: i64 = 2 * 24 * 3600;

/// Page size for the market listing endpoint (provider maximum).
pub const MARKETS_PAGE_SIZE: usize = 100;

/// Backoff schedule applied to rate-limited requests, in milliseconds.
/// One retry per entry; the request fails after the last one.
pub const RATE_LIMIT_BACKOFF_MS: &[u64] = &[1000, 2000, 4000];

/// Markets analyzed concurrently per batch.
pub const DEFAULT_BATCH_SIZE: usize = 5;

/// Pause between dashboard batches (milliseconds).
pub const DEFAULT_BATCH_PAUSE_MS: u64 = 2000;

/// Result cache time-to-live: 12 hours.
pub const DEFAULT_CACHE_TTL_SECS: u64 = 12 * 3600;

/// Chains offered by the dashboard chain selector.
pub const KNOWN_CHAINS: &[(u64, &str)] = &[
    (1, "Ethereum"),
    (42161, "Arbitrum"),
    (56, "BSC"),
    (8453, "Base"),
    (146, "Sonic"),
    (9745, "Plasma"),
];

#[derive(Debug, Clone)]
pub struct Config {
    pub pendle_api_url: String,
    pub log_level: String,
    pub api_port: u16,
    /// Chain used when a request omits `chainId` (DEFAULT_CHAIN_ID)
    pub default_chain_id: u64,
    pub cache_ttl: Duration,
    /// Concurrent market analyses per batch (BATCH_SIZE)
    pub batch_size: usize,
    /// Delay between batches (BATCH_PAUSE_MS)
    pub batch_pause: Duration,
    pub http_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            pendle_api_url: std::env::var("PENDLE_API_URL")
                .unwrap_or_else(|_| PENDLE_API_URL.to_string()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
            default_chain_id: std::env::var("DEFAULT_CHAIN_ID")
                .unwrap_or_else(|_| "1".to_string())
                .parse::<u64>()
                .map_err(|_| AppError::Config("DEFAULT_CHAIN_ID must be an integer".to_string()))?,
            cache_ttl: Duration::from_secs(
                std::env::var("CACHE_TTL_SECS")
                    .ok()
                    .and_then(|s| s.parse::<u64>().ok())
                    .unwrap_or(DEFAULT_CACHE_TTL_SECS),
            ),
            batch_size: std::env::var("BATCH_SIZE")
                .ok()
                .and_then(|s| s.parse::<usize>().ok())
                .filter(|n| *n > 0)
                .unwrap_or(DEFAULT_BATCH_SIZE),
            batch_pause: Duration::from_millis(
                std::env::var("BATCH_PAUSE_MS")
                    .ok()
                    .and_then(|s| s.parse::<u64>().ok())
                    .unwrap_or(DEFAULT_BATCH_PAUSE_MS),
            ),
            http_timeout: Duration::from_secs(
                std::env::var("HTTP_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse::<u64>().ok())
                    .unwrap_or(30),
            ),
        })
    }
}

/// Immutable parameters of a single-market analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    pub horizons: Vec<u32>,
    pub match_tolerance: chrono::Duration,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            horizons: HORIZON_DAYS.to_vec(),
            match_tolerance: chrono::Duration::seconds(MATCH_TOLERANCE_SECS),
        }
    }
}
