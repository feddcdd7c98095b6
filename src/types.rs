use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Market
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketDescriptor {
    pub chain_id: u64,
    pub address: String,
    pub name: String,
    pub protocol: String,
    pub underlying_symbol: String,
    pub maturity: DateTime<Utc>,
}

impl MarketDescriptor {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.maturity < now
    }
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

/// Per-observation metrics carried alongside the yield data. Copied verbatim
/// into every `HorizonResult` derived from the observation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuxMetrics {
    pub liquidity_usd: Option<f64>,
    pub trading_volume: Option<f64>,
    pub pendle_apy: Option<f64>,
    pub lp_reward_apy: Option<f64>,
    pub underlying_reward_apy: Option<f64>,
    pub total_tvl: Option<f64>,
    pub total_pt: Option<f64>,
    pub total_sy: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    pub timestamp: DateTime<Utc>,
    /// PT discount to redemption value; bond price = 1 - discount.
    pub pt_discount: Option<f64>,
    pub implied_apy: Option<f64>,
    pub metrics: AuxMetrics,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketHistory {
    /// First instant covered by the provider's series for this market.
    pub observed_start: DateTime<Utc>,
    /// Ordered by timestamp ascending.
    pub points: Vec<HistoryPoint>,
}

// ---------------------------------------------------------------------------
// Analysis results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HorizonResult {
    pub horizon_days: u32,
    /// maturity - horizon_days
    pub t0: DateTime<Utc>,
    /// Timestamp of the observation matched to `t0`.
    pub observed_at: DateTime<Utc>,
    pub implied_apy: f64,
    pub realized_apy: f64,
    pub bond_price: f64,
    /// implied - realized
    pub signed_error: Option<f64>,
    pub absolute_error: Option<f64>,
    /// signed_error / |realized| * 100; absent when realized is exactly zero.
    pub relative_error_pct: Option<f64>,
    #[serde(flatten)]
    pub metrics: AuxMetrics,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccuracyStats {
    pub mean_absolute_error: Option<f64>,
    pub mean_signed_error: Option<f64>,
    pub mean_relative_absolute_error: Option<f64>,
    pub valid_horizons: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSummary {
    #[serde(flatten)]
    pub market: MarketDescriptor,
    /// In horizon evaluation order.
    pub horizons: Vec<HorizonResult>,
    pub overall: AccuracyStats,
}

/// Outcome of analyzing one market. Only `Analyzed` carries numbers; the other
/// two are distinct "nothing to report" states, never zero error.
#[derive(Debug, Clone, PartialEq)]
pub enum MarketAnalysis {
    Analyzed(MarketSummary),
    NoData,
    NotApplicable,
}

impl MarketAnalysis {
    pub fn into_summary(self) -> Option<MarketSummary> {
        match self {
            MarketAnalysis::Analyzed(s) => Some(s),
            MarketAnalysis::NoData | MarketAnalysis::NotApplicable => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HorizonBreakdown {
    pub horizon_days: u32,
    pub observations: usize,
    pub mean_absolute_error: Option<f64>,
    pub mean_signed_error: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub chain_id: u64,
    pub generated_at: DateTime<Utc>,
    pub total_expired_markets: usize,
    pub markets_with_data: usize,
    /// Mean over every horizon result of every retained market.
    pub overall_mae: Option<f64>,
    pub overall_mean_signed_error: Option<f64>,
    pub by_horizon: Vec<HorizonBreakdown>,
    pub markets: Vec<MarketSummary>,
}
