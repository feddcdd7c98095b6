use chrono::{DateTime, Utc};

use super::mean;
use crate::types::{DashboardSummary, HorizonBreakdown, HorizonResult, MarketSummary};

/// Fold per-market summaries into the chain-wide view.
///
/// Overall MAE and mean signed error are taken over the flattened set of
/// horizon results, so a market with seven scored horizons weighs seven times
/// as much as a market with one. Markets without any scored horizon are
/// dropped from the list.
pub fn summarize_dashboard(
    chain_id: u64,
    total_expired_markets: usize,
    markets: Vec<MarketSummary>,
    horizon_order: &[u32],
    generated_at: DateTime<Utc>,
) -> DashboardSummary {
    let markets: Vec<MarketSummary> = markets
        .into_iter()
        .filter(|m| !m.horizons.is_empty())
        .collect();

    let scored: Vec<&HorizonResult> = markets
        .iter()
        .flat_map(|m| m.horizons.iter())
        .filter(|r| r.absolute_error.is_some())
        .collect();

    let by_horizon = horizon_order
        .iter()
        .filter_map(|&days| {
            let at_horizon: Vec<&HorizonResult> = scored
                .iter()
                .copied()
                .filter(|r| r.horizon_days == days)
                .collect();
            if at_horizon.is_empty() {
                return None;
            }
            Some(HorizonBreakdown {
                horizon_days: days,
                observations: at_horizon.len(),
                mean_absolute_error: mean(at_horizon.iter().filter_map(|r| r.absolute_error)),
                mean_signed_error: mean(at_horizon.iter().filter_map(|r| r.signed_error)),
            })
        })
        .collect();

    DashboardSummary {
        chain_id,
        generated_at,
        total_expired_markets,
        markets_with_data: markets.len(),
        overall_mae: mean(scored.iter().filter_map(|r| r.absolute_error)),
        overall_mean_signed_error: mean(scored.iter().filter_map(|r| r.signed_error)),
        by_horizon,
        markets,
    }
}
