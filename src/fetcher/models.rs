//! Wire shapes of the Pendle core API and their conversion into domain types.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use tracing::debug;

use crate::types::{AuxMetrics, HistoryPoint, MarketDescriptor, MarketHistory};

#[derive(Debug, Deserialize)]
pub struct MarketsPage {
    pub total: usize,
    #[serde(default)]
    pub results: Vec<RawMarket>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAsset {
    #[serde(default)]
    pub symbol: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMarket {
    pub chain_id: u64,
    pub address: String,
    #[serde(default)]
    pub symbol: String,
    pub expiry: String,
    #[serde(default)]
    pub protocol: Option<String>,
    #[serde(default)]
    pub accounting_asset: Option<RawAsset>,
    #[serde(default)]
    pub underlying_asset: Option<RawAsset>,
}

impl RawMarket {
    /// `None` when the expiry cannot be parsed; such a market can never be analyzed.
    pub fn into_descriptor(self) -> Option<MarketDescriptor> {
        let maturity = parse_timestamp(&self.expiry)?;
        let name = self
            .accounting_asset
            .and_then(|a| a.symbol)
            .filter(|s| !s.is_empty())
            .unwrap_or(self.symbol);
        let underlying_symbol = self
            .underlying_asset
            .and_then(|a| a.symbol)
            .unwrap_or_default();

        Some(MarketDescriptor {
            chain_id: self.chain_id,
            address: self.address,
            name,
            protocol: self.protocol.unwrap_or_default(),
            underlying_symbol,
            maturity,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct RawHistory {
    #[serde(default)]
    pub timestamp_start: String,
    #[serde(default)]
    pub results: Vec<RawHistoryPoint>,
}

#[derive(Debug, Deserialize)]
pub struct RawLiquidity {
    pub usd: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawHistoryPoint {
    pub timestamp: String,
    pub implied_apy: Option<f64>,
    pub pt_discount: Option<f64>,
    pub liquidity: Option<RawLiquidity>,
    pub trading_volume: Option<f64>,
    pub pendle_apy: Option<f64>,
    pub lp_reward_apy: Option<f64>,
    pub underlying_reward_apy: Option<f64>,
    pub total_tvl: Option<f64>,
    pub total_pt: Option<f64>,
    pub total_sy: Option<f64>,
}

impl RawHistory {
    /// Drops points with unparseable timestamps and sorts the rest ascending.
    /// Falls back to the earliest point when `timestamp_start` is unreadable.
    pub fn into_history(self, market: &str) -> Option<MarketHistory> {
        let total = self.results.len();
        let mut points: Vec<HistoryPoint> = self
            .results
            .into_iter()
            .filter_map(RawHistoryPoint::into_point)
            .collect();
        if points.len() < total {
            debug!(
                "[FETCH] {market}: dropped {} history points with bad timestamps",
                total - points.len()
            );
        }
        points.sort_by_key(|p| p.timestamp);

        let observed_start = parse_timestamp(&self.timestamp_start)
            .or_else(|| points.first().map(|p| p.timestamp))?;

        Some(MarketHistory {
            observed_start,
            points,
        })
    }
}

impl RawHistoryPoint {
    fn into_point(self) -> Option<HistoryPoint> {
        Some(HistoryPoint {
            timestamp: parse_timestamp(&self.timestamp)?,
            pt_discount: self.pt_discount,
            implied_apy: self.implied_apy,
            metrics: AuxMetrics {
                liquidity_usd: self.liquidity.and_then(|l| l.usd),
                trading_volume: self.trading_volume,
                pendle_apy: self.pendle_apy,
                lp_reward_apy: self.lp_reward_apy,
                underlying_reward_apy: self.underlying_reward_apy,
                total_tvl: self.total_tvl,
                total_pt: self.total_pt,
                total_sy: self.total_sy,
            },
        })
    }
}

/// RFC 3339 timestamps, or bare `YYYY-MM-DD` dates taken as midnight UTC.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}
