use ::csv::{QuoteStyle, Terminator, WriterBuilder};
use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::{AppError, Result};
use crate::types::{HorizonResult, MarketSummary};

pub const CSV_COLUMNS: [&str; 24] = [
    "chain_id",
    "market_address",
    "market_name",
    "protocol",
    "underlying_symbol",
    "maturity_timestamp",
    "maturity_date",
    "lead_days",
    "t0_timestamp",
    "t0_date",
    "implied_apy",
    "realized_apy",
    "pt_price",
    "error_signed",
    "error_abs",
    "error_rel_pct",
    "liquidity_usd",
    "trading_volume",
    "pendle_incentive_apy",
    "lp_reward_apy",
    "underlying_reward_apy",
    "total_tvl",
    "total_pt",
    "total_sy",
];

/// Yields, prices and errors.
const RATE_DECIMALS: usize = 6;
/// Dollar amounts, volumes and balances.
const AMOUNT_DECIMALS: usize = 2;

/// One record per (market, horizon) pair with a signed error, header first.
pub fn render_csv(markets: &[MarketSummary]) -> Result<String> {
    let mut wtr = WriterBuilder::new()
        .quote_style(QuoteStyle::Necessary)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    wtr.write_record(CSV_COLUMNS)?;
    for market in markets {
        for result in &market.horizons {
            if let Some(fields) = csv_fields(market, result) {
                wtr.write_record(&fields)?;
            }
        }
    }

    let bytes = wtr.into_inner().map_err(|e| AppError::Io(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| AppError::Invariant(format!("csv output: {e}")))
}

fn csv_fields(market: &MarketSummary, r: &HorizonResult) -> Option<Vec<String>> {
    r.signed_error?;
    let m = &market.market;
    let aux = &r.metrics;

    Some(vec![
        m.chain_id.to_string(),
        m.address.clone(),
        m.name.clone(),
        m.protocol.clone(),
        m.underlying_symbol.clone(),
        m.maturity.timestamp_millis().to_string(),
        iso(m.maturity),
        r.horizon_days.to_string(),
        r.t0.timestamp_millis().to_string(),
        iso(r.t0),
        fixed(Some(r.implied_apy), RATE_DECIMALS),
        fixed(Some(r.realized_apy), RATE_DECIMALS),
        fixed(Some(r.bond_price), RATE_DECIMALS),
        fixed(r.signed_error, RATE_DECIMALS),
        fixed(r.absolute_error, RATE_DECIMALS),
        fixed(r.relative_error_pct, RATE_DECIMALS),
        fixed(aux.liquidity_usd, AMOUNT_DECIMALS),
        fixed(aux.trading_volume, AMOUNT_DECIMALS),
        fixed(aux.pendle_apy, RATE_DECIMALS),
        fixed(aux.lp_reward_apy, RATE_DECIMALS),
        fixed(aux.underlying_reward_apy, RATE_DECIMALS),
        fixed(aux.total_tvl, AMOUNT_DECIMALS),
        fixed(aux.total_pt, AMOUNT_DECIMALS),
        fixed(aux.total_sy, AMOUNT_DECIMALS),
    ])
}

fn iso(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn fixed(v: Option<f64>, decimals: usize) -> String {
    match v {
        Some(x) if x.is_finite() => format!("{x:.decimals$}"),
        _ => String::new(),
    }
}
