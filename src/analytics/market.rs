use chrono::{DateTime, Duration, Utc};

use super::{mean, nearest_preceding, realized_apy};
use crate::config::AnalysisConfig;
use crate::error::{AppError, Result};
use crate::types::{
    AccuracyStats, HorizonResult, MarketAnalysis, MarketDescriptor, MarketHistory, MarketSummary,
};

/// Evaluate the implied APY quoted at each horizon against the yield the PT
/// price at that instant actually locked in until maturity.
///
/// Pure over its inputs: the same market, history and `now` always produce the
/// same result. Horizons with no usable observation are skipped, not scored.
pub fn analyze_history(
    market: &MarketDescriptor,
    history: &MarketHistory,
    now: DateTime<Utc>,
    cfg: &AnalysisConfig,
) -> Result<MarketAnalysis> {
    if !market.is_expired(now) {
        return Ok(MarketAnalysis::NotApplicable);
    }
    if history.points.is_empty() {
        return Ok(MarketAnalysis::NoData);
    }

    let mut horizons = Vec::with_capacity(cfg.horizons.len());
    for &days in &cfg.horizons {
        if let Some(result) = evaluate_horizon(market, history, days, cfg)? {
            horizons.push(result);
        }
    }

    if horizons.is_empty() {
        return Ok(MarketAnalysis::NoData);
    }

    let overall = accuracy_stats(&horizons);
    Ok(MarketAnalysis::Analyzed(MarketSummary {
        market: market.clone(),
        horizons,
        overall,
    }))
}

fn evaluate_horizon(
    market: &MarketDescriptor,
    history: &MarketHistory,
    days: u32,
    cfg: &AnalysisConfig,
) -> Result<Option<HorizonResult>> {
    let t0 = market.maturity - Duration::days(i64::from(days));

    // Before the market existed
    if t0 < history.observed_start {
        return Ok(None);
    }

    let Some(point) = nearest_preceding(&history.points, t0, cfg.match_tolerance) else {
        return Ok(None);
    };
    let (Some(discount), Some(implied)) = (point.pt_discount, point.implied_apy) else {
        return Ok(None);
    };

    let bond_price = 1.0 - discount;
    let Some(realized) = realized_apy(bond_price, f64::from(days)) else {
        return Ok(None);
    };

    let signed = implied - realized;
    if !signed.is_finite() {
        return Err(AppError::Invariant(format!(
            "non-finite error for {} at {days}d (implied={implied}, realized={realized})",
            market.address
        )));
    }
    let relative = (realized != 0.0).then(|| signed / realized.abs() * 100.0);

    Ok(Some(HorizonResult {
        horizon_days: days,
        t0,
        observed_at: point.timestamp,
        implied_apy: implied,
        realized_apy: realized,
        bond_price,
        signed_error: Some(signed),
        absolute_error: Some(signed.abs()),
        relative_error_pct: relative,
        metrics: point.metrics.clone(),
    }))
}

/// Roll a market's horizon results into its summary statistics.
pub fn accuracy_stats(results: &[HorizonResult]) -> AccuracyStats {
    let scored: Vec<&HorizonResult> = results.iter().filter(|r| r.signed_error.is_some()).collect();
    AccuracyStats {
        mean_absolute_error: mean(scored.iter().filter_map(|r| r.absolute_error)),
        mean_signed_error: mean(scored.iter().filter_map(|r| r.signed_error)),
        mean_relative_absolute_error: mean(
            results.iter().filter_map(|r| r.relative_error_pct).map(f64::abs),
        ),
        valid_horizons: scored.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AuxMetrics, HistoryPoint};
    use chrono::TimeZone;

    fn maturity() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 27, 0, 0, 0).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    fn market() -> MarketDescriptor {
        MarketDescriptor {
            chain_id: 1,
            address: "0xabc".to_string(),
            name: "PT-weETH".to_string(),
            protocol: "Ether.fi".to_string(),
            underlying_symbol: "weETH".to_string(),
            maturity: maturity(),
        }
    }

    fn point(days_before: i64, discount: f64, implied: f64) -> HistoryPoint {
        HistoryPoint {
            timestamp: maturity() - Duration::days(days_before),
            pt_discount: Some(discount),
            implied_apy: Some(implied),
            metrics: AuxMetrics {
                liquidity_usd: Some(1_000_000.0),
                ..AuxMetrics::default()
            },
        }
    }

    fn daily_history(from_days_before: i64) -> MarketHistory {
        let points = (1..=from_days_before)
            .rev()
            .map(|d| point(d, 0.001 * d as f64, 0.05))
            .collect();
        MarketHistory {
            observed_start: maturity() - Duration::days(from_days_before),
            points,
        }
    }

    #[test]
    fn future_maturity_is_not_applicable() {
        let history = daily_history(10);
        let early = maturity() - Duration::days(1);
        let outcome = analyze_history(&market(), &history, early, &AnalysisConfig::default()).unwrap();
        assert_eq!(outcome, MarketAnalysis::NotApplicable);
    }

    #[test]
    fn maturity_equal_to_now_is_not_applicable() {
        let history = daily_history(10);
        let outcome =
            analyze_history(&market(), &history, maturity(), &AnalysisConfig::default()).unwrap();
        assert_eq!(outcome, MarketAnalysis::NotApplicable);
    }

    #[test]
    fn empty_history_is_no_data() {
        let history = MarketHistory {
            observed_start: maturity() - Duration::days(100),
            points: vec![],
        };
        let outcome = analyze_history(&market(), &history, now(), &AnalysisConfig::default()).unwrap();
        assert_eq!(outcome, MarketAnalysis::NoData);
    }

    #[test]
    fn par_bond_one_day_out() {
        let history = MarketHistory {
            observed_start: maturity() - Duration::days(1),
            points: vec![point(1, 0.0, 0.05)],
        };
        let outcome = analyze_history(&market(), &history, now(), &AnalysisConfig::default()).unwrap();
        let summary = match outcome {
            MarketAnalysis::Analyzed(s) => s,
            other => panic!("expected analyzed market, got {other:?}"),
        };

        assert_eq!(summary.horizons.len(), 1);
        let r = &summary.horizons[0];
        assert_eq!(r.horizon_days, 1);
        assert_eq!(r.realized_apy, 0.0);
        assert_eq!(r.bond_price, 1.0);
        assert!((r.signed_error.unwrap() - 0.05).abs() < 1e-12);
        assert!((r.absolute_error.unwrap() - 0.05).abs() < 1e-12);
        assert_eq!(r.relative_error_pct, None);
        assert_eq!(r.metrics.liquidity_usd, Some(1_000_000.0));

        assert_eq!(summary.overall.valid_horizons, 1);
        assert_eq!(summary.overall.mean_relative_absolute_error, None);
        assert!((summary.overall.mean_absolute_error.unwrap() - 0.05).abs() < 1e-12);
    }

    #[test]
    fn pre_inception_horizons_are_skipped() {
        // 20 days of history: 90/60/30 fall before inception.
        let outcome =
            analyze_history(&market(), &daily_history(20), now(), &AnalysisConfig::default())
                .unwrap();
        let summary = outcome.into_summary().unwrap();
        let days: Vec<u32> = summary.horizons.iter().map(|r| r.horizon_days).collect();
        assert_eq!(days, vec![14, 7, 3, 1]);
    }

    #[test]
    fn full_history_scores_every_horizon_in_order() {
        let summary =
            analyze_history(&market(), &daily_history(120), now(), &AnalysisConfig::default())
                .unwrap()
                .into_summary()
                .unwrap();
        let days: Vec<u32> = summary.horizons.iter().map(|r| r.horizon_days).collect();
        assert_eq!(days, vec![90, 60, 30, 14, 7, 3, 1]);
        assert_eq!(summary.overall.valid_horizons, 7);

        // discount = 0.001 * d, so realized = (1/(1-0.001d) - 1) * 365/d
        let r30 = &summary.horizons[2];
        let expected = (1.0 / (1.0 - 0.03) - 1.0) / (30.0 / 365.0);
        assert!((r30.realized_apy - expected).abs() < 1e-12);
        assert!((r30.signed_error.unwrap() - (0.05 - expected)).abs() < 1e-12);
        let rel = r30.relative_error_pct.unwrap();
        assert!((rel - (0.05 - expected) / expected * 100.0).abs() < 1e-9);
    }

    #[test]
    fn gaps_beyond_tolerance_skip_the_horizon() {
        // Only observations 40 and 1 days out: 30d horizon sees a 10-day-old point.
        let history = MarketHistory {
            observed_start: maturity() - Duration::days(40),
            points: vec![point(40, 0.01, 0.05), point(1, 0.0001, 0.05)],
        };
        let summary = analyze_history(&market(), &history, now(), &AnalysisConfig::default())
            .unwrap()
            .into_summary()
            .unwrap();
        let days: Vec<u32> = summary.horizons.iter().map(|r| r.horizon_days).collect();
        assert_eq!(days, vec![1]);
    }

    #[test]
    fn substitute_horizon_set() {
        let cfg = AnalysisConfig {
            horizons: vec![5, 2],
            ..AnalysisConfig::default()
        };
        let summary = analyze_history(&market(), &daily_history(10), now(), &cfg)
            .unwrap()
            .into_summary()
            .unwrap();
        let days: Vec<u32> = summary.horizons.iter().map(|r| r.horizon_days).collect();
        assert_eq!(days, vec![5, 2]);
    }

    #[test]
    fn missing_quote_fields_skip_the_horizon() {
        let mut p = point(1, 0.0, 0.05);
        p.implied_apy = None;
        let history = MarketHistory {
            observed_start: maturity() - Duration::days(1),
            points: vec![p],
        };
        let outcome = analyze_history(&market(), &history, now(), &AnalysisConfig::default()).unwrap();
        assert_eq!(outcome, MarketAnalysis::NoData);
    }

    #[test]
    fn fully_discounted_bond_is_skipped() {
        let history = MarketHistory {
            observed_start: maturity() - Duration::days(1),
            points: vec![point(1, 1.0, 0.05)],
        };
        let outcome = analyze_history(&market(), &history, now(), &AnalysisConfig::default()).unwrap();
        assert_eq!(outcome, MarketAnalysis::NoData);
    }

    #[test]
    fn non_finite_quote_is_fatal() {
        let history = MarketHistory {
            observed_start: maturity() - Duration::days(1),
            points: vec![point(1, 0.001, f64::INFINITY)],
        };
        let err = analyze_history(&market(), &history, now(), &AnalysisConfig::default()).unwrap_err();
        assert!(matches!(err, AppError::Invariant(_)));
    }

    #[test]
    fn rerun_is_byte_identical() {
        let history = daily_history(100);
        let a = analyze_history(&market(), &history, now(), &AnalysisConfig::default())
            .unwrap()
            .into_summary()
            .unwrap();
        let b = analyze_history(&market(), &history, now(), &AnalysisConfig::default())
            .unwrap()
            .into_summary()
            .unwrap();
        assert_eq!(
            serde_json::to_vec(&a).unwrap(),
            serde_json::to_vec(&b).unwrap()
        );
    }

    #[test]
    fn relative_mean_uses_only_defined_values() {
        let history = MarketHistory {
            observed_start: maturity() - Duration::days(10),
            // 7d: realized > 0; 1d: par bond, realized = 0
            points: vec![point(7, 0.002, 0.05), point(1, 0.0, 0.05)],
        };
        let summary = analyze_history(&market(), &history, now(), &AnalysisConfig::default())
            .unwrap()
            .into_summary()
            .unwrap();
        assert_eq!(summary.overall.valid_horizons, 2);
        let rel7 = summary.horizons[0].relative_error_pct.unwrap();
        assert_eq!(summary.horizons[1].relative_error_pct, None);
        assert!((summary.overall.mean_relative_absolute_error.unwrap() - rel7.abs()).abs() < 1e-12);
    }
}
