use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::analytics::{analyze_history, summarize_dashboard};
use crate::config::AnalysisConfig;
use crate::error::{AppError, Result};
use crate::fetcher::MarketSource;
use crate::scheduler::BatchScheduler;
use crate::types::{DashboardSummary, MarketAnalysis, MarketDescriptor};

/// Entry points of the accuracy analysis. Always recomputes; caching is the
/// caller's concern.
pub struct AccuracyEngine {
    source: Arc<dyn MarketSource>,
    analysis: AnalysisConfig,
    scheduler: BatchScheduler,
}

impl AccuracyEngine {
    pub fn new(
        source: Arc<dyn MarketSource>,
        analysis: AnalysisConfig,
        scheduler: BatchScheduler,
    ) -> Self {
        Self {
            source,
            analysis,
            scheduler,
        }
    }

    pub async fn find_market(
        &self,
        chain_id: u64,
        address: &str,
    ) -> Result<Option<MarketDescriptor>> {
        self.source.find_market(chain_id, address).await
    }

    pub async fn analyze_market(&self, market: &MarketDescriptor) -> Result<MarketAnalysis> {
        self.analyze_market_at(market, Utc::now()).await
    }

    /// History fetch errors propagate; no retry happens at this level.
    pub async fn analyze_market_at(
        &self,
        market: &MarketDescriptor,
        now: DateTime<Utc>,
    ) -> Result<MarketAnalysis> {
        if !market.is_expired(now) {
            return Ok(MarketAnalysis::NotApplicable);
        }
        let history = self
            .source
            .fetch_history(market.chain_id, &market.address)
            .await?;
        analyze_history(market, &history, now, &self.analysis)
    }

    pub async fn analyze_dashboard(&self, chain_id: u64) -> Result<DashboardSummary> {
        self.analyze_dashboard_at(chain_id, Utc::now()).await
    }

    /// Only a failure to list markets, or an invariant violation, fails the
    /// run. Other per-market failures are logged and the market is left out.
    pub async fn analyze_dashboard_at(
        &self,
        chain_id: u64,
        now: DateTime<Utc>,
    ) -> Result<DashboardSummary> {
        let expired = self.source.list_expired_markets(chain_id, now).await?;
        let total = expired.len();
        info!(
            "[DASHBOARD] chain {chain_id}: analyzing {total} expired markets in batches of {}",
            self.scheduler.width()
        );

        let outcomes = self
            .scheduler
            .run(expired, |market| async move {
                let outcome = self.analyze_market_at(&market, now).await;
                (market, outcome)
            })
            .await;

        let mut summaries = Vec::new();
        let mut failed = 0usize;
        for (market, outcome) in outcomes {
            match outcome {
                Ok(MarketAnalysis::Analyzed(summary)) => summaries.push(summary),
                Ok(MarketAnalysis::NoData) => {
                    debug!("[DASHBOARD] {} ({}): no usable history", market.name, market.address);
                }
                Ok(MarketAnalysis::NotApplicable) => {
                    debug!("[DASHBOARD] {} ({}): not yet matured", market.name, market.address);
                }
                Err(e @ AppError::Invariant(_)) => return Err(e),
                Err(e) => {
                    failed += 1;
                    warn!(
                        market = %market.address,
                        "[DASHBOARD] {} excluded: {e}",
                        market.name
                    );
                }
            }
        }

        let summary = summarize_dashboard(chain_id, total, summaries, &self.analysis.horizons, now);
        info!(
            "[DASHBOARD] chain {chain_id}: {}/{total} markets with data, {failed} failed, MAE={}",
            summary.markets_with_data,
            summary
                .overall_mae
                .map(|v| format!("{v:.6}"))
                .unwrap_or_else(|| "n/a".to_string()),
        );
        Ok(summary)
    }
}
