use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::debug;

use crate::types::{DashboardSummary, MarketSummary};

// ---------------------------------------------------------------------------
// TtlCache
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Entry<V> {
    stored_at: Instant,
    value: V,
}

/// String-keyed map whose entries expire `ttl` after insertion.
/// Expired entries are evicted lazily on read.
#[derive(Debug)]
pub struct TtlCache<V> {
    entries: DashMap<String, Entry<V>>,
    ttl: Duration,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    pub fn get(&self, key: &str) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    fn get_at(&self, key: &str, now: Instant) -> Option<V> {
        let fresh = {
            let entry = self.entries.get(key)?;
            if now.saturating_duration_since(entry.stored_at) <= self.ttl {
                Some(entry.value.clone())
            } else {
                None
            }
        };
        if fresh.is_none() {
            debug!("[CACHE] {key} expired");
            self.entries.remove(key);
        }
        fresh
    }

    pub fn insert(&self, key: String, value: V) {
        self.entries.insert(
            key,
            Entry {
                stored_at: Instant::now(),
                value,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

// ---------------------------------------------------------------------------
// ResultCache
// ---------------------------------------------------------------------------

/// Read-through cache for the two HTTP lookups: whole-chain dashboards and
/// single-market summaries.
#[derive(Debug)]
pub struct ResultCache {
    dashboards: TtlCache<DashboardSummary>,
    markets: TtlCache<MarketSummary>,
}

impl ResultCache {
    pub fn new(ttl: Duration) -> Arc<Self> {
        Arc::new(Self {
            dashboards: TtlCache::new(ttl),
            markets: TtlCache::new(ttl),
        })
    }

    pub fn dashboard_key(chain_id: u64) -> String {
        format!("dashboard-{chain_id}")
    }

    pub fn market_key(chain_id: u64, address: &str) -> String {
        format!("market-{chain_id}-{}", address.to_ascii_lowercase())
    }

    pub fn get_dashboard(&self, chain_id: u64) -> Option<DashboardSummary> {
        self.dashboards.get(&Self::dashboard_key(chain_id))
    }

    pub fn put_dashboard(&self, summary: DashboardSummary) {
        self.dashboards
            .insert(Self::dashboard_key(summary.chain_id), summary);
    }

    pub fn get_market(&self, chain_id: u64, address: &str) -> Option<MarketSummary> {
        self.markets.get(&Self::market_key(chain_id, address))
    }

    pub fn put_market(&self, summary: MarketSummary) {
        let key = Self::market_key(summary.market.chain_id, &summary.market.address);
        self.markets.insert(key, summary);
    }

    pub fn entry_count(&self) -> usize {
        self.dashboards.len() + self.markets.len()
    }

    pub fn clear(&self) {
        self.dashboards.clear();
        self.markets.clear();
    }
}
