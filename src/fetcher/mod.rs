pub mod client;
pub mod models;
pub mod retry;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::types::{MarketDescriptor, MarketHistory};

pub use client::PendleClient;
pub use retry::RetryPolicy;

/// Market data the analysis layer reads. Implementations own transport,
/// pagination and retry; failures surface as `AppError`.
#[async_trait]
pub trait MarketSource: Send + Sync {
    /// Every market listed on `chain_id`, active or not.
    async fn list_markets(&self, chain_id: u64) -> Result<Vec<MarketDescriptor>>;

    async fn fetch_history(&self, chain_id: u64, address: &str) -> Result<MarketHistory>;

    /// Markets whose maturity is strictly before `now`.
    async fn list_expired_markets(
        &self,
        chain_id: u64,
        now: DateTime<Utc>,
    ) -> Result<Vec<MarketDescriptor>> {
        let mut markets = self.list_markets(chain_id).await?;
        markets.retain(|m| m.is_expired(now));
        Ok(markets)
    }

    /// Case-insensitive lookup by market address.
    async fn find_market(&self, chain_id: u64, address: &str) -> Result<Option<MarketDescriptor>> {
        let markets = self.list_markets(chain_id).await?;
        Ok(markets
            .into_iter()
            .find(|m| m.address.eq_ignore_ascii_case(address)))
    }
}
