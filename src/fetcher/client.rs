use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use super::models::{MarketsPage, RawHistory};
use super::{MarketSource, RetryPolicy};
use crate::config::{Config, MARKETS_PAGE_SIZE};
use crate::error::{AppError, Result};
use crate::types::{MarketDescriptor, MarketHistory};

/// REST client for the Pendle core API.
pub struct PendleClient {
    http: reqwest::Client,
    base_url: String,
    retry: RetryPolicy,
}

impl PendleClient {
    pub fn new(cfg: &Config, retry: RetryPolicy) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(cfg.http_timeout)
            .build()?;
        Ok(Self {
            http,
            base_url: cfg.pendle_api_url.trim_end_matches('/').to_string(),
            retry,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        self.retry
            .run(url, move || async move {
                let resp = self
                    .http
                    .get(url)
                    .header(ACCEPT, "application/json")
                    .send()
                    .await?;

                let status = resp.status();
                if status == StatusCode::TOO_MANY_REQUESTS {
                    return Err(AppError::RateLimited(url.to_string()));
                }
                if !status.is_success() {
                    let body = resp.text().await.unwrap_or_default();
                    warn!("[FETCH] {url} -> {status}: {body}");
                    return Err(AppError::Upstream {
                        status: status.as_u16(),
                        body,
                    });
                }
                Ok(resp.json::<T>().await?)
            })
            .await
    }
}

#[async_trait]
impl MarketSource for PendleClient {
    async fn list_markets(&self, chain_id: u64) -> Result<Vec<MarketDescriptor>> {
        let mut markets = Vec::new();
        let mut skip = 0usize;
        let mut unparseable = 0usize;

        loop {
            let url = format!(
                "{}/v1/{}/markets?limit={}&skip={}",
                self.base_url, chain_id, MARKETS_PAGE_SIZE, skip
            );
            let page: MarketsPage = self.get_json(&url).await?;
            let fetched = page.results.len();
            debug!("[FETCH] chain {chain_id}: {fetched} markets (skip={skip}, total={})", page.total);

            for raw in page.results {
                match raw.into_descriptor() {
                    Some(m) => markets.push(m),
                    None => unparseable += 1,
                }
            }

            skip += MARKETS_PAGE_SIZE;
            if skip >= page.total || fetched == 0 {
                break;
            }
        }

        if unparseable > 0 {
            warn!("[FETCH] chain {chain_id}: skipped {unparseable} markets with unreadable expiry");
        }
        info!("[FETCH] chain {chain_id}: {} markets listed", markets.len());
        Ok(markets)
    }

    async fn fetch_history(&self, chain_id: u64, address: &str) -> Result<MarketHistory> {
        let url = format!(
            "{}/v2/{}/markets/{}/history",
            self.base_url, chain_id, address
        );
        let raw: RawHistory = self.get_json(&url).await?;
        raw.into_history(address).ok_or_else(|| AppError::Upstream {
            status: 200,
            body: format!("history for {address} has no readable timestamps"),
        })
    }
}
