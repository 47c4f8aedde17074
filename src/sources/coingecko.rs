//! CoinGecko REST polling adapter (secondary source).
//!
//! Runs as the fallback when the stream is exhausted. Fetch failures mark
//! the feed degraded but polling itself never gives up; requests are
//! self-throttled to a minimum spacing regardless of call frequency.

use crate::services::PriceStore;
use crate::types::{ConnectionStatus, DataSource, PriceTick};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

const COINGECKO_API_URL: &str = "https://api.coingecko.com/api/v3";

/// Minimum spacing between outbound requests, enforced even when polled
/// more frequently.
const MIN_REQUEST_SPACING: Duration = Duration::from_secs(5);

/// Symbol to CoinGecko ID mapping.
pub const SYMBOL_TO_ID: &[(&str, &str)] = &[
    ("btc", "bitcoin"),
    ("eth", "ethereum"),
    ("sol", "solana"),
    ("link", "chainlink"),
    ("avax", "avalanche-2"),
    ("bnb", "binancecoin"),
    ("xrp", "ripple"),
    ("ada", "cardano"),
    ("doge", "dogecoin"),
    ("dot", "polkadot"),
];

/// CoinGecko simple/price entry.
#[derive(Debug, Deserialize)]
struct CoinGeckoPrice {
    usd: Option<f64>,
    usd_24h_change: Option<f64>,
}

/// CoinGecko REST client.
pub struct CoinGeckoClient {
    client: Client,
    symbols: Vec<String>,
    poll_interval: Duration,
    store: Arc<PriceStore>,
    last_request: Mutex<Option<Instant>>,
}

impl CoinGeckoClient {
    /// Create a new polling adapter feeding `store`.
    pub fn new(symbols: &[String], poll_interval: Duration, store: Arc<PriceStore>) -> Self {
        let client = Client::builder()
            .user_agent("Mirage/1.0")
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            symbols: symbols.to_vec(),
            poll_interval,
            store,
            last_request: Mutex::new(None),
        }
    }

    /// Poll at the fixed interval forever.
    pub async fn run(&self) {
        info!("Starting CoinGecko price polling");

        loop {
            self.poll_once().await;
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// One polling pass. Skipped entirely when invoked inside the minimum
    /// request spacing window.
    pub async fn poll_once(&self) {
        {
            let mut last = self.last_request.lock().unwrap();
            if let Some(at) = *last {
                if at.elapsed() < MIN_REQUEST_SPACING {
                    debug!("CoinGecko poll throttled");
                    return;
                }
            }
            *last = Some(Instant::now());
        }

        match self.fetch_prices().await {
            Ok(count) => {
                debug!("CoinGecko poll updated {} symbols", count);
                self.store
                    .update_status(ConnectionStatus::Connected, DataSource::Secondary);
            }
            Err(e) => {
                error!("CoinGecko fetch error: {}", e);
                self.store
                    .update_status(ConnectionStatus::Degraded, DataSource::Secondary);
            }
        }
    }

    async fn fetch_prices(&self) -> anyhow::Result<usize> {
        let ids: Vec<&str> = SYMBOL_TO_ID
            .iter()
            .filter(|(sym, _)| self.symbols.iter().any(|s| s == sym))
            .map(|(_, id)| *id)
            .collect();

        let url = format!(
            "{}/simple/price?ids={}&vs_currencies=usd&include_24hr_change=true",
            COINGECKO_API_URL,
            ids.join(",")
        );

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            warn!(
                "CoinGecko API returned {}: {}",
                status,
                &text[..text.len().min(200)]
            );
            return Err(anyhow::anyhow!("CoinGecko API error: {}", status));
        }

        let prices: HashMap<String, CoinGeckoPrice> = response.json().await?;
        let timestamp = chrono::Utc::now().timestamp_millis();

        let id_to_symbol: HashMap<&str, &str> =
            SYMBOL_TO_ID.iter().map(|(sym, id)| (*id, *sym)).collect();

        let mut count = 0;
        for (id, entry) in prices {
            let Some(symbol) = id_to_symbol.get(id.as_str()) else {
                continue;
            };
            let Some(price) = entry.usd else {
                continue;
            };
            if price <= 0.0 {
                continue;
            }

            self.store.update_tick(PriceTick {
                symbol: symbol.to_string(),
                price,
                timestamp,
                change_24h: entry.usd_24h_change,
            });
            count += 1;
        }

        Ok(count)
    }
}
