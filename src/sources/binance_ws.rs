//! Binance WebSocket trade stream adapter (primary source).
//!
//! Vendor messages are parsed at this boundary; malformed payloads and
//! unknown symbols are dropped, never surfaced. Stream failures drive the
//! reconnect schedule and, once attempts are exhausted, the degraded
//! status that tells the coordinator to fall back to polling.

use crate::services::{Debouncer, PriceStore};
use crate::types::{ConnectionStatus, DataSource, PriceTick};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

const BACKOFF_BASE_SECS: u64 = 1;
const BACKOFF_CAP_SECS: u64 = 30;

/// Symbol mapping (canonical symbol -> Binance trading pair).
pub const SYMBOL_PAIRS: &[(&str, &str)] = &[
    ("btc", "BTCUSDT"),
    ("eth", "ETHUSDT"),
    ("sol", "SOLUSDT"),
    ("link", "LINKUSDT"),
    ("avax", "AVAXUSDT"),
    ("bnb", "BNBUSDT"),
    ("xrp", "XRPUSDT"),
    ("ada", "ADAUSDT"),
    ("doge", "DOGEUSDT"),
    ("dot", "DOTUSDT"),
];

/// Delay before reconnect attempt `attempt` (0-based): 1s, 2s, 4s... capped.
pub(crate) fn reconnect_delay(attempt: u32) -> Duration {
    let secs = BACKOFF_BASE_SECS
        .saturating_mul(2u64.saturating_pow(attempt))
        .min(BACKOFF_CAP_SECS);
    Duration::from_secs(secs)
}

/// Combined-stream envelope.
#[derive(Debug, Deserialize)]
struct StreamEnvelope {
    #[allow(dead_code)]
    stream: String,
    data: TradeEvent,
}

/// Binance trade event payload.
#[derive(Debug, Deserialize)]
struct TradeEvent {
    #[serde(rename = "e")]
    event_type: String,
    #[serde(rename = "s")]
    symbol: String,
    #[serde(rename = "p")]
    price: String,
    #[serde(rename = "T")]
    trade_time: i64,
}

/// Binance WebSocket client.
pub struct BinanceWs {
    url: String,
    symbols: Vec<String>,
    store: Arc<PriceStore>,
    debouncer: Debouncer,
    max_attempts: u32,
    pair_to_symbol: HashMap<String, String>,
}

impl BinanceWs {
    /// Create a new streaming adapter feeding `store`.
    pub fn new(
        url: String,
        symbols: &[String],
        debounce: Duration,
        max_attempts: u32,
        store: Arc<PriceStore>,
    ) -> Self {
        let pair_to_symbol: HashMap<String, String> = SYMBOL_PAIRS
            .iter()
            .filter(|(sym, _)| symbols.iter().any(|s| s == sym))
            .map(|(sym, pair)| (pair.to_string(), sym.to_string()))
            .collect();

        let debouncer = {
            let store = store.clone();
            Debouncer::new(debounce, move |tick: PriceTick| store.update_tick(tick))
        };

        Self {
            url,
            symbols: symbols.to_vec(),
            store,
            debouncer,
            max_attempts,
            pair_to_symbol,
        }
    }

    fn stream_url(&self) -> String {
        let streams: Vec<String> = self
            .symbols
            .iter()
            .filter_map(|sym| {
                SYMBOL_PAIRS
                    .iter()
                    .find(|(s, _)| s == sym)
                    .map(|(_, pair)| format!("{}@trade", pair.to_lowercase()))
            })
            .collect();
        format!("{}?streams={}", self.url, streams.join("/"))
    }

    /// Run the stream with reconnects until attempts are exhausted.
    ///
    /// Returns when `max_attempts` consecutive connection failures have
    /// occurred; by then the store status is `Degraded` and the caller is
    /// expected to fall back to polling.
    pub async fn run(&self) {
        let mut attempt = 0u32;

        loop {
            self.store
                .update_status(ConnectionStatus::Connecting, DataSource::Primary);

            match self.run_connection().await {
                Ok(()) => {
                    // A session was established and then dropped; start the
                    // backoff schedule over.
                    warn!("Binance stream disconnected, reconnecting");
                    attempt = 0;
                }
                Err(e) => {
                    error!("Binance stream error: {}", e);
                    attempt += 1;
                }
            }

            if attempt >= self.max_attempts {
                warn!(
                    "Binance stream failed {} consecutive attempts, falling back",
                    attempt
                );
                self.store
                    .update_status(ConnectionStatus::Degraded, DataSource::Primary);
                return;
            }

            // First failure waits 1s, then 2s, 4s... up to the cap.
            let delay = reconnect_delay(attempt.saturating_sub(1));
            debug!("Reconnecting to Binance stream in {:?}", delay);
            tokio::time::sleep(delay).await;
        }
    }

    async fn run_connection(&self) -> anyhow::Result<()> {
        let url = self.stream_url();
        info!("Connecting to Binance stream");

        let (ws_stream, _) = connect_async(&url).await?;
        let (mut write, mut read) = ws_stream.split();
        info!("Connected to Binance stream ({} symbols)", self.symbols.len());

        self.store
            .update_status(ConnectionStatus::Connected, DataSource::Primary);

        while let Some(msg) = read.next().await {
            match msg {
                Ok(Message::Text(text)) => self.handle_message(&text),
                Ok(Message::Ping(data)) => {
                    let _ = write.send(Message::Pong(data)).await;
                }
                Ok(Message::Close(_)) => {
                    info!("Binance stream closed by server");
                    break;
                }
                Err(e) => {
                    error!("Binance stream read error: {}", e);
                    break;
                }
                _ => {}
            }
        }

        Ok(())
    }

    fn handle_message(&self, text: &str) {
        let envelope: StreamEnvelope = match serde_json::from_str(text) {
            Ok(e) => e,
            Err(_) => return,
        };

        if envelope.data.event_type != "trade" {
            return;
        }

        // Unknown symbols are dropped, not errors
        let Some(symbol) = self.pair_to_symbol.get(&envelope.data.symbol) else {
            return;
        };

        let price: f64 = match envelope.data.price.parse() {
            Ok(p) => p,
            Err(_) => return,
        };
        if price <= 0.0 {
            return;
        }

        debug!("Binance trade: {} = ${}", symbol, price);

        self.debouncer.push(PriceTick {
            symbol: symbol.clone(),
            price,
            timestamp: envelope.data.trade_time,
            change_24h: None,
        });
    }
}
