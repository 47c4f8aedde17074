//! Price feed coordinator: streaming first, polling as fallback.

use crate::config::Config;
use crate::services::PriceStore;
use crate::sources::{BinanceWs, CoinGeckoClient};
use crate::types::{ConnectionStatus, DataSource};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Unifies the streaming and polling adapters into one canonical tick
/// stream with failover.
///
/// `start()` runs the streaming adapter; when its reconnect attempts are
/// exhausted the polling adapter takes over for the rest of the session.
/// Both feed the same [`PriceStore`], which is the only place failures
/// become observable.
pub struct PriceFeed {
    store: Arc<PriceStore>,
    stream: Arc<BinanceWs>,
    poller: Arc<CoinGeckoClient>,
    supervisor: Mutex<Option<JoinHandle<()>>>,
}

impl PriceFeed {
    /// Create a feed over the configured symbol set.
    pub fn new(config: &Config, store: Arc<PriceStore>) -> Arc<Self> {
        let stream = Arc::new(BinanceWs::new(
            config.stream_url.clone(),
            &config.symbols,
            Duration::from_millis(config.debounce_ms),
            config.max_reconnect_attempts,
            store.clone(),
        ));

        let poller = Arc::new(CoinGeckoClient::new(
            &config.symbols,
            Duration::from_secs(config.poll_interval_secs),
            store.clone(),
        ));

        Arc::new(Self {
            store,
            stream,
            poller,
            supervisor: Mutex::new(None),
        })
    }

    /// Begin ingesting prices. Calling while running is a no-op.
    pub fn start(&self) {
        let mut supervisor = self.supervisor.lock().unwrap();
        if supervisor.is_some() {
            debug!("Price feed already running");
            return;
        }

        info!("Starting price feed");
        let stream = self.stream.clone();
        let poller = self.poller.clone();
        let handle = tokio::spawn(async move {
            // Streaming runs until its reconnect attempts are exhausted.
            stream.run().await;

            warn!("Streaming source exhausted, switching to polling fallback");
            poller.run().await;
        });

        *supervisor = Some(handle);
    }

    /// Cancel all feed activity. Safe to call repeatedly or when never
    /// started.
    pub fn stop(&self) {
        let handle = self.supervisor.lock().unwrap().take();
        if let Some(handle) = handle {
            handle.abort();
            info!("Price feed stopped");
        }
        self.store
            .update_status(ConnectionStatus::Disconnected, DataSource::None);
    }

    /// The store this feed writes into.
    pub fn store(&self) -> Arc<PriceStore> {
        self.store.clone()
    }
}

impl Drop for PriceFeed {
    fn drop(&mut self) {
        if let Some(handle) = self.supervisor.lock().unwrap().take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::snapshot::MemoryStore;

    fn test_config() -> Config {
        Config {
            symbols: vec!["btc".to_string(), "eth".to_string()],
            stream_url: "wss://stream.binance.com:9443/stream".to_string(),
            poll_interval_secs: 10,
            max_reconnect_attempts: 2,
            debounce_ms: 250,
            tick_interval_secs: 5,
            snapshot_dir: ".mirage_cache".to_string(),
        }
    }

    #[tokio::test]
    async fn test_stop_without_start_is_safe() {
        let store = Arc::new(PriceStore::new(Arc::new(MemoryStore::new())));
        let feed = PriceFeed::new(&test_config(), store.clone());

        feed.stop();
        feed.stop();

        let state = store.state();
        assert_eq!(state.connection_status, ConnectionStatus::Disconnected);
        assert_eq!(state.data_source, DataSource::None);
    }

    #[tokio::test]
    async fn test_double_stop_matches_single_stop() {
        let store = Arc::new(PriceStore::new(Arc::new(MemoryStore::new())));
        let feed = PriceFeed::new(&test_config(), store.clone());

        feed.start();
        feed.stop();
        let after_one = store.state();

        feed.stop();
        let after_two = store.state();

        assert_eq!(after_one.connection_status, after_two.connection_status);
        assert_eq!(after_one.data_source, after_two.data_source);
        assert!(feed.supervisor.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_start_twice_spawns_one_supervisor() {
        let store = Arc::new(PriceStore::new(Arc::new(MemoryStore::new())));
        let feed = PriceFeed::new(&test_config(), store);

        feed.start();
        let first = feed
            .supervisor
            .lock()
            .unwrap()
            .as_ref()
            .map(|h| h.is_finished());
        feed.start();

        assert!(first.is_some());
        feed.stop();
    }
}
