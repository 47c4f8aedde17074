use std::env;

/// Default canonical symbol set tracked by the feed.
const DEFAULT_SYMBOLS: &[&str] = &["btc", "eth", "sol", "link", "avax"];

/// Application configuration.
///
/// The clamp bounds, debounce window and tier APY defaults elsewhere in the
/// crate are product tuning constants and intentionally not configurable.
#[derive(Debug, Clone)]
pub struct Config {
    /// Canonical symbols to ingest.
    pub symbols: Vec<String>,
    /// WebSocket endpoint for the streaming adapter.
    pub stream_url: String,
    /// Fixed interval between polling fetches (seconds).
    pub poll_interval_secs: u64,
    /// Maximum consecutive stream reconnect attempts before falling back.
    pub max_reconnect_attempts: u32,
    /// Per-symbol debounce window for streamed ticks (milliseconds).
    pub debounce_ms: u64,
    /// Simulator tick interval (seconds).
    pub tick_interval_secs: u64,
    /// Directory for persisted snapshots.
    pub snapshot_dir: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let symbols = env::var("MIRAGE_SYMBOLS")
            .ok()
            .map(|s| {
                s.split(',')
                    .map(|sym| sym.trim().to_lowercase())
                    .filter(|sym| !sym.is_empty())
                    .collect()
            })
            .unwrap_or_else(|| DEFAULT_SYMBOLS.iter().map(|s| s.to_string()).collect());

        Self {
            symbols,
            stream_url: env::var("MIRAGE_STREAM_URL")
                .unwrap_or_else(|_| "wss://stream.binance.com:9443/stream".to_string()),
            poll_interval_secs: env::var("MIRAGE_POLL_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            max_reconnect_attempts: env::var("MIRAGE_MAX_RECONNECT_ATTEMPTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(6),
            debounce_ms: env::var("MIRAGE_DEBOUNCE_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(250),
            tick_interval_secs: env::var("MIRAGE_TICK_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
            snapshot_dir: env::var("MIRAGE_SNAPSHOT_DIR")
                .unwrap_or_else(|_| ".mirage_cache".to_string()),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config {
            symbols: DEFAULT_SYMBOLS.iter().map(|s| s.to_string()).collect(),
            stream_url: "wss://stream.binance.com:9443/stream".to_string(),
            poll_interval_secs: 10,
            max_reconnect_attempts: 6,
            debounce_ms: 250,
            tick_interval_secs: 5,
            snapshot_dir: ".mirage_cache".to_string(),
        }
    }

    #[test]
    fn test_config_defaults() {
        let config = base_config();
        assert_eq!(config.poll_interval_secs, 10);
        assert_eq!(config.debounce_ms, 250);
        assert_eq!(config.tick_interval_secs, 5);
        assert!(config.symbols.contains(&"btc".to_string()));
    }

    #[test]
    fn test_default_symbols_lowercase() {
        for symbol in DEFAULT_SYMBOLS {
            assert_eq!(*symbol, symbol.to_lowercase());
        }
    }

    #[test]
    fn test_config_clone() {
        let config = base_config();
        let cloned = config.clone();
        assert_eq!(cloned.symbols, config.symbols);
        assert_eq!(cloned.stream_url, config.stream_url);
    }
}
