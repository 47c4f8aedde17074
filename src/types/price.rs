use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Connection health of the price feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Connecting,
    Connected,
    Degraded,
    Disconnected,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionStatus::Connecting => write!(f, "connecting"),
            ConnectionStatus::Connected => write!(f, "connected"),
            ConnectionStatus::Degraded => write!(f, "degraded"),
            ConnectionStatus::Disconnected => write!(f, "disconnected"),
        }
    }
}

/// Which adapter is currently feeding prices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    /// Low-latency streaming adapter.
    Primary,
    /// Polling fallback adapter.
    Secondary,
    None,
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::Primary => write!(f, "primary"),
            DataSource::Secondary => write!(f, "secondary"),
            DataSource::None => write!(f, "none"),
        }
    }
}

/// One observed price sample for a symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceTick {
    pub symbol: String,
    pub price: f64,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_24h: Option<f64>,
}

/// Snapshot of the price cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceState {
    /// Latest tick per symbol.
    pub ticks: HashMap<String, PriceTick>,
    /// Rolling history of ticks across all symbols, oldest first.
    pub history: Vec<PriceTick>,
    pub connection_status: ConnectionStatus,
    pub data_source: DataSource,
    pub last_update: i64,
}

impl Default for PriceState {
    fn default() -> Self {
        Self {
            ticks: HashMap::new(),
            history: Vec::new(),
            connection_status: ConnectionStatus::Disconnected,
            data_source: DataSource::None,
            last_update: 0,
        }
    }
}

/// Event delivered to price store subscribers.
#[derive(Debug, Clone)]
pub enum PriceUpdate {
    Tick(PriceTick),
    Status {
        status: ConnectionStatus,
        source: DataSource,
    },
}
