//! Mirage - synthetic market data ingestion and model simulation engine
//!
//! A multi-source price feed with automatic failover feeds a shared price
//! cache; a per-model stochastic NAV simulator couples to the observed
//! market returns; a pure analytics layer derives display metrics from the
//! simulated history. Everything is constructed explicitly and wired by
//! the caller: construct, start, subscribe, stop.

pub mod config;
pub mod error;
pub mod services;
pub mod sources;
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use error::{EngineError, Result};
pub use services::{
    calculate_metrics, calculate_metrics_at, model_config, FileStore, MemoryStore, ModelSimulator,
    PriceFeed, PriceStore, SnapshotStore, MODEL_CONFIGS,
};
pub use types::*;
