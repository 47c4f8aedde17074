//! Shared price cache with bounded history, pub/sub and persistence.

use crate::services::snapshot::SnapshotStore;
use crate::services::subscribers::{Subscribers, SubscriptionId};
use crate::types::{ConnectionStatus, DataSource, PriceState, PriceTick, PriceUpdate};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Snapshot key for the persisted price state.
const SNAPSHOT_KEY: &str = "mirage:prices";

/// Maximum ticks retained in the rolling history.
const MAX_HISTORY: usize = 500;

/// Persisted snapshots older than this are discarded on load.
const SNAPSHOT_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);

/// Single authoritative in-memory price cache.
///
/// All mutation goes through [`update_tick`](Self::update_tick) and
/// [`update_status`](Self::update_status); reads return snapshot copies.
/// Subscribers are notified synchronously, in registration order.
pub struct PriceStore {
    state: RwLock<PriceState>,
    subscribers: Subscribers<PriceUpdate>,
    snapshots: Arc<dyn SnapshotStore>,
}

impl PriceStore {
    /// Create a store, restoring the persisted snapshot if it is fresh.
    pub fn new(snapshots: Arc<dyn SnapshotStore>) -> Self {
        let state = Self::restore(snapshots.as_ref()).unwrap_or_default();

        Self {
            state: RwLock::new(state),
            subscribers: Subscribers::new(),
            snapshots,
        }
    }

    fn restore(snapshots: &dyn SnapshotStore) -> Option<PriceState> {
        let payload = snapshots.get(SNAPSHOT_KEY, SNAPSHOT_MAX_AGE)?;
        match serde_json::from_str::<PriceState>(&payload) {
            Ok(mut state) => {
                info!(
                    "Restored price snapshot with {} symbols, {} history ticks",
                    state.ticks.len(),
                    state.history.len()
                );
                // Connection fields describe the live feed, not the snapshot.
                state.connection_status = ConnectionStatus::Disconnected;
                state.data_source = DataSource::None;
                Some(state)
            }
            Err(e) => {
                warn!("Discarding unreadable price snapshot: {}", e);
                None
            }
        }
    }

    /// Merge a tick into the cache, persist, and notify subscribers.
    ///
    /// A tick without `change_24h` keeps the previously known value for
    /// its symbol.
    pub fn update_tick(&self, mut tick: PriceTick) {
        let snapshot = {
            let mut state = self.state.write().unwrap();

            if tick.change_24h.is_none() {
                tick.change_24h = state
                    .ticks
                    .get(&tick.symbol)
                    .and_then(|prev| prev.change_24h);
            }

            state.ticks.insert(tick.symbol.clone(), tick.clone());
            state.history.push(tick.clone());
            if state.history.len() > MAX_HISTORY {
                let excess = state.history.len() - MAX_HISTORY;
                state.history.drain(..excess);
            }
            state.last_update = tick.timestamp;

            state.clone()
        };

        self.persist(&snapshot);
        self.subscribers.notify(&PriceUpdate::Tick(tick));
    }

    /// Update the connection status pair and notify subscribers.
    pub fn update_status(&self, status: ConnectionStatus, source: DataSource) {
        {
            let mut state = self.state.write().unwrap();
            if state.connection_status == status && state.data_source == source {
                return;
            }
            state.connection_status = status;
            state.data_source = source;
        }

        debug!("Feed status: {} via {}", status, source);
        self.subscribers.notify(&PriceUpdate::Status { status, source });
    }

    /// Snapshot copy of the full cache state.
    pub fn state(&self) -> PriceState {
        self.state.read().unwrap().clone()
    }

    /// Latest tick for a symbol, if any.
    pub fn tick(&self, symbol: &str) -> Option<PriceTick> {
        self.state.read().unwrap().ticks.get(symbol).cloned()
    }

    /// Up to `limit` most recent history ticks for one symbol, oldest first.
    pub fn history_for_symbol(&self, symbol: &str, limit: usize) -> Vec<PriceTick> {
        let state = self.state.read().unwrap();
        let matching: Vec<PriceTick> = state
            .history
            .iter()
            .filter(|t| t.symbol == symbol)
            .cloned()
            .collect();

        let skip = matching.len().saturating_sub(limit);
        matching.into_iter().skip(skip).collect()
    }

    /// Register a listener for tick and status updates.
    pub fn subscribe(
        &self,
        listener: impl Fn(&PriceUpdate) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.subscribers.add(listener)
    }

    /// Remove a previously registered listener.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.subscribers.remove(id)
    }

    /// One-line summary of the feed state for periodic logging.
    pub fn connection_summary(&self) -> String {
        let state = self.state.read().unwrap();
        format!(
            "{} via {} ({} symbols)",
            state.connection_status,
            state.data_source,
            state.ticks.len()
        )
    }

    fn persist(&self, state: &PriceState) {
        match serde_json::to_string(state) {
            Ok(payload) => self.snapshots.set(SNAPSHOT_KEY, &payload),
            Err(e) => warn!("Failed to serialize price snapshot: {}", e),
        }
    }
}
