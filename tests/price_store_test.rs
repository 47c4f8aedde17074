//! Integration tests for the price store.

use mirage::services::{MemoryStore, PriceStore, SnapshotStore};
use mirage::types::{ConnectionStatus, DataSource, PriceTick, PriceUpdate};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const PRICE_SNAPSHOT_KEY: &str = "mirage:prices";

fn tick(symbol: &str, price: f64, timestamp: i64, change: Option<f64>) -> PriceTick {
    PriceTick {
        symbol: symbol.to_string(),
        price,
        timestamp,
        change_24h: change,
    }
}

#[test]
fn test_snapshot_round_trip() {
    let snapshots = Arc::new(MemoryStore::new());

    {
        let store = PriceStore::new(snapshots.clone());
        store.update_tick(tick("btc", 43000.0, 1000, Some(1.5)));
        store.update_tick(tick("eth", 2500.0, 2000, Some(-0.5)));
        store.update_tick(tick("btc", 43100.0, 3000, None));
    }

    // A fresh store over the same snapshots restores the cache
    let restored = PriceStore::new(snapshots);
    let state = restored.state();

    assert_eq!(state.ticks.len(), 2);
    assert_eq!(state.history.len(), 3);
    assert_eq!(state.last_update, 3000);

    let btc = restored.tick("btc").unwrap();
    assert_eq!(btc.price, 43100.0);
    // The merge that preserved change_24h survives the round trip
    assert_eq!(btc.change_24h, Some(1.5));

    // Connection fields are not restored as live
    assert_eq!(state.connection_status, ConnectionStatus::Disconnected);
    assert_eq!(state.data_source, DataSource::None);
}

#[test]
fn test_stale_snapshot_starts_empty() {
    let snapshots = Arc::new(MemoryStore::new());

    {
        let store = PriceStore::new(snapshots.clone());
        store.update_tick(tick("btc", 43000.0, 1000, None));
    }

    // Backdate the snapshot past the 24h staleness threshold
    let payload = snapshots
        .get(PRICE_SNAPSHOT_KEY, Duration::from_secs(3600))
        .expect("snapshot should exist");
    let old = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
        - 25 * 3600;
    snapshots.set_stamped(PRICE_SNAPSHOT_KEY, &payload, old);

    let store = PriceStore::new(snapshots);
    assert!(store.state().ticks.is_empty());
    assert!(store.state().history.is_empty());
}

#[test]
fn test_corrupt_snapshot_starts_empty() {
    let snapshots = Arc::new(MemoryStore::new());
    snapshots.set(PRICE_SNAPSHOT_KEY, "definitely not json");

    let store = PriceStore::new(snapshots);
    assert!(store.state().ticks.is_empty());
}

#[test]
fn test_subscribers_receive_ticks_and_status() {
    let store = PriceStore::new(Arc::new(MemoryStore::new()));
    let events = Arc::new(Mutex::new(Vec::new()));

    let id = {
        let events = events.clone();
        store.subscribe(move |update| {
            let label = match update {
                PriceUpdate::Tick(t) => format!("tick:{}", t.symbol),
                PriceUpdate::Status { status, .. } => format!("status:{}", status),
            };
            events.lock().unwrap().push(label);
        })
    };

    store.update_tick(tick("btc", 43000.0, 1000, None));
    store.update_status(ConnectionStatus::Connected, DataSource::Primary);

    assert!(store.unsubscribe(id));
    store.update_tick(tick("btc", 43100.0, 2000, None));

    let events = events.lock().unwrap();
    assert_eq!(*events, vec!["tick:btc", "status:connected"]);
}

#[test]
fn test_listener_order_is_registration_order() {
    let store = PriceStore::new(Arc::new(MemoryStore::new()));
    let order = Arc::new(Mutex::new(Vec::new()));

    for tag in ["a", "b", "c"] {
        let order = order.clone();
        store.subscribe(move |_| order.lock().unwrap().push(tag));
    }

    store.update_tick(tick("btc", 43000.0, 1000, None));
    assert_eq!(*order.lock().unwrap(), vec!["a", "b", "c"]);
}

#[test]
fn test_reads_do_not_alias_internal_state() {
    let store = PriceStore::new(Arc::new(MemoryStore::new()));
    store.update_tick(tick("btc", 43000.0, 1000, Some(2.0)));

    let mut tick_copy = store.tick("btc").unwrap();
    tick_copy.price = 0.0;

    let mut history = store.history_for_symbol("btc", 10);
    history.clear();

    assert_eq!(store.tick("btc").unwrap().price, 43000.0);
    assert_eq!(store.history_for_symbol("btc", 10).len(), 1);
}
