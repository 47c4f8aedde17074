//! Persistence port for service snapshots.
//!
//! Stores and simulators serialize their state to JSON and hand it to a
//! [`SnapshotStore`]. Failures are swallowed and logged so persistence can
//! never block or fail the update path.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

/// Key-value snapshot persistence, decoupled from any storage mechanism.
pub trait SnapshotStore: Send + Sync {
    /// Fetch the payload stored under `key` if it is younger than `max_age`.
    fn get(&self, key: &str, max_age: Duration) -> Option<String>;

    /// Store `payload` under `key`, stamped with the current time.
    fn set(&self, key: &str, payload: &str);
}

/// Stored payload with write timestamp.
#[derive(Debug, Serialize, Deserialize)]
struct SnapshotEntry {
    timestamp: u64,
    payload: String,
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// File-backed snapshot store, one JSON file per key.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `dir`, creating the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        if !dir.exists() {
            if let Err(e) = fs::create_dir_all(&dir) {
                warn!("Failed to create snapshot directory {:?}: {}", dir, e);
            }
        }
        Self { dir }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        // Sanitize key for filesystem
        let safe_key = key.replace(['/', '\\', ':', '*', '?', '"', '<', '>', '|'], "_");
        self.dir.join(format!("{}.json", safe_key))
    }
}

impl SnapshotStore for FileStore {
    fn get(&self, key: &str, max_age: Duration) -> Option<String> {
        let path = self.path_for(key);

        let content = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(_) => return None,
        };

        let entry: SnapshotEntry = match serde_json::from_str(&content) {
            Ok(e) => e,
            Err(e) => {
                warn!("Failed to parse snapshot {}: {}", key, e);
                return None;
            }
        };

        if now_secs().saturating_sub(entry.timestamp) > max_age.as_secs() {
            debug!("Snapshot {} is stale, ignoring", key);
            return None;
        }

        Some(entry.payload)
    }

    fn set(&self, key: &str, payload: &str) {
        let entry = SnapshotEntry {
            timestamp: now_secs(),
            payload: payload.to_string(),
        };

        match serde_json::to_string(&entry) {
            Ok(content) => {
                if let Err(e) = fs::write(self.path_for(key), content) {
                    warn!("Failed to write snapshot {}: {}", key, e);
                }
            }
            Err(e) => {
                warn!("Failed to serialize snapshot {}: {}", key, e);
            }
        }
    }
}

/// In-memory snapshot store for tests and ephemeral runs.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, SnapshotEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a payload with an explicit write timestamp (seconds since
    /// epoch). Lets tests simulate stale snapshots.
    pub fn set_stamped(&self, key: &str, payload: &str, timestamp: u64) {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(
            key.to_string(),
            SnapshotEntry {
                timestamp,
                payload: payload.to_string(),
            },
        );
    }
}

impl SnapshotStore for MemoryStore {
    fn get(&self, key: &str, max_age: Duration) -> Option<String> {
        let entries = self.entries.lock().unwrap();
        let entry = entries.get(key)?;
        if now_secs().saturating_sub(entry.timestamp) > max_age.as_secs() {
            return None;
        }
        Some(entry.payload.clone())
    }

    fn set(&self, key: &str, payload: &str) {
        self.set_stamped(key, payload, now_secs());
    }
}
