//! Per-symbol debounce for streamed price ticks.
//!
//! Trailing-edge: a burst of updates for one symbol inside the window
//! collapses to a single delivery carrying the latest sample.

use crate::types::PriceTick;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;

type Sink = Box<dyn Fn(PriceTick) + Send + Sync>;

struct DebounceInner {
    window: Duration,
    pending: DashMap<String, PriceTick>,
    sink: Sink,
}

/// Collapses rapid same-symbol updates to the most recent one.
pub struct Debouncer {
    inner: Arc<DebounceInner>,
}

impl Debouncer {
    /// Create a debouncer that forwards settled ticks into `sink`.
    pub fn new(window: Duration, sink: impl Fn(PriceTick) + Send + Sync + 'static) -> Self {
        Self {
            inner: Arc::new(DebounceInner {
                window,
                pending: DashMap::new(),
                sink: Box::new(sink),
            }),
        }
    }

    /// Submit a tick. The first tick for a symbol opens a window; every
    /// later tick within it replaces the pending sample. When the window
    /// closes, the latest sample is forwarded.
    pub fn push(&self, tick: PriceTick) {
        let symbol = tick.symbol.clone();
        if self.inner.pending.insert(symbol.clone(), tick).is_some() {
            // Window already open; the newer sample replaced the pending one.
            return;
        }

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            tokio::time::sleep(inner.window).await;
            if let Some((_, latest)) = inner.pending.remove(&symbol) {
                (inner.sink)(latest);
            }
        });
    }

    /// Number of symbols with an open window.
    pub fn pending_count(&self) -> usize {
        self.inner.pending.len()
    }
}
