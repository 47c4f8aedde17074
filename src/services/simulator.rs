//! Stochastic NAV simulator for the configured model set.
//!
//! Each model evolves a dimensionless NAV index (seeded at 1.0) on a fixed
//! global clock. The per-tick step combines drift, a dampened market term
//! sourced from observed log-returns, gaussian noise, mean reversion and a
//! rare biased jump. All models advance together in one atomic cycle;
//! subscribers only ever see whole-cycle snapshots.

use crate::error::{EngineError, Result};
use crate::services::metrics::calculate_metrics;
use crate::services::returns::ReturnWindow;
use crate::services::snapshot::SnapshotStore;
use crate::services::subscribers::{Subscribers, SubscriptionId};
use crate::types::{
    AllModelsState, CalculatedMetrics, ModelConfig, ModelEvent, ModelEventKind, ModelState,
    ModelStatus, NavPoint, PriceTick, RiskTier,
};
use chrono::Utc;
use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::StandardNormal;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Snapshot key for the persisted simulator state.
const SNAPSHOT_KEY: &str = "mirage:models";

/// Persisted snapshots older than this are regenerated on load.
const SNAPSHOT_MAX_AGE: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Number of synthetic points generated on cold start.
const BACKFILL_POINTS: usize = 288;

/// Spacing of backfill points (5 minutes over a trailing 24h window).
const BACKFILL_SPACING_SECS: i64 = 300;

/// Maximum NAV points retained per model.
const MAX_NAV_POINTS: usize = 2880;

/// Maximum activity log entries retained per model.
const MAX_EVENTS: usize = 50;

/// Chance of logging one activity entry per model per tick.
const EVENT_PROBABILITY: f64 = 0.04;

// Product tuning constants. The values are inherited configuration, not
// derived quantities; do not attempt to recompute them.
const MARKET_DAMPENING: f64 = 0.3;
const MAX_TICK_RETURN: f64 = 0.015;
const NAV_FLOOR: f64 = 0.7;
const NAV_CEILING: f64 = 2.5;
const BACKFILL_NAV_FLOOR: f64 = 0.5;
const BACKFILL_NAV_CEILING: f64 = 3.0;
const JUMP_SCALE: f64 = 3.0;
const JUMP_UP_BIAS: f64 = 0.65;
const SCALE_UP_NAV: f64 = 1.15;
const COOL_DOWN_NAV: f64 = 0.92;
const STATUS_BAND: f64 = 0.02;

/// Size of the rolling log-return window per observed instrument.
const RETURN_WINDOW: usize = 100;

/// Model roster. Drift, volatility and mean reversion are per day.
pub const MODEL_CONFIGS: &[ModelConfig] = &[
    ModelConfig {
        id: "atlas",
        risk_tier: RiskTier::Conservative,
        base_drift: 0.0030,
        volatility: 0.012,
        beta: 0.35,
        mean_reversion: 0.35,
        jump_probability: 0.5,
        jump_size: 0.004,
    },
    ModelConfig {
        id: "vertex",
        risk_tier: RiskTier::Balanced,
        base_drift: 0.0042,
        volatility: 0.018,
        beta: 0.6,
        mean_reversion: 0.22,
        jump_probability: 0.8,
        jump_size: 0.006,
    },
    ModelConfig {
        id: "nova",
        risk_tier: RiskTier::Balanced,
        base_drift: 0.0048,
        volatility: 0.022,
        beta: 0.75,
        mean_reversion: 0.18,
        jump_probability: 1.0,
        jump_size: 0.007,
    },
    ModelConfig {
        id: "titan",
        risk_tier: RiskTier::Aggressive,
        base_drift: 0.0060,
        volatility: 0.030,
        beta: 0.95,
        mean_reversion: 0.12,
        jump_probability: 1.2,
        jump_size: 0.010,
    },
    ModelConfig {
        id: "quasar",
        risk_tier: RiskTier::Aggressive,
        base_drift: 0.0070,
        volatility: 0.038,
        beta: 1.1,
        mean_reversion: 0.08,
        jump_probability: 1.5,
        jump_size: 0.012,
    },
];

const EVENT_KINDS: &[ModelEventKind] = &[
    ModelEventKind::Rebalance,
    ModelEventKind::Entry,
    ModelEventKind::Exit,
    ModelEventKind::Adjustment,
];

const REBALANCE_MESSAGES: &[&str] = &[
    "Rebalanced allocation toward target weights",
    "Rotated exposure across venues",
    "Normalized position sizing after drift",
];

const ENTRY_MESSAGES: &[&str] = &[
    "Opened long exposure on momentum signal",
    "Entered position on volatility contraction",
    "Added exposure on trend confirmation",
];

const EXIT_MESSAGES: &[&str] = &[
    "Closed position at profit target",
    "Exited exposure on signal decay",
    "Reduced position into strength",
];

const ADJUSTMENT_MESSAGES: &[&str] = &[
    "Tightened risk limits on elevated volatility",
    "Adjusted hedge ratio",
    "Updated stop placement after range shift",
];

/// Look up the configuration for a model id.
pub fn model_config(id: &str) -> Option<&'static ModelConfig> {
    MODEL_CONFIGS.iter().find(|c| c.id == id)
}

fn message_pool(kind: ModelEventKind) -> &'static [&'static str] {
    match kind {
        ModelEventKind::Rebalance => REBALANCE_MESSAGES,
        ModelEventKind::Entry => ENTRY_MESSAGES,
        ModelEventKind::Exit => EXIT_MESSAGES,
        ModelEventKind::Adjustment => ADJUSTMENT_MESSAGES,
    }
}

/// Apply one stochastic step to `nav` and clamp into `bounds`.
///
/// `dt` is the step interval as a fraction of one day and
/// `market_log_return` the most recent observed market log-return.
fn step_nav(
    cfg: &ModelConfig,
    nav: f64,
    dt: f64,
    market_log_return: f64,
    bounds: (f64, f64),
    rng: &mut StdRng,
) -> f64 {
    let drift = cfg.base_drift * dt;
    let market_term = cfg.beta * market_log_return * MARKET_DAMPENING;
    let gaussian: f64 = rng.sample(StandardNormal);
    let noise = gaussian * cfg.volatility * dt.sqrt();
    let reversion = cfg.mean_reversion * (1.0 - nav) * dt;

    let jump_prob = (cfg.jump_probability * dt * JUMP_SCALE).clamp(0.0, 1.0);
    let jump = if rng.gen_bool(jump_prob) {
        let magnitude = cfg.jump_size * rng.gen::<f64>();
        if rng.gen_bool(JUMP_UP_BIAS) {
            magnitude
        } else {
            -magnitude
        }
    } else {
        0.0
    };

    let raw_return =
        (drift + market_term + noise + reversion + jump).clamp(-MAX_TICK_RETURN, MAX_TICK_RETURN);

    (nav * (1.0 + raw_return)).clamp(bounds.0, bounds.1)
}

/// Derive a model's status from its NAV. Inside the boundary band around
/// each threshold the outcome is a randomized tie-break.
fn status_for_nav(nav: f64, rng: &mut StdRng) -> ModelStatus {
    if nav >= SCALE_UP_NAV + STATUS_BAND {
        return ModelStatus::Scaling;
    }
    if nav > SCALE_UP_NAV - STATUS_BAND {
        return if rng.gen_bool(0.5) {
            ModelStatus::Scaling
        } else {
            ModelStatus::Active
        };
    }
    if nav <= COOL_DOWN_NAV - STATUS_BAND {
        return ModelStatus::Cooling;
    }
    if nav < COOL_DOWN_NAV + STATUS_BAND {
        return if rng.gen_bool(0.5) {
            ModelStatus::Cooling
        } else {
            ModelStatus::Active
        };
    }
    ModelStatus::Active
}

fn maybe_event(timestamp: i64, rng: &mut StdRng) -> Option<ModelEvent> {
    if !rng.gen_bool(EVENT_PROBABILITY) {
        return None;
    }

    let kind = EVENT_KINDS[rng.gen_range(0..EVENT_KINDS.len())];
    let pool = message_pool(kind);
    let message = pool[rng.gen_range(0..pool.len())].to_string();

    Some(ModelEvent {
        timestamp,
        kind,
        message,
    })
}

/// Rolling market-return input shared by all models.
struct MarketSignal {
    windows: HashMap<String, ReturnWindow>,
    latest: f64,
}

impl MarketSignal {
    fn new() -> Self {
        Self {
            windows: HashMap::new(),
            latest: 0.0,
        }
    }
}

/// State and plumbing shared between the public handle and the tick task.
struct SimCore {
    state: Mutex<AllModelsState>,
    market: Mutex<MarketSignal>,
    rng: Mutex<StdRng>,
    subscribers: Subscribers<AllModelsState>,
    snapshots: Arc<dyn SnapshotStore>,
    tick_interval: Duration,
}

impl SimCore {
    /// Apply one simulation cycle to all models atomically, persist the
    /// trimmed snapshot, and notify subscribers.
    fn tick_cycle(&self) {
        let now = Utc::now().timestamp_millis();
        let market_log_return = self.market.lock().unwrap().latest;
        let dt = self.tick_interval.as_secs_f64() / 86_400.0;

        let snapshot = {
            let mut rng = self.rng.lock().unwrap();
            let mut state = self.state.lock().unwrap();

            for cfg in MODEL_CONFIGS {
                let Some(model) = state.models.get_mut(cfg.id) else {
                    continue;
                };

                let nav = step_nav(
                    cfg,
                    model.current_nav,
                    dt,
                    market_log_return,
                    (NAV_FLOOR, NAV_CEILING),
                    &mut rng,
                );

                // Strictly ascending even when cycles land on the same ms.
                let timestamp = model
                    .nav_series
                    .last()
                    .map(|p| now.max(p.timestamp + 1))
                    .unwrap_or(now);

                model.nav_series.push(NavPoint { timestamp, nav });
                if model.nav_series.len() > MAX_NAV_POINTS {
                    let excess = model.nav_series.len() - MAX_NAV_POINTS;
                    model.nav_series.drain(..excess);
                }

                model.current_nav = nav;
                model.status = status_for_nav(nav, &mut rng);
                model.last_update = timestamp;

                if let Some(event) = maybe_event(timestamp, &mut rng) {
                    model.events.push(event);
                    if model.events.len() > MAX_EVENTS {
                        let excess = model.events.len() - MAX_EVENTS;
                        model.events.drain(..excess);
                    }
                }
            }

            state.last_global_update = now;
            state.clone()
        };

        self.persist(&snapshot);
        self.subscribers.notify(&snapshot);
    }

    /// Persistence never blocks or fails the tick path; failures are
    /// logged inside the snapshot store.
    fn persist(&self, state: &AllModelsState) {
        match serde_json::to_string(state) {
            Ok(payload) => self.snapshots.set(SNAPSHOT_KEY, &payload),
            Err(e) => warn!("Failed to serialize model snapshot: {}", e),
        }
    }
}

/// Per-model stochastic NAV simulator with persistence and pub/sub.
///
/// Lifecycle: construct, [`start`](Self::start), subscribe,
/// [`stop`](Self::stop). Construction either restores a fresh persisted
/// snapshot or synthesizes a backfilled history for every model.
pub struct ModelSimulator {
    core: Arc<SimCore>,
    ticker: Mutex<Option<JoinHandle<()>>>,
}

impl ModelSimulator {
    /// Create a simulator, restoring persisted state when it is fresh and
    /// sane, otherwise regenerating a synthetic backfill.
    pub fn new(snapshots: Arc<dyn SnapshotStore>, tick_interval: Duration, rng: StdRng) -> Self {
        let mut rng = rng;
        let (state, regenerated) = match Self::restore(snapshots.as_ref()) {
            Some(state) => (state, false),
            None => (Self::backfill_all(&mut rng), true),
        };

        let core = Arc::new(SimCore {
            state: Mutex::new(state),
            market: Mutex::new(MarketSignal::new()),
            rng: Mutex::new(rng),
            subscribers: Subscribers::new(),
            snapshots,
            tick_interval,
        });

        if regenerated {
            let snapshot = core.state.lock().unwrap().clone();
            core.persist(&snapshot);
        }

        Self {
            core,
            ticker: Mutex::new(None),
        }
    }

    fn restore(snapshots: &dyn SnapshotStore) -> Option<AllModelsState> {
        let payload = snapshots.get(SNAPSHOT_KEY, SNAPSHOT_MAX_AGE)?;
        let state = match serde_json::from_str::<AllModelsState>(&payload) {
            Ok(state) => state,
            Err(e) => {
                warn!("Discarding unreadable model snapshot: {}", e);
                return None;
            }
        };

        if !Self::validate(&state) {
            warn!("Persisted model state failed sanity checks, regenerating");
            return None;
        }

        info!("Restored {} models from snapshot", state.models.len());
        Some(state)
    }

    /// A snapshot is usable only if every configured model is present with
    /// a coherent, in-bounds NAV path.
    fn validate(state: &AllModelsState) -> bool {
        MODEL_CONFIGS.iter().all(|cfg| {
            let Some(model) = state.models.get(cfg.id) else {
                return false;
            };
            let Some(last) = model.nav_series.last() else {
                return false;
            };

            let ascending = model
                .nav_series
                .windows(2)
                .all(|pair| pair[0].timestamp < pair[1].timestamp);

            ascending
                && last.nav == model.current_nav
                && model.current_nav >= BACKFILL_NAV_FLOOR
                && model.current_nav <= BACKFILL_NAV_CEILING
        })
    }

    fn backfill_all(rng: &mut StdRng) -> AllModelsState {
        let now = Utc::now().timestamp_millis();
        info!(
            "Generating synthetic backfill for {} models ({} points each)",
            MODEL_CONFIGS.len(),
            BACKFILL_POINTS
        );

        let models = MODEL_CONFIGS
            .iter()
            .map(|cfg| (cfg.id.to_string(), Self::backfill_model(cfg, now, rng)))
            .collect();

        AllModelsState {
            models,
            last_global_update: now,
        }
    }

    fn backfill_model(cfg: &ModelConfig, now_ms: i64, rng: &mut StdRng) -> ModelState {
        let spacing_ms = BACKFILL_SPACING_SECS * 1000;
        let start = now_ms - spacing_ms * (BACKFILL_POINTS as i64 - 1);
        let dt = BACKFILL_SPACING_SECS as f64 / 86_400.0;

        let mut nav = 1.0;
        let mut series = Vec::with_capacity(BACKFILL_POINTS);
        let mut events = Vec::new();
        series.push(NavPoint {
            timestamp: start,
            nav,
        });

        for i in 1..BACKFILL_POINTS {
            let timestamp = start + spacing_ms * i as i64;
            nav = step_nav(
                cfg,
                nav,
                dt,
                0.0,
                (BACKFILL_NAV_FLOOR, BACKFILL_NAV_CEILING),
                rng,
            );
            series.push(NavPoint { timestamp, nav });

            if let Some(event) = maybe_event(timestamp, rng) {
                events.push(event);
            }
        }

        let excess = events.len().saturating_sub(MAX_EVENTS);
        events.drain(..excess);

        let status = status_for_nav(nav, rng);
        let last_update = series.last().map(|p| p.timestamp).unwrap_or(now_ms);

        ModelState {
            id: cfg.id.to_string(),
            nav_series: series,
            events,
            current_nav: nav,
            status,
            last_update,
        }
    }

    /// Apply one simulation cycle immediately.
    pub fn tick_now(&self) {
        self.core.tick_cycle();
    }

    /// Feed an observed price into the market-return windows. The most
    /// recent log-return across instruments becomes the market signal.
    pub fn update_price(&self, tick: &PriceTick) {
        let mut market = self.core.market.lock().unwrap();
        let window = market
            .windows
            .entry(tick.symbol.clone())
            .or_insert_with(|| ReturnWindow::new(RETURN_WINDOW));

        if let Some(log_return) = window.record(tick.price) {
            market.latest = log_return;
        }
    }

    /// Begin the recurring tick cycle. Performs one immediate tick, then
    /// schedules the interval. Calling while running is a no-op.
    pub fn start(&self) {
        let mut ticker = self.ticker.lock().unwrap();
        if ticker.is_some() {
            debug!("Simulator already running");
            return;
        }

        info!(
            "Starting model simulator ({} models, {:?} cadence)",
            MODEL_CONFIGS.len(),
            self.core.tick_interval
        );
        self.core.tick_cycle();

        let core = Arc::clone(&self.core);
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(core.tick_interval);
            // First tick of a fresh interval completes immediately; the
            // initial cycle already ran above.
            interval.tick().await;
            loop {
                interval.tick().await;
                core.tick_cycle();
            }
        });

        *ticker = Some(handle);
    }

    /// Cancel the recurring cycle. Safe to call repeatedly or when never
    /// started.
    pub fn stop(&self) {
        if let Some(handle) = self.ticker.lock().unwrap().take() {
            handle.abort();
            info!("Model simulator stopped");
        }
    }

    /// Reinitialize one model to its baseline, persist and notify.
    pub fn reset_model(&self, id: &str) -> Result<()> {
        let cfg = model_config(id).ok_or_else(|| EngineError::UnknownModel(id.to_string()))?;
        let now = Utc::now().timestamp_millis();

        let snapshot = {
            let mut state = self.core.state.lock().unwrap();
            state.models.insert(
                cfg.id.to_string(),
                ModelState {
                    id: cfg.id.to_string(),
                    nav_series: vec![NavPoint {
                        timestamp: now,
                        nav: 1.0,
                    }],
                    events: Vec::new(),
                    current_nav: 1.0,
                    status: ModelStatus::Active,
                    last_update: now,
                },
            );
            state.last_global_update = now;
            state.clone()
        };

        info!("Model {} reset to baseline", id);
        self.core.persist(&snapshot);
        self.core.subscribers.notify(&snapshot);
        Ok(())
    }

    /// Snapshot copy of all model state.
    pub fn state(&self) -> AllModelsState {
        self.core.state.lock().unwrap().clone()
    }

    /// Snapshot copy of one model's state.
    pub fn model(&self, id: &str) -> Option<ModelState> {
        self.core.state.lock().unwrap().models.get(id).cloned()
    }

    /// Derive display metrics for one model.
    pub fn metrics(&self, id: &str) -> Result<CalculatedMetrics> {
        let cfg = model_config(id).ok_or_else(|| EngineError::UnknownModel(id.to_string()))?;
        let model = self
            .model(id)
            .ok_or_else(|| EngineError::UnknownModel(id.to_string()))?;
        Ok(calculate_metrics(&model, cfg.risk_tier))
    }

    /// Register a listener for whole-cycle state snapshots.
    pub fn subscribe(
        &self,
        listener: impl Fn(&AllModelsState) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.core.subscribers.add(listener)
    }

    /// Remove a previously registered listener.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.core.subscribers.remove(id)
    }
}

impl Drop for ModelSimulator {
    fn drop(&mut self) {
        if let Some(handle) = self.ticker.lock().unwrap().take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn test_rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    fn quiet_config(base_drift: f64) -> ModelConfig {
        ModelConfig {
            id: "test",
            risk_tier: RiskTier::Balanced,
            base_drift,
            volatility: 0.0,
            beta: 0.0,
            mean_reversion: 0.0,
            jump_probability: 0.0,
            jump_size: 0.0,
        }
    }

    #[test]
    fn test_step_clamps_excessive_return() {
        // A raw +5% per-tick return must be applied as at most +1.5%.
        let cfg = quiet_config(0.05);
        let mut rng = test_rng();

        let nav = step_nav(&cfg, 1.0, 1.0, 0.0, (NAV_FLOOR, NAV_CEILING), &mut rng);
        assert!((nav - 1.015).abs() < 1e-12);
    }

    #[test]
    fn test_step_clamps_excessive_loss() {
        let cfg = quiet_config(-0.10);
        let mut rng = test_rng();

        let nav = step_nav(&cfg, 1.0, 1.0, 0.0, (NAV_FLOOR, NAV_CEILING), &mut rng);
        assert!((nav - 0.985).abs() < 1e-12);
    }

    #[test]
    fn test_step_respects_nav_bounds() {
        let cfg = quiet_config(1.0);
        let mut rng = test_rng();

        let mut nav = 2.49;
        for _ in 0..100 {
            nav = step_nav(&cfg, nav, 1.0, 0.0, (NAV_FLOOR, NAV_CEILING), &mut rng);
        }
        assert!(nav <= NAV_CEILING);

        let cfg = quiet_config(-1.0);
        let mut nav = 0.71;
        for _ in 0..100 {
            nav = step_nav(&cfg, nav, 1.0, 0.0, (NAV_FLOOR, NAV_CEILING), &mut rng);
        }
        assert!(nav >= NAV_FLOOR);
    }

    #[test]
    fn test_market_term_moves_nav() {
        let cfg = ModelConfig {
            beta: 1.0,
            ..quiet_config(0.0)
        };
        let mut rng = test_rng();

        // dt tiny so drift/reversion are negligible; market term dominates.
        let up = step_nav(&cfg, 1.0, 1e-9, 0.01, (NAV_FLOOR, NAV_CEILING), &mut rng);
        let down = step_nav(&cfg, 1.0, 1e-9, -0.01, (NAV_FLOOR, NAV_CEILING), &mut rng);

        assert!(up > 1.0);
        assert!(down < 1.0);
        // Dampened: 1% market move scales to 0.3% NAV move
        assert!((up - 1.003).abs() < 1e-9);
    }

    #[test]
    fn test_status_thresholds_outside_band() {
        let mut rng = test_rng();

        assert_eq!(status_for_nav(1.30, &mut rng), ModelStatus::Scaling);
        assert_eq!(status_for_nav(1.00, &mut rng), ModelStatus::Active);
        assert_eq!(status_for_nav(0.80, &mut rng), ModelStatus::Cooling);
    }

    #[test]
    fn test_status_band_tie_break_is_bounded() {
        let mut rng = test_rng();

        // Inside the band the outcome may vary, but only between the two
        // adjacent statuses.
        for _ in 0..50 {
            let status = status_for_nav(SCALE_UP_NAV, &mut rng);
            assert!(matches!(status, ModelStatus::Scaling | ModelStatus::Active));

            let status = status_for_nav(COOL_DOWN_NAV, &mut rng);
            assert!(matches!(status, ModelStatus::Cooling | ModelStatus::Active));
        }
    }

    #[test]
    fn test_backfill_shape() {
        let mut rng = test_rng();
        let now = Utc::now().timestamp_millis();
        let cfg = model_config("vertex").unwrap();

        let model = ModelSimulator::backfill_model(cfg, now, &mut rng);

        assert_eq!(model.nav_series.len(), BACKFILL_POINTS);
        assert_eq!(model.nav_series[0].nav, 1.0);
        assert!(model
            .nav_series
            .windows(2)
            .all(|pair| pair[0].timestamp < pair[1].timestamp));
        assert!(model.current_nav >= BACKFILL_NAV_FLOOR);
        assert!(model.current_nav <= BACKFILL_NAV_CEILING);
        assert_eq!(model.current_nav, model.nav_series.last().unwrap().nav);
        // Window spans the configured trailing period
        let span = model.nav_series.last().unwrap().timestamp - model.nav_series[0].timestamp;
        assert_eq!(
            span,
            BACKFILL_SPACING_SECS * 1000 * (BACKFILL_POINTS as i64 - 1)
        );
    }

    #[test]
    fn test_model_config_lookup() {
        assert!(model_config("atlas").is_some());
        assert!(model_config("ghost").is_none());
    }

    #[test]
    fn test_event_messages_match_kind() {
        let mut rng = test_rng();
        let mut produced = 0;

        for _ in 0..2000 {
            if let Some(event) = maybe_event(0, &mut rng) {
                produced += 1;
                assert!(message_pool(event.kind).contains(&event.message.as_str()));
            }
        }

        // EVENT_PROBABILITY of 4% over 2000 draws
        assert!(produced > 20 && produced < 200);
    }
}
