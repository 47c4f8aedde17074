//! Integration tests for the metrics calculator.

use mirage::services::{calculate_metrics_at, MemoryStore, ModelSimulator, MODEL_CONFIGS};
use mirage::types::{ModelState, ModelStatus, NavPoint, RiskTier};
use mirage::EngineError;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::Duration;

const MS_PER_DAY: i64 = 86_400_000;

fn state_from_series(series: Vec<NavPoint>) -> ModelState {
    let current = series.last().map(|p| p.nav).unwrap_or(1.0);
    let last_update = series.last().map(|p| p.timestamp).unwrap_or(0);
    ModelState {
        id: "test".to_string(),
        nav_series: series,
        events: Vec::new(),
        current_nav: current,
        status: ModelStatus::Active,
        last_update,
    }
}

#[test]
fn test_one_day_gain_scenario() {
    let t0 = 1_700_000_000_000i64;
    let state = state_from_series(vec![
        NavPoint {
            timestamp: t0,
            nav: 1.0,
        },
        NavPoint {
            timestamp: t0 + MS_PER_DAY,
            nav: 1.05,
        },
    ]);

    let metrics = calculate_metrics_at(&state, RiskTier::Balanced, t0 + MS_PER_DAY);
    assert!((metrics.pnl_daily_pct - 5.0).abs() < 1e-9);
    assert!((metrics.pnl_total_pct - 5.0).abs() < 1e-9);
}

#[test]
fn test_fresh_reset_scenario() {
    let sim = ModelSimulator::new(
        Arc::new(MemoryStore::new()),
        Duration::from_secs(5),
        StdRng::seed_from_u64(1),
    );
    sim.reset_model("vertex").unwrap();

    let metrics = sim.metrics("vertex").unwrap();
    assert_eq!(metrics.apy_7d, RiskTier::Balanced.default_apy());
    assert_eq!(metrics.max_drawdown, 0.0);
    assert_eq!(metrics.win_rate, 50.0);
    assert_eq!(metrics.trade_count, 0);
}

#[test]
fn test_tier_defaults_differ_by_risk() {
    let t0 = 1_700_000_000_000i64;
    let state = state_from_series(vec![NavPoint {
        timestamp: t0,
        nav: 1.0,
    }]);

    let conservative = calculate_metrics_at(&state, RiskTier::Conservative, t0);
    let balanced = calculate_metrics_at(&state, RiskTier::Balanced, t0);
    let aggressive = calculate_metrics_at(&state, RiskTier::Aggressive, t0);

    assert!(conservative.apy_7d < balanced.apy_7d);
    assert!(balanced.apy_7d < aggressive.apy_7d);
}

#[test]
fn test_metrics_over_simulated_history() {
    let sim = ModelSimulator::new(
        Arc::new(MemoryStore::new()),
        Duration::from_secs(5),
        StdRng::seed_from_u64(2),
    );
    for _ in 0..20 {
        sim.tick_now();
    }

    for cfg in MODEL_CONFIGS {
        let metrics = sim.metrics(cfg.id).unwrap();

        // Display clamps always hold
        assert!(metrics.apy_7d >= 190.0 && metrics.apy_7d <= 460.0);
        assert!(metrics.return_30d >= -50.0 && metrics.return_30d <= 100.0);
        assert!(metrics.sharpe_ratio <= 5.0);
        assert!(metrics.max_drawdown >= 0.0);
        assert!(metrics.win_rate >= 0.0 && metrics.win_rate <= 100.0);
        assert!(metrics.volatility_30d >= 0.0);
    }
}

#[test]
fn test_metrics_are_pure_over_identical_state() {
    let sim = ModelSimulator::new(
        Arc::new(MemoryStore::new()),
        Duration::from_secs(5),
        StdRng::seed_from_u64(3),
    );
    let model = sim.model("titan").unwrap();
    let now = model.last_update + 1000;

    let a = calculate_metrics_at(&model, RiskTier::Aggressive, now);
    let b = calculate_metrics_at(&model, RiskTier::Aggressive, now);

    assert_eq!(a.pnl_total_pct, b.pnl_total_pct);
    assert_eq!(a.pnl_daily_pct, b.pnl_daily_pct);
    assert_eq!(a.apy_7d, b.apy_7d);
    assert_eq!(a.return_30d, b.return_30d);
    assert_eq!(a.volatility_30d, b.volatility_30d);
    assert_eq!(a.max_drawdown, b.max_drawdown);
    assert_eq!(a.win_rate, b.win_rate);
    assert_eq!(a.trade_count, b.trade_count);
    assert_eq!(a.sharpe_ratio, b.sharpe_ratio);
}

#[test]
fn test_metrics_do_not_mutate_state() {
    let sim = ModelSimulator::new(
        Arc::new(MemoryStore::new()),
        Duration::from_secs(5),
        StdRng::seed_from_u64(4),
    );

    let before = sim.model("atlas").unwrap();
    sim.metrics("atlas").unwrap();
    let after = sim.model("atlas").unwrap();

    assert_eq!(before.nav_series.len(), after.nav_series.len());
    assert_eq!(before.current_nav, after.current_nav);
    assert_eq!(before.last_update, after.last_update);
}

#[test]
fn test_metrics_unknown_model_errors() {
    let sim = ModelSimulator::new(
        Arc::new(MemoryStore::new()),
        Duration::from_secs(5),
        StdRng::seed_from_u64(5),
    );

    let err = sim.metrics("ghost").unwrap_err();
    assert!(matches!(err, EngineError::UnknownModel(_)));
}
