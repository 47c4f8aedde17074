//! Pure derivation of display analytics from a model's simulated history.
//!
//! Stateless and recomputed from scratch on every call. Annualization is
//! always done on continuously-compounded (log) returns so results stay
//! stable across window lengths.

use crate::types::{CalculatedMetrics, ModelEventKind, ModelState, NavPoint, RiskTier};
use chrono::Utc;

const MS_PER_DAY: i64 = 86_400_000;

// Display tuning constants, preserved as configuration.
const APY_MIN: f64 = 190.0;
const APY_MAX: f64 = 460.0;
const RETURN_30D_MIN: f64 = -50.0;
const RETURN_30D_MAX: f64 = 100.0;
const RISK_FREE_RATE: f64 = 0.04;
const SHARPE_CAP: f64 = 5.0;
const SHARPE_DEFAULT: f64 = 2.5;
const DEFAULT_VOLATILITY: f64 = 0.02;
const WIN_RATE_SAMPLES: usize = 30;

/// Derive metrics for a model as of now.
pub fn calculate_metrics(state: &ModelState, tier: RiskTier) -> CalculatedMetrics {
    calculate_metrics_at(state, tier, Utc::now().timestamp_millis())
}

/// Derive metrics with an explicit clock, for deterministic evaluation.
pub fn calculate_metrics_at(state: &ModelState, tier: RiskTier, now: i64) -> CalculatedMetrics {
    let series = &state.nav_series;
    let current = state.current_nav;

    let pnl_total_pct = (current - 1.0) * 100.0;

    let pnl_daily_pct = {
        let base = nav_at(series, now - MS_PER_DAY);
        if base > 0.0 {
            (current / base - 1.0) * 100.0
        } else {
            0.0
        }
    };

    let apy_7d = apy_7d(series, current, tier, now);

    let return_30d = {
        let value = if spans_back_to(series, now - 30 * MS_PER_DAY) {
            let base = nav_at(series, now - 30 * MS_PER_DAY);
            if base > 0.0 {
                (current / base - 1.0) * 100.0
            } else {
                pnl_total_pct
            }
        } else {
            pnl_total_pct
        };
        value.clamp(RETURN_30D_MIN, RETURN_30D_MAX)
    };

    let vol_raw = volatility_raw(series, now);
    let volatility_30d = vol_raw * 100.0;

    let max_drawdown = max_drawdown(series);
    let win_rate = win_rate(series);

    let trade_count = state
        .events
        .iter()
        .filter(|e| matches!(e.kind, ModelEventKind::Entry | ModelEventKind::Exit))
        .count();

    let sharpe_ratio = if vol_raw < 1e-9 {
        SHARPE_DEFAULT
    } else {
        let excess = apy_7d / 100.0 - RISK_FREE_RATE;
        (excess / (vol_raw * 365.0_f64.sqrt())).min(SHARPE_CAP)
    };

    CalculatedMetrics {
        pnl_total_pct,
        pnl_daily_pct,
        apy_7d,
        return_30d,
        volatility_30d,
        max_drawdown,
        win_rate,
        trade_count,
        sharpe_ratio,
    }
}

/// NAV at the nearest point at-or-before `target`, else the earliest point.
fn nav_at(series: &[NavPoint], target: i64) -> f64 {
    let mut result = None;
    for point in series {
        if point.timestamp <= target {
            result = Some(point.nav);
        } else {
            break;
        }
    }

    result.unwrap_or_else(|| series.first().map(|p| p.nav).unwrap_or(1.0))
}

/// Whether the series reaches back to `target` or earlier.
fn spans_back_to(series: &[NavPoint], target: i64) -> bool {
    series.first().map(|p| p.timestamp <= target).unwrap_or(false)
}

fn apy_7d(series: &[NavPoint], current: f64, tier: RiskTier, now: i64) -> f64 {
    let week_ago = now - 7 * MS_PER_DAY;

    let value = if spans_back_to(series, week_ago) {
        let base = nav_at(series, week_ago);
        if base > 0.0 && current > 0.0 {
            let weekly_log = (current / base).ln();
            ((weekly_log * 52.0).exp() - 1.0) * 100.0
        } else {
            tier.default_apy()
        }
    } else {
        let span_days = series
            .first()
            .zip(series.last())
            .map(|(first, last)| (last.timestamp - first.timestamp) as f64 / MS_PER_DAY as f64)
            .unwrap_or(0.0);

        if span_days > 0.5 {
            let first = series.first().map(|p| p.nav).unwrap_or(1.0);
            if first > 0.0 && current > 0.0 {
                let annual_log = (current / first).ln() * 365.0 / span_days;
                (annual_log.exp() - 1.0) * 100.0
            } else {
                tier.default_apy()
            }
        } else {
            tier.default_apy()
        }
    };

    value.clamp(APY_MIN, APY_MAX)
}

/// Sample stdev of consecutive log-returns over the trailing 30 days.
fn volatility_raw(series: &[NavPoint], now: i64) -> f64 {
    let cutoff = now - 30 * MS_PER_DAY;
    let window: Vec<f64> = series
        .iter()
        .filter(|p| p.timestamp >= cutoff && p.nav > 0.0)
        .map(|p| p.nav)
        .collect();

    let returns: Vec<f64> = window.windows(2).map(|w| (w[1] / w[0]).ln()).collect();
    if returns.len() < 2 {
        return DEFAULT_VOLATILITY;
    }

    let mean = returns.iter().sum::<f64>() / returns.len() as f64;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>()
        / (returns.len() - 1) as f64;

    variance.sqrt()
}

/// Largest percentage decline from any running peak.
fn max_drawdown(series: &[NavPoint]) -> f64 {
    let mut peak = f64::MIN;
    let mut worst = 0.0f64;

    for point in series {
        peak = peak.max(point.nav);
        if peak > 0.0 {
            let drawdown = (peak - point.nav) / peak * 100.0;
            worst = worst.max(drawdown);
        }
    }

    worst
}

/// Fraction of sampled intervals where NAV increased, in percent.
fn win_rate(series: &[NavPoint]) -> f64 {
    if series.len() < 2 {
        return 50.0;
    }

    let step = (series.len() / WIN_RATE_SAMPLES).max(1);
    let mut wins = 0usize;
    let mut total = 0usize;

    let mut i = step;
    while i < series.len() {
        total += 1;
        if series[i].nav > series[i - step].nav {
            wins += 1;
        }
        i += step;
    }

    if total == 0 {
        return 50.0;
    }

    wins as f64 / total as f64 * 100.0
}
