use serde::{Deserialize, Serialize};

/// Display analytics derived from one model's simulated history.
///
/// Recomputed on demand, never persisted. Percentage fields are expressed
/// in percent (5.0 = 5%).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculatedMetrics {
    /// Total PnL since inception (NAV 1.0 baseline).
    pub pnl_total_pct: f64,
    /// PnL over the trailing 24 hours.
    pub pnl_daily_pct: f64,
    /// Annualized yield from the trailing 7-day window.
    pub apy_7d: f64,
    /// Return over the trailing 30 days.
    pub return_30d: f64,
    /// Sample stdev of consecutive log-returns over 30 days, in percent.
    pub volatility_30d: f64,
    /// Largest peak-to-trough NAV decline over the full series.
    pub max_drawdown: f64,
    /// Fraction of sampled intervals where NAV increased.
    pub win_rate: f64,
    /// Count of entry/exit events in the activity log.
    pub trade_count: usize,
    pub sharpe_ratio: f64,
}
