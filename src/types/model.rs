use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Lifecycle phase of a simulated model, derived from its NAV.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelStatus {
    Active,
    Scaling,
    Cooling,
}

impl fmt::Display for ModelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelStatus::Active => write!(f, "active"),
            ModelStatus::Scaling => write!(f, "scaling"),
            ModelStatus::Cooling => write!(f, "cooling"),
        }
    }
}

/// Risk classification for a model configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    Conservative,
    Balanced,
    Aggressive,
}

impl RiskTier {
    /// Fallback APY (percent) used when a model has too little history
    /// to annualize from. Product tuning values, not derived.
    pub fn default_apy(&self) -> f64 {
        match self {
            RiskTier::Conservative => 220.0,
            RiskTier::Balanced => 290.0,
            RiskTier::Aggressive => 380.0,
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskTier::Conservative => write!(f, "conservative"),
            RiskTier::Balanced => write!(f, "balanced"),
            RiskTier::Aggressive => write!(f, "aggressive"),
        }
    }
}

/// Category of a model activity log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelEventKind {
    Rebalance,
    Entry,
    Exit,
    Adjustment,
}

/// One entry in a model's bounded activity log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelEvent {
    pub timestamp: i64,
    pub kind: ModelEventKind,
    pub message: String,
}

/// One point on a model's NAV path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavPoint {
    pub timestamp: i64,
    pub nav: f64,
}

/// Immutable per-model tuning for the stochastic step function.
///
/// `base_drift`, `volatility` and `mean_reversion` are expressed per day;
/// the simulator scales them by the tick interval.
#[derive(Debug, Clone, Copy)]
pub struct ModelConfig {
    pub id: &'static str,
    pub risk_tier: RiskTier,
    pub base_drift: f64,
    pub volatility: f64,
    /// Sensitivity to the observed market log-return.
    pub beta: f64,
    pub mean_reversion: f64,
    /// Expected jumps per day, before tick scaling.
    pub jump_probability: f64,
    /// Maximum magnitude of a single jump.
    pub jump_size: f64,
}

/// Mutable simulation state for one model.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelState {
    pub id: String,
    /// Time-ascending NAV path, bounded.
    pub nav_series: Vec<NavPoint>,
    /// Most recent activity entries, bounded.
    pub events: Vec<ModelEvent>,
    pub current_nav: f64,
    pub status: ModelStatus,
    pub last_update: i64,
}

/// Aggregate snapshot across all configured models.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllModelsState {
    pub models: HashMap<String, ModelState>,
    pub last_global_update: i64,
}

impl Default for AllModelsState {
    fn default() -> Self {
        Self {
            models: HashMap::new(),
            last_global_update: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_status_serialization() {
        let json = serde_json::to_string(&ModelStatus::Scaling).unwrap();
        assert_eq!(json, "\"scaling\"");

        let back: ModelStatus = serde_json::from_str("\"cooling\"").unwrap();
        assert_eq!(back, ModelStatus::Cooling);
    }

    #[test]
    fn test_risk_tier_default_apy_ordering() {
        assert!(RiskTier::Conservative.default_apy() < RiskTier::Balanced.default_apy());
        assert!(RiskTier::Balanced.default_apy() < RiskTier::Aggressive.default_apy());
    }

    #[test]
    fn test_model_event_round_trip() {
        let event = ModelEvent {
            timestamp: 1_700_000_000_000,
            kind: ModelEventKind::Entry,
            message: "Opened long exposure".to_string(),
        };

        let json = serde_json::to_string(&event).unwrap();
        let back: ModelEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back.kind, ModelEventKind::Entry);
        assert_eq!(back.message, event.message);
    }

    #[test]
    fn test_model_state_round_trip() {
        let state = ModelState {
            id: "atlas".to_string(),
            nav_series: vec![
                NavPoint { timestamp: 1000, nav: 1.0 },
                NavPoint { timestamp: 2000, nav: 1.01 },
            ],
            events: vec![],
            current_nav: 1.01,
            status: ModelStatus::Active,
            last_update: 2000,
        };

        let json = serde_json::to_string(&state).unwrap();
        let back: ModelState = serde_json::from_str(&json).unwrap();
        assert_eq!(back.nav_series.len(), 2);
        assert_eq!(back.current_nav, 1.01);
        assert_eq!(back.status, ModelStatus::Active);
    }
}
