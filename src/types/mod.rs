pub mod metrics;
pub mod model;
pub mod price;

pub use metrics::CalculatedMetrics;
pub use model::{
    AllModelsState, ModelConfig, ModelEvent, ModelEventKind, ModelState, ModelStatus, NavPoint,
    RiskTier,
};
pub use price::{ConnectionStatus, DataSource, PriceState, PriceTick, PriceUpdate};
