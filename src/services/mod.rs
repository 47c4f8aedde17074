pub mod debounce;
pub mod feed;
pub mod metrics;
pub mod price_store;
pub mod returns;
pub mod simulator;
pub mod snapshot;
pub mod subscribers;

pub use debounce::Debouncer;
pub use feed::PriceFeed;
pub use metrics::{calculate_metrics, calculate_metrics_at};
pub use price_store::PriceStore;
pub use returns::ReturnWindow;
pub use simulator::{model_config, ModelSimulator, MODEL_CONFIGS};
pub use snapshot::{FileStore, MemoryStore, SnapshotStore};
pub use subscribers::{Subscribers, SubscriptionId};
