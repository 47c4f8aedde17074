use mirage::services::{FileStore, ModelSimulator, PriceFeed, PriceStore};
use mirage::types::PriceUpdate;
use mirage::Config;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mirage=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env();
    info!(
        "Starting Mirage engine ({} symbols, {}s tick)",
        config.symbols.len(),
        config.tick_interval_secs
    );

    // Persistence port shared by both stores
    let snapshots = Arc::new(FileStore::new(&config.snapshot_dir));

    // Price cache
    let store = Arc::new(PriceStore::new(snapshots.clone()));

    // Model simulator, coupled to observed market returns
    let simulator = Arc::new(ModelSimulator::new(
        snapshots,
        Duration::from_secs(config.tick_interval_secs),
        StdRng::from_entropy(),
    ));
    {
        let simulator = simulator.clone();
        store.subscribe(move |update| {
            if let PriceUpdate::Tick(tick) = update {
                simulator.update_price(tick);
            }
        });
    }

    // Price feed with streaming-to-polling failover
    let feed = PriceFeed::new(&config, store.clone());

    simulator.start();
    feed.start();

    // Periodic status summary
    let summary_store = store.clone();
    let summary_sim = simulator.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            let models = summary_sim.state();
            info!(
                "Feed: {}; models at {}",
                summary_store.connection_summary(),
                models
                    .models
                    .values()
                    .map(|m| format!("{}={:.4}", m.id, m.current_nav))
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
    });

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");

    feed.stop();
    simulator.stop();

    Ok(())
}
