//! Atlas allocation server
//!
//! Run with: cargo run --release --bin atlasd
//!
//! Environment:
//! - `ATLAS_HISTORY`: demand history CSV path (default: synthetic_data.csv)
//! - `ATLAS_ADDR`: HTTP bind address (default: 0.0.0.0:8080)
//! - `RUST_LOG`: log filter (default: info)

use atlas_allocation::AtlasBuilder;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let history_path =
        std::env::var("ATLAS_HISTORY").unwrap_or_else(|_| "synthetic_data.csv".to_string());
    let addr = std::env::var("ATLAS_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

    let atlas = Arc::new(AtlasBuilder::new().with_http_addr(&addr)?.build()?);

    let records = atlas.load_history_csv(&history_path)?;
    info!(records = records, path = %history_path, "Demand history ready");

    let snapshot_id = atlas.refresh_forecasts()?;
    info!(snapshot_id = %snapshot_id, "Initial forecast snapshot ready");

    atlas.run().await?;
    Ok(())
}
