//! # Atlas Allocation
//!
//! A Rust-native inventory allocation service for demand-driven
//! replenishment: forecast snapshots per (store, category) pair, an
//! L1-optimal closed-form allocation solver, and a daily planner over the
//! forecast horizon.
//!
//! ## Features
//!
//! - **Allocation Solver**: Split a fixed total across consumers while
//!   minimizing summed deviation from forecast (shift-and-clip closed form)
//! - **Daily Planner**: One independent solve per horizon day, in parallel
//! - **Two Modes**: Allocate a category across its stores, or a store's
//!   stock across its categories
//! - **Forecast Seam**: Pluggable [`forecast::Forecaster`] with seasonal-naive
//!   and drift baselines; immutable snapshots with an explicit refresh
//! - **HTTP Surface**: Axum endpoints for allocation, forecasts, historical
//!   breakdowns and metrics
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use atlas_allocation::{AtlasBuilder, AllocationRequest};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> atlas_allocation::Result<()> {
//!     let atlas = Arc::new(AtlasBuilder::new().build()?);
//!
//!     atlas.load_history_csv("synthetic_data.csv")?;
//!     atlas.refresh_forecasts()?;
//!
//!     let plan = atlas.plan(&AllocationRequest::by_product("TECH").with_total(100.0))?;
//!     println!("{} days planned", plan.days.len());
//!
//!     atlas.run().await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod allocator;
pub mod api;
pub mod builder;
pub mod error;
pub mod forecast;
pub mod history;
pub mod inventory;
pub mod metrics;
pub mod runtime;
pub mod types;

// Re-exports for ergonomic API
pub use allocator::{
    allocate, AllocationMode, AllocationPlan, AllocationRequest, Allocator, DayAllocation,
    StoreTotalPolicy,
};
pub use api::HttpServerConfig;
pub use builder::{AtlasBuilder, AtlasConfig};
pub use error::{AtlasError, Result};
pub use forecast::{DriftForecaster, ForecastSnapshot, Forecaster, SeasonalNaiveForecaster};
pub use history::{DemandHistory, DemandRecord};
pub use inventory::InventoryTable;
pub use metrics::AtlasMetrics;
pub use runtime::Atlas;
pub use types::{CategoryId, ConsumerId, ForecastPoint, SnapshotId, StoreId};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::allocator::{AllocationMode, AllocationRequest, Allocator};
    pub use crate::builder::AtlasBuilder;
    pub use crate::error::Result;
    pub use crate::forecast::{Forecaster, SeasonalNaiveForecaster};
    pub use crate::history::DemandHistory;
    pub use crate::inventory::InventoryTable;
    pub use crate::runtime::Atlas;
    pub use crate::types::{CategoryId, ConsumerId, StoreId};
}
