//! Inventory allocation for Atlas
//!
//! Splits a constrained inventory total across competing consumers in
//! proportion to forecasted need, with:
//! - A closed-form L1-optimal solver (shift-and-clip)
//! - A per-day driver over the forecast horizon
//! - Two request modes: by product category (consumers are stores) and by
//!   store (consumers are categories)
//! - Default totals from the static inventory table when the caller supplies
//!   none

pub mod horizon;
pub mod solver;

pub use horizon::{plan_horizon, AllocationTable};
pub use solver::{allocate, DayAllocation, SUM_TOLERANCE};

use crate::error::{AtlasError, Result};
use crate::forecast::ForecastSnapshot;
use crate::inventory::InventoryTable;
use crate::types::{CategoryId, ConsumerId, ForecastPoint, StoreId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::info;

/// Which entities compete for the total in one allocation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationMode {
    /// Fix a category; consumers are the stores forecasting it
    ByProduct,
    /// Fix a store; consumers are the categories it sells
    ByStore,
}

impl AllocationMode {
    /// Stable string form
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ByProduct => "by_product",
            Self::ByStore => "by_store",
        }
    }
}

impl fmt::Display for AllocationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AllocationMode {
    type Err = AtlasError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "product" | "by_product" => Ok(Self::ByProduct),
            "store" | "by_store" => Ok(Self::ByStore),
            other => Err(AtlasError::InvalidMode(other.to_string())),
        }
    }
}

/// How a by-store run derives its total when the caller supplies none.
///
/// The permissive default sums the per-category inventory defaults over the
/// categories the store forecasts, which conflates category-wide stock with
/// store-available stock; deployments that care should require an explicit
/// total instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreTotalPolicy {
    /// Sum the configured category defaults (categories without a default
    /// contribute zero)
    #[default]
    SumCategoryDefaults,
    /// Reject requests that do not carry an explicit total
    RequireExplicit,
}

/// One allocation request, constructed by the request router
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationRequest {
    /// Allocation mode
    pub mode: AllocationMode,
    /// Category id (by product) or store id (by store)
    pub selector: String,
    /// Caller-supplied total, overriding the inventory defaults
    pub total: Option<f64>,
}

impl AllocationRequest {
    /// Allocate a category's inventory across stores
    pub fn by_product(category: impl Into<String>) -> Self {
        Self {
            mode: AllocationMode::ByProduct,
            selector: category.into(),
            total: None,
        }
    }

    /// Allocate a store's inventory across its categories
    pub fn by_store(store: impl Into<String>) -> Self {
        Self {
            mode: AllocationMode::ByStore,
            selector: store.into(),
            total: None,
        }
    }

    /// Override the total quantity to distribute
    pub fn with_total(mut self, total: f64) -> Self {
        self.total = Some(total);
        self
    }
}

/// Date-keyed allocation result for one request
#[derive(Debug, Clone, Serialize)]
pub struct AllocationPlan {
    /// Mode the plan was computed under
    pub mode: AllocationMode,
    /// Selector the consumer set was resolved from
    pub selector: String,
    /// Total distributed on each day
    pub total: f64,
    /// Per-day allocations, ascending by date
    pub days: AllocationTable,
}

/// Resolves a request's consumer set and total, then drives the per-day
/// solver.
///
/// Holds no optimization logic of its own; it is a pure function of the
/// snapshot it is handed plus the read-only inventory table.
#[derive(Debug, Clone)]
pub struct Allocator {
    inventory: InventoryTable,
    store_total_policy: StoreTotalPolicy,
}

impl Allocator {
    /// Create an allocator over an inventory table
    pub fn new(inventory: InventoryTable) -> Self {
        Self {
            inventory,
            store_total_policy: StoreTotalPolicy::default(),
        }
    }

    /// Set the by-store default-total policy
    pub fn with_store_total_policy(mut self, policy: StoreTotalPolicy) -> Self {
        self.store_total_policy = policy;
        self
    }

    /// The inventory table consulted for default totals
    pub fn inventory(&self) -> &InventoryTable {
        &self.inventory
    }

    /// Plan allocations for every day of the snapshot's horizon
    pub fn plan(
        &self,
        snapshot: &ForecastSnapshot,
        request: &AllocationRequest,
    ) -> Result<AllocationPlan> {
        if let Some(total) = request.total {
            if !total.is_finite() || total < 0.0 {
                return Err(AtlasError::InvalidTotal(total));
            }
        }
        if request.selector.is_empty() {
            return Err(AtlasError::missing_selector(match request.mode {
                AllocationMode::ByProduct => "product allocation requires a category",
                AllocationMode::ByStore => "store allocation requires a store",
            }));
        }

        let (total, series) = match request.mode {
            AllocationMode::ByProduct => self.resolve_by_product(snapshot, request)?,
            AllocationMode::ByStore => self.resolve_by_store(snapshot, request)?,
        };

        let days = plan_horizon(total, &series)?;

        info!(
            mode = %request.mode,
            selector = %request.selector,
            total = total,
            days = days.len(),
            consumers = series.len(),
            "Allocation planned"
        );

        Ok(AllocationPlan {
            mode: request.mode,
            selector: request.selector.clone(),
            total,
            days,
        })
    }

    fn resolve_by_product(
        &self,
        snapshot: &ForecastSnapshot,
        request: &AllocationRequest,
    ) -> Result<(f64, BTreeMap<ConsumerId, Vec<ForecastPoint>>)> {
        let category = CategoryId::new(request.selector.clone());

        let total = match request.total {
            Some(total) => total,
            None => self.inventory.get(&category).map(|q| q as f64).ok_or_else(|| {
                AtlasError::UnknownInventory(format!(
                    "category {} has no configured inventory and no total was supplied",
                    category
                ))
            })?,
        };

        let stores = snapshot
            .category_view(&category)
            .filter(|stores| !stores.is_empty())
            .ok_or_else(|| {
                AtlasError::no_forecast(format!("no store forecasts category {}", category))
            })?;

        let series = stores
            .iter()
            .map(|(store, points)| (ConsumerId::from(store.clone()), points.clone()))
            .collect();

        Ok((total, series))
    }

    fn resolve_by_store(
        &self,
        snapshot: &ForecastSnapshot,
        request: &AllocationRequest,
    ) -> Result<(f64, BTreeMap<ConsumerId, Vec<ForecastPoint>>)> {
        let store = StoreId::new(request.selector.clone());

        let categories = snapshot.store_view(&store);
        if categories.is_empty() {
            return Err(AtlasError::no_forecast(format!(
                "store {} has no category forecasts",
                store
            )));
        }

        let total = match (request.total, self.store_total_policy) {
            (Some(total), _) => total,
            (None, StoreTotalPolicy::SumCategoryDefaults) => {
                self.inventory.total_for(categories.keys()) as f64
            }
            (None, StoreTotalPolicy::RequireExplicit) => {
                return Err(AtlasError::UnknownInventory(format!(
                    "store {} requires an explicit total under the require_explicit policy",
                    store
                )));
            }
        };

        let series = categories
            .into_iter()
            .map(|(category, points)| (ConsumerId::from(category), points.clone()))
            .collect();

        Ok((total, series))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forecast::{ForecastSnapshot, SeasonalNaiveForecaster};
    use crate::history::{DemandHistory, DemandRecord};
    use chrono::Duration;

    /// Fourteen days of flat demand per pair, enough history to forecast.
    fn snapshot() -> ForecastSnapshot {
        let mut records = Vec::new();
        let start: chrono::NaiveDate = "2024-01-01".parse().unwrap();
        for (store, category, quantity) in [
            ("S1", "TECH", 50.0),
            ("S2", "TECH", 30.0),
            ("S3", "TECH", 20.0),
            ("S1", "BOOK", 10.0),
            ("S1", "FOOD", 5.0),
        ] {
            for day in 0..14 {
                records.push(DemandRecord {
                    date: start + Duration::days(day),
                    store_id: store.into(),
                    category: category.into(),
                    quantity,
                });
            }
        }
        let history = DemandHistory::new(records);
        ForecastSnapshot::build(&history, &SeasonalNaiveForecaster::new(), 7, 10).unwrap()
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("product".parse::<AllocationMode>().unwrap(), AllocationMode::ByProduct);
        assert_eq!("by_product".parse::<AllocationMode>().unwrap(), AllocationMode::ByProduct);
        assert_eq!("store".parse::<AllocationMode>().unwrap(), AllocationMode::ByStore);
        assert_eq!("by_store".parse::<AllocationMode>().unwrap(), AllocationMode::ByStore);
        assert!(matches!(
            "warehouse".parse::<AllocationMode>().unwrap_err(),
            AtlasError::InvalidMode(_)
        ));
    }

    #[test]
    fn test_by_product_uses_default_inventory() {
        let allocator = Allocator::new(InventoryTable::builtin());
        let plan = allocator
            .plan(&snapshot(), &AllocationRequest::by_product("TECH"))
            .unwrap();

        assert_eq!(plan.total, 500.0);
        assert_eq!(plan.days.len(), 7);
        for day in plan.days.values() {
            assert_eq!(day.consumer_count(), 3);
            assert!((day.allocated_total() - 500.0).abs() <= SUM_TOLERANCE * 500.0);
        }
    }

    #[test]
    fn test_by_product_with_override_total() {
        let allocator = Allocator::new(InventoryTable::builtin());
        let plan = allocator
            .plan(
                &snapshot(),
                &AllocationRequest::by_product("TECH").with_total(70.0),
            )
            .unwrap();

        // Flat 50/30/20 forecasts against a 70 total: uniform shift of -10.
        for day in plan.days.values() {
            assert!((day.quantities[&ConsumerId::new("S1")] - 40.0).abs() < 1e-9);
            assert!((day.quantities[&ConsumerId::new("S2")] - 20.0).abs() < 1e-9);
            assert!((day.quantities[&ConsumerId::new("S3")] - 10.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_by_product_unconfigured_category_needs_a_total() {
        let allocator = Allocator::new(InventoryTable::builtin());

        // FOOD is forecast by S1 but has no inventory default.
        let err = allocator
            .plan(&snapshot(), &AllocationRequest::by_product("FOOD"))
            .unwrap_err();
        assert!(matches!(err, AtlasError::UnknownInventory(_)));

        let plan = allocator
            .plan(
                &snapshot(),
                &AllocationRequest::by_product("FOOD").with_total(12.0),
            )
            .unwrap();
        assert_eq!(plan.total, 12.0);
    }

    #[test]
    fn test_by_product_without_forecasts_is_not_found() {
        let allocator = Allocator::new(InventoryTable::builtin());
        let err = allocator
            .plan(&snapshot(), &AllocationRequest::by_product("KIDS"))
            .unwrap_err();
        assert!(matches!(err, AtlasError::NoForecast(_)));
    }

    #[test]
    fn test_by_store_sums_category_defaults() {
        let allocator = Allocator::new(InventoryTable::builtin());
        let plan = allocator
            .plan(&snapshot(), &AllocationRequest::by_store("S1"))
            .unwrap();

        // S1 forecasts TECH (500), BOOK (600) and FOOD (unconfigured, 0).
        assert_eq!(plan.total, 1100.0);
        for day in plan.days.values() {
            assert_eq!(day.consumer_count(), 3);
            assert!((day.allocated_total() - 1100.0).abs() <= SUM_TOLERANCE * 1100.0);
        }
    }

    #[test]
    fn test_by_store_require_explicit_policy() {
        let allocator = Allocator::new(InventoryTable::builtin())
            .with_store_total_policy(StoreTotalPolicy::RequireExplicit);

        let err = allocator
            .plan(&snapshot(), &AllocationRequest::by_store("S1"))
            .unwrap_err();
        assert!(matches!(err, AtlasError::UnknownInventory(_)));

        let plan = allocator
            .plan(
                &snapshot(),
                &AllocationRequest::by_store("S1").with_total(90.0),
            )
            .unwrap();
        assert_eq!(plan.total, 90.0);
    }

    #[test]
    fn test_unknown_store_is_not_found() {
        let allocator = Allocator::new(InventoryTable::builtin());
        let err = allocator
            .plan(&snapshot(), &AllocationRequest::by_store("S9"))
            .unwrap_err();
        assert!(matches!(err, AtlasError::NoForecast(_)));
    }

    #[test]
    fn test_missing_selector() {
        let allocator = Allocator::new(InventoryTable::builtin());
        let err = allocator
            .plan(&snapshot(), &AllocationRequest::by_product(""))
            .unwrap_err();
        assert!(matches!(err, AtlasError::MissingSelector(_)));
    }

    #[test]
    fn test_negative_override_total_is_rejected_up_front() {
        let allocator = Allocator::new(InventoryTable::builtin());
        let err = allocator
            .plan(
                &snapshot(),
                &AllocationRequest::by_product("TECH").with_total(-3.0),
            )
            .unwrap_err();
        assert!(matches!(err, AtlasError::InvalidTotal(_)));
    }
}
