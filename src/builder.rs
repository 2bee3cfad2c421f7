//! AtlasBuilder for configuring and constructing Atlas instances
//!
//! ## Table of Contents
//! - **AtlasBuilder**: Builder pattern for Atlas configuration
//! - **AtlasConfig**: Complete configuration struct

use crate::allocator::{Allocator, StoreTotalPolicy};
use crate::api::HttpServerConfig;
use crate::error::{AtlasError, Result};
use crate::forecast::{BoxedForecaster, Forecaster, SeasonalNaiveForecaster};
use crate::inventory::InventoryTable;
use crate::metrics::AtlasMetrics;
use crate::runtime::Atlas;
use crate::types::{DEFAULT_HORIZON_DAYS, DEFAULT_MIN_HISTORY_DAYS};
use std::sync::Arc;
use tracing::info;

/// Complete Atlas configuration
#[derive(Debug, Clone)]
pub struct AtlasConfig {
    /// HTTP server config
    pub http_config: HttpServerConfig,
    /// Per-category default inventory table
    pub inventory: InventoryTable,
    /// Forecast horizon in days
    pub horizon_days: usize,
    /// Minimum observations before a pair is forecast
    pub min_history_days: usize,
    /// Default-total policy for by-store runs
    pub store_total_policy: StoreTotalPolicy,
    /// Enable metrics
    pub metrics_enabled: bool,
    /// Service name
    pub service_name: String,
}

impl Default for AtlasConfig {
    fn default() -> Self {
        Self {
            http_config: HttpServerConfig::default(),
            inventory: InventoryTable::builtin(),
            horizon_days: DEFAULT_HORIZON_DAYS,
            min_history_days: DEFAULT_MIN_HISTORY_DAYS,
            store_total_policy: StoreTotalPolicy::default(),
            metrics_enabled: true,
            service_name: hostname::get()
                .map(|h| h.to_string_lossy().to_string())
                .unwrap_or_else(|_| "atlas-node".to_string()),
        }
    }
}

/// Builder for constructing Atlas instances
pub struct AtlasBuilder {
    config: AtlasConfig,
    forecaster: Option<BoxedForecaster>,
}

impl AtlasBuilder {
    /// Create a new AtlasBuilder with default configuration
    pub fn new() -> Self {
        Self {
            config: AtlasConfig::default(),
            forecaster: None,
        }
    }

    /// Set the inventory table consulted for default totals
    pub fn with_inventory(mut self, inventory: InventoryTable) -> Self {
        self.config.inventory = inventory;
        self
    }

    /// Set the forecaster
    pub fn with_forecaster<F: Forecaster + 'static>(mut self, forecaster: F) -> Self {
        self.forecaster = Some(Arc::new(forecaster));
        self
    }

    /// Set the forecast horizon in days
    pub fn with_horizon_days(mut self, days: usize) -> Self {
        self.config.horizon_days = days;
        self
    }

    /// Set the minimum observation count before a pair is forecast
    pub fn with_min_history_days(mut self, days: usize) -> Self {
        self.config.min_history_days = days;
        self
    }

    /// Set the by-store default-total policy
    pub fn with_store_total_policy(mut self, policy: StoreTotalPolicy) -> Self {
        self.config.store_total_policy = policy;
        self
    }

    /// Set HTTP server configuration
    pub fn with_http_config(mut self, config: HttpServerConfig) -> Self {
        self.config.http_config = config;
        self
    }

    /// Set HTTP bind address
    pub fn with_http_addr(mut self, addr: &str) -> Result<Self> {
        self.config.http_config = self.config.http_config.with_addr_str(addr)?;
        Ok(self)
    }

    /// Enable or disable metrics
    pub fn with_metrics(mut self, enabled: bool) -> Self {
        self.config.metrics_enabled = enabled;
        self
    }

    /// Set service name
    pub fn with_service_name(mut self, name: impl Into<String>) -> Self {
        self.config.service_name = name.into();
        self
    }

    /// Build the Atlas instance
    pub fn build(self) -> Result<Atlas> {
        if self.config.horizon_days == 0 {
            return Err(AtlasError::config("horizon_days must be at least 1"));
        }
        if self.config.min_history_days == 0 {
            return Err(AtlasError::config("min_history_days must be at least 1"));
        }

        info!(
            service = %self.config.service_name,
            horizon_days = self.config.horizon_days,
            "Building Atlas instance"
        );

        // Default forecaster
        let forecaster = self
            .forecaster
            .unwrap_or_else(|| Arc::new(SeasonalNaiveForecaster::new()));

        // Allocator over the configured inventory table
        let allocator = Allocator::new(self.config.inventory.clone())
            .with_store_total_policy(self.config.store_total_policy);

        // Metrics
        let metrics = if self.config.metrics_enabled {
            Some(Arc::new(AtlasMetrics::new()?))
        } else {
            None
        };

        Ok(Atlas::new(self.config, forecaster, allocator, metrics))
    }
}

impl Default for AtlasBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forecast::DriftForecaster;

    #[test]
    fn test_builder_default() {
        let atlas = AtlasBuilder::new().build();
        assert!(atlas.is_ok());
    }

    #[test]
    fn test_builder_with_custom_forecaster() {
        let atlas = AtlasBuilder::new()
            .with_forecaster(DriftForecaster::new())
            .with_horizon_days(14)
            .build();
        assert!(atlas.is_ok());
    }

    #[test]
    fn test_builder_rejects_zero_horizon() {
        let atlas = AtlasBuilder::new().with_horizon_days(0).build();
        assert!(matches!(atlas.unwrap_err(), AtlasError::Config(_)));
    }

    #[test]
    fn test_builder_with_http_addr() {
        let atlas = AtlasBuilder::new()
            .with_http_addr("127.0.0.1:9100")
            .unwrap()
            .build();
        assert!(atlas.is_ok());
    }

    #[test]
    fn test_builder_rejects_bad_addr() {
        assert!(AtlasBuilder::new().with_http_addr("not-an-addr").is_err());
    }
}
