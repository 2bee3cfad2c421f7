//! Atlas runtime and serving loop
//!
//! ## Table of Contents
//! - **Atlas**: Main runtime struct
//! - **RuntimeState**: Lifecycle states
//!
//! The runtime owns the demand history and the current forecast snapshot.
//! Both are immutable values behind a read-mostly lock, swapped whole on
//! refresh, so allocation requests share them without copying or blocking
//! each other.

use crate::allocator::{AllocationPlan, AllocationRequest, Allocator};
use crate::api;
use crate::builder::AtlasConfig;
use crate::error::{AtlasError, Result};
use crate::forecast::{BoxedForecaster, ForecastSnapshot};
use crate::history::DemandHistory;
use crate::metrics::AtlasMetrics;
use crate::types::SnapshotId;
use parking_lot::RwLock;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::broadcast;
use tracing::{error, info};

/// Runtime state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeState {
    /// Not started
    Stopped,
    /// Starting up
    Starting,
    /// Running normally
    Running,
    /// Shutting down
    ShuttingDown,
}

/// Main Atlas runtime
pub struct Atlas {
    config: AtlasConfig,
    state: RwLock<RuntimeState>,

    // Core components
    forecaster: BoxedForecaster,
    allocator: Allocator,
    metrics: Option<Arc<AtlasMetrics>>,

    // Shared read-mostly data
    history: RwLock<Option<Arc<DemandHistory>>>,
    snapshot: RwLock<Option<Arc<ForecastSnapshot>>>,

    // Shutdown signal
    shutdown_tx: broadcast::Sender<()>,
}

impl std::fmt::Debug for Atlas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Atlas").finish_non_exhaustive()
    }
}

impl Atlas {
    /// Create a new Atlas instance (use AtlasBuilder instead)
    pub(crate) fn new(
        config: AtlasConfig,
        forecaster: BoxedForecaster,
        allocator: Allocator,
        metrics: Option<Arc<AtlasMetrics>>,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            state: RwLock::new(RuntimeState::Stopped),
            forecaster,
            allocator,
            metrics,
            history: RwLock::new(None),
            snapshot: RwLock::new(None),
            shutdown_tx,
        }
    }

    /// Get current runtime state
    pub fn state(&self) -> RuntimeState {
        *self.state.read()
    }

    /// Get the configuration
    pub fn config(&self) -> &AtlasConfig {
        &self.config
    }

    /// Get metrics instance
    pub fn metrics(&self) -> Option<&Arc<AtlasMetrics>> {
        self.metrics.as_ref()
    }

    /// Get the allocator
    pub fn allocator(&self) -> &Allocator {
        &self.allocator
    }

    // History management

    /// Replace the demand history
    pub fn set_history(&self, history: DemandHistory) {
        info!(records = history.len(), "Demand history replaced");
        *self.history.write() = Some(Arc::new(history));
    }

    /// Load the demand history from a CSV file
    pub fn load_history_csv(&self, path: impl AsRef<Path>) -> Result<usize> {
        let history = DemandHistory::from_csv_path(path)?;
        let records = history.len();
        self.set_history(history);
        Ok(records)
    }

    /// Current demand history, if loaded
    pub fn history(&self) -> Option<Arc<DemandHistory>> {
        self.history.read().clone()
    }

    /// Current demand history, or an error when none is loaded
    pub fn history_required(&self) -> Result<Arc<DemandHistory>> {
        self.history()
            .ok_or_else(|| AtlasError::history("no demand history loaded"))
    }

    // Forecast management

    /// Rebuild the forecast snapshot from the current history.
    ///
    /// This is the only way forecasts come into existence; serving and
    /// forecast computation stay independently testable. Requests running
    /// concurrently keep the snapshot they already hold.
    pub fn refresh_forecasts(&self) -> Result<SnapshotId> {
        let history = self.history_required()?;

        let start = Instant::now();
        let snapshot = ForecastSnapshot::build(
            &history,
            self.forecaster.as_ref(),
            self.config.horizon_days,
            self.config.min_history_days,
        )?;
        let elapsed = start.elapsed().as_secs_f64();

        let id = snapshot.id();
        let pairs = snapshot.pair_count();
        *self.snapshot.write() = Some(Arc::new(snapshot));

        if let Some(metrics) = &self.metrics {
            metrics.record_refresh(pairs, elapsed);
        }

        info!(
            snapshot_id = %id,
            forecaster = self.forecaster.name(),
            pairs = pairs,
            elapsed_secs = elapsed,
            "Forecasts refreshed"
        );

        Ok(id)
    }

    /// Current forecast snapshot, if one has been built
    pub fn snapshot(&self) -> Option<Arc<ForecastSnapshot>> {
        self.snapshot.read().clone()
    }

    /// Current forecast snapshot, or an error when none has been built
    pub fn snapshot_required(&self) -> Result<Arc<ForecastSnapshot>> {
        self.snapshot().ok_or_else(|| {
            AtlasError::forecast("no forecast snapshot loaded; call refresh_forecasts first")
        })
    }

    // Allocation

    /// Plan allocations for a request against the current snapshot
    pub fn plan(&self, request: &AllocationRequest) -> Result<AllocationPlan> {
        let snapshot = self.snapshot_required()?;

        let start = Instant::now();
        let result = self.allocator.plan(&snapshot, request);

        match &result {
            Ok(plan) => {
                if let Some(metrics) = &self.metrics {
                    metrics.record_allocation(
                        request.mode.as_str(),
                        plan.days.len(),
                        start.elapsed().as_secs_f64(),
                    );
                }
            }
            Err(err) => {
                if let Some(metrics) = &self.metrics {
                    metrics.record_allocation_failure(err.kind());
                }
            }
        }

        result
    }

    // Serving

    /// Run the HTTP control plane until shutdown
    pub async fn run(self: Arc<Self>) -> Result<()> {
        *self.state.write() = RuntimeState::Starting;

        info!(
            service = %self.config.service_name,
            addr = %self.config.http_config.bind_addr,
            "Starting Atlas control plane"
        );

        let router = api::router(self.clone());
        let server = api::HttpServer::new(self.config.http_config.clone()).with_router(router);

        *self.state.write() = RuntimeState::Running;

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        tokio::select! {
            result = server.serve() => {
                if let Err(e) = result {
                    error!(error = %e, "HTTP server error");
                }
            }
            _ = shutdown_rx.recv() => {
                info!("Shutdown signal received");
            }
        }

        self.shutdown();
        Ok(())
    }

    /// Shut down the control plane
    pub fn shutdown(&self) {
        {
            let mut state = self.state.write();
            if *state == RuntimeState::Stopped {
                return;
            }
            *state = RuntimeState::ShuttingDown;
        }

        let _ = self.shutdown_tx.send(());
        *self.state.write() = RuntimeState::Stopped;

        info!("Atlas control plane stopped");
    }

    /// Signal shutdown without waiting
    pub fn signal_shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Subscribe to the shutdown signal
    pub fn shutdown_receiver(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }
}
