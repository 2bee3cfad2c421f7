//! Error types for Atlas
//!
//! ## Table of Contents
//! - **AtlasError**: Main error enum covering all failure modes
//! - **Result**: Type alias for `Result<T, AtlasError>`

use thiserror::Error;

/// Result type alias for Atlas operations
pub type Result<T> = std::result::Result<T, AtlasError>;

/// Main error type for Atlas operations
#[derive(Error, Debug)]
pub enum AtlasError {
    /// Configuration error during builder setup
    #[error("configuration error: {0}")]
    Config(String),

    /// Allocation mode is neither `product` nor `store`
    #[error("invalid allocation mode: {0}")]
    InvalidMode(String),

    /// Required category/store selector absent for the chosen mode
    #[error("missing selector: {0}")]
    MissingSelector(String),

    /// No default inventory configured and no caller-supplied total
    #[error("no inventory total available: {0}")]
    UnknownInventory(String),

    /// The consumer set resolved to empty for the given selector
    #[error("no forecast available: {0}")]
    NoForecast(String),

    /// The solver was handed an empty forecast map
    #[error("empty consumer set")]
    EmptyConsumerSet,

    /// Total quantity is negative or non-finite
    #[error("invalid total quantity: {0}")]
    InvalidTotal(f64),

    /// A forecast value is NaN or infinite
    #[error("non-finite forecast for consumer: {0}")]
    NonFiniteForecast(String),

    /// Consumer forecast sequences do not share a common day-0 date
    #[error("misaligned forecast calendars: {0}")]
    MisalignedCalendars(String),

    /// Demand history ingestion or aggregation failure
    #[error("history error: {0}")]
    History(String),

    /// Forecaster failure
    #[error("forecast error: {0}")]
    Forecast(String),

    /// Networking failure (HTTP bind/serve)
    #[error("network error: {0}")]
    Network(String),

    /// Metrics collection or export failure
    #[error("metrics error: {0}")]
    Metrics(String),

    /// Generic IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error (should not occur in normal operation)
    #[error("internal error: {0}")]
    Internal(String),
}

impl AtlasError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a missing-selector error
    pub fn missing_selector(msg: impl Into<String>) -> Self {
        Self::MissingSelector(msg.into())
    }

    /// Create a no-forecast error
    pub fn no_forecast(msg: impl Into<String>) -> Self {
        Self::NoForecast(msg.into())
    }

    /// Create a misaligned-calendars error
    pub fn misaligned(msg: impl Into<String>) -> Self {
        Self::MisalignedCalendars(msg.into())
    }

    /// Create a history error
    pub fn history(msg: impl Into<String>) -> Self {
        Self::History(msg.into())
    }

    /// Create a forecast error
    pub fn forecast(msg: impl Into<String>) -> Self {
        Self::Forecast(msg.into())
    }

    /// Create a network error
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    /// Create a metrics error
    pub fn metrics(msg: impl Into<String>) -> Self {
        Self::Metrics(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Short stable label for metrics and log dimensions
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::InvalidMode(_) => "invalid_mode",
            Self::MissingSelector(_) => "missing_selector",
            Self::UnknownInventory(_) => "unknown_inventory",
            Self::NoForecast(_) => "no_forecast",
            Self::EmptyConsumerSet => "empty_consumer_set",
            Self::InvalidTotal(_) => "invalid_total",
            Self::NonFiniteForecast(_) => "non_finite_forecast",
            Self::MisalignedCalendars(_) => "misaligned_calendars",
            Self::History(_) => "history",
            Self::Forecast(_) => "forecast",
            Self::Network(_) => "network",
            Self::Metrics(_) => "metrics",
            Self::Io(_) => "io",
            Self::Serialization(_) => "serialization",
            Self::Internal(_) => "internal",
        }
    }
}

impl From<csv::Error> for AtlasError {
    fn from(err: csv::Error) -> Self {
        Self::History(err.to_string())
    }
}

impl From<prometheus::Error> for AtlasError {
    fn from(err: prometheus::Error) -> Self {
        Self::Metrics(err.to_string())
    }
}
