//! Core types for Atlas allocation
//!
//! ## Table of Contents
//! - **StoreId**: Unique identifier for a retail store
//! - **CategoryId**: Unique identifier for a product category
//! - **ConsumerId**: Opaque token for a participant in one allocation run
//! - **SnapshotId**: Unique identifier for a forecast snapshot
//! - **ForecastPoint**: One (date, point estimate) pair

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Default forecast horizon in days
pub const DEFAULT_HORIZON_DAYS: usize = 7;

/// Minimum observations a (store, category) pair needs before it is forecast
pub const DEFAULT_MIN_HISTORY_DAYS: usize = 10;

/// Unique identifier for a retail store
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoreId(String);

impl StoreId {
    /// Create a new store id
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for StoreId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for StoreId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Unique identifier for a product category
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryId(String);

impl CategoryId {
    /// Create a new category id
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CategoryId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for CategoryId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Opaque identifier for a participant in one allocation run.
///
/// Depending on the allocation mode a consumer is either a store or a
/// category; the solver treats the token as opaque and only requires
/// uniqueness within a run.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConsumerId(String);

impl ConsumerId {
    /// Create a new consumer id
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConsumerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ConsumerId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ConsumerId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<StoreId> for ConsumerId {
    fn from(id: StoreId) -> Self {
        Self(id.0)
    }
}

impl From<CategoryId> for ConsumerId {
    fn from(id: CategoryId) -> Self {
        Self(id.0)
    }
}

/// Unique identifier for a forecast snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SnapshotId(Uuid);

impl SnapshotId {
    /// Create a new random SnapshotId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SnapshotId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "snapshot-{}", &self.0.to_string()[..8])
    }
}

/// One point estimate of demand for a (consumer, date) pair.
///
/// Produced by a [`Forecaster`](crate::forecast::Forecaster) and immutable
/// once computed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    /// Calendar date the estimate is for
    pub date: NaiveDate,
    /// Point estimate of demand
    pub yhat: f64,
}

impl ForecastPoint {
    /// Create a new forecast point
    pub fn new(date: NaiveDate, yhat: f64) -> Self {
        Self { date, yhat }
    }
}
