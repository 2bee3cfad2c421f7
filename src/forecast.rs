//! Forecast provider seam and forecast snapshots
//!
//! ## Table of Contents
//! - **Forecaster**: Trait for pluggable demand forecasters
//! - **SeasonalNaiveForecaster**: Same-weekday mean baseline (default)
//! - **DriftForecaster**: Mean plus linear drift baseline
//! - **ForecastSnapshot**: Immutable per-(store, category) forecast set
//!
//! The allocator never forecasts. It consumes point estimates produced here,
//! and the internal method of a [`Forecaster`] is irrelevant to it.

use crate::error::{AtlasError, Result};
use crate::history::DemandHistory;
use crate::types::{CategoryId, ForecastPoint, SnapshotId, StoreId};
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Boxed forecaster shared by the runtime
pub type BoxedForecaster = Arc<dyn Forecaster>;

/// Trait for demand forecasters.
///
/// A forecaster is a pure function of an observed daily demand series: given
/// the series and a horizon, it returns one point estimate per future day.
///
/// # Example
///
/// ```rust,ignore
/// use atlas_allocation::forecast::Forecaster;
///
/// struct FlatForecaster;
///
/// impl Forecaster for FlatForecaster {
///     fn forecast(&self, history: &[(chrono::NaiveDate, f64)], horizon: usize)
///         -> atlas_allocation::Result<Vec<f64>>
///     {
///         let mean = history.iter().map(|(_, q)| q).sum::<f64>() / history.len() as f64;
///         Ok(vec![mean; horizon])
///     }
/// }
/// ```
#[cfg_attr(test, mockall::automock)]
pub trait Forecaster: Send + Sync {
    /// Produce `horizon` point estimates for the days following the series.
    ///
    /// # Arguments
    /// * `history` - Observed (date, quantity) pairs, ascending by date
    /// * `horizon` - Number of future days to estimate
    fn forecast(&self, history: &[(NaiveDate, f64)], horizon: usize) -> Result<Vec<f64>>;

    /// Forecaster name for metrics/logging
    fn name(&self) -> &str {
        "custom"
    }
}

/// Same-weekday mean forecaster.
///
/// Each future day is estimated as the mean of the most recent observations
/// falling on the same weekday, looking back a bounded number of weeks. Days
/// with no same-weekday observation fall back to the overall series mean.
#[derive(Debug, Clone)]
pub struct SeasonalNaiveForecaster {
    /// How many trailing same-weekday observations to average
    window_weeks: usize,
}

impl SeasonalNaiveForecaster {
    /// Create a forecaster with the default 4-week window
    pub fn new() -> Self {
        Self { window_weeks: 4 }
    }

    /// Set the trailing window, in weeks
    pub fn with_window_weeks(mut self, weeks: usize) -> Self {
        self.window_weeks = weeks.max(1);
        self
    }
}

impl Default for SeasonalNaiveForecaster {
    fn default() -> Self {
        Self::new()
    }
}

impl Forecaster for SeasonalNaiveForecaster {
    fn forecast(&self, history: &[(NaiveDate, f64)], horizon: usize) -> Result<Vec<f64>> {
        if history.is_empty() {
            return Err(AtlasError::forecast("cannot forecast an empty series"));
        }

        let overall_mean =
            history.iter().map(|(_, q)| q).sum::<f64>() / history.len() as f64;
        let last_date = history[history.len() - 1].0;

        let estimates = (1..=horizon)
            .map(|offset| {
                let target = last_date + Duration::days(offset as i64);
                let weekday = target.weekday();

                let same_weekday: Vec<f64> = history
                    .iter()
                    .rev()
                    .filter(|(date, _)| date.weekday() == weekday)
                    .take(self.window_weeks)
                    .map(|(_, q)| *q)
                    .collect();

                if same_weekday.is_empty() {
                    overall_mean
                } else {
                    same_weekday.iter().sum::<f64>() / same_weekday.len() as f64
                }
            })
            .collect();

        Ok(estimates)
    }

    fn name(&self) -> &str {
        "seasonal-naive"
    }
}

/// Mean-plus-drift forecaster.
///
/// Fits a least-squares line through the series and extends it over the
/// horizon. Flat series degrade to the plain mean.
#[derive(Debug, Clone, Default)]
pub struct DriftForecaster;

impl DriftForecaster {
    /// Create a drift forecaster
    pub fn new() -> Self {
        Self
    }
}

impl Forecaster for DriftForecaster {
    fn forecast(&self, history: &[(NaiveDate, f64)], horizon: usize) -> Result<Vec<f64>> {
        if history.is_empty() {
            return Err(AtlasError::forecast("cannot forecast an empty series"));
        }

        let n = history.len() as f64;
        let mean_x = (n - 1.0) / 2.0;
        let mean_y = history.iter().map(|(_, q)| q).sum::<f64>() / n;

        let mut cov = 0.0;
        let mut var = 0.0;
        for (i, (_, q)) in history.iter().enumerate() {
            let dx = i as f64 - mean_x;
            cov += dx * (q - mean_y);
            var += dx * dx;
        }
        let slope = if var > 0.0 { cov / var } else { 0.0 };
        let intercept = mean_y - slope * mean_x;

        Ok((0..horizon)
            .map(|offset| intercept + slope * (n + offset as f64))
            .collect())
    }

    fn name(&self) -> &str {
        "drift"
    }
}

/// Immutable forecasts for every eligible (store, category) pair.
///
/// Built once per refresh cycle and shared as an `Arc` across all concurrent
/// allocation requests; never mutated in place. Every series in one snapshot
/// starts on the same date by construction.
#[derive(Debug, Clone)]
pub struct ForecastSnapshot {
    id: SnapshotId,
    generated_at: DateTime<Utc>,
    start_date: NaiveDate,
    horizon: usize,
    by_category: BTreeMap<CategoryId, BTreeMap<StoreId, Vec<ForecastPoint>>>,
}

impl ForecastSnapshot {
    /// Build a snapshot by forecasting every pair with enough history.
    ///
    /// Pairs with fewer than `min_history` daily observations are skipped.
    /// Forecaster outputs must be finite; negative estimates are floored at
    /// zero before entering the snapshot. Pairs are forecast in parallel.
    pub fn build(
        history: &DemandHistory,
        forecaster: &dyn Forecaster,
        horizon: usize,
        min_history: usize,
    ) -> Result<Self> {
        let last_date = history
            .last_date()
            .ok_or_else(|| AtlasError::history("cannot snapshot an empty demand history"))?;
        let start_date = last_date + Duration::days(1);

        let mut skipped = 0usize;
        let mut pairs = Vec::new();
        for (category, stores) in history.pair_series() {
            for (store, series) in stores {
                if series.len() < min_history {
                    skipped += 1;
                    debug!(
                        store = %store,
                        category = %category,
                        observations = series.len(),
                        "Skipping pair with insufficient history"
                    );
                    continue;
                }
                pairs.push((category.clone(), store, series));
            }
        }

        let forecast_pairs: Vec<(CategoryId, StoreId, Vec<ForecastPoint>)> = pairs
            .into_par_iter()
            .map(|(category, store, series)| {
                let estimates = forecaster.forecast(&series, horizon)?;
                if estimates.len() != horizon {
                    return Err(AtlasError::forecast(format!(
                        "forecaster returned {} estimates for a {}-day horizon",
                        estimates.len(),
                        horizon
                    )));
                }
                let points = estimates
                    .into_iter()
                    .enumerate()
                    .map(|(offset, yhat)| {
                        if !yhat.is_finite() {
                            return Err(AtlasError::NonFiniteForecast(format!(
                                "{}/{}",
                                store, category
                            )));
                        }
                        Ok(ForecastPoint::new(
                            start_date + Duration::days(offset as i64),
                            yhat.max(0.0),
                        ))
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok((category, store, points))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut by_category: BTreeMap<CategoryId, BTreeMap<StoreId, Vec<ForecastPoint>>> =
            BTreeMap::new();
        for (category, store, points) in forecast_pairs {
            by_category.entry(category).or_default().insert(store, points);
        }

        let snapshot = Self {
            id: SnapshotId::new(),
            generated_at: Utc::now(),
            start_date,
            horizon,
            by_category,
        };

        if snapshot.pair_count() == 0 {
            warn!(skipped = skipped, "Forecast snapshot is empty");
        } else {
            info!(
                snapshot_id = %snapshot.id,
                pairs = snapshot.pair_count(),
                skipped = skipped,
                start_date = %start_date,
                horizon = horizon,
                "Forecast snapshot built"
            );
        }

        Ok(snapshot)
    }

    /// Snapshot identifier
    pub fn id(&self) -> SnapshotId {
        self.id
    }

    /// When the snapshot was generated
    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    /// First forecast date (day 0 of the horizon)
    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    /// Horizon length in days
    pub fn horizon(&self) -> usize {
        self.horizon
    }

    /// Number of (store, category) pairs with forecasts
    pub fn pair_count(&self) -> usize {
        self.by_category.values().map(|stores| stores.len()).sum()
    }

    /// Categories with at least one forecast, in id order
    pub fn categories(&self) -> impl Iterator<Item = &CategoryId> {
        self.by_category.keys()
    }

    /// Per-store forecast series for one category
    pub fn category_view(
        &self,
        category: &CategoryId,
    ) -> Option<&BTreeMap<StoreId, Vec<ForecastPoint>>> {
        self.by_category.get(category)
    }

    /// Per-category forecast series for one store
    pub fn store_view(&self, store: &StoreId) -> BTreeMap<CategoryId, &Vec<ForecastPoint>> {
        self.by_category
            .iter()
            .filter_map(|(category, stores)| {
                stores.get(store).map(|points| (category.clone(), points))
            })
            .collect()
    }

    /// Forecast series for one (store, category) pair
    pub fn series(&self, store: &StoreId, category: &CategoryId) -> Option<&[ForecastPoint]> {
        self.by_category
            .get(category)
            .and_then(|stores| stores.get(store))
            .map(|points| points.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::DemandRecord;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn series(start: &str, values: &[f64]) -> Vec<(NaiveDate, f64)> {
        let start = date(start);
        values
            .iter()
            .enumerate()
            .map(|(i, v)| (start + Duration::days(i as i64), *v))
            .collect()
    }

    fn history_for(store: &str, category: &str, start: &str, values: &[f64]) -> DemandHistory {
        let start = date(start);
        DemandHistory::new(
            values
                .iter()
                .enumerate()
                .map(|(i, v)| DemandRecord {
                    date: start + Duration::days(i as i64),
                    store_id: StoreId::new(store),
                    category: CategoryId::new(category),
                    quantity: *v,
                })
                .collect(),
        )
    }

    #[test]
    fn test_seasonal_naive_uses_weekday_means() {
        // 2024-01-01 is a Monday. Two full weeks: Mondays are 10, all other
        // days are 1.
        let values: Vec<f64> = (0..14).map(|i| if i % 7 == 0 { 10.0 } else { 1.0 }).collect();
        let history = series("2024-01-01", &values);

        let forecaster = SeasonalNaiveForecaster::new();
        let estimates = forecaster.forecast(&history, 7).unwrap();

        // Day 1 of the horizon is 2024-01-15, a Monday.
        assert_eq!(estimates[0], 10.0);
        for est in &estimates[1..] {
            assert_eq!(*est, 1.0);
        }
    }

    #[test]
    fn test_seasonal_naive_falls_back_to_mean() {
        // Three observations never cover all weekdays.
        let history = series("2024-01-01", &[3.0, 6.0, 9.0]);
        let forecaster = SeasonalNaiveForecaster::new();
        let estimates = forecaster.forecast(&history, 7).unwrap();
        assert!(estimates.iter().any(|e| (*e - 6.0).abs() < 1e-9));
    }

    #[test]
    fn test_drift_extends_linear_series() {
        let history = series("2024-01-01", &[1.0, 2.0, 3.0, 4.0, 5.0]);
        let forecaster = DriftForecaster::new();
        let estimates = forecaster.forecast(&history, 3).unwrap();
        assert!((estimates[0] - 6.0).abs() < 1e-9);
        assert!((estimates[2] - 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_series_is_an_error() {
        assert!(SeasonalNaiveForecaster::new().forecast(&[], 7).is_err());
        assert!(DriftForecaster::new().forecast(&[], 7).is_err());
    }

    #[test]
    fn test_build_skips_short_pairs() {
        let mut records = Vec::new();
        records.extend(
            history_for("S1", "TECH", "2024-01-01", &[5.0; 14]).records().to_vec(),
        );
        records.extend(
            history_for("S2", "TECH", "2024-01-10", &[5.0; 3]).records().to_vec(),
        );
        let history = DemandHistory::new(records);

        let snapshot =
            ForecastSnapshot::build(&history, &SeasonalNaiveForecaster::new(), 7, 10).unwrap();

        assert_eq!(snapshot.pair_count(), 1);
        assert!(snapshot
            .series(&StoreId::new("S1"), &CategoryId::new("TECH"))
            .is_some());
        assert!(snapshot
            .series(&StoreId::new("S2"), &CategoryId::new("TECH"))
            .is_none());
    }

    #[test]
    fn test_build_dates_follow_history() {
        let history = history_for("S1", "TECH", "2024-01-01", &[5.0; 14]);
        let snapshot =
            ForecastSnapshot::build(&history, &SeasonalNaiveForecaster::new(), 7, 10).unwrap();

        assert_eq!(snapshot.start_date(), date("2024-01-15"));
        let points = snapshot
            .series(&StoreId::new("S1"), &CategoryId::new("TECH"))
            .unwrap();
        assert_eq!(points.len(), 7);
        assert_eq!(points[0].date, date("2024-01-15"));
        assert_eq!(points[6].date, date("2024-01-21"));
    }

    #[test]
    fn test_build_rejects_non_finite_estimates() {
        let history = history_for("S1", "TECH", "2024-01-01", &[5.0; 14]);

        let mut mock = MockForecaster::new();
        mock.expect_forecast()
            .returning(|_, horizon| Ok(vec![f64::NAN; horizon]));

        let err = ForecastSnapshot::build(&history, &mock, 7, 10).unwrap_err();
        assert!(matches!(err, AtlasError::NonFiniteForecast(_)));
    }

    #[test]
    fn test_build_floors_negative_estimates() {
        let history = history_for("S1", "TECH", "2024-01-01", &[5.0; 14]);

        let mut mock = MockForecaster::new();
        mock.expect_forecast()
            .returning(|_, horizon| Ok(vec![-2.0; horizon]));

        let snapshot = ForecastSnapshot::build(&history, &mock, 7, 10).unwrap();
        let points = snapshot
            .series(&StoreId::new("S1"), &CategoryId::new("TECH"))
            .unwrap();
        assert!(points.iter().all(|p| p.yhat == 0.0));
    }

    #[test]
    fn test_build_rejects_wrong_horizon_length() {
        let history = history_for("S1", "TECH", "2024-01-01", &[5.0; 14]);

        let mut mock = MockForecaster::new();
        mock.expect_forecast().returning(|_, _| Ok(vec![1.0; 3]));

        let err = ForecastSnapshot::build(&history, &mock, 7, 10).unwrap_err();
        assert!(matches!(err, AtlasError::Forecast(_)));
    }

    #[test]
    fn test_store_view_collects_across_categories() {
        let mut records = Vec::new();
        records.extend(history_for("S1", "TECH", "2024-01-01", &[5.0; 14]).records().to_vec());
        records.extend(history_for("S1", "BOOK", "2024-01-01", &[2.0; 14]).records().to_vec());
        records.extend(history_for("S2", "TECH", "2024-01-01", &[9.0; 14]).records().to_vec());
        let history = DemandHistory::new(records);

        let snapshot =
            ForecastSnapshot::build(&history, &SeasonalNaiveForecaster::new(), 7, 10).unwrap();

        let view = snapshot.store_view(&StoreId::new("S1"));
        assert_eq!(view.len(), 2);
        assert!(view.contains_key(&CategoryId::new("TECH")));
        assert!(view.contains_key(&CategoryId::new("BOOK")));
    }
}
