//! Demand history ingestion and aggregation
//!
//! ## Table of Contents
//! - **DemandRecord**: One sales record (CSV row)
//! - **DemandHistory**: Sorted record set with aggregation views
//! - **BreakdownAxis / BreakdownRow**: Last-N-days daily grouping

use crate::error::Result;
use crate::types::{CategoryId, StoreId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use tracing::info;

/// One sales record.
///
/// CSV rows carry a `sku` column as well; records are aggregated at the
/// (date, store, category) grain so the sku is dropped on ingest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandRecord {
    /// Calendar date of the sale
    pub date: NaiveDate,
    /// Store where the sale happened
    pub store_id: StoreId,
    /// Product category sold
    pub category: CategoryId,
    /// Quantity sold
    pub quantity: f64,
}

/// Axis to group a daily breakdown by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakdownAxis {
    /// One row per (date, store)
    Store,
    /// One row per (date, category)
    Category,
}

/// One row of a daily breakdown
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakdownRow {
    /// Calendar date
    pub date: NaiveDate,
    /// Store or category key, depending on the axis
    pub key: String,
    /// Summed quantity
    pub quantity: f64,
}

/// Historical demand records, sorted by date.
///
/// Read-only once constructed; the runtime rebuilds the whole value when new
/// data is loaded.
#[derive(Debug, Clone, Default)]
pub struct DemandHistory {
    records: Vec<DemandRecord>,
}

impl DemandHistory {
    /// Create a history from records (sorted on construction)
    pub fn new(mut records: Vec<DemandRecord>) -> Self {
        records.sort_by(|a, b| {
            a.date
                .cmp(&b.date)
                .then_with(|| a.store_id.cmp(&b.store_id))
                .then_with(|| a.category.cmp(&b.category))
        });
        Self { records }
    }

    /// Load records from a CSV file
    pub fn from_csv_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let history = Self::from_reader(file)?;
        info!(
            path = %path.display(),
            records = history.len(),
            "Demand history loaded"
        );
        Ok(history)
    }

    /// Load records from any CSV reader
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let mut records = Vec::new();
        for row in csv_reader.deserialize::<DemandRecord>() {
            records.push(row?);
        }
        Ok(Self::new(records))
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the history holds no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records in date order
    pub fn records(&self) -> &[DemandRecord] {
        &self.records
    }

    /// Most recent date in the history
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.records.last().map(|r| r.date)
    }

    /// Distinct stores, in id order
    pub fn stores(&self) -> Vec<StoreId> {
        let mut set: Vec<_> = self.records.iter().map(|r| r.store_id.clone()).collect();
        set.sort();
        set.dedup();
        set
    }

    /// Distinct categories, in id order
    pub fn categories(&self) -> Vec<CategoryId> {
        let mut set: Vec<_> = self.records.iter().map(|r| r.category.clone()).collect();
        set.sort();
        set.dedup();
        set
    }

    /// Daily demand series per (category, store) pair.
    ///
    /// Quantities are summed per date; dates come out ascending. This is the
    /// shape the forecast snapshot builder consumes.
    pub fn pair_series(&self) -> BTreeMap<CategoryId, BTreeMap<StoreId, Vec<(NaiveDate, f64)>>> {
        let mut daily: BTreeMap<(CategoryId, StoreId), BTreeMap<NaiveDate, f64>> = BTreeMap::new();
        for record in &self.records {
            *daily
                .entry((record.category.clone(), record.store_id.clone()))
                .or_default()
                .entry(record.date)
                .or_default() += record.quantity;
        }

        let mut series: BTreeMap<CategoryId, BTreeMap<StoreId, Vec<(NaiveDate, f64)>>> =
            BTreeMap::new();
        for ((category, store), days) in daily {
            series
                .entry(category)
                .or_default()
                .insert(store, days.into_iter().collect());
        }
        series
    }

    /// Daily demand series for one (store, category) pair
    pub fn series_for(&self, store: &StoreId, category: &CategoryId) -> Vec<(NaiveDate, f64)> {
        let mut daily: BTreeMap<NaiveDate, f64> = BTreeMap::new();
        for record in self
            .records
            .iter()
            .filter(|r| &r.store_id == store && &r.category == category)
        {
            *daily.entry(record.date).or_default() += record.quantity;
        }
        daily.into_iter().collect()
    }

    /// Daily totals over the last `days` days, grouped by the given axis.
    ///
    /// Optional store/category filters narrow the records first; the window
    /// is anchored at the most recent date in the history.
    pub fn daily_breakdown(
        &self,
        days: u32,
        axis: BreakdownAxis,
        store: Option<&StoreId>,
        category: Option<&CategoryId>,
    ) -> Vec<BreakdownRow> {
        let Some(last) = self.last_date() else {
            return Vec::new();
        };
        let start = last - chrono::Duration::days(days.saturating_sub(1) as i64);

        let mut grouped: BTreeMap<(NaiveDate, String), f64> = BTreeMap::new();
        for record in &self.records {
            if record.date < start {
                continue;
            }
            if let Some(s) = store {
                if &record.store_id != s {
                    continue;
                }
            }
            if let Some(c) = category {
                if &record.category != c {
                    continue;
                }
            }
            let key = match axis {
                BreakdownAxis::Store => record.store_id.to_string(),
                BreakdownAxis::Category => record.category.to_string(),
            };
            *grouped.entry((record.date, key)).or_default() += record.quantity;
        }

        grouped
            .into_iter()
            .map(|((date, key), quantity)| BreakdownRow { date, key, quantity })
            .collect()
    }

    /// Summed daily quantity for one (store, category) pair over the trailing
    /// `days` days, as (date, quantity) pairs
    pub fn tail_series(
        &self,
        store: &StoreId,
        category: &CategoryId,
        days: u32,
    ) -> Vec<(NaiveDate, f64)> {
        let series = self.series_for(store, category);
        let skip = series.len().saturating_sub(days as usize);
        series.into_iter().skip(skip).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn record(d: &str, store: &str, cat: &str, qty: f64) -> DemandRecord {
        DemandRecord {
            date: date(d),
            store_id: StoreId::new(store),
            category: CategoryId::new(cat),
            quantity: qty,
        }
    }

    #[test]
    fn test_from_reader_ignores_sku_column() {
        let csv = "date,store_id,sku,category,quantity\n\
                   2024-01-01,S1,SKU-9,TECH,3\n\
                   2024-01-01,S1,SKU-4,TECH,2\n\
                   2024-01-02,S2,SKU-1,BOOK,5\n";
        let history = DemandHistory::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history.last_date(), Some(date("2024-01-02")));
    }

    #[test]
    fn test_from_csv_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "date,store_id,sku,category,quantity").unwrap();
        writeln!(file, "2024-03-01,S1,SKU-1,TECH,4").unwrap();
        writeln!(file, "2024-03-02,S1,SKU-1,TECH,6").unwrap();
        file.flush().unwrap();

        let history = DemandHistory::from_csv_path(file.path()).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history.stores(), vec![StoreId::new("S1")]);
    }

    #[test]
    fn test_pair_series_sums_per_date() {
        let history = DemandHistory::new(vec![
            record("2024-01-01", "S1", "TECH", 3.0),
            record("2024-01-01", "S1", "TECH", 2.0),
            record("2024-01-02", "S1", "TECH", 4.0),
            record("2024-01-01", "S2", "BOOK", 1.0),
        ]);

        let series = history.pair_series();
        let tech = &series[&CategoryId::new("TECH")][&StoreId::new("S1")];
        assert_eq!(tech, &vec![(date("2024-01-01"), 5.0), (date("2024-01-02"), 4.0)]);
        assert_eq!(series[&CategoryId::new("BOOK")].len(), 1);
    }

    #[test]
    fn test_daily_breakdown_window_and_filter() {
        let history = DemandHistory::new(vec![
            record("2024-01-01", "S1", "TECH", 1.0),
            record("2024-01-09", "S1", "TECH", 2.0),
            record("2024-01-10", "S1", "TECH", 3.0),
            record("2024-01-10", "S1", "BOOK", 7.0),
            record("2024-01-10", "S2", "TECH", 9.0),
        ]);

        // Last 2 days for store S1, grouped by category.
        let rows = history.daily_breakdown(
            2,
            BreakdownAxis::Category,
            Some(&StoreId::new("S1")),
            None,
        );
        assert_eq!(
            rows,
            vec![
                BreakdownRow { date: date("2024-01-09"), key: "TECH".into(), quantity: 2.0 },
                BreakdownRow { date: date("2024-01-10"), key: "BOOK".into(), quantity: 7.0 },
                BreakdownRow { date: date("2024-01-10"), key: "TECH".into(), quantity: 3.0 },
            ]
        );

        // Same window for category TECH, grouped by store.
        let rows = history.daily_breakdown(
            2,
            BreakdownAxis::Store,
            None,
            Some(&CategoryId::new("TECH")),
        );
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().any(|r| r.key == "S2" && r.quantity == 9.0));
    }

    #[test]
    fn test_tail_series() {
        let history = DemandHistory::new(vec![
            record("2024-01-01", "S1", "TECH", 1.0),
            record("2024-01-02", "S1", "TECH", 2.0),
            record("2024-01-03", "S1", "TECH", 3.0),
        ]);
        let tail = history.tail_series(&StoreId::new("S1"), &CategoryId::new("TECH"), 2);
        assert_eq!(tail, vec![(date("2024-01-02"), 2.0), (date("2024-01-03"), 3.0)]);
    }

    #[test]
    fn test_empty_history() {
        let history = DemandHistory::default();
        assert!(history.is_empty());
        assert!(history.last_date().is_none());
        assert!(history
            .daily_breakdown(7, BreakdownAxis::Store, None, None)
            .is_empty());
    }
}
