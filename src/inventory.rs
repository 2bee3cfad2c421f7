//! Static per-category inventory configuration
//!
//! The table supplies the default total when an allocation request does not
//! carry an explicit quantity. It is read-only after initialization and
//! shared freely across concurrent requests.

use crate::types::CategoryId;
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

lazy_static! {
    /// Built-in default inventory table
    static ref BUILTIN: InventoryTable = InventoryTable::new()
        .with_quantity("TECH", 500)
        .with_quantity("BOOK", 600)
        .with_quantity("HOME", 400)
        .with_quantity("KIDS", 300);
}

/// Available inventory per product category
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InventoryTable {
    quantities: BTreeMap<CategoryId, u64>,
}

impl InventoryTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in table shipped with the crate
    pub fn builtin() -> Self {
        BUILTIN.clone()
    }

    /// Set the quantity for a category
    pub fn with_quantity(mut self, category: impl Into<CategoryId>, quantity: u64) -> Self {
        self.quantities.insert(category.into(), quantity);
        self
    }

    /// Look up the configured quantity for a category
    pub fn get(&self, category: &CategoryId) -> Option<u64> {
        self.quantities.get(category).copied()
    }

    /// Whether a category has a configured quantity
    pub fn contains(&self, category: &CategoryId) -> bool {
        self.quantities.contains_key(category)
    }

    /// Sum of configured quantities over the given categories.
    ///
    /// Categories without a configured quantity contribute zero.
    pub fn total_for<'a>(&self, categories: impl IntoIterator<Item = &'a CategoryId>) -> u64 {
        categories
            .into_iter()
            .filter_map(|c| self.get(c))
            .sum()
    }

    /// Number of configured categories
    pub fn len(&self) -> usize {
        self.quantities.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.quantities.is_empty()
    }

    /// Iterate over (category, quantity) pairs in category order
    pub fn iter(&self) -> impl Iterator<Item = (&CategoryId, u64)> {
        self.quantities.iter().map(|(c, q)| (c, *q))
    }
}
