//! Stock reservation arithmetic.
//!
//! Storage backends lock stock rows and persist levels; the decisions about
//! whether a reservation fits and what the new level is are made here.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::MarketError;
use crate::types::{ProductId, SizeId};

/// Identifies one stock row.
///
/// Ordering is `(product_id, size_id)`, which is also the order rows are
/// locked in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StockKey {
    pub product_id: ProductId,
    pub size_id: SizeId,
}

impl StockKey {
    #[must_use]
    pub const fn new(product_id: ProductId, size_id: SizeId) -> Self {
        Self {
            product_id,
            size_id,
        }
    }

    /// Error for a request of `requested` units when only `available` exist.
    #[must_use]
    pub const fn insufficient(self, requested: u32, available: u32) -> MarketError {
        MarketError::InsufficientStock {
            product_id: self.product_id,
            size_id: self.size_id,
            requested,
            available,
        }
    }
}

impl std::fmt::Display for StockKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.product_id, self.size_id)
    }
}

/// Validate a level read from storage.
///
/// # Errors
///
/// Returns `StockConsistencyViolation` if the stored level is negative or too
/// large to be a quantity.
pub fn checked_level(key: StockKey, stored: i64) -> Result<u32, MarketError> {
    u32::try_from(stored).map_err(|_| MarketError::StockConsistencyViolation {
        product_id: key.product_id,
        size_id: key.size_id,
        attempted: stored,
    })
}

/// Level after taking `quantity` units from `available`.
///
/// # Errors
///
/// Returns `InsufficientStock` if fewer than `quantity` units are available.
pub fn reserve(key: StockKey, available: u32, quantity: u32) -> Result<u32, MarketError> {
    available
        .checked_sub(quantity)
        .ok_or_else(|| key.insufficient(quantity, available))
}

/// Level after returning `quantity` units to `available`.
///
/// # Errors
///
/// Returns `StockConsistencyViolation` if the level would overflow.
pub fn restore(key: StockKey, available: u32, quantity: u32) -> Result<u32, MarketError> {
    available
        .checked_add(quantity)
        .ok_or(MarketError::StockConsistencyViolation {
            product_id: key.product_id,
            size_id: key.size_id,
            attempted: i64::from(available) + i64::from(quantity),
        })
}

/// Total quantity needed per stock row, iterated in lock order.
///
/// Two cart lines never share a key, but order edits and tests may combine
/// demands, so quantities for the same key are summed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StockDemand(BTreeMap<StockKey, u32>);

impl StockDemand {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `quantity` units for `key`, saturating at `u32::MAX`.
    pub fn add(&mut self, key: StockKey, quantity: u32) {
        let entry = self.0.entry(key).or_insert(0);
        *entry = entry.saturating_add(quantity);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Keys and quantities in ascending key order.
    pub fn iter(&self) -> impl Iterator<Item = (StockKey, u32)> + '_ {
        self.0.iter().map(|(key, qty)| (*key, *qty))
    }
}

impl FromIterator<(StockKey, u32)> for StockDemand {
    fn from_iter<I: IntoIterator<Item = (StockKey, u32)>>(iter: I) -> Self {
        let mut demand = Self::new();
        for (key, quantity) in iter {
            demand.add(key, quantity);
        }
        demand
    }
}
