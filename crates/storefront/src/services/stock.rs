//! Stock ledger.
//!
//! Every change to a stock level happens on a row locked in the caller's unit
//! of work. Rows are always locked in ascending `(product, size)` order.

use tracing::instrument;

use pazar_core::stock::{self as rules, StockDemand, StockKey};
use pazar_core::{Actor, Entity, MarketError};

use super::ServiceError;
use crate::db::{MarketStore, MarketTx};

/// Validate a stored level, reporting corruption loudly.
fn level(key: StockKey, stored: i64) -> Result<u32, MarketError> {
    rules::checked_level(key, stored).inspect_err(|_| {
        tracing::error!(
            product_id = %key.product_id,
            size_id = %key.size_id,
            stored,
            "Stock level is negative"
        );
    })
}

/// Lock every row of `demand` and check that each can cover its quantity.
///
/// Returns the level each row will have once the reservation is written.
/// Nothing is written, so callers can finish their own validation first.
///
/// # Errors
///
/// Returns `InsufficientStock` for the first row, in lock order, that cannot
/// cover its quantity.
pub(crate) async fn lock_and_check<T: MarketTx>(
    tx: &mut T,
    demand: &StockDemand,
) -> Result<Vec<(StockKey, u32)>, ServiceError> {
    let mut levels = Vec::with_capacity(demand.len());
    for (key, quantity) in demand.iter() {
        let available = level(key, tx.lock_stock(key).await?)?;
        levels.push((key, rules::reserve(key, available, quantity)?));
    }
    Ok(levels)
}

/// Take `quantity` units from a locked row.
///
/// # Errors
///
/// Returns `InsufficientStock` if the row holds fewer units.
pub(crate) async fn reserve<T: MarketTx>(
    tx: &mut T,
    key: StockKey,
    quantity: u32,
) -> Result<u32, ServiceError> {
    let available = level(key, tx.lock_stock(key).await?)?;
    let remaining = rules::reserve(key, available, quantity)?;
    tx.write_stock(key, remaining).await?;
    Ok(remaining)
}

/// Return `quantity` units to a locked row, creating it if absent.
pub(crate) async fn restore<T: MarketTx>(
    tx: &mut T,
    key: StockKey,
    quantity: u32,
) -> Result<u32, ServiceError> {
    let available = level(key, tx.lock_stock(key).await?)?;
    let restored = rules::restore(key, available, quantity)?;
    tx.write_stock(key, restored).await?;
    Ok(restored)
}

/// Return every quantity in `demand`, locking rows in order.
pub(crate) async fn restore_all<T: MarketTx>(
    tx: &mut T,
    demand: &StockDemand,
) -> Result<(), ServiceError> {
    for (key, quantity) in demand.iter() {
        restore(tx, key, quantity).await?;
    }
    Ok(())
}

/// Stock ledger operations that stand on their own.
pub struct StockService<'a, S> {
    store: &'a S,
}

impl<'a, S: MarketStore> StockService<'a, S> {
    /// Create a new stock service.
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Current level of one row, without locking it.
    ///
    /// # Errors
    ///
    /// Returns `StockConsistencyViolation` if the stored level is negative.
    pub async fn available(&self, key: StockKey) -> Result<u32, ServiceError> {
        let mut tx = self.store.begin().await?;
        let stored = tx.peek_stock(key).await?;
        Ok(level(key, stored)?)
    }

    /// Set a level outright. Used for restocking and inventory counts.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the product does not exist.
    #[instrument(skip(self), fields(product_id = %key.product_id, size_id = %key.size_id))]
    pub async fn set_quantity(&self, key: StockKey, quantity: u32) -> Result<(), ServiceError> {
        let mut tx = self.store.begin().await?;
        if tx.catalog_entry(key.product_id).await?.is_none() {
            return Err(MarketError::NotFound(Entity::Product).into());
        }
        let previous = tx.lock_stock(key).await?;
        tx.write_stock(key, quantity).await?;
        tx.commit().await?;

        tracing::info!(previous, quantity, "Stock level set");
        Ok(())
    }

    /// [`Self::set_quantity`] on behalf of an actor.
    ///
    /// Admins may restock anything; a store operator only their own products.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` if the actor does not manage the product's
    /// store and `NotFound` if the product does not exist.
    pub async fn restock(
        &self,
        actor: &Actor,
        key: StockKey,
        quantity: u32,
    ) -> Result<(), ServiceError> {
        let store_id = {
            let mut tx = self.store.begin().await?;
            tx.catalog_entry(key.product_id)
                .await?
                .ok_or(MarketError::NotFound(Entity::Product))?
                .store_id
        };
        if !actor.can_manage_store(store_id) {
            return Err(MarketError::unauthorized("cannot restock another store's products").into());
        }
        self.set_quantity(key, quantity).await
    }
}
