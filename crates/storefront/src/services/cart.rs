//! Cart staging.
//!
//! A cart only ever holds products of one store. Adding a product from
//! another store is refused unless the caller confirms replacing the cart.
//! Cart operations check stock without reserving it; the authoritative check
//! happens under lock at checkout. Every mutation holds the cart lock, so
//! concurrent adds to one cart cannot mix stores or race on the same line.

use tracing::instrument;

use pazar_core::stock::{StockKey, checked_level};
use pazar_core::{CartLineId, Entity, MarketError, Price, StoreId, UserId};

use super::ServiceError;
use crate::db::{MarketStore, MarketTx};
use crate::models::{CartItem, CartLine, CartView, CatalogEntry};

/// Request to add a product to a cart.
#[derive(Debug, Clone, Copy)]
pub struct AddToCart {
    pub key: StockKey,
    pub quantity: u32,
    /// Clear a cart holding another store's products instead of refusing.
    pub confirm_replace: bool,
}

/// Cart service.
pub struct CartService<'a, S> {
    store: &'a S,
}

impl<'a, S: MarketStore> CartService<'a, S> {
    /// Create a new cart service.
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Add a product and size to the user's cart.
    ///
    /// Adding a product and size already in the cart increases that line.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a zero quantity or a deactivated product,
    /// `NotFound` for an unknown product, `CrossStoreConflict` if the cart
    /// holds another store's products and replacement was not confirmed, and
    /// `InsufficientStock` if the resulting line exceeds available stock.
    #[instrument(skip_all, fields(user_id = %user_id, product_id = %request.key.product_id))]
    pub async fn add_line(
        &self,
        user_id: UserId,
        request: AddToCart,
    ) -> Result<CartLine, ServiceError> {
        if request.quantity == 0 {
            return Err(MarketError::validation("quantity must be at least 1").into());
        }

        let mut tx = self.store.begin().await?;
        tx.lock_cart(user_id).await?;
        let entry = purchasable(&mut tx, request.key).await?;

        let mut lines = tx.cart_lines(user_id).await?;
        if let Some(existing_store) = cart_store(&mut tx, &lines).await?
            && existing_store != entry.store_id
        {
            if !request.confirm_replace {
                return Err(MarketError::CrossStoreConflict {
                    existing_store,
                    new_store: entry.store_id,
                }
                .into());
            }
            let removed = tx.clear_cart(user_id).await?;
            tracing::info!(removed, %existing_store, "Cart replaced with another store");
            lines.clear();
        }

        let existing = lines.iter().find(|line| line.stock_key() == request.key);
        let quantity = existing
            .map_or(0, |line| line.quantity)
            .checked_add(request.quantity)
            .ok_or_else(|| MarketError::validation("quantity is too large"))?;

        let available = checked_level(request.key, tx.peek_stock(request.key).await?)?;
        if quantity > available {
            return Err(request.key.insufficient(quantity, available).into());
        }

        let line = match existing {
            Some(line) => tx
                .set_cart_line_quantity(user_id, line.id, quantity)
                .await?
                .ok_or(MarketError::NotFound(Entity::CartLine))?,
            None => tx.insert_cart_line(user_id, request.key, quantity).await?,
        };
        tx.commit().await?;
        Ok(line)
    }

    /// Change the quantity of one of the user's lines.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a zero quantity and `NotFound` if the user has
    /// no such line.
    pub async fn update_line(
        &self,
        user_id: UserId,
        line_id: CartLineId,
        quantity: u32,
    ) -> Result<CartLine, ServiceError> {
        if quantity == 0 {
            return Err(MarketError::validation(
                "quantity must be at least 1; remove the line instead",
            )
            .into());
        }

        let mut tx = self.store.begin().await?;
        tx.lock_cart(user_id).await?;
        let line = tx
            .set_cart_line_quantity(user_id, line_id, quantity)
            .await?
            .ok_or(MarketError::NotFound(Entity::CartLine))?;
        tx.commit().await?;
        Ok(line)
    }

    /// Remove one of the user's lines.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the user has no such line.
    pub async fn remove_line(&self, user_id: UserId, line_id: CartLineId) -> Result<(), ServiceError> {
        let mut tx = self.store.begin().await?;
        tx.lock_cart(user_id).await?;
        if !tx.delete_cart_line(user_id, line_id).await? {
            return Err(MarketError::NotFound(Entity::CartLine).into());
        }
        tx.commit().await?;
        Ok(())
    }

    /// Empty the user's cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn clear(&self, user_id: UserId) -> Result<(), ServiceError> {
        let mut tx = self.store.begin().await?;
        tx.lock_cart(user_id).await?;
        tx.clear_cart(user_id).await?;
        tx.commit().await?;
        Ok(())
    }

    /// The user's cart priced at current catalog prices.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if a line references a product the catalog no
    /// longer knows.
    pub async fn view(&self, user_id: UserId) -> Result<CartView, ServiceError> {
        let mut tx = self.store.begin().await?;
        let lines = tx.cart_lines(user_id).await?;
        if lines.is_empty() {
            return Ok(CartView::empty());
        }

        let mut items = Vec::with_capacity(lines.len());
        let mut store_id = None;
        for line in lines {
            let entry = tx
                .catalog_entry(line.product_id)
                .await?
                .ok_or(MarketError::NotFound(Entity::Product))?;
            store_id.get_or_insert(entry.store_id);
            items.push(CartItem {
                line_id: line.id,
                product_id: line.product_id,
                product_name: entry.name,
                size_id: line.size_id,
                quantity: line.quantity,
                unit_price: entry.price,
                line_total: entry.price.times(line.quantity),
                active: entry.active,
            });
        }

        let subtotal: Price = items.iter().map(|item| item.line_total).sum();
        Ok(CartView {
            store_id,
            items,
            subtotal,
        })
    }
}

/// Catalog entry for a product that may be bought.
async fn purchasable<T: MarketTx>(tx: &mut T, key: StockKey) -> Result<CatalogEntry, ServiceError> {
    let entry = tx
        .catalog_entry(key.product_id)
        .await?
        .ok_or(MarketError::NotFound(Entity::Product))?;
    if !entry.active {
        return Err(MarketError::validation(format!(
            "product {} is no longer available",
            key.product_id
        ))
        .into());
    }
    Ok(entry)
}

/// Store the cart's lines belong to, judged by its first line.
async fn cart_store<T: MarketTx>(
    tx: &mut T,
    lines: &[CartLine],
) -> Result<Option<StoreId>, ServiceError> {
    let Some(first) = lines.first() else {
        return Ok(None);
    };
    let entry = tx
        .catalog_entry(first.product_id)
        .await?
        .ok_or(MarketError::NotFound(Entity::Product))?;
    Ok(Some(entry.store_id))
}
