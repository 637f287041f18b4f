//! Order engine: cart-to-order conversion and order reads.

use tracing::instrument;

use pazar_core::stock::StockDemand;
use pazar_core::{Actor, Entity, MarketError, OrderId, Price, StoreId, UserId};

use super::{ServiceError, stock};
use crate::db::{MarketStore, MarketTx};
use crate::models::{NewOrder, NewOrderLine, Order, OrderDetail};

/// Pick the delivery address: the requested one, else the profile default.
///
/// # Errors
///
/// Returns `Validation` if neither is present.
pub(crate) async fn resolve_address<T: MarketTx>(
    tx: &mut T,
    user_id: UserId,
    requested: Option<&str>,
) -> Result<String, ServiceError> {
    if let Some(address) = requested.map(str::trim).filter(|a| !a.is_empty()) {
        return Ok(address.to_owned());
    }
    tx.default_address(user_id)
        .await?
        .ok_or_else(|| MarketError::validation("a delivery address is required").into())
}

/// Convert the user's cart into an order inside `tx`.
///
/// The cart is locked before it is read, so a second conversion of the same
/// cart waits and then finds it empty. Every stock row is locked and checked
/// before anything is written. When `expected_total` is given the cart must
/// still cost exactly that much.
///
/// # Errors
///
/// Returns `EmptyCart`, `CrossStoreCart`, `Validation` (deactivated product
/// or changed total), `NotFound` (unknown product) or `InsufficientStock`.
pub(crate) async fn create_from_cart<T: MarketTx>(
    tx: &mut T,
    user_id: UserId,
    delivery_address: String,
    expected_total: Option<Price>,
) -> Result<OrderDetail, ServiceError> {
    tx.lock_cart(user_id).await?;
    let cart = tx.cart_lines(user_id).await?;
    if cart.is_empty() {
        return Err(MarketError::EmptyCart.into());
    }

    let mut store_id: Option<StoreId> = None;
    let mut new_lines = Vec::with_capacity(cart.len());
    for line in &cart {
        let entry = tx
            .catalog_entry(line.product_id)
            .await?
            .ok_or(MarketError::NotFound(Entity::Product))?;
        if !entry.active {
            return Err(MarketError::validation(format!(
                "product {} is no longer available",
                entry.product_id
            ))
            .into());
        }
        if *store_id.get_or_insert(entry.store_id) != entry.store_id {
            return Err(MarketError::CrossStoreCart.into());
        }
        new_lines.push(NewOrderLine {
            product_id: line.product_id,
            size_id: line.size_id,
            quantity: line.quantity,
            unit_price: entry.price,
        });
    }
    let Some(store_id) = store_id else {
        return Err(MarketError::EmptyCart.into());
    };

    let total_amount: Price = new_lines
        .iter()
        .map(|line| line.unit_price.times(line.quantity))
        .sum();
    if let Some(expected) = expected_total
        && expected != total_amount
    {
        return Err(MarketError::validation(format!(
            "cart total changed from {expected} to {total_amount}"
        ))
        .into());
    }

    let demand: StockDemand = cart
        .iter()
        .map(|line| (line.stock_key(), line.quantity))
        .collect();
    let levels = stock::lock_and_check(tx, &demand).await?;

    let order = tx
        .insert_order(&NewOrder {
            user_id,
            store_id,
            delivery_address,
            total_amount,
        })
        .await?;
    let mut lines = Vec::with_capacity(new_lines.len());
    for line in &new_lines {
        lines.push(tx.insert_order_line(order.id, line).await?);
    }
    for (key, remaining) in levels {
        tx.write_stock(key, remaining).await?;
    }
    tx.clear_cart(user_id).await?;

    Ok(OrderDetail { order, lines })
}

/// Order service.
pub struct OrderService<'a, S> {
    store: &'a S,
}

impl<'a, S: MarketStore> OrderService<'a, S> {
    /// Create a new order service.
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Turn the user's cart into an order without going through payment.
    ///
    /// # Errors
    ///
    /// See [`create_from_cart`]; also `Validation` if no delivery address is
    /// known. Nothing changes when an error is returned.
    #[instrument(skip_all, fields(user_id = %user_id))]
    pub async fn checkout(
        &self,
        user_id: UserId,
        delivery_address: Option<&str>,
    ) -> Result<OrderDetail, ServiceError> {
        let mut tx = self.store.begin().await?;
        let address = resolve_address(&mut tx, user_id, delivery_address).await?;
        let detail = match create_from_cart(&mut tx, user_id, address, None).await {
            Ok(detail) => detail,
            Err(ServiceError::Market(err)) => {
                tracing::warn!(error = %err, "Checkout rejected");
                return Err(err.into());
            }
            Err(err) => return Err(err),
        };
        tx.commit().await?;

        tracing::info!(
            order_id = %detail.order.id,
            store_id = %detail.order.store_id,
            total = %detail.order.total_amount,
            lines = detail.lines.len(),
            "Order created"
        );
        Ok(detail)
    }

    /// One order with its lines, if the actor may see it.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown orders and `Unauthorized` if the actor
    /// is neither the customer who placed it nor allowed to manage its store.
    pub async fn get(&self, actor: &Actor, order_id: OrderId) -> Result<OrderDetail, ServiceError> {
        let mut tx = self.store.begin().await?;
        let order = tx
            .find_order(order_id)
            .await?
            .ok_or(MarketError::NotFound(Entity::Order))?;
        if !actor.can_view_order(order.user_id, order.store_id) {
            return Err(MarketError::unauthorized("order belongs to someone else").into());
        }
        let lines = tx.order_lines(order_id).await?;
        Ok(OrderDetail { order, lines })
    }

    /// Orders placed by a customer, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn list_for_customer(&self, user_id: UserId) -> Result<Vec<Order>, ServiceError> {
        let mut tx = self.store.begin().await?;
        Ok(tx.orders_for_user(user_id).await?)
    }

    /// Orders received by a store, newest first.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` unless the actor manages the store.
    pub async fn list_for_store(
        &self,
        actor: &Actor,
        store_id: StoreId,
    ) -> Result<Vec<Order>, ServiceError> {
        if !actor.can_manage_store(store_id) {
            return Err(MarketError::unauthorized("cannot view another store's orders").into());
        }
        let mut tx = self.store.begin().await?;
        Ok(tx.orders_for_store(store_id).await?)
    }
}
