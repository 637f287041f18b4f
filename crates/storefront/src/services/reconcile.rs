//! Order reconciliation: editing and removing lines of placed orders.
//!
//! Stock moves by the difference between the old and new quantity. Unit
//! prices come from the line's snapshot, never from the catalog, so orders
//! for deactivated products stay editable. The order total is recomputed
//! from the remaining lines after every edit.

use std::cmp::Ordering;

use tracing::instrument;

use pazar_core::{Actor, Entity, MarketError, OrderId, OrderLineId, OrderStatus, Price};

use super::{ServiceError, stock};
use crate::db::{MarketStore, MarketTx};
use crate::models::{Order, OrderDetail, OrderLine, total_of};

/// Order reconciliation service.
pub struct ReconcileService<'a, S> {
    store: &'a S,
}

impl<'a, S: MarketStore> ReconcileService<'a, S> {
    /// Create a new reconciliation service.
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Set the quantity of one order line.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a zero quantity, `NotFound` if the order or
    /// the line within it is missing, `Unauthorized` unless the actor manages
    /// the order's store, `OrderClosed` for delivered or cancelled orders and
    /// `InsufficientStock` if the increase cannot be covered. Nothing changes
    /// when an error is returned.
    #[instrument(skip_all, fields(order_id = %order_id, line_id = %line_id, quantity = quantity))]
    pub async fn update_line_quantity(
        &self,
        actor: &Actor,
        order_id: OrderId,
        line_id: OrderLineId,
        quantity: u32,
    ) -> Result<OrderDetail, ServiceError> {
        if quantity == 0 {
            return Err(MarketError::validation(
                "quantity must be at least 1; remove the line instead",
            )
            .into());
        }

        let mut tx = self.store.begin().await?;
        let (order, mut lines) = open_order(&mut tx, actor, order_id).await?;
        let line = lines
            .iter_mut()
            .find(|line| line.id == line_id)
            .ok_or(MarketError::NotFound(Entity::OrderLine))?;
        let key = line.stock_key();
        let previous = line.quantity;

        match quantity.cmp(&previous) {
            Ordering::Equal => return Ok(OrderDetail { order, lines }),
            Ordering::Less => {
                stock::restore(&mut tx, key, previous - quantity).await?;
            }
            Ordering::Greater => {
                stock::reserve(&mut tx, key, quantity - previous).await?;
            }
        }

        *line = tx.set_order_line_quantity(line_id, quantity).await?;
        let order = tx
            .update_order(order_id, order.status, total_of(&lines))
            .await?;
        tx.commit().await?;

        tracing::info!(previous, total = %order.total_amount, "Order line quantity changed");
        Ok(OrderDetail { order, lines })
    }

    /// Remove one order line, returning its quantity to stock.
    ///
    /// Removing the last line cancels the order.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the order or the line within it is missing,
    /// `Unauthorized` unless the actor manages the order's store and
    /// `OrderClosed` for delivered or cancelled orders.
    #[instrument(skip_all, fields(order_id = %order_id, line_id = %line_id))]
    pub async fn remove_line(
        &self,
        actor: &Actor,
        order_id: OrderId,
        line_id: OrderLineId,
    ) -> Result<OrderDetail, ServiceError> {
        let mut tx = self.store.begin().await?;
        let (order, mut lines) = open_order(&mut tx, actor, order_id).await?;
        let index = lines
            .iter()
            .position(|line| line.id == line_id)
            .ok_or(MarketError::NotFound(Entity::OrderLine))?;
        let removed = lines.remove(index);

        stock::restore(&mut tx, removed.stock_key(), removed.quantity).await?;
        tx.delete_order_line(line_id).await?;

        let order = if lines.is_empty() {
            tx.update_order(order_id, OrderStatus::Cancelled, Price::ZERO)
                .await?
        } else {
            tx.update_order(order_id, order.status, total_of(&lines))
                .await?
        };
        tx.commit().await?;

        tracing::info!(
            restored = removed.quantity,
            remaining_lines = lines.len(),
            status = %order.status,
            total = %order.total_amount,
            "Order line removed"
        );
        Ok(OrderDetail { order, lines })
    }
}

/// Lock an order the actor may edit, together with its lines.
async fn open_order<T: MarketTx>(
    tx: &mut T,
    actor: &Actor,
    order_id: OrderId,
) -> Result<(Order, Vec<OrderLine>), ServiceError> {
    let order = tx
        .lock_order(order_id)
        .await?
        .ok_or(MarketError::NotFound(Entity::Order))?;
    if !actor.can_manage_store(order.store_id) {
        return Err(MarketError::unauthorized("cannot edit another store's orders").into());
    }
    if order.status.is_terminal() {
        return Err(MarketError::OrderClosed(order.status).into());
    }
    let lines = tx.order_lines(order_id).await?;
    Ok((order, lines))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pazar_core::UserId;

    use super::*;
    use crate::services::LifecycleService;
    use crate::services::fixtures::*;

    const OPERATOR: Actor = Actor::operator(UserId::new(10), MAVI);

    fn assert_total_consistent(detail: &OrderDetail) {
        assert_eq!(detail.order.total_amount, total_of(&detail.lines));
        for line in &detail.lines {
            assert_eq!(line.line_total, line.unit_price.times(line.quantity));
        }
    }

    #[tokio::test]
    async fn test_lowering_quantity_restores_the_difference() {
        let store = demo();
        let detail = place_order(&store, BUYER, &[(key(JEANS, M), 5)]).await;
        assert_eq!(store.stock_level(key(JEANS, M)).await, 3);

        let edited = ReconcileService::new(&store)
            .update_line_quantity(&OPERATOR, detail.order.id, detail.lines[0].id, 2)
            .await
            .unwrap();
        assert_eq!(store.stock_level(key(JEANS, M)).await, 6);
        assert_eq!(edited.lines[0].quantity, 2);
        assert_eq!(edited.order.total_amount, Price::from_minor(49998));
        assert_total_consistent(&edited);
    }

    #[tokio::test]
    async fn test_raising_quantity_beyond_stock_changes_nothing() {
        let store = demo();
        let detail = place_order(&store, BUYER, &[(key(TSHIRT, M), 4)]).await;
        let reconcile = ReconcileService::new(&store);

        let err = reconcile
            .update_line_quantity(&OPERATOR, detail.order.id, detail.lines[0].id, 6)
            .await
            .unwrap_err();
        assert!(matches!(
            err.market(),
            Some(MarketError::InsufficientStock { requested: 2, available: 1, .. })
        ));
        assert_eq!(store.stock_level(key(TSHIRT, M)).await, 1);

        let edited = reconcile
            .update_line_quantity(&OPERATOR, detail.order.id, detail.lines[0].id, 5)
            .await
            .unwrap();
        assert_eq!(store.stock_level(key(TSHIRT, M)).await, 0);
        assert_total_consistent(&edited);
    }

    #[tokio::test]
    async fn test_removing_a_line_restores_it_and_recomputes_total() {
        let store = demo();
        let detail = place_order(&store, BUYER, &[(key(TSHIRT, M), 1), (key(JEANS, L), 2)]).await;
        let jeans = detail.lines[1].id;

        let edited = ReconcileService::new(&store)
            .remove_line(&OPERATOR, detail.order.id, jeans)
            .await
            .unwrap();
        assert_eq!(store.stock_level(key(JEANS, L)).await, 8);
        assert_eq!(edited.lines.len(), 1);
        assert_eq!(edited.order.status, OrderStatus::Pending);
        assert_eq!(edited.order.total_amount, Price::from_minor(12999));
        assert_total_consistent(&edited);
    }

    #[tokio::test]
    async fn test_removing_last_line_cancels() {
        let store = demo();
        let detail = place_order(&store, BUYER, &[(key(TSHIRT, L), 3)]).await;

        let edited = ReconcileService::new(&store)
            .remove_line(&OPERATOR, detail.order.id, detail.lines[0].id)
            .await
            .unwrap();
        assert_eq!(edited.order.status, OrderStatus::Cancelled);
        assert_eq!(edited.order.total_amount, Price::ZERO);
        assert!(edited.lines.is_empty());
        assert_eq!(store.stock_level(key(TSHIRT, L)).await, 10);
    }

    #[tokio::test]
    async fn test_deactivated_product_stays_editable() {
        let store = demo();
        let detail = place_order(&store, BUYER, &[(key(TSHIRT, S), 2)]).await;
        store.set_product_active(TSHIRT, false).await;
        store.set_product_price(TSHIRT, Price::from_minor(100)).await;

        let edited = ReconcileService::new(&store)
            .update_line_quantity(&OPERATOR, detail.order.id, detail.lines[0].id, 3)
            .await
            .unwrap();
        assert_eq!(edited.order.total_amount, Price::from_minor(38997));
    }

    #[tokio::test]
    async fn test_rejected_edits() {
        let store = demo();
        let detail = place_order(&store, BUYER, &[(key(TSHIRT, M), 1)]).await;
        let other = place_order(&store, OTHER_BUYER, &[(key(JEANS, M), 1)]).await;
        let reconcile = ReconcileService::new(&store);
        let (order_id, line_id) = (detail.order.id, detail.lines[0].id);

        let err = reconcile
            .update_line_quantity(&OPERATOR, order_id, line_id, 0)
            .await
            .unwrap_err();
        assert!(matches!(err.market(), Some(MarketError::Validation(_))));

        let err = reconcile
            .remove_line(&OPERATOR, order_id, other.lines[0].id)
            .await
            .unwrap_err();
        assert!(matches!(err.market(), Some(MarketError::NotFound(Entity::OrderLine))));

        let err = reconcile
            .remove_line(&Actor::customer(BUYER), order_id, line_id)
            .await
            .unwrap_err();
        assert!(matches!(err.market(), Some(MarketError::Unauthorized(_))));

        LifecycleService::new(&store)
            .update_status(&OPERATOR, order_id, OrderStatus::Delivered)
            .await
            .unwrap();
        let err = reconcile
            .update_line_quantity(&OPERATOR, order_id, line_id, 2)
            .await
            .unwrap_err();
        assert!(matches!(
            err.market(),
            Some(MarketError::OrderClosed(OrderStatus::Delivered))
        ));
    }
}
