//! Order status transitions.

use tracing::instrument;

use pazar_core::lifecycle::{Transition, check_transition};
use pazar_core::stock::StockDemand;
use pazar_core::{Actor, Entity, MarketError, OrderId, OrderStatus, Price};

use super::{ServiceError, stock};
use crate::db::{MarketStore, MarketTx};
use crate::models::Order;

/// Order status service.
pub struct LifecycleService<'a, S> {
    store: &'a S,
}

impl<'a, S: MarketStore> LifecycleService<'a, S> {
    /// Create a new lifecycle service.
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Move an order to `status`.
    ///
    /// Cancelling returns every line's quantity to stock, removes the lines
    /// and zeroes the total. Requesting the current status changes nothing.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown orders, `Unauthorized` unless the actor
    /// manages the order's store, and `InvalidTransition` for moves the
    /// transition table does not allow.
    #[instrument(skip_all, fields(order_id = %order_id, to = %status, actor = %actor.user_id))]
    pub async fn update_status(
        &self,
        actor: &Actor,
        order_id: OrderId,
        status: OrderStatus,
    ) -> Result<Order, ServiceError> {
        let mut tx = self.store.begin().await?;
        let order = tx
            .lock_order(order_id)
            .await?
            .ok_or(MarketError::NotFound(Entity::Order))?;
        if !actor.can_manage_store(order.store_id) {
            return Err(MarketError::unauthorized("cannot manage another store's orders").into());
        }

        let transition = check_transition(order.status, status, actor.role)?;
        let updated = match transition {
            Transition::Unchanged => return Ok(order),
            t if t.cancels() => {
                let lines = tx.order_lines(order_id).await?;
                let demand: StockDemand = lines
                    .iter()
                    .map(|line| (line.stock_key(), line.quantity))
                    .collect();
                stock::restore_all(&mut tx, &demand).await?;
                tx.delete_order_lines(order_id).await?;
                tx.update_order(order_id, OrderStatus::Cancelled, Price::ZERO)
                    .await?
            }
            Transition::Move { to, .. } => {
                tx.update_order(order_id, to, order.total_amount).await?
            }
        };
        tx.commit().await?;

        tracing::info!(from = %order.status, "Order status changed");
        Ok(updated)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pazar_core::UserId;

    use super::*;
    use crate::services::OrderService;
    use crate::services::fixtures::*;

    const OPERATOR: Actor = Actor::operator(UserId::new(10), MAVI);

    #[tokio::test]
    async fn test_operator_may_skip_to_delivered_and_then_nothing() {
        let store = demo();
        let detail = place_order(&store, BUYER, &[(key(TSHIRT, M), 1)]).await;
        let lifecycle = LifecycleService::new(&store);

        let order = lifecycle
            .update_status(&OPERATOR, detail.order.id, OrderStatus::Delivered)
            .await
            .unwrap();
        assert_eq!(order.status, OrderStatus::Delivered);

        let err = lifecycle
            .update_status(&OPERATOR, detail.order.id, OrderStatus::Pending)
            .await
            .unwrap_err();
        assert!(matches!(
            err.market(),
            Some(MarketError::InvalidTransition {
                from: OrderStatus::Delivered,
                to: OrderStatus::Pending
            })
        ));
    }

    #[tokio::test]
    async fn test_moving_backwards_between_open_states() {
        let store = demo();
        let detail = place_order(&store, BUYER, &[(key(TSHIRT, M), 1)]).await;
        let lifecycle = LifecycleService::new(&store);

        lifecycle
            .update_status(&OPERATOR, detail.order.id, OrderStatus::Shipped)
            .await
            .unwrap();
        let order = lifecycle
            .update_status(&OPERATOR, detail.order.id, OrderStatus::Preparing)
            .await
            .unwrap();
        assert_eq!(order.status, OrderStatus::Preparing);
        assert_eq!(order.total_amount, Price::from_minor(12999));
    }

    #[tokio::test]
    async fn test_cancel_restores_stock_and_zeroes_total() {
        let store = demo();
        let detail = place_order(&store, BUYER, &[(key(TSHIRT, M), 2), (key(JEANS, S), 3)]).await;
        assert_eq!(store.stock_level(key(TSHIRT, M)).await, 3);

        let order = LifecycleService::new(&store)
            .update_status(&Actor::admin(UserId::new(11)), detail.order.id, OrderStatus::Cancelled)
            .await
            .unwrap();
        assert_eq!(order.status, OrderStatus::Cancelled);
        assert_eq!(order.total_amount, Price::ZERO);
        assert_eq!(store.stock_level(key(TSHIRT, M)).await, 5);
        assert_eq!(store.stock_level(key(JEANS, S)).await, 8);

        let fetched = OrderService::new(&store)
            .get(&Actor::customer(BUYER), detail.order.id)
            .await
            .unwrap();
        assert!(fetched.lines.is_empty());
    }

    #[tokio::test]
    async fn test_same_status_is_a_no_op() {
        let store = demo();
        let detail = place_order(&store, BUYER, &[(key(TSHIRT, M), 1)]).await;

        let order = LifecycleService::new(&store)
            .update_status(&OPERATOR, detail.order.id, OrderStatus::Pending)
            .await
            .unwrap();
        assert_eq!(order, detail.order);
    }

    #[tokio::test]
    async fn test_customers_and_other_stores_are_refused() {
        let store = demo();
        let detail = place_order(&store, BUYER, &[(key(TSHIRT, M), 1)]).await;
        let lifecycle = LifecycleService::new(&store);

        for actor in [
            Actor::customer(BUYER),
            Actor::operator(UserId::new(12), ZARA),
        ] {
            let err = lifecycle
                .update_status(&actor, detail.order.id, OrderStatus::Cancelled)
                .await
                .unwrap_err();
            assert!(matches!(err.market(), Some(MarketError::Unauthorized(_))));
        }
        assert_eq!(store.stock_level(key(TSHIRT, M)).await, 4);

        let err = lifecycle
            .update_status(&OPERATOR, OrderId::new(404), OrderStatus::Shipped)
            .await
            .unwrap_err();
        assert!(matches!(err.market(), Some(MarketError::NotFound(Entity::Order))));
    }
}
