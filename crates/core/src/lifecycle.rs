//! Order status transitions.
//!
//! Transitions are looked up in a table keyed by `(current status, role)`.
//! Store operators and admins may jump between any two open states and cancel
//! from any of them; customers have no entries at all.

use crate::error::MarketError;
use crate::types::{OrderStatus, Role};

use crate::types::OrderStatus::{Cancelled, Delivered, Pending, Preparing, Shipped};

const FROM_PENDING: &[OrderStatus] = &[Preparing, Shipped, Delivered, Cancelled];
const FROM_PREPARING: &[OrderStatus] = &[Pending, Shipped, Delivered, Cancelled];
const FROM_SHIPPED: &[OrderStatus] = &[Pending, Preparing, Delivered, Cancelled];

/// Statuses an actor with `role` may move an order to from `from`.
///
/// Terminal statuses and the customer role yield an empty slice.
#[must_use]
pub const fn allowed_targets(from: OrderStatus, role: Role) -> &'static [OrderStatus] {
    match (from, role) {
        (_, Role::Customer) | (Delivered | Cancelled, _) => &[],
        (Pending, Role::StoreOperator | Role::Admin) => FROM_PENDING,
        (Preparing, Role::StoreOperator | Role::Admin) => FROM_PREPARING,
        (Shipped, Role::StoreOperator | Role::Admin) => FROM_SHIPPED,
    }
}

/// Outcome of a permitted status request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The order is already in the requested status.
    Unchanged,
    /// The order moves to a new status.
    Move { from: OrderStatus, to: OrderStatus },
}

impl Transition {
    /// Whether the move releases the order's stock.
    #[must_use]
    pub const fn cancels(self) -> bool {
        matches!(self, Self::Move { to: Cancelled, .. })
    }
}

/// Decide whether `role` may move an order from `from` to `to`.
///
/// Callers check store ownership before asking.
///
/// # Errors
///
/// Returns `Unauthorized` for customers and `InvalidTransition` when the table
/// has no entry (any move out of a terminal state).
pub fn check_transition(
    from: OrderStatus,
    to: OrderStatus,
    role: Role,
) -> Result<Transition, MarketError> {
    if matches!(role, Role::Customer) {
        return Err(MarketError::unauthorized(
            "customers cannot change order status",
        ));
    }
    if from == to {
        return Ok(Transition::Unchanged);
    }
    if allowed_targets(from, role).contains(&to) {
        Ok(Transition::Move { from, to })
    } else {
        Err(MarketError::InvalidTransition { from, to })
    }
}
