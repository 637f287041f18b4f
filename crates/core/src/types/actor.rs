//! The authenticated caller of a marketplace operation.

use serde::{Deserialize, Serialize};

use super::id::{StoreId, UserId};
use super::status::Role;

/// Who is performing an operation.
///
/// Identity is asserted upstream; the marketplace only decides what an actor
/// with this role and store binding may do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: UserId,
    pub role: Role,
    /// Store bound to a store operator. Ignored for other roles.
    pub store_id: Option<StoreId>,
}

impl Actor {
    #[must_use]
    pub const fn customer(user_id: UserId) -> Self {
        Self {
            user_id,
            role: Role::Customer,
            store_id: None,
        }
    }

    #[must_use]
    pub const fn operator(user_id: UserId, store_id: StoreId) -> Self {
        Self {
            user_id,
            role: Role::StoreOperator,
            store_id: Some(store_id),
        }
    }

    #[must_use]
    pub const fn admin(user_id: UserId) -> Self {
        Self {
            user_id,
            role: Role::Admin,
            store_id: None,
        }
    }

    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self.role, Role::Admin)
    }

    /// Whether this actor may manage orders of `store_id`.
    ///
    /// Admins manage every store; an operator only the store they are bound to.
    #[must_use]
    pub fn can_manage_store(&self, store_id: StoreId) -> bool {
        match self.role {
            Role::Admin => true,
            Role::StoreOperator => self.store_id == Some(store_id),
            Role::Customer => false,
        }
    }

    /// Whether this actor may read an order placed by `owner` at `store_id`.
    #[must_use]
    pub fn can_view_order(&self, owner: UserId, store_id: StoreId) -> bool {
        match self.role {
            Role::Customer => self.user_id == owner,
            Role::StoreOperator | Role::Admin => self.can_manage_store(store_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_is_bound_to_one_store() {
        let op = Actor::operator(UserId::new(10), StoreId::new(1));
        assert!(op.can_manage_store(StoreId::new(1)));
        assert!(!op.can_manage_store(StoreId::new(2)));
    }

    #[test]
    fn test_operator_without_store_manages_nothing() {
        let op = Actor {
            user_id: UserId::new(10),
            role: Role::StoreOperator,
            store_id: None,
        };
        assert!(!op.can_manage_store(StoreId::new(1)));
    }

    #[test]
    fn test_customer_sees_only_own_orders() {
        let customer = Actor::customer(UserId::new(5));
        assert!(customer.can_view_order(UserId::new(5), StoreId::new(1)));
        assert!(!customer.can_view_order(UserId::new(6), StoreId::new(1)));
        assert!(!customer.can_manage_store(StoreId::new(1)));
    }

    #[test]
    fn test_admin_manages_every_store() {
        let admin = Actor::admin(UserId::new(1));
        assert!(admin.is_admin());
        assert!(admin.can_manage_store(StoreId::new(99)));
        assert!(admin.can_view_order(UserId::new(5), StoreId::new(99)));
    }
}
