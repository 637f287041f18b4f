//! Business errors raised by marketplace operations.
//!
//! These describe why an operation was refused. Storage backends and the HTTP
//! layer wrap them; they never carry database or transport details.

use thiserror::Error;

use crate::types::{OrderStatus, PaymentStatus, ProductId, SizeId, StoreId};

/// Kind of entity an operation could not find.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    CartLine,
    Order,
    OrderLine,
    Product,
    Payment,
    Store,
}

impl Entity {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CartLine => "cart_line",
            Self::Order => "order",
            Self::OrderLine => "order_line",
            Self::Product => "product",
            Self::Payment => "payment",
            Self::Store => "store",
        }
    }
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a marketplace operation failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarketError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error(
        "insufficient stock for product {product_id} size {size_id}: \
         requested {requested}, available {available}"
    )]
    InsufficientStock {
        product_id: ProductId,
        size_id: SizeId,
        requested: u32,
        available: u32,
    },

    #[error("cart already holds products from store {existing_store}, cannot add from store {new_store}")]
    CrossStoreConflict {
        existing_store: StoreId,
        new_store: StoreId,
    },

    #[error("cart is empty")]
    EmptyCart,

    #[error("cart holds products from more than one store")]
    CrossStoreCart,

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("{0} not found")]
    NotFound(Entity),

    #[error("cannot move order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("order is {0} and can no longer be changed")]
    OrderClosed(OrderStatus),

    #[error("payment has already been completed")]
    PaymentAlreadyCompleted,

    #[error("cannot move payment from {from} to {to}")]
    InvalidPaymentTransition {
        from: PaymentStatus,
        to: PaymentStatus,
    },

    /// A stock row would go negative. Reservations check availability first,
    /// so this indicates a bug or concurrent manual edit.
    #[error("stock for product {product_id} size {size_id} would become {attempted}")]
    StockConsistencyViolation {
        product_id: ProductId,
        size_id: SizeId,
        attempted: i64,
    },
}

impl MarketError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }
}
