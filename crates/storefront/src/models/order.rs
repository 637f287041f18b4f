//! Order domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use pazar_core::stock::StockKey;
use pazar_core::{OrderId, OrderLineId, OrderStatus, Price, ProductId, SizeId, StoreId, UserId};

/// A durable purchase against one store.
///
/// `total_amount` always equals the sum of the order's line totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub store_id: StoreId,
    pub total_amount: Price,
    pub delivery_address: String,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One product and size within an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderLine {
    pub id: OrderLineId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub size_id: SizeId,
    pub quantity: u32,
    /// Price snapshot taken when the order was created.
    pub unit_price: Price,
    pub line_total: Price,
}

impl OrderLine {
    #[must_use]
    pub const fn stock_key(&self) -> StockKey {
        StockKey::new(self.product_id, self.size_id)
    }
}

/// An order together with its lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderDetail {
    pub order: Order,
    pub lines: Vec<OrderLine>,
}

/// Input for creating an order.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: UserId,
    pub store_id: StoreId,
    pub delivery_address: String,
    pub total_amount: Price,
}

/// Input for creating an order line.
#[derive(Debug, Clone, Copy)]
pub struct NewOrderLine {
    pub product_id: ProductId,
    pub size_id: SizeId,
    pub quantity: u32,
    pub unit_price: Price,
}

/// Sum of line totals.
pub fn total_of<'a>(lines: impl IntoIterator<Item = &'a OrderLine>) -> Price {
    lines.into_iter().map(|line| line.line_total).sum()
}
