//! Cart domain types.

use serde::Serialize;

use pazar_core::stock::StockKey;
use pazar_core::{CartLineId, Price, ProductId, SizeId, StoreId, UserId};

/// One line of a user's cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartLine {
    pub id: CartLineId,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub size_id: SizeId,
    /// Always at least 1.
    pub quantity: u32,
}

impl CartLine {
    #[must_use]
    pub const fn stock_key(&self) -> StockKey {
        StockKey::new(self.product_id, self.size_id)
    }
}

/// A cart line priced at the current catalog price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartItem {
    pub line_id: CartLineId,
    pub product_id: ProductId,
    pub product_name: String,
    pub size_id: SizeId,
    pub quantity: u32,
    pub unit_price: Price,
    pub line_total: Price,
    pub active: bool,
}

/// The cart as shown to its owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartView {
    /// Store every line belongs to; `None` for an empty cart.
    pub store_id: Option<StoreId>,
    pub items: Vec<CartItem>,
    pub subtotal: Price,
}

impl CartView {
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            store_id: None,
            items: Vec::new(),
            subtotal: Price::ZERO,
        }
    }
}
