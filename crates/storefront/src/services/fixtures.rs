//! Shared setup for service tests, built on the demo catalog.

#![allow(clippy::unwrap_used)]

use pazar_core::stock::StockKey;
use pazar_core::{ProductId, SizeId, StoreId, UserId};

use super::cart::AddToCart;
use super::{CartService, OrderService};
use crate::db::MemoryMarketStore;
use crate::models::OrderDetail;

pub const BUYER: UserId = UserId::new(1);
pub const OTHER_BUYER: UserId = UserId::new(2);
/// Has no profile, so no default delivery address.
pub const ANONYMOUS: UserId = UserId::new(99);

pub const MAVI: StoreId = StoreId::new(1);
pub const ZARA: StoreId = StoreId::new(2);
pub const KOTON: StoreId = StoreId::new(3);

/// Mavi, 129.99, S10 M5 L10.
pub const TSHIRT: ProductId = ProductId::new(1);
/// Mavi, 249.99, 8 per size.
pub const JEANS: ProductId = ProductId::new(2);
/// Zara, 399.90, 6 per size.
pub const LINEN_SHIRT: ProductId = ProductId::new(3);
/// Koton, 299.99, 12 per size.
pub const HOODIE: ProductId = ProductId::new(5);

pub const S: SizeId = SizeId::new(1);
pub const M: SizeId = SizeId::new(2);
pub const L: SizeId = SizeId::new(3);

pub const fn key(product_id: ProductId, size_id: SizeId) -> StockKey {
    StockKey::new(product_id, size_id)
}

pub fn demo() -> MemoryMarketStore {
    MemoryMarketStore::with_demo_catalog()
}

pub async fn add(store: &MemoryMarketStore, user_id: UserId, key: StockKey, quantity: u32) {
    CartService::new(store)
        .add_line(
            user_id,
            AddToCart {
                key,
                quantity,
                confirm_replace: false,
            },
        )
        .await
        .unwrap();
}

/// Fill the cart and check out directly.
pub async fn place_order(
    store: &MemoryMarketStore,
    user_id: UserId,
    lines: &[(StockKey, u32)],
) -> OrderDetail {
    for (key, quantity) in lines {
        add(store, user_id, *key, *quantity).await;
    }
    OrderService::new(store)
        .checkout(user_id, None)
        .await
        .unwrap()
}
