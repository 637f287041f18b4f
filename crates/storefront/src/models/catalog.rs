//! Catalog data consumed from the catalog service.

use serde::Serialize;

use pazar_core::{Price, ProductId, StoreId};

/// A product as the engine sees it.
///
/// The catalog owns products; the engine only reads the owning store, the
/// current price and whether the product can still be bought.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    pub product_id: ProductId,
    pub store_id: StoreId,
    pub name: String,
    /// Current list price. Orders snapshot this at creation.
    pub price: Price,
    /// Deactivated products stay readable for order history but cannot be
    /// added to carts or checked out.
    pub active: bool,
}
