//! Stock administration.

use tracing::info;

use pazar_core::stock::StockKey;
use pazar_core::{ProductId, SizeId};
use pazar_storefront::db::{self, PgMarketStore};
use pazar_storefront::services::StockService;

use super::database_url;

/// Set the stock level of one product and size.
///
/// # Errors
///
/// Returns an error if the database URL is missing, the product does not
/// exist, or the database fails.
pub async fn set(
    product_id: i32,
    size_id: i32,
    quantity: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    let database_url = database_url()?;
    let store = PgMarketStore::new(db::create_pool(&database_url, 1).await?);

    let key = StockKey::new(ProductId::new(product_id), SizeId::new(size_id));
    let stock = StockService::new(&store);
    stock.set_quantity(key, quantity).await?;

    info!(%key, quantity = stock.available(key).await?, "Stock updated");
    Ok(())
}
