//! Seed the database with the demo catalog.
//!
//! Three stores ("Mavi", "Zara", "Koton") with two products each, sizes
//! S, M and L, stock levels and delivery addresses for users 1 and 2.
//! Safe to rerun: demo stock levels are reset, other rows are kept.

use tracing::info;

use pazar_storefront::db;
use pazar_storefront::db::postgres::seed::seed_demo_catalog;

use super::database_url;

/// Seed the demo catalog.
///
/// # Errors
///
/// Returns an error if the database URL is missing, the database cannot be
/// reached, or the schema has not been migrated.
pub async fn demo_catalog() -> Result<(), Box<dyn std::error::Error>> {
    let database_url = database_url()?;

    let pool = db::create_pool(&database_url, 2).await?;
    info!("Connected to database");

    let summary = seed_demo_catalog(&pool).await?;

    info!("Seeding complete!");
    info!("  Stores: {}", summary.stores);
    info!("  Products: {}", summary.products);
    info!("  Stock rows: {}", summary.stock_rows);

    Ok(())
}
