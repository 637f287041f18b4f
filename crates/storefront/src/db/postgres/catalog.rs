//! Read-only queries against collaborator-owned tables.

use rust_decimal::Decimal;
use sqlx::PgConnection;

use pazar_core::{Price, ProductId, StoreId, UserId};

use crate::db::RepositoryError;
use crate::models::CatalogEntry;

#[derive(Debug, sqlx::FromRow)]
struct CatalogRow {
    id: i32,
    store_id: i32,
    name: String,
    price: Decimal,
    active: bool,
}

impl From<CatalogRow> for CatalogEntry {
    fn from(row: CatalogRow) -> Self {
        Self {
            product_id: ProductId::new(row.id),
            store_id: StoreId::new(row.store_id),
            name: row.name,
            price: Price::new(row.price),
            active: row.active,
        }
    }
}

pub async fn entry(
    conn: &mut PgConnection,
    product_id: ProductId,
) -> Result<Option<CatalogEntry>, RepositoryError> {
    let row = sqlx::query_as::<_, CatalogRow>(
        r"
        SELECT id, store_id, name, price, active
        FROM pazar.product
        WHERE id = $1
        ",
    )
    .bind(product_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(CatalogEntry::from))
}

pub async fn default_address(
    conn: &mut PgConnection,
    user_id: UserId,
) -> Result<Option<String>, RepositoryError> {
    let address = sqlx::query_scalar::<_, Option<String>>(
        r"
        SELECT default_address
        FROM pazar.user_profile
        WHERE user_id = $1
        ",
    )
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(address.flatten().filter(|a| !a.trim().is_empty()))
}
