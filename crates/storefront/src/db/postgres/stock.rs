//! Stock row queries.

use sqlx::PgConnection;

use pazar_core::stock::StockKey;

use crate::db::{RepositoryError, quantity_to_db};

/// Lock a stock row, creating an empty one first so that concurrent units
/// serialize on it even when no stock was ever recorded.
pub async fn lock(conn: &mut PgConnection, key: StockKey) -> Result<i64, RepositoryError> {
    sqlx::query(
        r"
        INSERT INTO pazar.stock (product_id, size_id, quantity)
        VALUES ($1, $2, 0)
        ON CONFLICT (product_id, size_id) DO NOTHING
        ",
    )
    .bind(key.product_id)
    .bind(key.size_id)
    .execute(&mut *conn)
    .await?;

    let quantity = sqlx::query_scalar::<_, i32>(
        r"
        SELECT quantity
        FROM pazar.stock
        WHERE product_id = $1 AND size_id = $2
        FOR UPDATE
        ",
    )
    .bind(key.product_id)
    .bind(key.size_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(i64::from(quantity))
}

pub async fn peek(conn: &mut PgConnection, key: StockKey) -> Result<i64, RepositoryError> {
    let quantity = sqlx::query_scalar::<_, i32>(
        r"
        SELECT quantity
        FROM pazar.stock
        WHERE product_id = $1 AND size_id = $2
        ",
    )
    .bind(key.product_id)
    .bind(key.size_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(quantity.map_or(0, i64::from))
}

pub async fn write(
    conn: &mut PgConnection,
    key: StockKey,
    quantity: u32,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        INSERT INTO pazar.stock (product_id, size_id, quantity)
        VALUES ($1, $2, $3)
        ON CONFLICT (product_id, size_id)
        DO UPDATE SET quantity = EXCLUDED.quantity, updated_at = NOW()
        ",
    )
    .bind(key.product_id)
    .bind(key.size_id)
    .bind(quantity_to_db(quantity)?)
    .execute(&mut *conn)
    .await?;

    Ok(())
}
