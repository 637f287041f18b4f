//! Cart line queries. Every statement is scoped by `user_id`.

use sqlx::PgConnection;

use pazar_core::stock::StockKey;
use pazar_core::{CartLineId, ProductId, SizeId, UserId};

use crate::db::{RepositoryError, quantity_from_db, quantity_to_db};
use crate::models::CartLine;

#[derive(Debug, sqlx::FromRow)]
struct CartLineRow {
    id: i32,
    user_id: i32,
    product_id: i32,
    size_id: i32,
    quantity: i32,
}

impl TryFrom<CartLineRow> for CartLine {
    type Error = RepositoryError;

    fn try_from(row: CartLineRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: CartLineId::new(row.id),
            user_id: UserId::new(row.user_id),
            product_id: ProductId::new(row.product_id),
            size_id: SizeId::new(row.size_id),
            quantity: quantity_from_db("cart line quantity", row.quantity)?,
        })
    }
}

/// Advisory lock namespace for carts; the second key is the user id.
const CART_LOCK_CLASS: i32 = 0x0CA7;

/// Take the transaction-scoped advisory lock for a user's cart.
///
/// A cart may have no rows at all, so there is nothing to `SELECT ... FOR
/// UPDATE`; the advisory lock stands in for the whole cart and is released
/// on commit or rollback.
pub async fn lock(conn: &mut PgConnection, user_id: UserId) -> Result<(), RepositoryError> {
    sqlx::query("SELECT pg_advisory_xact_lock($1, $2)")
        .bind(CART_LOCK_CLASS)
        .bind(user_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn lines(
    conn: &mut PgConnection,
    user_id: UserId,
) -> Result<Vec<CartLine>, RepositoryError> {
    sqlx::query_as::<_, CartLineRow>(
        r"
        SELECT id, user_id, product_id, size_id, quantity
        FROM pazar.cart_line
        WHERE user_id = $1
        ORDER BY id
        ",
    )
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await?
    .into_iter()
    .map(CartLine::try_from)
    .collect()
}

pub async fn insert(
    conn: &mut PgConnection,
    user_id: UserId,
    key: StockKey,
    quantity: u32,
) -> Result<CartLine, RepositoryError> {
    let row = sqlx::query_as::<_, CartLineRow>(
        r"
        INSERT INTO pazar.cart_line (user_id, product_id, size_id, quantity)
        VALUES ($1, $2, $3, $4)
        RETURNING id, user_id, product_id, size_id, quantity
        ",
    )
    .bind(user_id)
    .bind(key.product_id)
    .bind(key.size_id)
    .bind(quantity_to_db(quantity)?)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.is_unique_violation()
        {
            return RepositoryError::Conflict(format!("cart already has a line for {key}"));
        }
        RepositoryError::Database(e)
    })?;

    row.try_into()
}

pub async fn set_quantity(
    conn: &mut PgConnection,
    user_id: UserId,
    line_id: CartLineId,
    quantity: u32,
) -> Result<Option<CartLine>, RepositoryError> {
    sqlx::query_as::<_, CartLineRow>(
        r"
        UPDATE pazar.cart_line
        SET quantity = $3
        WHERE user_id = $1 AND id = $2
        RETURNING id, user_id, product_id, size_id, quantity
        ",
    )
    .bind(user_id)
    .bind(line_id)
    .bind(quantity_to_db(quantity)?)
    .fetch_optional(&mut *conn)
    .await?
    .map(CartLine::try_from)
    .transpose()
}

pub async fn delete(
    conn: &mut PgConnection,
    user_id: UserId,
    line_id: CartLineId,
) -> Result<bool, RepositoryError> {
    let result = sqlx::query("DELETE FROM pazar.cart_line WHERE user_id = $1 AND id = $2")
        .bind(user_id)
        .bind(line_id)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn clear(conn: &mut PgConnection, user_id: UserId) -> Result<u64, RepositoryError> {
    let result = sqlx::query("DELETE FROM pazar.cart_line WHERE user_id = $1")
        .bind(user_id)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected())
}
