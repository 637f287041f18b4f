//! Order and order line queries.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgConnection;

use pazar_core::{
    OrderId, OrderLineId, OrderStatus, Price, ProductId, SizeId, StoreId, UserId,
};

use crate::db::{RepositoryError, quantity_from_db, quantity_to_db};
use crate::models::{NewOrder, NewOrderLine, Order, OrderLine};

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i32,
    user_id: i32,
    store_id: i32,
    total_amount: Decimal,
    delivery_address: String,
    status: OrderStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Self {
            id: OrderId::new(row.id),
            user_id: UserId::new(row.user_id),
            store_id: StoreId::new(row.store_id),
            total_amount: Price::new(row.total_amount),
            delivery_address: row.delivery_address,
            status: row.status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderLineRow {
    id: i32,
    order_id: i32,
    product_id: i32,
    size_id: i32,
    quantity: i32,
    unit_price: Decimal,
    line_total: Decimal,
}

impl TryFrom<OrderLineRow> for OrderLine {
    type Error = RepositoryError;

    fn try_from(row: OrderLineRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: OrderLineId::new(row.id),
            order_id: OrderId::new(row.order_id),
            product_id: ProductId::new(row.product_id),
            size_id: SizeId::new(row.size_id),
            quantity: quantity_from_db("order line quantity", row.quantity)?,
            unit_price: Price::new(row.unit_price),
            line_total: Price::new(row.line_total),
        })
    }
}

// =============================================================================
// Orders
// =============================================================================

pub async fn insert(conn: &mut PgConnection, order: &NewOrder) -> Result<Order, RepositoryError> {
    let row = sqlx::query_as::<_, OrderRow>(
        r"
        INSERT INTO pazar.customer_order (user_id, store_id, total_amount, delivery_address)
        VALUES ($1, $2, $3, $4)
        RETURNING id, user_id, store_id, total_amount, delivery_address, status,
                  created_at, updated_at
        ",
    )
    .bind(order.user_id)
    .bind(order.store_id)
    .bind(order.total_amount)
    .bind(&order.delivery_address)
    .fetch_one(&mut *conn)
    .await?;

    Ok(row.into())
}

pub async fn find(
    conn: &mut PgConnection,
    order_id: OrderId,
) -> Result<Option<Order>, RepositoryError> {
    let row = sqlx::query_as::<_, OrderRow>(
        r"
        SELECT id, user_id, store_id, total_amount, delivery_address, status,
               created_at, updated_at
        FROM pazar.customer_order
        WHERE id = $1
        ",
    )
    .bind(order_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(Order::from))
}

pub async fn lock(
    conn: &mut PgConnection,
    order_id: OrderId,
) -> Result<Option<Order>, RepositoryError> {
    let row = sqlx::query_as::<_, OrderRow>(
        r"
        SELECT id, user_id, store_id, total_amount, delivery_address, status,
               created_at, updated_at
        FROM pazar.customer_order
        WHERE id = $1
        FOR UPDATE
        ",
    )
    .bind(order_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(Order::from))
}

pub async fn update(
    conn: &mut PgConnection,
    order_id: OrderId,
    status: OrderStatus,
    total_amount: Price,
) -> Result<Order, RepositoryError> {
    let row = sqlx::query_as::<_, OrderRow>(
        r"
        UPDATE pazar.customer_order
        SET status = $2, total_amount = $3, updated_at = NOW()
        WHERE id = $1
        RETURNING id, user_id, store_id, total_amount, delivery_address, status,
                  created_at, updated_at
        ",
    )
    .bind(order_id)
    .bind(status)
    .bind(total_amount)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(RepositoryError::NotFound)?;

    Ok(row.into())
}

pub async fn for_user(
    conn: &mut PgConnection,
    user_id: UserId,
) -> Result<Vec<Order>, RepositoryError> {
    let rows = sqlx::query_as::<_, OrderRow>(
        r"
        SELECT id, user_id, store_id, total_amount, delivery_address, status,
               created_at, updated_at
        FROM pazar.customer_order
        WHERE user_id = $1
        ORDER BY created_at DESC, id DESC
        ",
    )
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows.into_iter().map(Order::from).collect())
}

pub async fn for_store(
    conn: &mut PgConnection,
    store_id: StoreId,
) -> Result<Vec<Order>, RepositoryError> {
    let rows = sqlx::query_as::<_, OrderRow>(
        r"
        SELECT id, user_id, store_id, total_amount, delivery_address, status,
               created_at, updated_at
        FROM pazar.customer_order
        WHERE store_id = $1
        ORDER BY created_at DESC, id DESC
        ",
    )
    .bind(store_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows.into_iter().map(Order::from).collect())
}

// =============================================================================
// Order Lines
// =============================================================================

pub async fn insert_line(
    conn: &mut PgConnection,
    order_id: OrderId,
    line: &NewOrderLine,
) -> Result<OrderLine, RepositoryError> {
    sqlx::query_as::<_, OrderLineRow>(
        r"
        INSERT INTO pazar.order_line (order_id, product_id, size_id, quantity, unit_price)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, order_id, product_id, size_id, quantity, unit_price, line_total
        ",
    )
    .bind(order_id)
    .bind(line.product_id)
    .bind(line.size_id)
    .bind(quantity_to_db(line.quantity)?)
    .bind(line.unit_price)
    .fetch_one(&mut *conn)
    .await?
    .try_into()
}

pub async fn lines(
    conn: &mut PgConnection,
    order_id: OrderId,
) -> Result<Vec<OrderLine>, RepositoryError> {
    sqlx::query_as::<_, OrderLineRow>(
        r"
        SELECT id, order_id, product_id, size_id, quantity, unit_price, line_total
        FROM pazar.order_line
        WHERE order_id = $1
        ORDER BY id
        ",
    )
    .bind(order_id)
    .fetch_all(&mut *conn)
    .await?
    .into_iter()
    .map(OrderLine::try_from)
    .collect()
}

pub async fn set_line_quantity(
    conn: &mut PgConnection,
    line_id: OrderLineId,
    quantity: u32,
) -> Result<OrderLine, RepositoryError> {
    sqlx::query_as::<_, OrderLineRow>(
        r"
        UPDATE pazar.order_line
        SET quantity = $2
        WHERE id = $1
        RETURNING id, order_id, product_id, size_id, quantity, unit_price, line_total
        ",
    )
    .bind(line_id)
    .bind(quantity_to_db(quantity)?)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(RepositoryError::NotFound)?
    .try_into()
}

pub async fn delete_line(
    conn: &mut PgConnection,
    line_id: OrderLineId,
) -> Result<(), RepositoryError> {
    let result = sqlx::query("DELETE FROM pazar.order_line WHERE id = $1")
        .bind(line_id)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::NotFound);
    }
    Ok(())
}

pub async fn delete_lines(
    conn: &mut PgConnection,
    order_id: OrderId,
) -> Result<u64, RepositoryError> {
    let result = sqlx::query("DELETE FROM pazar.order_line WHERE order_id = $1")
        .bind(order_id)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected())
}
