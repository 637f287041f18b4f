//! Mock payment queries.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgConnection;
use uuid::Uuid;

use pazar_core::payment::CardBrand;
use pazar_core::{OrderId, PaymentId, PaymentStatus, Price, UserId};

use crate::db::RepositoryError;
use crate::models::{NewPayment, Payment, PaymentOutcome};

#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    id: i32,
    user_id: i32,
    order_id: Option<i32>,
    amount: Decimal,
    token: Uuid,
    status: PaymentStatus,
    delivery_address: String,
    card_brand: Option<CardBrand>,
    card_last4: Option<String>,
    failure_reason: Option<String>,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl From<PaymentRow> for Payment {
    fn from(row: PaymentRow) -> Self {
        Self {
            id: PaymentId::new(row.id),
            user_id: UserId::new(row.user_id),
            order_id: row.order_id.map(OrderId::new),
            amount: Price::new(row.amount),
            token: row.token,
            status: row.status,
            delivery_address: row.delivery_address,
            card_brand: row.card_brand,
            card_last4: row.card_last4,
            failure_reason: row.failure_reason,
            created_at: row.created_at,
            completed_at: row.completed_at,
        }
    }
}

pub async fn insert(
    conn: &mut PgConnection,
    payment: &NewPayment,
) -> Result<Payment, RepositoryError> {
    let row = sqlx::query_as::<_, PaymentRow>(
        r"
        INSERT INTO pazar.payment (user_id, amount, token, delivery_address)
        VALUES ($1, $2, $3, $4)
        RETURNING id, user_id, order_id, amount, token, status, delivery_address,
                  card_brand, card_last4, failure_reason, created_at, completed_at
        ",
    )
    .bind(payment.user_id)
    .bind(payment.amount)
    .bind(payment.token)
    .bind(&payment.delivery_address)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.is_unique_violation()
        {
            return RepositoryError::Conflict("payment token already exists".to_owned());
        }
        RepositoryError::Database(e)
    })?;

    Ok(row.into())
}

pub async fn lock(conn: &mut PgConnection, token: Uuid) -> Result<Option<Payment>, RepositoryError> {
    let row = sqlx::query_as::<_, PaymentRow>(
        r"
        SELECT id, user_id, order_id, amount, token, status, delivery_address,
               card_brand, card_last4, failure_reason, created_at, completed_at
        FROM pazar.payment
        WHERE token = $1
        FOR UPDATE
        ",
    )
    .bind(token)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(Payment::from))
}

pub async fn finish(
    conn: &mut PgConnection,
    payment_id: PaymentId,
    outcome: &PaymentOutcome,
) -> Result<Payment, RepositoryError> {
    let row = sqlx::query_as::<_, PaymentRow>(
        r"
        UPDATE pazar.payment
        SET status = $2,
            order_id = $3,
            card_brand = $4,
            card_last4 = $5,
            failure_reason = $6,
            completed_at = NOW()
        WHERE id = $1 AND status = 'pending'
        RETURNING id, user_id, order_id, amount, token, status, delivery_address,
                  card_brand, card_last4, failure_reason, created_at, completed_at
        ",
    )
    .bind(payment_id)
    .bind(outcome.status)
    .bind(outcome.order_id)
    .bind(outcome.card_brand)
    .bind(outcome.card_last4.as_deref())
    .bind(outcome.failure_reason.as_deref())
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(RepositoryError::NotFound)?;

    Ok(row.into())
}

pub async fn set_status(
    conn: &mut PgConnection,
    payment_id: PaymentId,
    status: PaymentStatus,
) -> Result<Payment, RepositoryError> {
    let row = sqlx::query_as::<_, PaymentRow>(
        r"
        UPDATE pazar.payment
        SET status = $2
        WHERE id = $1
        RETURNING id, user_id, order_id, amount, token, status, delivery_address,
                  card_brand, card_last4, failure_reason, created_at, completed_at
        ",
    )
    .bind(payment_id)
    .bind(status)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(RepositoryError::NotFound)?;

    Ok(row.into())
}
