//! Mock payment gate.
//!
//! A payment is started against the payer's cart and completed with a card.
//! Completion and order creation share one unit of work: either the order
//! exists and the payment is `SUCCEEDED`, or there is no order and the
//! payment is `FAILED` with the reason.

use tracing::instrument;
use uuid::Uuid;

use pazar_core::payment::{CardCheck, evaluate_card};
use pazar_core::{Actor, Entity, MarketError, PaymentStatus, Price, UserId};

use super::{ServiceError, orders};
use crate::db::{MarketStore, MarketTx};
use crate::models::{
    CardDetails, NewPayment, Payment, PaymentOutcome, PaymentReceipt, PaymentResult,
};

/// Payment service.
pub struct PaymentService<'a, S> {
    store: &'a S,
}

impl<'a, S: MarketStore> PaymentService<'a, S> {
    /// Create a new payment service.
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Start a payment for the user's cart at current catalog prices.
    ///
    /// # Errors
    ///
    /// Returns `EmptyCart`, `NotFound` if a cart product is unknown and
    /// `Validation` if no delivery address is known.
    #[instrument(skip_all, fields(user_id = %user_id))]
    pub async fn begin(
        &self,
        user_id: UserId,
        delivery_address: Option<&str>,
    ) -> Result<PaymentReceipt, ServiceError> {
        let mut tx = self.store.begin().await?;
        let lines = tx.cart_lines(user_id).await?;
        if lines.is_empty() {
            return Err(MarketError::EmptyCart.into());
        }
        let mut amount = Price::ZERO;
        for line in &lines {
            let entry = tx
                .catalog_entry(line.product_id)
                .await?
                .ok_or(MarketError::NotFound(Entity::Product))?;
            amount = amount + entry.price.times(line.quantity);
        }
        let delivery_address = orders::resolve_address(&mut tx, user_id, delivery_address).await?;

        let payment = tx
            .insert_payment(&NewPayment {
                user_id,
                amount,
                token: Uuid::new_v4(),
                delivery_address,
            })
            .await?;
        tx.commit().await?;

        tracing::info!(payment_id = %payment.id, amount = %payment.amount, "Payment started");
        Ok(PaymentReceipt {
            token: payment.token,
            amount: payment.amount,
        })
    }

    /// Charge a card against a pending payment.
    ///
    /// A declined card or a failed order creation is not an error: the
    /// payment is recorded `FAILED` and the result says why.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown tokens or tokens of another user, and
    /// `PaymentAlreadyCompleted` once the token has been used.
    #[instrument(skip_all, fields(user_id = %user_id, token = %token))]
    pub async fn complete(
        &self,
        user_id: UserId,
        token: Uuid,
        card: &CardDetails,
    ) -> Result<PaymentResult, ServiceError> {
        let mut tx = self.store.begin().await?;
        let payment = pending_payment(&mut tx, user_id, token).await?;

        let check = evaluate_card(&card.card_number);
        if !check.succeeded() {
            let payment = tx
                .finish_payment(payment.id, &failed_outcome(&check, check.message.clone()))
                .await?;
            tx.commit().await?;
            tracing::info!(payment_id = %payment.id, reason = %check.message, "Payment declined");
            return Ok(failure(check.message));
        }

        let created = orders::create_from_cart(
            &mut tx,
            user_id,
            payment.delivery_address.clone(),
            Some(payment.amount),
        )
        .await;
        let detail = match created {
            Ok(detail) => detail,
            Err(ServiceError::Market(err)) => {
                drop(tx);
                return self.fail_after_rollback(user_id, token, &check, &err).await;
            }
            Err(err) => return Err(err),
        };

        let outcome = PaymentOutcome {
            status: PaymentStatus::Succeeded,
            order_id: Some(detail.order.id),
            card_brand: check.brand,
            card_last4: check.last4.clone(),
            failure_reason: None,
        };
        tx.finish_payment(payment.id, &outcome).await?;
        tx.commit().await?;

        tracing::info!(
            payment_id = %payment.id,
            order_id = %detail.order.id,
            amount = %payment.amount,
            "Payment succeeded"
        );
        Ok(PaymentResult {
            succeeded: true,
            status: PaymentStatus::Succeeded,
            message: check.message,
            order_id: Some(detail.order.id),
        })
    }

    /// Record `FAILED` for a payment whose order could not be created.
    ///
    /// The order attempt's unit of work has already been discarded, so the
    /// payment is locked again in a fresh one.
    async fn fail_after_rollback(
        &self,
        user_id: UserId,
        token: Uuid,
        check: &CardCheck,
        reason: &MarketError,
    ) -> Result<PaymentResult, ServiceError> {
        let mut tx = self.store.begin().await?;
        let payment = pending_payment(&mut tx, user_id, token).await?;
        let reason = reason.to_string();
        tx.finish_payment(payment.id, &failed_outcome(check, reason.clone()))
            .await?;
        tx.commit().await?;

        tracing::warn!(payment_id = %payment.id, %reason, "Payment failed: order not created");
        Ok(failure(reason))
    }

    /// Cancel a pending payment. Admin only.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` for non-admins, `NotFound` for unknown tokens and
    /// `InvalidPaymentTransition` unless the payment is pending.
    pub async fn cancel(&self, actor: &Actor, token: Uuid) -> Result<Payment, ServiceError> {
        self.administer(actor, token, PaymentStatus::Cancelled).await
    }

    /// Mark a successful payment refunded. Admin only.
    ///
    /// The order and its stock are left as they are.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` for non-admins, `NotFound` for unknown tokens and
    /// `InvalidPaymentTransition` unless the payment succeeded.
    pub async fn refund(&self, actor: &Actor, token: Uuid) -> Result<Payment, ServiceError> {
        self.administer(actor, token, PaymentStatus::Refunded).await
    }

    #[instrument(skip(self, actor), fields(actor = %actor.user_id))]
    async fn administer(
        &self,
        actor: &Actor,
        token: Uuid,
        status: PaymentStatus,
    ) -> Result<Payment, ServiceError> {
        if !actor.is_admin() {
            return Err(MarketError::unauthorized("only admins can change payments").into());
        }
        let mut tx = self.store.begin().await?;
        let payment = tx
            .lock_payment(token)
            .await?
            .ok_or(MarketError::NotFound(Entity::Payment))?;
        if !payment.status.can_transition_to(status) {
            return Err(MarketError::InvalidPaymentTransition {
                from: payment.status,
                to: status,
            }
            .into());
        }
        let payment = tx.set_payment_status(payment.id, status).await?;
        tx.commit().await?;

        tracing::info!(payment_id = %payment.id, %status, "Payment status changed");
        Ok(payment)
    }
}

/// Lock a payment owned by `user_id` that has not been completed yet.
async fn pending_payment<T: MarketTx>(
    tx: &mut T,
    user_id: UserId,
    token: Uuid,
) -> Result<Payment, ServiceError> {
    let payment = tx
        .lock_payment(token)
        .await?
        .filter(|payment| payment.user_id == user_id)
        .ok_or(MarketError::NotFound(Entity::Payment))?;
    if payment.status != PaymentStatus::Pending {
        return Err(MarketError::PaymentAlreadyCompleted.into());
    }
    Ok(payment)
}

fn failed_outcome(check: &CardCheck, reason: String) -> PaymentOutcome {
    PaymentOutcome {
        status: PaymentStatus::Failed,
        order_id: None,
        card_brand: check.brand,
        card_last4: check.last4.clone(),
        failure_reason: Some(reason),
    }
}

const fn failure(message: String) -> PaymentResult {
    PaymentResult {
        succeeded: false,
        status: PaymentStatus::Failed,
        message,
        order_id: None,
    }
}
