//! Checkout and payment route handlers.
//!
//! With `PAZAR_REQUIRE_PAYMENT` set (the default) orders are only created by
//! a successful `POST /payments/{token}/complete`; `POST /checkout` answers
//! 402.

use axum::{extract::State, http::StatusCode};
use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;

use crate::db::MarketStore;
use crate::error::{AppError, AppJson, AppPath, Result, add_breadcrumb};
use crate::middleware::Identity;
use crate::models::{CardDetails, OrderDetail, PaymentReceipt, PaymentResult};
use crate::services::{OrderService, PaymentService};
use crate::state::AppState;

/// Body of `POST /checkout` and `POST /payments`.
#[derive(Debug, Default, Deserialize)]
pub struct DeliveryRequest {
    /// Falls back to the address on the caller's profile.
    #[serde(default)]
    pub delivery_address: Option<String>,
}

/// Turn the caller's cart into an order without payment.
#[instrument(skip_all, fields(user_id = %actor.user_id))]
pub async fn checkout<S: MarketStore>(
    State(state): State<AppState<S>>,
    Identity(actor): Identity,
    AppJson(body): AppJson<DeliveryRequest>,
) -> Result<(StatusCode, AppJson<OrderDetail>)> {
    if state.config().require_payment {
        return Err(AppError::PaymentRequired);
    }
    let detail = OrderService::new(state.store())
        .checkout(actor.user_id, body.delivery_address.as_deref())
        .await?;
    Ok((StatusCode::CREATED, AppJson(detail)))
}

/// Start a payment for the caller's cart.
#[instrument(skip_all, fields(user_id = %actor.user_id))]
pub async fn begin_payment<S: MarketStore>(
    State(state): State<AppState<S>>,
    Identity(actor): Identity,
    AppJson(body): AppJson<DeliveryRequest>,
) -> Result<(StatusCode, AppJson<PaymentReceipt>)> {
    let receipt = PaymentService::new(state.store())
        .begin(actor.user_id, body.delivery_address.as_deref())
        .await?;
    add_breadcrumb("payment", "Payment started", None);
    Ok((StatusCode::CREATED, AppJson(receipt)))
}

/// Charge a card against a pending payment.
///
/// A declined card is a normal `200` with `succeeded: false`.
#[instrument(skip_all, fields(user_id = %actor.user_id, token = %token))]
pub async fn complete_payment<S: MarketStore>(
    State(state): State<AppState<S>>,
    Identity(actor): Identity,
    AppPath(token): AppPath<Uuid>,
    AppJson(card): AppJson<CardDetails>,
) -> Result<AppJson<PaymentResult>> {
    let result = PaymentService::new(state.store())
        .complete(actor.user_id, token, &card)
        .await?;
    Ok(AppJson(result))
}
