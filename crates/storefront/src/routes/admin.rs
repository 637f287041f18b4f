//! Stock and payment administration.

use axum::extract::State;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use pazar_core::stock::StockKey;
use pazar_core::{ProductId, SizeId};

use super::cart::QuantityRequest;
use crate::db::MarketStore;
use crate::error::{AppJson, AppPath, Result};
use crate::middleware::Identity;
use crate::models::Payment;
use crate::services::{PaymentService, StockService};
use crate::state::AppState;

/// Stock level of one product and size.
#[derive(Debug, Serialize, Deserialize)]
pub struct StockLevel {
    pub product_id: ProductId,
    pub size_id: SizeId,
    pub quantity: u32,
}

/// Current stock level. Public.
#[instrument(skip(state))]
pub async fn stock_level<S: MarketStore>(
    State(state): State<AppState<S>>,
    AppPath((product_id, size_id)): AppPath<(ProductId, SizeId)>,
) -> Result<AppJson<StockLevel>> {
    let quantity = StockService::new(state.store())
        .available(StockKey::new(product_id, size_id))
        .await?;
    Ok(AppJson(StockLevel {
        product_id,
        size_id,
        quantity,
    }))
}

/// Set a stock level outright.
///
/// Admins may set any level. Store operators may restock the products of the
/// store they are bound to; other stores' products answer 403.
#[instrument(skip_all, fields(user_id = %actor.user_id, product_id = %product_id, size_id = %size_id))]
pub async fn set_stock<S: MarketStore>(
    State(state): State<AppState<S>>,
    Identity(actor): Identity,
    AppPath((product_id, size_id)): AppPath<(ProductId, SizeId)>,
    AppJson(body): AppJson<QuantityRequest>,
) -> Result<AppJson<StockLevel>> {
    StockService::new(state.store())
        .restock(&actor, StockKey::new(product_id, size_id), body.quantity)
        .await?;
    Ok(AppJson(StockLevel {
        product_id,
        size_id,
        quantity: body.quantity,
    }))
}

/// Cancel a pending payment.
#[instrument(skip_all, fields(user_id = %actor.user_id, token = %token))]
pub async fn cancel_payment<S: MarketStore>(
    State(state): State<AppState<S>>,
    Identity(actor): Identity,
    AppPath(token): AppPath<Uuid>,
) -> Result<AppJson<Payment>> {
    let payment = PaymentService::new(state.store())
        .cancel(&actor, token)
        .await?;
    Ok(AppJson(payment))
}

/// Refund a successful payment.
#[instrument(skip_all, fields(user_id = %actor.user_id, token = %token))]
pub async fn refund_payment<S: MarketStore>(
    State(state): State<AppState<S>>,
    Identity(actor): Identity,
    AppPath(token): AppPath<Uuid>,
) -> Result<AppJson<Payment>> {
    let payment = PaymentService::new(state.store())
        .refund(&actor, token)
        .await?;
    Ok(AppJson(payment))
}
