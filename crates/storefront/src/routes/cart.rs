//! Cart route handlers.

use axum::{extract::State, http::StatusCode};
use serde::Deserialize;
use tracing::instrument;

use pazar_core::stock::StockKey;
use pazar_core::{CartLineId, ProductId, SizeId};

use crate::db::MarketStore;
use crate::error::{AppJson, AppPath, Result, add_breadcrumb};
use crate::middleware::Identity;
use crate::models::{CartLine, CartView};
use crate::services::CartService;
use crate::services::cart::AddToCart;
use crate::state::AppState;

/// Body of `POST /cart/lines`.
#[derive(Debug, Deserialize)]
pub struct AddLineRequest {
    pub product_id: ProductId,
    pub size_id: SizeId,
    pub quantity: u32,
    /// Replace a cart holding another store's products.
    #[serde(default)]
    pub confirm_replace: bool,
}

/// Body of quantity updates.
#[derive(Debug, Deserialize)]
pub struct QuantityRequest {
    pub quantity: u32,
}

/// Show the caller's cart.
#[instrument(skip_all, fields(user_id = %actor.user_id))]
pub async fn show<S: MarketStore>(
    State(state): State<AppState<S>>,
    Identity(actor): Identity,
) -> Result<AppJson<CartView>> {
    let view = CartService::new(state.store()).view(actor.user_id).await?;
    Ok(AppJson(view))
}

/// Add a product and size to the caller's cart.
#[instrument(skip_all, fields(user_id = %actor.user_id, product_id = %body.product_id))]
pub async fn add<S: MarketStore>(
    State(state): State<AppState<S>>,
    Identity(actor): Identity,
    AppJson(body): AppJson<AddLineRequest>,
) -> Result<(StatusCode, AppJson<CartLine>)> {
    let line = CartService::new(state.store())
        .add_line(
            actor.user_id,
            AddToCart {
                key: StockKey::new(body.product_id, body.size_id),
                quantity: body.quantity,
                confirm_replace: body.confirm_replace,
            },
        )
        .await?;

    add_breadcrumb(
        "cart",
        "Added to cart",
        Some(&[
            ("product_id", &body.product_id.to_string()),
            ("quantity", &line.quantity.to_string()),
        ]),
    );
    Ok((StatusCode::CREATED, AppJson(line)))
}

/// Change the quantity of a cart line.
#[instrument(skip_all, fields(user_id = %actor.user_id, line_id = %line_id))]
pub async fn update<S: MarketStore>(
    State(state): State<AppState<S>>,
    Identity(actor): Identity,
    AppPath(line_id): AppPath<CartLineId>,
    AppJson(body): AppJson<QuantityRequest>,
) -> Result<AppJson<CartLine>> {
    let line = CartService::new(state.store())
        .update_line(actor.user_id, line_id, body.quantity)
        .await?;
    Ok(AppJson(line))
}

/// Remove a cart line.
#[instrument(skip_all, fields(user_id = %actor.user_id, line_id = %line_id))]
pub async fn remove<S: MarketStore>(
    State(state): State<AppState<S>>,
    Identity(actor): Identity,
    AppPath(line_id): AppPath<CartLineId>,
) -> Result<StatusCode> {
    CartService::new(state.store())
        .remove_line(actor.user_id, line_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Empty the caller's cart.
#[instrument(skip_all, fields(user_id = %actor.user_id))]
pub async fn clear<S: MarketStore>(
    State(state): State<AppState<S>>,
    Identity(actor): Identity,
) -> Result<StatusCode> {
    CartService::new(state.store()).clear(actor.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
