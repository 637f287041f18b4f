//! Order route handlers: reads, status changes and line edits.

use axum::extract::State;
use serde::Deserialize;
use tracing::instrument;

use pazar_core::{OrderId, OrderLineId, OrderStatus, StoreId};

use super::cart::QuantityRequest;
use crate::db::MarketStore;
use crate::error::{AppJson, AppPath, Result};
use crate::middleware::Identity;
use crate::models::{Order, OrderDetail};
use crate::services::{LifecycleService, OrderService, ReconcileService};
use crate::state::AppState;

/// Body of `POST /orders/{order_id}/status`.
#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: OrderStatus,
}

/// The caller's own orders, newest first.
#[instrument(skip_all, fields(user_id = %actor.user_id))]
pub async fn mine<S: MarketStore>(
    State(state): State<AppState<S>>,
    Identity(actor): Identity,
) -> Result<AppJson<Vec<Order>>> {
    let orders = OrderService::new(state.store())
        .list_for_customer(actor.user_id)
        .await?;
    Ok(AppJson(orders))
}

/// One order with its lines.
#[instrument(skip_all, fields(user_id = %actor.user_id, order_id = %order_id))]
pub async fn show<S: MarketStore>(
    State(state): State<AppState<S>>,
    Identity(actor): Identity,
    AppPath(order_id): AppPath<OrderId>,
) -> Result<AppJson<OrderDetail>> {
    let detail = OrderService::new(state.store())
        .get(&actor, order_id)
        .await?;
    Ok(AppJson(detail))
}

/// Orders received by a store.
#[instrument(skip_all, fields(user_id = %actor.user_id, store_id = %store_id))]
pub async fn for_store<S: MarketStore>(
    State(state): State<AppState<S>>,
    Identity(actor): Identity,
    AppPath(store_id): AppPath<StoreId>,
) -> Result<AppJson<Vec<Order>>> {
    let orders = OrderService::new(state.store())
        .list_for_store(&actor, store_id)
        .await?;
    Ok(AppJson(orders))
}

/// Move an order to another status.
#[instrument(skip_all, fields(user_id = %actor.user_id, order_id = %order_id))]
pub async fn update_status<S: MarketStore>(
    State(state): State<AppState<S>>,
    Identity(actor): Identity,
    AppPath(order_id): AppPath<OrderId>,
    AppJson(body): AppJson<StatusRequest>,
) -> Result<AppJson<Order>> {
    let order = LifecycleService::new(state.store())
        .update_status(&actor, order_id, body.status)
        .await?;
    Ok(AppJson(order))
}

/// Change the quantity of an order line.
#[instrument(skip_all, fields(user_id = %actor.user_id, order_id = %order_id, line_id = %line_id))]
pub async fn update_line<S: MarketStore>(
    State(state): State<AppState<S>>,
    Identity(actor): Identity,
    AppPath((order_id, line_id)): AppPath<(OrderId, OrderLineId)>,
    AppJson(body): AppJson<QuantityRequest>,
) -> Result<AppJson<OrderDetail>> {
    let detail = ReconcileService::new(state.store())
        .update_line_quantity(&actor, order_id, line_id, body.quantity)
        .await?;
    Ok(AppJson(detail))
}

/// Remove an order line.
#[instrument(skip_all, fields(user_id = %actor.user_id, order_id = %order_id, line_id = %line_id))]
pub async fn remove_line<S: MarketStore>(
    State(state): State<AppState<S>>,
    Identity(actor): Identity,
    AppPath((order_id, line_id)): AppPath<(OrderId, OrderLineId)>,
) -> Result<AppJson<OrderDetail>> {
    let detail = ReconcileService::new(state.store())
        .remove_line(&actor, order_id, line_id)
        .await?;
    Ok(AppJson(detail))
}
