//! HTTP routes for the marketplace JSON API.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                              - Liveness
//! GET    /health/ready                        - Store connectivity
//!
//! # Cart
//! GET    /cart                                - Cart view
//! DELETE /cart                                - Empty the cart
//! POST   /cart/lines                          - Add to cart
//! PATCH  /cart/lines/{line_id}                - Change quantity
//! DELETE /cart/lines/{line_id}                - Remove line
//!
//! # Checkout
//! POST   /checkout                            - Order without payment (if enabled)
//! POST   /payments                            - Start a payment
//! POST   /payments/{token}/complete           - Pay and create the order
//!
//! # Orders
//! GET    /orders                              - Caller's orders
//! GET    /orders/{order_id}                   - One order
//! POST   /orders/{order_id}/status            - Change status
//! PATCH  /orders/{order_id}/lines/{line_id}   - Change line quantity
//! DELETE /orders/{order_id}/lines/{line_id}   - Remove line
//! GET    /stores/{store_id}/orders            - Store's orders
//!
//! # Stock and administration
//! GET    /stock/{product_id}/{size_id}        - Current level
//! PUT    /admin/stock/{product_id}/{size_id}  - Set level (admin, or the
//!                                               product's store operator)
//! POST   /admin/payments/{token}/cancel       - Cancel pending payment
//! POST   /admin/payments/{token}/refund       - Refund payment
//! ```

pub mod admin;
pub mod cart;
pub mod checkout;
pub mod orders;

use std::time::Duration;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    middleware,
    routing::{get, patch, post, put},
};
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::db::MarketStore;
use crate::middleware::request_id_middleware;
use crate::state::AppState;

/// Create the cart routes router.
pub fn cart_routes<S: MarketStore>() -> Router<AppState<S>> {
    Router::new()
        .route("/", get(cart::show::<S>).delete(cart::clear::<S>))
        .route("/lines", post(cart::add::<S>))
        .route(
            "/lines/{line_id}",
            patch(cart::update::<S>).delete(cart::remove::<S>),
        )
}

/// Create the order routes router.
pub fn order_routes<S: MarketStore>() -> Router<AppState<S>> {
    Router::new()
        .route("/", get(orders::mine::<S>))
        .route("/{order_id}", get(orders::show::<S>))
        .route("/{order_id}/status", post(orders::update_status::<S>))
        .route(
            "/{order_id}/lines/{line_id}",
            patch(orders::update_line::<S>).delete(orders::remove_line::<S>),
        )
}

/// Create the admin routes router.
pub fn admin_routes<S: MarketStore>() -> Router<AppState<S>> {
    Router::new()
        .route("/stock/{product_id}/{size_id}", put(admin::set_stock::<S>))
        .route("/payments/{token}/cancel", post(admin::cancel_payment::<S>))
        .route("/payments/{token}/refund", post(admin::refund_payment::<S>))
}

/// Create all API routes.
pub fn routes<S: MarketStore>() -> Router<AppState<S>> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness::<S>))
        .nest("/cart", cart_routes())
        .route("/checkout", post(checkout::checkout::<S>))
        .route("/payments", post(checkout::begin_payment::<S>))
        .route(
            "/payments/{token}/complete",
            post(checkout::complete_payment::<S>),
        )
        .nest("/orders", order_routes())
        .route("/stores/{store_id}/orders", get(orders::for_store::<S>))
        .route("/stock/{product_id}/{size_id}", get(admin::stock_level::<S>))
        .nest("/admin", admin_routes())
}

/// The application with request tracing, ready to serve.
///
/// Sentry layers are added by the binary so tests run without a hub.
pub fn app<S: MarketStore>(state: AppState<S>) -> Router {
    routes()
        .layer(middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        user_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>, latency: Duration, span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
pub async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the store is not reachable.
pub async fn readiness<S: MarketStore>(State(state): State<AppState<S>>) -> StatusCode {
    match state.store().ping().await {
        Ok(()) => StatusCode::OK,
        Err(err) => {
            tracing::warn!(error = %err, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
