//! Unified error handling with Sentry integration.
//!
//! Route handlers return `Result<T, AppError>`. Business refusals become a
//! tagged JSON body with a 4xx status. Server errors are captured to Sentry
//! and answered with a generic `internal` body.

use axum::{
    extract::{
        FromRequest, FromRequestParts,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;

use pazar_core::MarketError;

use crate::db::RepositoryError;
use crate::services::ServiceError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// A business rule refused the operation.
    #[error(transparent)]
    Market(#[from] MarketError),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Identity headers are missing or malformed.
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// Malformed request body or path.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Direct checkout is disabled; orders go through the payment gate.
    #[error("payment is required to place an order")]
    PaymentRequired,

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Market(err) => Self::Market(err),
            ServiceError::Repository(err) => Self::Database(err),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl AppError {
    /// Whether this is a server-side failure that must be reported.
    const fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Database(_)
                | Self::Internal(_)
                | Self::Market(MarketError::StockConsistencyViolation { .. })
        )
    }

    const fn status(&self) -> StatusCode {
        match self {
            Self::Market(err) => market_status(err),
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::PaymentRequired => StatusCode::PAYMENT_REQUIRED,
        }
    }

    /// Tagged JSON body. Internal details never leave the server.
    fn body(&self) -> Value {
        if self.is_server_error() {
            return json!({ "error": "internal", "message": "Internal server error" });
        }
        match self {
            Self::Market(err) => market_body(err),
            Self::Unauthenticated(_) => json!({ "error": "unauthorized", "message": self.to_string() }),
            Self::BadRequest(msg) => json!({ "error": "validation", "message": msg }),
            Self::PaymentRequired => {
                json!({ "error": "payment_required", "message": self.to_string() })
            }
            Self::Database(_) | Self::Internal(_) => {
                json!({ "error": "internal", "message": "Internal server error" })
            }
        }
    }
}

const fn market_status(err: &MarketError) -> StatusCode {
    match err {
        MarketError::Validation(_) | MarketError::EmptyCart => StatusCode::BAD_REQUEST,
        MarketError::Unauthorized(_) => StatusCode::FORBIDDEN,
        MarketError::NotFound(_) => StatusCode::NOT_FOUND,
        MarketError::InsufficientStock { .. }
        | MarketError::CrossStoreConflict { .. }
        | MarketError::CrossStoreCart
        | MarketError::InvalidTransition { .. }
        | MarketError::OrderClosed(_)
        | MarketError::PaymentAlreadyCompleted
        | MarketError::InvalidPaymentTransition { .. } => StatusCode::CONFLICT,
        MarketError::StockConsistencyViolation { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn market_body(err: &MarketError) -> Value {
    let message = err.to_string();
    match err {
        MarketError::Validation(_) => json!({ "error": "validation", "message": message }),
        MarketError::InsufficientStock {
            product_id,
            size_id,
            requested,
            available,
        } => json!({
            "error": "insufficient_stock",
            "message": message,
            "product_id": product_id,
            "size_id": size_id,
            "requested": requested,
            "available": available,
        }),
        MarketError::CrossStoreConflict {
            existing_store,
            new_store,
        } => json!({
            "error": "cross_store_conflict",
            "message": message,
            "existing_store": existing_store,
            "new_store": new_store,
        }),
        MarketError::CrossStoreCart => json!({ "error": "cross_store_cart", "message": message }),
        MarketError::EmptyCart => json!({ "error": "empty_cart", "message": message }),
        MarketError::Unauthorized(_) => json!({ "error": "unauthorized", "message": message }),
        MarketError::NotFound(entity) => json!({
            "error": "not_found",
            "message": message,
            "entity": entity.as_str(),
        }),
        MarketError::InvalidTransition { from, to } => json!({
            "error": "invalid_transition",
            "message": message,
            "from": from,
            "to": to,
        }),
        MarketError::OrderClosed(status) => json!({
            "error": "order_closed",
            "message": message,
            "status": status,
        }),
        MarketError::PaymentAlreadyCompleted => {
            json!({ "error": "payment_already_completed", "message": message })
        }
        MarketError::InvalidPaymentTransition { from, to } => json!({
            "error": "invalid_payment_transition",
            "message": message,
            "from": from,
            "to": to,
        }),
        MarketError::StockConsistencyViolation { .. } => {
            json!({ "error": "internal", "message": "Internal server error" })
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        (self.status(), axum::Json(self.body())).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// JSON extractor and response whose rejections are [`AppError`]s.
///
/// Malformed bodies are answered with the same tagged `validation` body as
/// every other client error instead of axum's plain-text rejection.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

impl<T: Serialize> IntoResponse for AppJson<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

/// Path extractor whose rejections are [`AppError`]s.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct AppPath<T>(pub T);

/// Set the Sentry user context for the current request.
pub fn set_sentry_user(user_id: &impl ToString, role: &str) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            ..Default::default()
        }));
        scope.set_tag("role", role);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added to cart", Some(&[("product_id", "3")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
