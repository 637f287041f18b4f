//! HTTP middleware for the storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, transaction per route), added in `main`
//! 2. `TraceLayer` (`http_request` span)
//! 3. Request ID (records into the span opened by the trace layer)
//!
//! Caller identity is an extractor ([`Identity`]), not a layer, so health
//! checks need no headers.

pub mod auth;
pub mod request_id;

pub use auth::Identity;
pub use request_id::{REQUEST_ID_HEADER, RequestId, request_id_middleware};
