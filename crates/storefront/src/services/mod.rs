//! Business logic services for the marketplace.
//!
//! # Services
//!
//! - [`stock`] - Stock ledger: locked reserve/restore, reads, restocking
//! - [`cart`] - Single-store cart staging
//! - [`orders`] - Cart-to-order conversion and order reads
//! - [`lifecycle`] - Order status transitions
//! - [`reconcile`] - Order line edits with compensating stock moves
//! - [`payments`] - Mock payment gate
//!
//! Each service borrows a [`MarketStore`](crate::db::MarketStore) and runs
//! every operation in one unit of work, so any error leaves no partial
//! effect behind.

mod error;
#[cfg(test)]
mod fixtures;

pub mod cart;
pub mod lifecycle;
pub mod orders;
pub mod payments;
pub mod reconcile;
pub mod stock;

pub use cart::CartService;
pub use error::ServiceError;
pub use lifecycle::LifecycleService;
pub use orders::OrderService;
pub use payments::PaymentService;
pub use reconcile::ReconcileService;
pub use stock::StockService;
