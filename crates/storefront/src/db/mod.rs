//! Storage for marketplace state.
//!
//! All engine operations run against a [`MarketStore`]. A store hands out
//! units of work ([`MarketTx`]); every read and write of one operation goes
//! through a single unit, and nothing is visible to other units until
//! [`MarketTx::commit`]. Dropping a unit without committing discards it.
//!
//! # Backends
//!
//! - [`postgres::PgMarketStore`] - one `PostgreSQL` transaction per unit, with
//!   `SELECT ... FOR UPDATE` on every stock, order and payment row it changes
//! - [`memory::MemoryMarketStore`] - process-local state; units are fully
//!   serialized
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p pazar-cli -- migrate
//! ```

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;
use uuid::Uuid;

use pazar_core::stock::StockKey;
use pazar_core::{
    CartLineId, OrderId, OrderLineId, OrderStatus, PaymentId, PaymentStatus, Price, ProductId,
    StoreId, UserId,
};

use crate::models::{
    CartLine, CatalogEntry, NewOrder, NewOrderLine, NewPayment, Order, OrderLine, Payment,
    PaymentOutcome,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryMarketStore;
pub use postgres::PgMarketStore;

/// Errors that can occur in storage operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Row expected by the caller does not exist.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate cart line).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Source of units of work.
#[async_trait]
pub trait MarketStore: Send + Sync + 'static {
    type Tx: MarketTx;

    /// Open a unit of work.
    async fn begin(&self) -> Result<Self::Tx, RepositoryError>;

    /// Check that the backend is reachable.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// One unit of work.
///
/// Stock levels are returned as `i64` exactly as stored so that callers can
/// detect a corrupted negative level instead of having it clamped away.
#[async_trait]
pub trait MarketTx: Send {
    // -- Catalog and identity (read-only) ------------------------------------

    /// Catalog entry for a product, including deactivated products.
    async fn catalog_entry(
        &mut self,
        product_id: ProductId,
    ) -> Result<Option<CatalogEntry>, RepositoryError>;

    /// Default delivery address from the user's profile.
    async fn default_address(&mut self, user_id: UserId)
    -> Result<Option<String>, RepositoryError>;

    // -- Stock ----------------------------------------------------------------

    /// Read a stock level and hold it locked until the unit ends.
    /// A missing row reads as zero.
    async fn lock_stock(&mut self, key: StockKey) -> Result<i64, RepositoryError>;

    /// Read a stock level without locking it. A missing row reads as zero.
    async fn peek_stock(&mut self, key: StockKey) -> Result<i64, RepositoryError>;

    /// Write a stock level, creating the row if needed.
    async fn write_stock(&mut self, key: StockKey, quantity: u32) -> Result<(), RepositoryError>;

    // -- Cart -----------------------------------------------------------------

    /// Hold the user's cart exclusively until the unit ends.
    ///
    /// Every unit that reads a cart in order to change it takes this lock
    /// first, so concurrent adds and checkouts of one cart run one at a time
    /// and each sees the lines the previous one committed.
    async fn lock_cart(&mut self, user_id: UserId) -> Result<(), RepositoryError>;

    /// A user's cart lines, oldest first.
    async fn cart_lines(&mut self, user_id: UserId) -> Result<Vec<CartLine>, RepositoryError>;

    async fn insert_cart_line(
        &mut self,
        user_id: UserId,
        key: StockKey,
        quantity: u32,
    ) -> Result<CartLine, RepositoryError>;

    /// Returns `None` if the user has no such line.
    async fn set_cart_line_quantity(
        &mut self,
        user_id: UserId,
        line_id: CartLineId,
        quantity: u32,
    ) -> Result<Option<CartLine>, RepositoryError>;

    /// Returns `false` if the user has no such line.
    async fn delete_cart_line(
        &mut self,
        user_id: UserId,
        line_id: CartLineId,
    ) -> Result<bool, RepositoryError>;

    /// Delete every line of a user's cart, returning how many were removed.
    async fn clear_cart(&mut self, user_id: UserId) -> Result<u64, RepositoryError>;

    // -- Orders ---------------------------------------------------------------

    async fn insert_order(&mut self, order: &NewOrder) -> Result<Order, RepositoryError>;

    async fn insert_order_line(
        &mut self,
        order_id: OrderId,
        line: &NewOrderLine,
    ) -> Result<OrderLine, RepositoryError>;

    async fn find_order(&mut self, order_id: OrderId) -> Result<Option<Order>, RepositoryError>;

    /// Read an order and hold it locked until the unit ends.
    async fn lock_order(&mut self, order_id: OrderId) -> Result<Option<Order>, RepositoryError>;

    /// An order's lines in creation order.
    async fn order_lines(&mut self, order_id: OrderId) -> Result<Vec<OrderLine>, RepositoryError>;

    /// Returns `RepositoryError::NotFound` if the line does not exist.
    async fn set_order_line_quantity(
        &mut self,
        line_id: OrderLineId,
        quantity: u32,
    ) -> Result<OrderLine, RepositoryError>;

    /// Returns `RepositoryError::NotFound` if the line does not exist.
    async fn delete_order_line(&mut self, line_id: OrderLineId) -> Result<(), RepositoryError>;

    async fn delete_order_lines(&mut self, order_id: OrderId) -> Result<u64, RepositoryError>;

    /// Set status and total, bumping `updated_at`.
    async fn update_order(
        &mut self,
        order_id: OrderId,
        status: OrderStatus,
        total_amount: Price,
    ) -> Result<Order, RepositoryError>;

    /// A customer's orders, newest first.
    async fn orders_for_user(&mut self, user_id: UserId) -> Result<Vec<Order>, RepositoryError>;

    /// A store's orders, newest first.
    async fn orders_for_store(&mut self, store_id: StoreId)
    -> Result<Vec<Order>, RepositoryError>;

    // -- Payments -------------------------------------------------------------

    async fn insert_payment(&mut self, payment: &NewPayment) -> Result<Payment, RepositoryError>;

    /// Read a payment by token and hold it locked until the unit ends.
    async fn lock_payment(&mut self, token: Uuid) -> Result<Option<Payment>, RepositoryError>;

    /// Record the terminal outcome of a pending payment.
    async fn finish_payment(
        &mut self,
        payment_id: PaymentId,
        outcome: &PaymentOutcome,
    ) -> Result<Payment, RepositoryError>;

    async fn set_payment_status(
        &mut self,
        payment_id: PaymentId,
        status: PaymentStatus,
    ) -> Result<Payment, RepositoryError>;

    // -- Lifecycle ------------------------------------------------------------

    /// Publish every change made in this unit.
    async fn commit(self) -> Result<(), RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
/// * `max_connections` - Upper bound on pooled connections
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(
    database_url: &secrecy::SecretString,
    max_connections: u32,
) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .min_connections(2.min(max_connections))
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Convert a stored quantity column into a domain quantity.
pub(crate) fn quantity_from_db(column: &str, value: i32) -> Result<u32, RepositoryError> {
    u32::try_from(value)
        .map_err(|_| RepositoryError::DataCorruption(format!("negative {column}: {value}")))
}

/// Convert a domain quantity into a quantity column.
pub(crate) fn quantity_to_db(value: u32) -> Result<i32, RepositoryError> {
    i32::try_from(value)
        .map_err(|_| RepositoryError::Conflict(format!("quantity {value} is too large")))
}
