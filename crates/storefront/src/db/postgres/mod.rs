//! `PostgreSQL` backend.
//!
//! # Tables (schema `pazar`)
//!
//! - `store`, `product`, `size`, `user_profile` - owned by the catalog and
//!   identity services; read-only here (written by the CLI seeder)
//! - `stock` - available quantity per product and size
//! - `cart_line` - per-user cart lines
//! - `customer_order`, `order_line` - orders and their price snapshots
//! - `payment` - mock payment attempts
//!
//! Every query uses runtime-checked `sqlx::query_as` so the crate builds
//! without a live database.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use pazar_core::stock::StockKey;
use pazar_core::{
    CartLineId, OrderId, OrderLineId, OrderStatus, PaymentId, PaymentStatus, Price, ProductId,
    StoreId, UserId,
};

use super::{MarketStore, MarketTx, RepositoryError};
use crate::models::{
    CartLine, CatalogEntry, NewOrder, NewOrderLine, NewPayment, Order, OrderLine, Payment,
    PaymentOutcome,
};

mod cart;
mod catalog;
mod orders;
mod payments;
pub mod seed;
mod stock;

/// Marketplace store backed by a `PostgreSQL` pool.
#[derive(Debug, Clone)]
pub struct PgMarketStore {
    pool: PgPool,
}

impl PgMarketStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl MarketStore for PgMarketStore {
    type Tx = PgTx;

    async fn begin(&self) -> Result<PgTx, RepositoryError> {
        Ok(PgTx {
            tx: self.pool.begin().await?,
        })
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }
}

/// One `PostgreSQL` transaction. Rolled back on drop unless committed.
pub struct PgTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl MarketTx for PgTx {
    async fn catalog_entry(
        &mut self,
        product_id: ProductId,
    ) -> Result<Option<CatalogEntry>, RepositoryError> {
        catalog::entry(&mut self.tx, product_id).await
    }

    async fn default_address(
        &mut self,
        user_id: UserId,
    ) -> Result<Option<String>, RepositoryError> {
        catalog::default_address(&mut self.tx, user_id).await
    }

    async fn lock_stock(&mut self, key: StockKey) -> Result<i64, RepositoryError> {
        stock::lock(&mut self.tx, key).await
    }

    async fn peek_stock(&mut self, key: StockKey) -> Result<i64, RepositoryError> {
        stock::peek(&mut self.tx, key).await
    }

    async fn write_stock(&mut self, key: StockKey, quantity: u32) -> Result<(), RepositoryError> {
        stock::write(&mut self.tx, key, quantity).await
    }

    async fn lock_cart(&mut self, user_id: UserId) -> Result<(), RepositoryError> {
        cart::lock(&mut self.tx, user_id).await
    }

    async fn cart_lines(&mut self, user_id: UserId) -> Result<Vec<CartLine>, RepositoryError> {
        cart::lines(&mut self.tx, user_id).await
    }

    async fn insert_cart_line(
        &mut self,
        user_id: UserId,
        key: StockKey,
        quantity: u32,
    ) -> Result<CartLine, RepositoryError> {
        cart::insert(&mut self.tx, user_id, key, quantity).await
    }

    async fn set_cart_line_quantity(
        &mut self,
        user_id: UserId,
        line_id: CartLineId,
        quantity: u32,
    ) -> Result<Option<CartLine>, RepositoryError> {
        cart::set_quantity(&mut self.tx, user_id, line_id, quantity).await
    }

    async fn delete_cart_line(
        &mut self,
        user_id: UserId,
        line_id: CartLineId,
    ) -> Result<bool, RepositoryError> {
        cart::delete(&mut self.tx, user_id, line_id).await
    }

    async fn clear_cart(&mut self, user_id: UserId) -> Result<u64, RepositoryError> {
        cart::clear(&mut self.tx, user_id).await
    }

    async fn insert_order(&mut self, order: &NewOrder) -> Result<Order, RepositoryError> {
        orders::insert(&mut self.tx, order).await
    }

    async fn insert_order_line(
        &mut self,
        order_id: OrderId,
        line: &NewOrderLine,
    ) -> Result<OrderLine, RepositoryError> {
        orders::insert_line(&mut self.tx, order_id, line).await
    }

    async fn find_order(&mut self, order_id: OrderId) -> Result<Option<Order>, RepositoryError> {
        orders::find(&mut self.tx, order_id).await
    }

    async fn lock_order(&mut self, order_id: OrderId) -> Result<Option<Order>, RepositoryError> {
        orders::lock(&mut self.tx, order_id).await
    }

    async fn order_lines(&mut self, order_id: OrderId) -> Result<Vec<OrderLine>, RepositoryError> {
        orders::lines(&mut self.tx, order_id).await
    }

    async fn set_order_line_quantity(
        &mut self,
        line_id: OrderLineId,
        quantity: u32,
    ) -> Result<OrderLine, RepositoryError> {
        orders::set_line_quantity(&mut self.tx, line_id, quantity).await
    }

    async fn delete_order_line(&mut self, line_id: OrderLineId) -> Result<(), RepositoryError> {
        orders::delete_line(&mut self.tx, line_id).await
    }

    async fn delete_order_lines(&mut self, order_id: OrderId) -> Result<u64, RepositoryError> {
        orders::delete_lines(&mut self.tx, order_id).await
    }

    async fn update_order(
        &mut self,
        order_id: OrderId,
        status: OrderStatus,
        total_amount: Price,
    ) -> Result<Order, RepositoryError> {
        orders::update(&mut self.tx, order_id, status, total_amount).await
    }

    async fn orders_for_user(&mut self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        orders::for_user(&mut self.tx, user_id).await
    }

    async fn orders_for_store(
        &mut self,
        store_id: StoreId,
    ) -> Result<Vec<Order>, RepositoryError> {
        orders::for_store(&mut self.tx, store_id).await
    }

    async fn insert_payment(&mut self, payment: &NewPayment) -> Result<Payment, RepositoryError> {
        payments::insert(&mut self.tx, payment).await
    }

    async fn lock_payment(&mut self, token: Uuid) -> Result<Option<Payment>, RepositoryError> {
        payments::lock(&mut self.tx, token).await
    }

    async fn finish_payment(
        &mut self,
        payment_id: PaymentId,
        outcome: &PaymentOutcome,
    ) -> Result<Payment, RepositoryError> {
        payments::finish(&mut self.tx, payment_id, outcome).await
    }

    async fn set_payment_status(
        &mut self,
        payment_id: PaymentId,
        status: PaymentStatus,
    ) -> Result<Payment, RepositoryError> {
        payments::set_status(&mut self.tx, payment_id, status).await
    }

    async fn commit(self) -> Result<(), RepositoryError> {
        self.tx.commit().await?;
        Ok(())
    }
}
