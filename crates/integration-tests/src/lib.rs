//! Integration tests for Pazar.
//!
//! # Running Tests
//!
//! ```bash
//! # In-memory tests
//! cargo test -p pazar-integration-tests
//!
//! # PostgreSQL tests (migrates and seeds the database first)
//! PAZAR_TEST_DATABASE_URL=postgres://localhost/pazar_test \
//!     cargo test -p pazar-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `scenarios` - End-to-end marketplace stories against the engine
//! - `properties` - Invariants checked across many operations
//! - `http_api` - The axum router driven with `oneshot`
//! - `postgres` - Row locking and persistence against a real database

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use http_body_util::BodyExt;
use secrecy::SecretString;
use serde_json::Value;
use tower::ServiceExt;

use pazar_core::stock::StockKey;
use pazar_core::{Actor, ProductId, Role, SizeId, StoreId, UserId};
use pazar_storefront::config::{SentryConfig, StoreBackend, StorefrontConfig};
use pazar_storefront::db::{MemoryMarketStore, PgMarketStore};
use pazar_storefront::routes;
use pazar_storefront::services::CartService;
use pazar_storefront::services::cart::AddToCart;
use pazar_storefront::state::AppState;

/// Ids assigned by [`MemoryMarketStore::with_demo_catalog`] and by the
/// `PostgreSQL` seeder on an empty database.
pub mod demo {
    use super::{ProductId, SizeId, StoreId, UserId};

    pub const CUSTOMER: UserId = UserId::new(1);
    pub const OTHER_CUSTOMER: UserId = UserId::new(2);

    pub const MAVI: StoreId = StoreId::new(1);
    pub const ZARA: StoreId = StoreId::new(2);
    pub const KOTON: StoreId = StoreId::new(3);

    /// Mavi, 129.99, S10 M5 L10.
    pub const TSHIRT: ProductId = ProductId::new(1);
    /// Mavi, 249.99, 8 per size.
    pub const JEANS: ProductId = ProductId::new(2);
    /// Zara, 399.90, 6 per size.
    pub const LINEN_SHIRT: ProductId = ProductId::new(3);
    /// Koton, 299.99, 12 per size.
    pub const HOODIE: ProductId = ProductId::new(5);

    pub const S: SizeId = SizeId::new(1);
    pub const M: SizeId = SizeId::new(2);
    pub const L: SizeId = SizeId::new(3);
}

#[must_use]
pub const fn key(product_id: ProductId, size_id: SizeId) -> StockKey {
    StockKey::new(product_id, size_id)
}

/// Configuration for tests: in-memory store, no Sentry.
#[must_use]
pub fn test_config(require_payment: bool) -> StorefrontConfig {
    StorefrontConfig {
        store: StoreBackend::Memory,
        host: [127, 0, 0, 1].into(),
        port: 0,
        require_payment,
        sentry: SentryConfig::default(),
    }
}

/// Add a line to a cart, panicking on refusal.
pub async fn add_to_cart<S: pazar_storefront::db::MarketStore>(
    store: &S,
    user_id: UserId,
    key: StockKey,
    quantity: u32,
) {
    CartService::new(store)
        .add_line(
            user_id,
            AddToCart {
                key,
                quantity,
                confirm_replace: false,
            },
        )
        .await
        .unwrap();
}

/// The router over a demo store, plus the store for direct inspection.
pub struct TestApp {
    pub store: MemoryMarketStore,
    router: Router,
}

impl TestApp {
    #[must_use]
    pub fn new(require_payment: bool) -> Self {
        let store = MemoryMarketStore::with_demo_catalog();
        let router = routes::app(AppState::new(test_config(require_payment), store.clone()));
        Self { store, router }
    }

    /// Send a request as `actor` (or anonymously) and decode the JSON reply.
    ///
    /// Empty bodies decode as `Value::Null`.
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        actor: Option<&Actor>,
        body: Option<&Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(actor) = actor {
            request = request
                .header("x-user-id", actor.user_id.to_string())
                .header("x-user-role", actor.role.to_string());
            if let (Role::StoreOperator, Some(store_id)) = (actor.role, actor.store_id) {
                request = request.header("x-store-id", store_id.to_string());
            }
        }
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, value)
    }
}

/// Connection string for `PostgreSQL` tests.
#[must_use]
pub fn test_database_url() -> SecretString {
    std::env::var("PAZAR_TEST_DATABASE_URL")
        .map(SecretString::from)
        .expect("PAZAR_TEST_DATABASE_URL must be set for PostgreSQL tests")
}

/// Serializes `PostgreSQL` tests within one test binary; they share tables.
static PG_SERIAL: tokio::sync::Mutex<()> = tokio::sync::Mutex::const_new(());

/// A migrated and freshly seeded `PostgreSQL` store.
///
/// Expects a dedicated, empty test database so that the demo ids match
/// [`demo`]. Hold the returned guard for the whole test.
pub async fn pg_store() -> (PgMarketStore, tokio::sync::MutexGuard<'static, ()>) {
    let guard = PG_SERIAL.lock().await;
    let pool = pazar_storefront::db::create_pool(&test_database_url(), 8)
        .await
        .unwrap();
    sqlx::migrate!("../storefront/migrations")
        .run(&pool)
        .await
        .unwrap();
    sqlx::query("TRUNCATE pazar.payment, pazar.order_line, pazar.customer_order, pazar.cart_line")
        .execute(&pool)
        .await
        .unwrap();
    pazar_storefront::db::postgres::seed::seed_demo_catalog(&pool)
        .await
        .unwrap();
    (PgMarketStore::new(pool), guard)
}
