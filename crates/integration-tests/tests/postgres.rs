//! Row locking and persistence against a real `PostgreSQL` database.
//!
//! These tests truncate marketplace tables; point
//! `PAZAR_TEST_DATABASE_URL` at a dedicated database.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use sqlx::{PgConnection, Postgres, Transaction};

use pazar_core::payment::FAILURE_CARD_NUMBER;
use pazar_core::{Actor, MarketError, OrderStatus, PaymentStatus, Price, UserId};
use pazar_integration_tests::demo::*;
use pazar_integration_tests::{add_to_cart, key, pg_store};
use pazar_storefront::db::{MarketStore, MarketTx, PgMarketStore};
use pazar_storefront::models::CardDetails;
use pazar_storefront::services::cart::AddToCart;
use pazar_storefront::services::{
    CartService, LifecycleService, OrderService, PaymentService, ReconcileService, ServiceError,
    StockService,
};

const MAVI_OPERATOR: Actor = Actor::operator(UserId::new(10), MAVI);

async fn level(store: &PgMarketStore, product: pazar_core::ProductId, size: pazar_core::SizeId) -> u32 {
    StockService::new(store)
        .available(key(product, size))
        .await
        .unwrap()
}

/// Open a transaction holding one stock row locked, so that anything that
/// needs the row queues up behind it until the transaction ends.
async fn hold_stock_row(
    store: &PgMarketStore,
    product: pazar_core::ProductId,
    size: pazar_core::SizeId,
) -> Transaction<'static, Postgres> {
    let mut blocker = store.pool().begin().await.unwrap();
    lock_row(&mut blocker, product, size).await;
    blocker
}

async fn lock_row(conn: &mut PgConnection, product: pazar_core::ProductId, size: pazar_core::SizeId) {
    sqlx::query(
        "SELECT quantity FROM pazar.stock WHERE product_id = $1 AND size_id = $2 FOR UPDATE",
    )
    .bind(product)
    .bind(size)
    .fetch_one(&mut *conn)
    .await
    .unwrap();
}

/// Give spawned tasks time to reach the lock they will wait on.
async fn let_tasks_queue() {
    tokio::time::sleep(Duration::from_millis(300)).await;
}

fn card(number: &str) -> CardDetails {
    CardDetails {
        card_number: number.to_owned(),
        expiry: "12/30".to_owned(),
        cvv: "123".to_owned(),
        holder: "Test Buyer".to_owned(),
    }
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (PAZAR_TEST_DATABASE_URL)"]
async fn test_concurrent_checkouts_lock_stock_rows() {
    let (store, _serial) = pg_store().await;
    StockService::new(&store)
        .set_quantity(key(TSHIRT, M), 5)
        .await
        .unwrap();
    add_to_cart(&store, CUSTOMER, key(TSHIRT, M), 3).await;
    add_to_cart(&store, OTHER_CUSTOMER, key(TSHIRT, M), 3).await;

    let handles: Vec<_> = [CUSTOMER, OTHER_CUSTOMER]
        .into_iter()
        .map(|user_id| {
            let store = store.clone();
            tokio::spawn(async move { OrderService::new(&store).checkout(user_id, None).await })
        })
        .collect();

    let mut succeeded = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(ServiceError::Market(MarketError::InsufficientStock {
                requested: 3,
                available: 2,
                ..
            })) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(succeeded, 1);
    assert_eq!(level(&store, TSHIRT, M).await, 2);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (PAZAR_TEST_DATABASE_URL)"]
async fn test_order_edits_persist() {
    let (store, _serial) = pg_store().await;
    StockService::new(&store)
        .set_quantity(key(TSHIRT, S), 10)
        .await
        .unwrap();
    StockService::new(&store)
        .set_quantity(key(JEANS, L), 8)
        .await
        .unwrap();
    add_to_cart(&store, CUSTOMER, key(TSHIRT, S), 2).await;
    add_to_cart(&store, CUSTOMER, key(JEANS, L), 1).await;
    let detail = OrderService::new(&store)
        .checkout(CUSTOMER, None)
        .await
        .unwrap();
    assert_eq!(detail.order.total_amount, Price::from_minor(50997));
    assert_eq!(level(&store, TSHIRT, S).await, 8);

    let order_id = detail.order.id;
    let reconcile = ReconcileService::new(&store);
    let edited = reconcile
        .update_line_quantity(&MAVI_OPERATOR, order_id, detail.lines[0].id, 1)
        .await
        .unwrap();
    assert_eq!(edited.order.total_amount, Price::from_minor(37998));
    assert_eq!(level(&store, TSHIRT, S).await, 9);

    let edited = reconcile
        .remove_line(&MAVI_OPERATOR, order_id, detail.lines[1].id)
        .await
        .unwrap();
    assert_eq!(edited.order.total_amount, Price::from_minor(12999));
    assert_eq!(level(&store, JEANS, L).await, 8);

    let order = LifecycleService::new(&store)
        .update_status(&MAVI_OPERATOR, order_id, OrderStatus::Cancelled)
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::Cancelled);
    assert_eq!(order.total_amount, Price::ZERO);
    assert_eq!(level(&store, TSHIRT, S).await, 10);

    let reloaded = OrderService::new(&store)
        .get(&MAVI_OPERATOR, order_id)
        .await
        .unwrap();
    assert!(reloaded.lines.is_empty());
    assert_eq!(reloaded.order.status, OrderStatus::Cancelled);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (PAZAR_TEST_DATABASE_URL)"]
async fn test_payment_flow_records_outcomes() {
    let (store, _serial) = pg_store().await;
    StockService::new(&store)
        .set_quantity(key(HOODIE, L), 12)
        .await
        .unwrap();
    add_to_cart(&store, CUSTOMER, key(HOODIE, L), 2).await;

    let payments = PaymentService::new(&store);
    let declined = payments.begin(CUSTOMER, None).await.unwrap();
    let result = payments
        .complete(CUSTOMER, declined.token, &card(FAILURE_CARD_NUMBER))
        .await
        .unwrap();
    assert!(!result.succeeded);
    assert_eq!(result.status, PaymentStatus::Failed);

    let receipt = payments.begin(CUSTOMER, None).await.unwrap();
    assert_eq!(receipt.amount, Price::from_minor(59998));
    let result = payments
        .complete(CUSTOMER, receipt.token, &card("5555555555554444"))
        .await
        .unwrap();
    assert!(result.succeeded);
    assert_eq!(level(&store, HOODIE, L).await, 10);

    let err = payments
        .complete(CUSTOMER, receipt.token, &card("5555555555554444"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Market(MarketError::PaymentAlreadyCompleted)
    ));

    let mut tx = store.begin().await.unwrap();
    let failed = tx.lock_payment(declined.token).await.unwrap().unwrap();
    assert_eq!(failed.status, PaymentStatus::Failed);
    assert_eq!(failed.failure_reason.as_deref(), Some("card declined"));
    let paid = tx.lock_payment(receipt.token).await.unwrap().unwrap();
    assert_eq!(paid.status, PaymentStatus::Succeeded);
    assert_eq!(paid.order_id, result.order_id);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (PAZAR_TEST_DATABASE_URL)"]
async fn test_one_cart_converts_once_under_concurrent_checkouts() {
    let (store, _serial) = pg_store().await;
    add_to_cart(&store, CUSTOMER, key(TSHIRT, M), 1).await;
    assert_eq!(level(&store, TSHIRT, M).await, 5);

    let blocker = hold_stock_row(&store, TSHIRT, M).await;
    let handles: Vec<_> = (0..2)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move { OrderService::new(&store).checkout(CUSTOMER, None).await })
        })
        .collect();
    let_tasks_queue().await;
    blocker.commit().await.unwrap();

    let mut succeeded = 0;
    let mut empty = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(detail) => {
                assert_eq!(detail.lines.len(), 1);
                succeeded += 1;
            }
            Err(ServiceError::Market(MarketError::EmptyCart)) => empty += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!((succeeded, empty), (1, 1));
    assert_eq!(level(&store, TSHIRT, M).await, 4);
    let orders = OrderService::new(&store)
        .list_for_customer(CUSTOMER)
        .await
        .unwrap();
    assert_eq!(orders.len(), 1);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (PAZAR_TEST_DATABASE_URL)"]
async fn test_two_payment_tokens_for_one_cart_create_one_order() {
    let (store, _serial) = pg_store().await;
    add_to_cart(&store, CUSTOMER, key(JEANS, M), 1).await;
    let payments = PaymentService::new(&store);
    let first = payments.begin(CUSTOMER, None).await.unwrap();
    let second = payments.begin(CUSTOMER, None).await.unwrap();

    let blocker = hold_stock_row(&store, JEANS, M).await;
    let handles: Vec<_> = [first.token, second.token]
        .into_iter()
        .map(|token| {
            let store = store.clone();
            tokio::spawn(async move {
                PaymentService::new(&store)
                    .complete(CUSTOMER, token, &card("4242424242424242"))
                    .await
            })
        })
        .collect();
    let_tasks_queue().await;
    blocker.commit().await.unwrap();

    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await.unwrap().unwrap());
    }
    assert_eq!(results.iter().filter(|r| r.succeeded).count(), 1);
    let declined = results.iter().find(|r| !r.succeeded).unwrap();
    assert_eq!(declined.status, PaymentStatus::Failed);
    assert!(declined.order_id.is_none());

    assert_eq!(level(&store, JEANS, M).await, 7);
    let orders = OrderService::new(&store)
        .list_for_customer(CUSTOMER)
        .await
        .unwrap();
    assert_eq!(orders.len(), 1);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (PAZAR_TEST_DATABASE_URL)"]
async fn test_concurrent_adds_keep_one_store_and_one_line() {
    let (store, _serial) = pg_store().await;

    let same_line: Vec<_> = (0..4)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move {
                CartService::new(&store)
                    .add_line(
                        CUSTOMER,
                        AddToCart {
                            key: key(TSHIRT, S),
                            quantity: 1,
                            confirm_replace: false,
                        },
                    )
                    .await
            })
        })
        .collect();
    for handle in same_line {
        handle.await.unwrap().unwrap();
    }
    let cart = CartService::new(&store).view(CUSTOMER).await.unwrap();
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].quantity, 4);

    let mixed: Vec<_> = (0..8)
        .map(|i| {
            let store = store.clone();
            let product = if i % 2 == 0 { HOODIE } else { LINEN_SHIRT };
            tokio::spawn(async move {
                CartService::new(&store)
                    .add_line(
                        OTHER_CUSTOMER,
                        AddToCart {
                            key: key(product, M),
                            quantity: 1,
                            confirm_replace: false,
                        },
                    )
                    .await
            })
        })
        .collect();
    let mut added = 0;
    for handle in mixed {
        match handle.await.unwrap() {
            Ok(_) => added += 1,
            Err(ServiceError::Market(MarketError::CrossStoreConflict { .. })) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(added, 4);
    let cart = CartService::new(&store).view(OTHER_CUSTOMER).await.unwrap();
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].quantity, 4);
    assert!(cart.store_id == Some(KOTON) || cart.store_id == Some(ZARA));
}
