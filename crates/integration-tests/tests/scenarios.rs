//! Marketplace stories run end to end against the in-memory engine.

#![allow(clippy::unwrap_used)]

use pazar_core::payment::FAILURE_CARD_NUMBER;
use pazar_core::{Actor, MarketError, OrderStatus, PaymentStatus, Price, UserId};
use pazar_integration_tests::demo::*;
use pazar_integration_tests::{add_to_cart, key};
use pazar_storefront::db::MemoryMarketStore;
use pazar_storefront::models::CardDetails;
use pazar_storefront::services::cart::AddToCart;
use pazar_storefront::services::{
    CartService, OrderService, PaymentService, ReconcileService, ServiceError,
};

const MAVI_OPERATOR: Actor = Actor::operator(UserId::new(10), MAVI);

fn card(number: &str, expiry: &str, cvv: &str, holder: &str) -> CardDetails {
    CardDetails {
        card_number: number.to_owned(),
        expiry: expiry.to_owned(),
        cvv: cvv.to_owned(),
        holder: holder.to_owned(),
    }
}

#[tokio::test]
async fn test_concurrent_checkouts_cannot_oversell() {
    let store = MemoryMarketStore::with_demo_catalog();
    assert_eq!(store.stock_level(key(TSHIRT, M)).await, 5);
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
    let mut refused = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(ServiceError::Market(MarketError::InsufficientStock {
                requested: 3,
                available: 2,
                ..
            })) => refused += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!((succeeded, refused), (1, 1));
    assert_eq!(store.stock_level(key(TSHIRT, M)).await, 2);
}

#[tokio::test]
async fn test_two_line_mavi_checkout() {
    let store = MemoryMarketStore::with_demo_catalog();
    add_to_cart(&store, CUSTOMER, key(TSHIRT, M), 1).await;
    add_to_cart(&store, CUSTOMER, key(JEANS, L), 1).await;
    assert_eq!(
        CartService::new(&store).view(CUSTOMER).await.unwrap().subtotal,
        Price::from_minor(37998)
    );

    let detail = OrderService::new(&store)
        .checkout(CUSTOMER, None)
        .await
        .unwrap();

    assert_eq!(detail.order.total_amount.to_string(), "379.98");
    assert_eq!(detail.order.store_id, MAVI);
    assert_eq!(store.stock_level(key(TSHIRT, M)).await, 4);
    assert_eq!(store.stock_level(key(JEANS, L)).await, 7);
    assert!(CartService::new(&store).view(CUSTOMER).await.unwrap().items.is_empty());
}

#[tokio::test]
async fn test_removing_line_b_restores_it_and_reprices() {
    let store = MemoryMarketStore::with_demo_catalog();
    add_to_cart(&store, CUSTOMER, key(TSHIRT, S), 2).await;
    add_to_cart(&store, CUSTOMER, key(JEANS, M), 1).await;
    let detail = OrderService::new(&store)
        .checkout(CUSTOMER, None)
        .await
        .unwrap();
    let line_b = detail.lines.iter().find(|l| l.product_id == JEANS).unwrap();
    assert_eq!(store.stock_level(key(JEANS, M)).await, 7);

    let edited = ReconcileService::new(&store)
        .remove_line(&MAVI_OPERATOR, detail.order.id, line_b.id)
        .await
        .unwrap();

    assert_eq!(store.stock_level(key(JEANS, M)).await, 8);
    assert_eq!(edited.order.total_amount, Price::from_minor(25998));
    assert_eq!(edited.order.status, OrderStatus::Pending);
}

#[tokio::test]
async fn test_removing_only_line_cancels_order() {
    let store = MemoryMarketStore::with_demo_catalog();
    add_to_cart(&store, CUSTOMER, key(JEANS, S), 2).await;
    let detail = OrderService::new(&store)
        .checkout(CUSTOMER, None)
        .await
        .unwrap();

    let edited = ReconcileService::new(&store)
        .remove_line(&MAVI_OPERATOR, detail.order.id, detail.lines[0].id)
        .await
        .unwrap();

    assert_eq!(edited.order.status, OrderStatus::Cancelled);
    assert_eq!(edited.order.total_amount, Price::ZERO);
    assert_eq!(store.stock_level(key(JEANS, S)).await, 8);
}

#[tokio::test]
async fn test_failure_card_always_fails() {
    let store = MemoryMarketStore::with_demo_catalog();
    let payments = PaymentService::new(&store);
    add_to_cart(&store, CUSTOMER, key(TSHIRT, L), 1).await;

    let variants = [
        card(FAILURE_CARD_NUMBER, "12/30", "123", "Ayse Yilmaz"),
        card("4000 0000 0000 0002", "", "", ""),
        card("4000-0000-0000-0002", "01/99", "9999", "Mehmet Demir"),
    ];
    for details in &variants {
        let receipt = payments.begin(CUSTOMER, None).await.unwrap();
        let result = payments
            .complete(CUSTOMER, receipt.token, details)
            .await
            .unwrap();
        assert!(!result.succeeded);
        assert_eq!(result.status, PaymentStatus::Failed);
    }

    assert_eq!(store.stock_level(key(TSHIRT, L)).await, 10);
    assert!(OrderService::new(&store).list_for_customer(CUSTOMER).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_zara_into_koton_cart_conflicts() {
    let store = MemoryMarketStore::with_demo_catalog();
    let carts = CartService::new(&store);
    add_to_cart(&store, CUSTOMER, key(HOODIE, M), 1).await;
    let before = carts.view(CUSTOMER).await.unwrap();

    let err = carts
        .add_line(
            CUSTOMER,
            AddToCart {
                key: key(LINEN_SHIRT, M),
                quantity: 1,
                confirm_replace: false,
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ServiceError::Market(MarketError::CrossStoreConflict { existing_store, new_store })
            if existing_store == KOTON && new_store == ZARA
    ));
    assert_eq!(carts.view(CUSTOMER).await.unwrap(), before);
}
