//! The JSON API driven through the router with `oneshot`.

#![allow(clippy::unwrap_used)]

use axum::http::{Method, StatusCode};
use serde_json::{Value, json};

use pazar_core::{Actor, UserId};
use pazar_integration_tests::TestApp;
use pazar_integration_tests::demo::*;
use pazar_integration_tests::key;

const BUYER: Actor = Actor::customer(CUSTOMER);
const OTHER_BUYER: Actor = Actor::customer(OTHER_CUSTOMER);
const MAVI_OPERATOR: Actor = Actor::operator(UserId::new(10), MAVI);
const ZARA_OPERATOR: Actor = Actor::operator(UserId::new(11), ZARA);
const ADMIN: Actor = Actor::admin(UserId::new(12));

fn line(product: pazar_core::ProductId, size: pazar_core::SizeId, quantity: u32) -> Value {
    json!({ "product_id": product, "size_id": size, "quantity": quantity })
}

async fn order_through_checkout(app: &TestApp) -> Value {
    let (status, _) = app
        .send(Method::POST, "/cart/lines", Some(&BUYER), Some(&line(TSHIRT, S, 2)))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = app
        .send(Method::POST, "/cart/lines", Some(&BUYER), Some(&line(JEANS, M, 1)))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app
        .send(Method::POST, "/checkout", Some(&BUYER), Some(&json!({})))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    body
}

#[tokio::test]
async fn test_health_endpoints() {
    let app = TestApp::new(false);

    let (status, body) = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("ok".to_owned()));

    let (status, _) = app.send(Method::GET, "/health/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_identity_headers_are_required() {
    let app = TestApp::new(false);

    let (status, body) = app.send(Method::GET, "/cart", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn test_cart_add_and_view() {
    let app = TestApp::new(false);

    let (status, body) = app
        .send(Method::POST, "/cart/lines", Some(&BUYER), Some(&line(TSHIRT, M, 1)))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["quantity"], 1);

    app.send(Method::POST, "/cart/lines", Some(&BUYER), Some(&line(JEANS, L, 1)))
        .await;
    let (status, body) = app.send(Method::GET, "/cart", Some(&BUYER), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["store_id"], 1);
    assert_eq!(body["items"].as_array().unwrap().len(), 2);
    assert_eq!(body["subtotal"], "379.98");
}

#[tokio::test]
async fn test_cross_store_add_is_a_conflict() {
    let app = TestApp::new(false);
    app.send(Method::POST, "/cart/lines", Some(&BUYER), Some(&line(HOODIE, M, 1)))
        .await;

    let (status, body) = app
        .send(
            Method::POST,
            "/cart/lines",
            Some(&BUYER),
            Some(&line(LINEN_SHIRT, M, 1)),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "cross_store_conflict");
    assert_eq!(body["existing_store"], 3);
    assert_eq!(body["new_store"], 2);

    let mut replace = line(LINEN_SHIRT, M, 1);
    replace["confirm_replace"] = json!(true);
    let (status, _) = app
        .send(Method::POST, "/cart/lines", Some(&BUYER), Some(&replace))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (_, cart) = app.send(Method::GET, "/cart", Some(&BUYER), None).await;
    assert_eq!(cart["store_id"], 2);
}

#[tokio::test]
async fn test_malformed_body_is_a_validation_error() {
    let app = TestApp::new(false);

    let (status, body) = app
        .send(
            Method::POST,
            "/cart/lines",
            Some(&BUYER),
            Some(&json!({ "product_id": "shirt" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation");

    let (status, body) = app.send(Method::GET, "/orders/abc", Some(&BUYER), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation");
}

#[tokio::test]
async fn test_checkout_requires_payment_when_enabled() {
    let app = TestApp::new(true);
    app.send(Method::POST, "/cart/lines", Some(&BUYER), Some(&line(TSHIRT, S, 1)))
        .await;

    let (status, body) = app
        .send(Method::POST, "/checkout", Some(&BUYER), Some(&json!({})))
        .await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(body["error"], "payment_required");
    assert_eq!(app.store.stock_level(key(TSHIRT, S)).await, 10);
}

#[tokio::test]
async fn test_payment_flow_creates_the_order() {
    let app = TestApp::new(true);
    app.send(Method::POST, "/cart/lines", Some(&BUYER), Some(&line(TSHIRT, S, 1)))
        .await;
    app.send(Method::POST, "/cart/lines", Some(&BUYER), Some(&line(JEANS, L, 1)))
        .await;

    let (status, receipt) = app
        .send(
            Method::POST,
            "/payments",
            Some(&BUYER),
            Some(&json!({ "delivery_address": "Moda Cd. 3, Kadikoy" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(receipt["amount"], "379.98");
    let token = receipt["token"].as_str().unwrap().to_owned();

    let card = json!({
        "card_number": "4242 4242 4242 4242",
        "expiry": "12/30",
        "cvv": "123",
        "holder": "Ayse Yilmaz",
    });
    let uri = format!("/payments/{token}/complete");
    let (status, result) = app
        .send(Method::POST, &uri, Some(&BUYER), Some(&card))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["succeeded"], true);
    assert_eq!(result["status"], "SUCCEEDED");
    let order_id = result["order_id"].as_i64().unwrap();

    let (status, detail) = app
        .send(Method::GET, &format!("/orders/{order_id}"), Some(&BUYER), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["order"]["total_amount"], "379.98");
    assert_eq!(detail["order"]["delivery_address"], "Moda Cd. 3, Kadikoy");
    assert_eq!(detail["order"]["status"], "PENDING");

    let (_, cart) = app.send(Method::GET, "/cart", Some(&BUYER), None).await;
    assert!(cart["items"].as_array().unwrap().is_empty());

    let (status, body) = app
        .send(Method::POST, &uri, Some(&BUYER), Some(&card))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "payment_already_completed");
}

#[tokio::test]
async fn test_declined_card_is_not_an_http_error() {
    let app = TestApp::new(true);
    app.send(Method::POST, "/cart/lines", Some(&BUYER), Some(&line(TSHIRT, S, 1)))
        .await;
    let (_, receipt) = app
        .send(Method::POST, "/payments", Some(&BUYER), Some(&json!({})))
        .await;
    let token = receipt["token"].as_str().unwrap();

    let (status, result) = app
        .send(
            Method::POST,
            &format!("/payments/{token}/complete"),
            Some(&BUYER),
            Some(&json!({ "card_number": "4000000000000002" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["succeeded"], false);
    assert_eq!(result["status"], "FAILED");
    assert!(result["order_id"].is_null());
    assert_eq!(app.store.stock_level(key(TSHIRT, S)).await, 10);
}

#[tokio::test]
async fn test_operator_moves_order_through_lifecycle() {
    let app = TestApp::new(false);
    let detail = order_through_checkout(&app).await;
    let order_id = detail["order"]["id"].as_i64().unwrap();
    let uri = format!("/orders/{order_id}/status");

    let (status, order) = app
        .send(
            Method::POST,
            &uri,
            Some(&MAVI_OPERATOR),
            Some(&json!({ "status": "SHIPPED" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["status"], "SHIPPED");

    let (status, body) = app
        .send(Method::POST, &uri, Some(&BUYER), Some(&json!({ "status": "DELIVERED" })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "unauthorized");

    let (status, _) = app
        .send(
            Method::POST,
            &uri,
            Some(&ZARA_OPERATOR),
            Some(&json!({ "status": "DELIVERED" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    app.send(
        Method::POST,
        &uri,
        Some(&MAVI_OPERATOR),
        Some(&json!({ "status": "DELIVERED" })),
    )
    .await;
    let (status, body) = app
        .send(
            Method::POST,
            &uri,
            Some(&MAVI_OPERATOR),
            Some(&json!({ "status": "CANCELLED" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "invalid_transition");
    assert_eq!(body["from"], "DELIVERED");
    assert_eq!(body["to"], "CANCELLED");
}

#[tokio::test]
async fn test_operator_edits_order_lines() {
    let app = TestApp::new(false);
    let detail = order_through_checkout(&app).await;
    let order_id = detail["order"]["id"].as_i64().unwrap();
    let tshirt_line = detail["lines"][0]["id"].as_i64().unwrap();
    assert_eq!(app.store.stock_level(key(TSHIRT, S)).await, 8);

    let (status, edited) = app
        .send(
            Method::PATCH,
            &format!("/orders/{order_id}/lines/{tshirt_line}"),
            Some(&MAVI_OPERATOR),
            Some(&json!({ "quantity": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(edited["order"]["total_amount"], "379.98");
    assert_eq!(app.store.stock_level(key(TSHIRT, S)).await, 9);

    let (status, edited) = app
        .send(
            Method::DELETE,
            &format!("/orders/{order_id}/lines/{tshirt_line}"),
            Some(&MAVI_OPERATOR),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(edited["order"]["total_amount"], "249.99");
    assert_eq!(edited["lines"].as_array().unwrap().len(), 1);
    assert_eq!(app.store.stock_level(key(TSHIRT, S)).await, 10);
}

#[tokio::test]
async fn test_order_visibility() {
    let app = TestApp::new(false);
    let detail = order_through_checkout(&app).await;
    let order_id = detail["order"]["id"].as_i64().unwrap();
    let uri = format!("/orders/{order_id}");

    let (status, _) = app.send(Method::GET, &uri, Some(&MAVI_OPERATOR), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.send(Method::GET, &uri, Some(&OTHER_BUYER), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.send(Method::GET, "/orders/9999", Some(&BUYER), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["entity"], "order");

    let (status, orders) = app.send(Method::GET, "/orders", Some(&BUYER), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(orders.as_array().unwrap().len(), 1);

    let (status, orders) = app
        .send(Method::GET, "/stores/1/orders", Some(&MAVI_OPERATOR), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(orders.as_array().unwrap().len(), 1);

    let (status, _) = app
        .send(Method::GET, "/stores/1/orders", Some(&ZARA_OPERATOR), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_stock_administration() {
    let app = TestApp::new(false);

    let (status, level) = app.send(Method::GET, "/stock/2/2", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(level["quantity"], 8);

    let (status, _) = app
        .send(
            Method::PUT,
            "/admin/stock/2/2",
            Some(&ZARA_OPERATOR),
            Some(&json!({ "quantity": 40 })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, level) = app
        .send(
            Method::PUT,
            "/admin/stock/2/2",
            Some(&MAVI_OPERATOR),
            Some(&json!({ "quantity": 25 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(level["quantity"], 25);
    assert_eq!(app.store.stock_level(key(JEANS, M)).await, 25);

    let (status, level) = app
        .send(
            Method::PUT,
            "/admin/stock/2/2",
            Some(&ADMIN),
            Some(&json!({ "quantity": 40 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(level["quantity"], 40);
    assert_eq!(app.store.stock_level(key(JEANS, M)).await, 40);

    let (status, body) = app
        .send(
            Method::PUT,
            "/admin/stock/999/1",
            Some(&ADMIN),
            Some(&json!({ "quantity": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["entity"], "product");
}

#[tokio::test]
async fn test_admin_refunds_payment() {
    let app = TestApp::new(true);
    app.send(Method::POST, "/cart/lines", Some(&BUYER), Some(&line(TSHIRT, S, 1)))
        .await;
    let (_, receipt) = app
        .send(Method::POST, "/payments", Some(&BUYER), Some(&json!({})))
        .await;
    let token = receipt["token"].as_str().unwrap().to_owned();
    app.send(
        Method::POST,
        &format!("/payments/{token}/complete"),
        Some(&BUYER),
        Some(&json!({ "card_number": "4242424242424242" })),
    )
    .await;

    let refund = format!("/admin/payments/{token}/refund");
    let (status, _) = app.send(Method::POST, &refund, Some(&BUYER), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, payment) = app.send(Method::POST, &refund, Some(&ADMIN), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(payment["status"], "REFUNDED");

    let (status, body) = app
        .send(
            Method::POST,
            &format!("/admin/payments/{token}/cancel"),
            Some(&ADMIN),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "invalid_payment_transition");
}
