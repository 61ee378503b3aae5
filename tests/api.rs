use std::sync::Arc;

use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::{Value, json};
use shop_backend::{app_state::AppState, db::MemoryStore, routes};

fn server() -> TestServer {
    let app = routes::app(AppState::new(Arc::new(MemoryStore::new())));
    TestServer::new(app).unwrap()
}

async fn signup(server: &TestServer, email: &str) -> i64 {
    let res = server
        .post("/api/auth/signup")
        .json(&json!({ "email": email, "password": "hunter22" }))
        .await;
    res.assert_status_ok();
    res.json::<Value>()["data"]["id"].as_i64().unwrap()
}

async fn create_product(server: &TestServer, name: &str, price: &str) -> i64 {
    let res = server
        .post("/api/products")
        .json(&json!({ "name": name, "category": "tools", "price": price }))
        .await;
    res.assert_status_ok();
    res.json::<Value>()["data"]["id"].as_i64().unwrap()
}

async fn add_to_cart(server: &TestServer, user_id: i64, product_id: i64, quantity: i32) {
    server
        .post("/api/cart/add")
        .json(&json!({ "userId": user_id, "productId": product_id, "quantity": quantity }))
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn signup_hides_the_password_hash() {
    let server = server();
    let res = server
        .post("/api/auth/signup")
        .json(&json!({ "email": "Ann@Example.com", "password": "hunter22" }))
        .await;

    res.assert_status_ok();
    let body = res.json::<Value>();
    assert_eq!(body["data"]["email"], "ann@example.com");
    assert!(body["data"].get("passwordHash").is_none());
    assert!(body["data"].get("password_hash").is_none());
}

#[tokio::test]
async fn duplicate_signup_is_a_conflict() {
    let server = server();
    signup(&server, "ann@example.com").await;

    let res = server
        .post("/api/auth/signup")
        .json(&json!({ "email": "ann@example.com", "password": "other" }))
        .await;
    res.assert_status(StatusCode::CONFLICT);
    assert_eq!(res.json::<Value>()["kind"], "CONFLICT");
}

#[tokio::test]
async fn login_outcomes() {
    let server = server();
    let user_id = signup(&server, "ann@example.com").await;

    let res = server
        .post("/api/auth/login")
        .json(&json!({ "email": "ann@example.com", "password": "hunter22" }))
        .await;
    res.assert_status_ok();
    assert_eq!(res.json::<Value>()["data"]["id"], user_id);

    server
        .post("/api/auth/login")
        .json(&json!({ "email": "ann@example.com", "password": "wrong" }))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    server
        .post("/api/auth/login")
        .json(&json!({ "email": "bob@example.com", "password": "hunter22" }))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn get_user_by_id() {
    let server = server();
    let user_id = signup(&server, "ann@example.com").await;

    let res = server.get(&format!("/api/users/{user_id}")).await;
    res.assert_status_ok();
    assert_eq!(res.json::<Value>()["data"]["email"], "ann@example.com");

    server
        .get("/api/users/999")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn checkout_moves_the_cart_into_an_order() {
    let server = server();
    let user_id = signup(&server, "ann@example.com").await;
    let hammer = create_product(&server, "Hammer", "10.00").await;
    let nails = create_product(&server, "Nails", "5.00").await;

    add_to_cart(&server, user_id, hammer, 2).await;
    add_to_cart(&server, user_id, nails, 1).await;

    let total = server.get(&format!("/api/cart/{user_id}/total")).await;
    total.assert_status_ok();
    assert_eq!(total.json::<Value>()["data"]["total"], "25.00");

    let placed = server
        .post("/api/orders/place")
        .json(&json!({ "userId": user_id }))
        .await;
    placed.assert_status_ok();
    let placed = placed.json::<Value>();
    assert_eq!(placed["data"]["order"]["totalAmount"], "25.00");
    assert_eq!(placed["data"]["items"].as_array().unwrap().len(), 2);

    let cart = server.get(&format!("/api/cart/{user_id}")).await;
    assert!(cart.json::<Value>()["data"].as_array().unwrap().is_empty());

    let orders = server.get(&format!("/api/orders/{user_id}")).await;
    orders.assert_status_ok();
    assert_eq!(orders.json::<Value>()["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn empty_cart_cannot_be_checked_out() {
    let server = server();
    let user_id = signup(&server, "ann@example.com").await;

    let res = server
        .post("/api/orders/place")
        .json(&json!({ "userId": user_id }))
        .await;
    res.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(res.json::<Value>()["kind"], "INVALID_STATE");
}

#[tokio::test]
async fn adding_unknown_product_is_not_found() {
    let server = server();
    let user_id = signup(&server, "ann@example.com").await;

    server
        .post("/api/cart/add")
        .json(&json!({ "userId": user_id, "productId": 42, "quantity": 1 }))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn removing_absent_item_succeeds() {
    let server = server();
    server.delete("/api/cart/remove/77").await.assert_status_ok();
}

#[tokio::test]
async fn products_filter_by_category() {
    let server = server();
    create_product(&server, "Hammer", "10.00").await;
    server
        .post("/api/products")
        .json(&json!({ "name": "Apple", "category": "food", "price": "0.50" }))
        .await
        .assert_status_ok();

    let res = server
        .get("/api/products")
        .add_query_param("category", "food")
        .await;
    let data = res.json::<Value>()["data"].clone();
    assert_eq!(data.as_array().unwrap().len(), 1);
    assert_eq!(data[0]["name"], "Apple");

    let res = server.get("/api/products/category/tools").await;
    assert_eq!(res.json::<Value>()["data"][0]["name"], "Hammer");
}

#[tokio::test]
async fn negative_price_is_a_bad_request() {
    let server = server();
    let res = server
        .post("/api/products")
        .json(&json!({ "name": "Broken", "price": "-1.00" }))
        .await;
    res.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(res.json::<Value>()["kind"], "BAD_REQUEST");
}

#[tokio::test]
async fn serves_openapi_document() {
    let server = server();
    let res = server.get("/api-docs/openapi.json").await;
    res.assert_status_ok();
    assert!(res.json::<Value>()["paths"].get("/api/orders/place").is_some());
}

#[tokio::test]
async fn numeric_prices_are_rounded_to_cents() {
    let server = server();
    let user_id = signup(&server, "ann@example.com").await;

    let res = server
        .post("/api/products")
        .json(&json!({ "name": "Tape", "price": 10.1 }))
        .await;
    res.assert_status_ok();
    let product = res.json::<Value>()["data"].clone();
    assert_eq!(product["price"], "10.10");

    let res = server
        .post("/api/products")
        .json(&json!({ "name": "Glue", "price": "10.005" }))
        .await;
    assert_eq!(res.json::<Value>()["data"]["price"], "10.01");

    add_to_cart(&server, user_id, product["id"].as_i64().unwrap(), 3).await;
    let total = server.get(&format!("/api/cart/{user_id}/total")).await;
    assert_eq!(total.json::<Value>()["data"]["total"], "30.30");
}

#[tokio::test]
async fn amounts_beyond_column_range_are_client_errors() {
    let server = server();
    let user_id = signup(&server, "ann@example.com").await;

    let res = server
        .post("/api/products")
        .json(&json!({ "name": "Yacht", "price": "99999999999999999999.99" }))
        .await;
    res.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(res.json::<Value>()["kind"], "BAD_REQUEST");

    let pricey = create_product(&server, "Island", "9999999999.99").await;
    add_to_cart(&server, user_id, pricey, i32::MAX).await;

    let res = server
        .post("/api/orders/place")
        .json(&json!({ "userId": user_id }))
        .await;
    res.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(res.json::<Value>()["kind"], "INVALID_STATE");
}

#[tokio::test]
async fn malformed_requests_get_the_error_body() {
    let server = server();

    let res = server
        .post("/api/cart/add")
        .json(&json!({ "userId": 1, "productId": 1, "quantity": "two" }))
        .await;
    res.assert_status(StatusCode::BAD_REQUEST);
    let body = res.json::<Value>();
    assert_eq!(body["kind"], "BAD_REQUEST");
    assert!(body["message"].as_str().unwrap().contains("quantity"));

    let res = server.get("/api/cart/abc").await;
    res.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(res.json::<Value>()["kind"], "BAD_REQUEST");

    let res = server
        .post("/api/auth/login")
        .text("not json")
        .await;
    res.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(res.json::<Value>()["kind"], "BAD_REQUEST");
}

#[tokio::test]
async fn login_with_unregistered_odd_email_is_not_found() {
    let server = server();

    let res = server
        .post("/api/auth/login")
        .json(&json!({ "email": "no-at-sign", "password": "x" }))
        .await;
    res.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(res.json::<Value>()["kind"], "NOT_FOUND");
}
