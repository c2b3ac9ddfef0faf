use actix_web::{http::StatusCode, test::TestRequest};
use order_engine::{
    db_types::{EventId, NewOrder, OrderItem, OrderStatusType},
    test_utils::{prepare_test_env, random_db_path},
    traits::{OrderManagement, OrderStoreError},
    SqliteDatabase,
};
use store_common::MinorUnits;

use super::{
    helpers::{configure_api, json_body, send, ADMIN_KEY},
    mocks::MockOrderStore,
};
use crate::{middleware::API_KEY_HEADER, routes::health};

fn new_order(event_id: &str, total: i64) -> NewOrder {
    NewOrder {
        source_event_id: EventId::from(event_id),
        customer_email: "ada@example.com".into(),
        customer_name: "Ada Lovelace".into(),
        shipping_address: None,
        items: vec![OrderItem::new("POSTER-A", 1, MinorUnits::from(total))],
        total_amount: MinorUnits::from(total),
        currency: "usd".into(),
    }
}

async fn seeded_db() -> (SqliteDatabase, Vec<String>) {
    let db = prepare_test_env(&random_db_path()).await;
    let mut ids = Vec::new();
    for (i, total) in [4900, 1500, 2500].into_iter().enumerate() {
        let order = db.create_order_if_absent(new_order(&format!("evt_{i}"), total)).await.unwrap().into_order();
        ids.push(order.id.to_string());
    }
    (db, ids)
}

fn bearer() -> (&'static str, String) {
    ("Authorization", format!("Bearer {ADMIN_KEY}"))
}

#[actix_web::test]
async fn api_requires_a_key() {
    let (db, _) = seeded_db().await;
    let (status, _) = send(TestRequest::get().uri("/api/orders"), configure_api(db.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let req = TestRequest::get().uri("/api/orders").insert_header(("Authorization", "Bearer not-the-key"));
    let (status, body) = send(req, configure_api(db.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.contains("A valid API key is required"));

    let req = TestRequest::get().uri("/api/orders").insert_header((API_KEY_HEADER, "not-the-key"));
    let (status, _) = send(req, configure_api(db)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn list_orders_newest_first() {
    let (db, ids) = seeded_db().await;
    let req = TestRequest::get().uri("/api/orders").insert_header(bearer());
    let (status, body) = send(req, configure_api(db.clone())).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let body = json_body(&body);
    assert_eq!(body["page"], 1);
    assert_eq!(body["per_page"], 25);
    let listed = body["orders"].as_array().unwrap().iter().map(|o| o["order_id"].as_str().unwrap()).collect::<Vec<_>>();
    assert_eq!(listed, vec![ids[2].as_str(), ids[1].as_str(), ids[0].as_str()]);
    assert_eq!(body["orders"][0]["status"], "paid");

    let req = TestRequest::get().uri("/api/orders?page=2&per_page=2").insert_header((API_KEY_HEADER, ADMIN_KEY));
    let (status, body) = send(req, configure_api(db)).await;
    assert_eq!(status, StatusCode::OK);
    let body = json_body(&body);
    assert_eq!(body["orders"].as_array().unwrap().len(), 1);
    assert_eq!(body["orders"][0]["order_id"], ids[0].as_str());
}

#[actix_web::test]
async fn fetch_order_by_id() {
    let (db, ids) = seeded_db().await;
    let req = TestRequest::get().uri(&format!("/api/orders/{}", ids[0])).insert_header(bearer());
    let (status, body) = send(req, configure_api(db)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let order = json_body(&body);
    assert_eq!(order["id"], ids[0].as_str());
    assert_eq!(order["source_event_id"], "evt_0");
    assert_eq!(order["total_amount"], 4900);
    assert_eq!(order["total"], 49.0);
    assert_eq!(order["status"], OrderStatusType::Paid.as_str());
}

#[actix_web::test]
async fn unknown_orders_are_not_found() {
    let mut store = MockOrderStore::new();
    store.expect_fetch_order().returning(|_| Ok(None));
    let req = TestRequest::get().uri("/api/orders/ORD-nope").insert_header(bearer());
    let (status, body) = send(req, configure_api(store)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json_body(&body)["error"], "The data was not found. Order ORD-nope does not exist");
}

#[actix_web::test]
async fn store_errors_are_server_errors() {
    let mut store = MockOrderStore::new();
    store.expect_list_orders().returning(|_| Err(OrderStoreError::DatabaseError("disk I/O error".into())));
    let req = TestRequest::get().uri("/api/orders").insert_header(bearer());
    let (status, body) = send(req, configure_api(store)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(json_body(&body)["error"].as_str().unwrap().contains("disk I/O error"));
}

#[actix_web::test]
async fn health_check() {
    let (status, body) = send(TestRequest::get().uri("/health"), |cfg| {
        cfg.service(health);
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "👍️\n");
}
