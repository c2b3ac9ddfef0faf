use std::time::Duration;

use actix_web::http::StatusCode;
use order_engine::{
    db_types::{EventId, OrderStatusType},
    test_utils::{prepare_test_env, random_db_path, signed_header, RecordingNotifier, StubProvider},
    traits::{NotificationTemplate, OrderManagement, OrderStoreError},
};
use serde_json::json;

use super::{
    helpers::{
        configure_webhook,
        event,
        flow_api,
        json_body,
        poster_purchase,
        send,
        signed_webhook,
        stub_flow_api,
        unsigned_webhook,
        SECRET,
    },
    mocks::{MockOrderStore, SlowStore},
};
use crate::config::WebhookConfig;

fn webhook_config() -> WebhookConfig {
    WebhookConfig::new(SECRET)
}

#[actix_web::test]
async fn signed_purchase_is_fulfilled() {
    let db = prepare_test_env(&random_db_path()).await;
    let (api, provider, notifier) = stub_flow_api(db.clone(), db.clone());
    let body = poster_purchase("evt_1");
    let (status, res) = send(signed_webhook(&body), configure_webhook(api, webhook_config())).await;
    assert_eq!(status, StatusCode::OK, "{res}");
    assert_eq!(json_body(&res), json!({ "received": true, "outcome": "order_created" }));

    let order = db.fetch_order_by_source_event(&EventId::from("evt_1")).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatusType::FulfillmentConfirmed);
    assert_eq!(order.fulfillment_provider_order_id.as_deref(), Some("pod_1"));
    assert_eq!(order.formatted_total(), "49.00");
    assert_eq!(provider.created(), vec![order.id.to_string()]);
    assert_eq!(notifier.sent_templates(), vec![
        NotificationTemplate::OrderConfirmation,
        NotificationTemplate::OperatorNewOrder
    ]);
}

#[actix_web::test]
async fn redelivered_purchase_is_acknowledged_once() {
    let db = prepare_test_env(&random_db_path()).await;
    let (api, provider, _) = stub_flow_api(db.clone(), db.clone());
    let body = poster_purchase("evt_2");
    let (status, _) = send(signed_webhook(&body), configure_webhook(api, webhook_config())).await;
    assert_eq!(status, StatusCode::OK);

    let api = flow_api(db.clone(), db.clone(), provider.clone(), RecordingNotifier::new());
    let (status, res) = send(signed_webhook(&body), configure_webhook(api, webhook_config())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&res)["outcome"], "duplicate_order");
    assert_eq!(provider.created().len(), 1);
}

#[actix_web::test]
async fn bad_signatures_are_rejected() {
    let db = prepare_test_env(&random_db_path()).await;
    let body = poster_purchase("evt_3");

    let (api, provider, notifier) = stub_flow_api(db.clone(), db.clone());
    let req = unsigned_webhook(&body).insert_header(("X-Payment-Signature", signed_header("wrong", body.as_bytes())));
    let (status, res) = send(req, configure_webhook(api, webhook_config())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json_body(&res)["error"].as_str().unwrap().starts_with("Payment event rejected."));

    let (api, _, _) = stub_flow_api(db.clone(), db.clone());
    let (status, _) = send(unsigned_webhook(&body), configure_webhook(api, webhook_config())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // A signature over one body does not vouch for another
    let (api, _, _) = stub_flow_api(db.clone(), db.clone());
    let tampered = body.replace("4900", "100");
    let req = unsigned_webhook(&tampered).insert_header(("X-Payment-Signature", signed_header(SECRET, body.as_bytes())));
    let (status, _) = send(req, configure_webhook(api, webhook_config())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert!(db.fetch_order_by_source_event(&EventId::from("evt_3")).await.unwrap().is_none());
    assert!(provider.created().is_empty());
    assert!(notifier.sent().is_empty());
}

#[actix_web::test]
async fn custom_signature_header() {
    let db = prepare_test_env(&random_db_path()).await;
    let (api, _, _) = stub_flow_api(db.clone(), db.clone());
    let body = event("evt_4", "payment.succeeded", json!({}));
    let config = WebhookConfig { signature_header: "Gateway-Signature".into(), ..webhook_config() };
    let req = unsigned_webhook(&body).insert_header(("Gateway-Signature", signed_header(SECRET, body.as_bytes())));
    let (status, res) = send(req, configure_webhook(api, config)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&res)["outcome"], "acknowledged");
}

#[actix_web::test]
async fn store_failure_asks_for_redelivery() {
    let mut store = MockOrderStore::new();
    store
        .expect_create_order_if_absent()
        .returning(|_| Err(OrderStoreError::DatabaseError("database is locked".into())));
    let provider = StubProvider::new();
    let notifier = RecordingNotifier::new();
    let api = flow_api(store, MockOrderStore::new(), provider.clone(), notifier.clone());
    let body = poster_purchase("evt_5");
    let (status, res) = send(signed_webhook(&body), configure_webhook(api, webhook_config())).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(json_body(&res)["error"].as_str().unwrap().contains("database is locked"));
    assert!(provider.created().is_empty());
    assert!(notifier.sent().is_empty());
}

#[actix_web::test]
async fn unknown_event_types_are_ignored() {
    // The store has no expectations, so any call to it would panic
    let api = flow_api(MockOrderStore::new(), MockOrderStore::new(), StubProvider::new(), RecordingNotifier::new());
    let body = event("evt_6", "customer.updated", json!({ "email": "ada@example.com" }));
    let (status, res) = send(signed_webhook(&body), configure_webhook(api, webhook_config())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&res)["outcome"], "ignored");
}

#[actix_web::test]
async fn intangible_purchases_get_a_receipt() {
    let db = prepare_test_env(&random_db_path()).await;
    let (api, provider, notifier) = stub_flow_api(db.clone(), db.clone());
    let body = event(
        "evt_7",
        "purchase.completed",
        json!({
            "purchase_kind": "intangible",
            "amount_total": 1500,
            "currency": "usd",
            "customer": { "email": "ada@example.com" },
            "items": [ { "sku": "EBOOK-1", "qty": 1, "price": "15.00" } ]
        }),
    );
    let (status, res) = send(signed_webhook(&body), configure_webhook(api, webhook_config())).await;
    assert_eq!(status, StatusCode::OK, "{res}");
    assert_eq!(json_body(&res)["outcome"], "receipt_sent");
    assert!(provider.created().is_empty());
    assert_eq!(notifier.sent_templates(), vec![NotificationTemplate::DigitalReceipt]);
    assert!(db.fetch_order_by_source_event(&EventId::from("evt_7")).await.unwrap().is_none());
}

#[actix_web::test]
async fn slow_fulfillment_finishes_after_the_response() {
    let db = prepare_test_env(&random_db_path()).await;
    let provider = StubProvider::new().stalling(Duration::from_secs(1));
    let notifier = RecordingNotifier::new();
    let api = flow_api(db.clone(), db.clone(), provider.clone(), notifier.clone());
    let config = webhook_config().with_timeout(Duration::from_millis(300));
    let body = poster_purchase("evt_8");
    let (status, res) = send(signed_webhook(&body), configure_webhook(api, config.clone())).await;
    assert_eq!(status, StatusCode::OK, "{res}");
    assert_eq!(json_body(&res)["outcome"], "order_created");
    let order = db.fetch_order_by_source_event(&EventId::from("evt_8")).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatusType::FulfillmentPending);
    assert!(notifier.sent().is_empty());

    // The provider answers each call after a second. The order must still be fulfilled and everyone notified.
    tokio::time::sleep(Duration::from_secs(3)).await;
    let order = db.fetch_order_by_source_event(&EventId::from("evt_8")).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatusType::FulfillmentConfirmed);
    assert_eq!(provider.created(), vec![order.id.to_string()]);
    assert_eq!(notifier.sent_templates(), vec![
        NotificationTemplate::OrderConfirmation,
        NotificationTemplate::OperatorNewOrder
    ]);

    let api = flow_api(db.clone(), db.clone(), StubProvider::new(), RecordingNotifier::new());
    let (status, res) = send(signed_webhook(&body), configure_webhook(api, config)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&res)["outcome"], "duplicate_order");
}

#[actix_web::test]
async fn slow_store_asks_for_redelivery() {
    let db = prepare_test_env(&random_db_path()).await;
    let store = SlowStore::new(db.clone(), Duration::from_secs(2));
    let provider = StubProvider::new();
    let api = flow_api(store.clone(), store, provider.clone(), RecordingNotifier::new());
    let config = webhook_config().with_timeout(Duration::from_millis(300));
    let body = poster_purchase("evt_9");
    let (status, res) = send(signed_webhook(&body), configure_webhook(api, config)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(json_body(&res)["error"].as_str().unwrap().contains("not handled within 300ms"));
    assert!(db.fetch_order_by_source_event(&EventId::from("evt_9")).await.unwrap().is_none());
    assert!(provider.created().is_empty());
}
