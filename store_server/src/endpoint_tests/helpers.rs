use std::time::Duration;

use actix_web::{http::StatusCode, test, test::TestRequest, web, web::ServiceConfig, App};
use log::debug;
use order_engine::{
    catalog::{CatalogEntry, ProductCatalog},
    test_utils::{signed_header, RecordingNotifier, StubProvider},
    traits::{FulfillmentProvider, Notifier, OrderManagement},
    FulfillmentApi,
    NotificationApi,
    OrderFlowApi,
    OrdersApi,
};
use serde_json::{json, Value};
use store_common::Secret;

use crate::{
    config::WebhookConfig,
    middleware::ApiKeyMiddlewareFactory,
    routes::{OrderByIdRoute, OrdersRoute, PaymentWebhookRoute},
};

pub const SECRET: &str = "whsec_endpoint_tests";
pub const ADMIN_KEY: &str = "admin-key-for-tests";
pub const OPERATOR: &str = "ops@example.com";

pub fn catalog() -> ProductCatalog {
    ProductCatalog::new().with_entry("POSTER-A", CatalogEntry::new("4011").with_file("https://cdn.example.com/a.png"))
}

pub fn poster_purchase(event_id: &str) -> String {
    json!({
        "id": event_id,
        "type": "purchase.completed",
        "data": {
            "amount_total": 4900,
            "currency": "usd",
            "customer": { "email": "ada@example.com", "name": "Ada Lovelace" },
            "shipping": { "name": "Ada Lovelace", "line1": "12 Analytical Row", "city": "London", "country": "GB" },
            "items": [ { "sku": "POSTER-A", "qty": 1, "price": "49.00" } ]
        }
    })
    .to_string()
}

pub fn event(event_id: &str, event_type: &str, data: Value) -> String {
    json!({ "id": event_id, "type": event_type, "data": data }).to_string()
}

pub fn flow_api<B, P, N>(db: B, fulfillment_db: B, provider: P, notifier: N) -> OrderFlowApi<B, P, N> {
    let fulfillment =
        FulfillmentApi::new(fulfillment_db, provider, catalog()).with_provider_timeout(Duration::from_secs(5));
    let notifications = NotificationApi::new(notifier, OPERATOR).with_timeout(Duration::from_millis(500));
    OrderFlowApi::new(db, fulfillment, notifications)
}

type StubFlow<B> = OrderFlowApi<B, StubProvider, RecordingNotifier>;

pub fn stub_flow_api<B>(db: B, fulfillment_db: B) -> (StubFlow<B>, StubProvider, RecordingNotifier) {
    let provider = StubProvider::new();
    let notifier = RecordingNotifier::new();
    (flow_api(db, fulfillment_db, provider.clone(), notifier.clone()), provider, notifier)
}

pub fn configure_webhook<B, P, N>(api: OrderFlowApi<B, P, N>, config: WebhookConfig) -> impl FnOnce(&mut ServiceConfig)
where
    B: OrderManagement + 'static,
    P: FulfillmentProvider + 'static,
    N: Notifier + 'static,
{
    move |cfg| {
        cfg.app_data(web::Data::new(api))
            .app_data(web::Data::new(config))
            .service(web::scope("/webhooks").service(PaymentWebhookRoute::<B, P, N>::new()));
    }
}

pub fn configure_api<B: OrderManagement + 'static>(db: B) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        cfg.app_data(web::Data::new(OrdersApi::new(db))).service(
            web::scope("/api")
                .wrap(ApiKeyMiddlewareFactory::new(Secret::new(ADMIN_KEY.to_string())))
                .service(OrdersRoute::<B>::new())
                .service(OrderByIdRoute::<B>::new()),
        );
    }
}

/// A webhook request for `body`, signed with the test secret.
pub fn signed_webhook(body: &str) -> TestRequest {
    unsigned_webhook(body).insert_header(("X-Payment-Signature", signed_header(SECRET, body.as_bytes())))
}

pub fn unsigned_webhook(body: &str) -> TestRequest {
    TestRequest::post().uri("/webhooks/payment").set_payload(body.to_string())
}

/// Sends the request through a fresh app and returns the status and body. Errors raised by middleware are turned
/// into their responses, the way the server would send them.
pub async fn send(req: TestRequest, configure: impl FnOnce(&mut ServiceConfig)) -> (StatusCode, String) {
    let _ = env_logger::try_init().ok();
    let app = App::new().configure(configure);
    let service = test::init_service(app).await;
    debug!("Making request");
    match test::try_call_service(&service, req.to_request()).await {
        Ok(res) => {
            let status = res.status();
            let body = test::read_body(res).await;
            (status, String::from_utf8_lossy(&body).into_owned())
        },
        Err(e) => {
            let res = e.error_response();
            (res.status(), e.to_string())
        },
    }
}

pub fn json_body(body: &str) -> Value {
    serde_json::from_str(body).expect("response body should be JSON")
}
