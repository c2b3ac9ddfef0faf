//! Request handler definitions
//!
//! Define each route and its handler here. The handlers only translate between HTTP and the engine APIs; anything
//! longer than a few lines belongs in `order_engine`.
//!
//! Since each worker thread processes its requests sequentially, handlers must never block. Every I/O-bound step,
//! including the provider and email calls made while handling a webhook, is an awaited future or a spawned task.
use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use log::*;
use order_engine::{
    db_types::OrderId,
    traits::{FulfillmentProvider, Notifier, OrderManagement},
    OrderFlowApi,
    OrdersApi,
};
use tokio::time::{timeout_at, Instant};

use crate::{
    config::WebhookConfig,
    data_objects::{OrderList, OrderListParams, WebhookResponse},
    errors::ServerError,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

// ----------------------------------------------   Webhook  ----------------------------------------------------
route!(payment_webhook => Post "/payment" impl OrderManagement, FulfillmentProvider, Notifier);
/// Receives a payment event from the gateway.
///
/// The signature is checked against the raw body before anything is parsed. The response tells the gateway whether
/// to redeliver: 200 for every event that was recorded or can be ignored, 400 when the signature is bad (redelivering
/// would not help) and 500 when the event could not be recorded, or not within the webhook timeout.
///
/// Once an event is recorded a redelivery would only be acknowledged as a duplicate, so the work that follows
/// (fulfillment and notifications) runs as its own task. The response waits for it until the webhook timeout and
/// then answers 200 while the task carries on.
pub async fn payment_webhook<B, P, N>(
    req: HttpRequest,
    body: web::Bytes,
    config: web::Data<WebhookConfig>,
    api: web::Data<OrderFlowApi<B, P, N>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement + 'static,
    P: FulfillmentProvider + 'static,
    N: Notifier + 'static,
{
    trace!("🛍️ Received payment webhook ({} bytes)", body.len());
    let deadline = Instant::now() + config.timeout;
    let header = req.headers().get(config.signature_header.as_str()).and_then(|v| v.to_str().ok());
    let event = config.verifier().verify(body.as_ref(), header).map_err(|e| {
        warn!("🛍️ Rejecting payment webhook. {e}");
        ServerError::from(e)
    })?;
    info!("🛍️ Accepted payment event {} ({})", event.id, event.event_type);
    let event_id = event.id.clone();
    let accepted = timeout_at(deadline, api.accept_event(event)).await.map_err(|_| {
        error!("🛍️ Payment event {event_id} was not recorded within {:?}", config.timeout);
        ServerError::WebhookTimeout(config.timeout)
    })??;
    if let Some(follow_up) = accepted.follow_up {
        let flow = api.clone();
        let task = actix_web::rt::spawn(async move { flow.follow_up(follow_up).await });
        match timeout_at(deadline, task).await {
            Ok(Ok(())) => {},
            Ok(Err(e)) => error!("🛍️ Handling of payment event {event_id} was aborted after it was recorded. {e}"),
            Err(_) => warn!(
                "🛍️ Payment event {event_id} is recorded but still being handled after {:?}. It will finish in the \
                 background.",
                config.timeout
            ),
        }
    }
    debug!("🛍️ Payment event {event_id} handled: {}", accepted.outcome);
    Ok(HttpResponse::Ok().json(WebhookResponse::new(accepted.outcome)))
}

// ----------------------------------------------   Orders  ----------------------------------------------------
route!(orders => Get "/orders" impl OrderManagement);
pub async fn orders<B: OrderManagement>(
    api: web::Data<OrdersApi<B>>,
    params: web::Query<OrderListParams>,
) -> Result<HttpResponse, ServerError> {
    let page = params.pagination();
    trace!("💻️ Listing orders, page {} ({} per page)", page.page, page.per_page);
    let orders = api.list_orders(page).await?;
    Ok(HttpResponse::Ok().json(OrderList { page: page.page, per_page: page.per_page, orders }))
}

route!(order_by_id => Get "/orders/{order_id}" impl OrderManagement);
pub async fn order_by_id<B: OrderManagement>(
    api: web::Data<OrdersApi<B>>,
    path: web::Path<String>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId::from(path.into_inner());
    trace!("💻️ Fetching order {order_id}");
    let order = api
        .fetch_order(&order_id)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("Order {order_id} does not exist")))?;
    Ok(HttpResponse::Ok().json(order))
}
