use std::{net::IpAddr, time::Duration};

use actix_web::{
    dev::{Server, Service},
    http::KeepAlive,
    middleware::Logger,
    web,
    App,
    HttpServer,
};
use futures::future::{ok, Either};
use log::*;
use order_engine::{catalog::ProductCatalog, FulfillmentApi, NotificationApi, OrderFlowApi, OrdersApi, SqliteDatabase};

use crate::{
    config::ServerConfig,
    errors::ServerError,
    helpers::get_remote_ip,
    integrations::{email::EmailNotifier, pod::PodFulfillment},
    middleware::ApiKeyMiddlewareFactory,
    routes::{health, OrderByIdRoute, OrdersRoute, PaymentWebhookRoute},
};

type StoreFlowApi = OrderFlowApi<SqliteDatabase, PodFulfillment, EmailNotifier>;

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, config.db_max_connections)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.migrate().await.map_err(|e| ServerError::InitializeError(format!("Could not migrate the database. {e}")))?;
    let catalog = load_catalog(config.catalog_path.as_deref())?;
    let provider = PodFulfillment::new(config.pod.clone())?;
    let notifier = EmailNotifier::new(config.email.clone())?;
    if config.check_timeouts() {
        debug!(
            "🪛️ Fulfillment and notifications fit inside the webhook timeout of {}s",
            config.webhook.timeout.as_secs()
        );
    }
    let srv = create_server_instance(config, db, provider, notifier, catalog)?;
    srv.await.map_err(ServerError::from)
}

fn load_catalog(path: Option<&str>) -> Result<ProductCatalog, ServerError> {
    let catalog = match path {
        Some(path) => ProductCatalog::from_file(path)
            .map_err(|e| ServerError::ConfigurationError(format!("Could not load the product catalog {path}. {e}")))?,
        None => {
            warn!("🪛️ STORE_PRODUCT_CATALOG is not set. Physical orders cannot be fulfilled without a catalog.");
            ProductCatalog::new()
        },
    };
    if catalog.is_empty() {
        warn!("🪛️ The product catalog is empty. Every physical order will fail fulfillment.");
    } else {
        info!("🪛️ Loaded {} products into the catalog", catalog.len());
    }
    Ok(catalog)
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    provider: PodFulfillment,
    notifier: EmailNotifier,
    catalog: ProductCatalog,
) -> Result<Server, ServerError> {
    let srv = HttpServer::new(move || {
        let fulfillment = FulfillmentApi::new(db.clone(), provider.clone(), catalog.clone())
            .with_provider_timeout(config.pod.timeout);
        let notifications =
            NotificationApi::new(notifier.clone(), &config.operator_email).with_timeout(config.email.timeout);
        let flow_api: StoreFlowApi =
            OrderFlowApi::new(db.clone(), fulfillment, notifications).with_stale_after(config.webhook.timeout);
        let orders_api = OrdersApi::new(db.clone());
        let mut app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("store::access_log"))
            .app_data(web::Data::new(flow_api))
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(config.webhook.clone()))
            .service(health);
        let use_x_forwarded_for = config.use_x_forwarded_for;
        let use_forwarded = config.use_forwarded;
        let whitelist = config.webhook.whitelist.clone();
        let webhook_scope = web::scope("/webhooks")
            .wrap_fn(move |req, srv| {
                let peer_ip = get_remote_ip(req.request(), use_x_forwarded_for, use_forwarded);
                if is_whitelisted(peer_ip, whitelist.as_deref()) {
                    Either::Left(srv.call(req))
                } else {
                    let peer = peer_ip.map(|ip| ip.to_string()).unwrap_or_else(|| "an unknown address".into());
                    Either::Right(ok(req.error_response(ServerError::ForbiddenPeer(peer))))
                }
            })
            .service(PaymentWebhookRoute::<SqliteDatabase, PodFulfillment, EmailNotifier>::new());
        app = app.service(webhook_scope);
        if let Some(key) = &config.admin_api_key {
            let api_scope = web::scope("/api")
                .wrap(ApiKeyMiddlewareFactory::new(key.clone()))
                .service(OrdersRoute::<SqliteDatabase>::new())
                .service(OrderByIdRoute::<SqliteDatabase>::new());
            app = app.service(api_scope);
        }
        app
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}

fn is_whitelisted(peer_ip: Option<IpAddr>, whitelist: Option<&[IpAddr]>) -> bool {
    match (peer_ip, whitelist) {
        (_, None) => true,
        (Some(ip), Some(whitelist)) => {
            let allowed = whitelist.contains(&ip);
            if !allowed {
                warn!("🛍️ Webhook call from {ip} is not on the gateway whitelist. Denying access.");
            }
            allowed
        },
        (None, Some(_)) => {
            warn!("🛍️ No IP address found for the webhook caller. Denying access.");
            false
        },
    }
}
