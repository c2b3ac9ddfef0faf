//! Order Engine
//!
//! The order engine holds the domain logic of the storefront payment pipeline. It takes verified payment events from
//! the payment gateway, records orders exactly once, drives the print-on-demand provider through its two-phase order
//! lifecycle and sends best-effort notifications. It knows nothing about HTTP.
//!
//! The library is divided into these sections:
//! 1. Data types ([`mod@db_types`] and [`mod@payment_events`]) shared by every layer.
//! 2. The backend contracts in [`mod@traits`]: [`OrderManagement`] for durable storage, [`FulfillmentProvider`] for the
//!    print-on-demand service and [`Notifier`] for the email service. Concrete bindings for the last two live in the
//!    server crate. The storage contract is implemented by [`SqliteDatabase`].
//! 3. The engine API structs, which compose the traits into the pipeline:
//!    * [`OrderFlowApi`] dispatches a verified event to the right handler and is the only thing the webhook calls.
//!    * [`FulfillmentApi`] turns a paid order into a confirmed (or failed) provider order.
//!    * [`NotificationApi`] sends customer and operator emails without ever failing the pipeline.
//!    * [`OrdersApi`] is a read-only view used by the admin endpoints.
//!
//! Failure tiers are strict. A storage failure while recording an order is returned to the caller as
//! [`OrderFlowError::PersistenceFailure`]. Fulfillment failures are recorded on the order. Notification failures are
//! only logged.
pub mod catalog;
pub mod db_types;
pub mod helpers;
pub mod payment_events;
pub mod traits;

mod engine_api;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use engine_api::{
    errors::{FulfillmentError, FulfillmentErrorKind, FulfillmentStep, OrderFlowError, TranslationError},
    fulfillment_api::{translate_items, translate_recipient, FulfillmentApi},
    notification_api::NotificationApi,
    order_flow_api::{AcceptedEvent, EventOutcome, FollowUp, OrderFlowApi, DEFAULT_STALE_ORDER_AGE},
    order_objects,
    orders_api::OrdersApi,
};
pub use helpers::signature::{SignatureError, SignatureVerifier};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use traits::{FulfillmentProvider, InsertOrderResult, Notifier, OrderManagement, OrderStoreError};
