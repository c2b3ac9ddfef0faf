//! # Backend contracts
//!
//! The engine drives three external collaborators, each behind a trait so that they can be swapped or stubbed:
//!
//! * [`OrderManagement`] is the durable, idempotent order store. It is the only shared mutable state in the pipeline.
//! * [`FulfillmentProvider`] is the print-on-demand service that manufactures and ships physical goods.
//! * [`Notifier`] delivers templated emails to customers and the operator.
mod fulfillment_provider;
mod notifier;
mod order_management;

pub use fulfillment_provider::{FulfillmentProvider, ProviderError, ProviderLineItem, ProviderOrderId, Recipient};
pub use notifier::{NotificationError, NotificationTemplate, Notifier};
pub use order_management::{InsertOrderResult, OrderManagement, OrderStoreError};
