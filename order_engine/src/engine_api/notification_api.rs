use std::{fmt::Debug, time::Duration};

use log::*;
use serde_json::{json, Value};

use crate::{
    db_types::{EventId, Order, OrderStatusType},
    payment_events::Purchase,
    traits::{NotificationError, NotificationTemplate, Notifier},
};

pub const DEFAULT_NOTIFICATION_TIMEOUT: Duration = Duration::from_secs(5);

/// Customer and operator notifications.
///
/// Every method here is best effort. Failures and timeouts are logged and reported through the `bool` return value,
/// but they never propagate, never change an order and never cause the gateway to redeliver an event.
pub struct NotificationApi<N> {
    notifier: N,
    operator_email: String,
    timeout: Duration,
}

impl<N> Debug for NotificationApi<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NotificationApi (operator: {}, timeout {:?})", self.operator_email, self.timeout)
    }
}

impl<N> NotificationApi<N> {
    pub fn new(notifier: N, operator_email: &str) -> Self {
        Self { notifier, operator_email: operator_email.to_string(), timeout: DEFAULT_NOTIFICATION_TIMEOUT }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl<N> NotificationApi<N>
where N: Notifier
{
    /// Sends the purchase confirmation. Customers get this whether or not fulfillment succeeded.
    pub async fn notify_customer(&self, order: &Order) -> bool {
        self.deliver(&order.customer_email, NotificationTemplate::OrderConfirmation, order_data(order)).await
    }

    /// Tells the operator about a new order, or about a failed fulfillment that needs follow-up.
    pub async fn notify_operator(&self, order: &Order) -> bool {
        let template = match order.status {
            OrderStatusType::FulfillmentFailed => NotificationTemplate::OperatorFulfillmentFailed,
            _ => NotificationTemplate::OperatorNewOrder,
        };
        self.deliver(&self.operator_email, template, order_data(order)).await
    }

    pub async fn send_receipt(&self, event_id: &EventId, purchase: &Purchase) -> bool {
        let data = json!({
            "event_id": event_id,
            "customer_name": purchase.customer.name,
            "customer_email": purchase.customer.email,
            "total": purchase.amount_total.format_major(&purchase.currency),
            "currency": purchase.currency,
            "items": purchase.items.iter().map(|item| json!({
                "product_ref": item.product_ref,
                "name": item.name,
                "quantity": item.quantity,
                "unit_price": item.unit_price.format_major(&purchase.currency),
            })).collect::<Vec<_>>(),
        });
        self.deliver(&purchase.customer.email, NotificationTemplate::DigitalReceipt, data).await
    }

    pub async fn alert_operator(&self, subject: &str, details: Value) -> bool {
        let data = json!({ "subject": subject, "details": details });
        self.deliver(&self.operator_email, NotificationTemplate::OperatorAlert, data).await
    }

    async fn deliver(&self, to: &str, template: NotificationTemplate, data: Value) -> bool {
        let result = match tokio::time::timeout(self.timeout, self.notifier.send(to, template, data)).await {
            Ok(result) => result,
            Err(_) => Err(NotificationError::Timeout),
        };
        match result {
            Ok(()) => {
                debug!("✉️ {template} sent to {to}");
                true
            },
            Err(e) => {
                warn!("✉️ Could not send {template} to {to}. {e}");
                false
            },
        }
    }
}

fn order_data(order: &Order) -> Value {
    json!({
        "order_id": order.id,
        "customer_name": order.customer_name,
        "customer_email": order.customer_email,
        "shipping_address": order.shipping_address,
        "items": order.items.iter().map(|item| json!({
            "product_ref": item.product_ref,
            "name": item.name,
            "quantity": item.quantity,
            "unit_price": item.unit_price.format_major(&order.currency),
        })).collect::<Vec<_>>(),
        "total": order.formatted_total(),
        "currency": order.currency,
        "status": order.status,
        "provider_order_id": order.fulfillment_provider_order_id,
        "fulfillment_note": order.fulfillment_note,
    })
}
