use std::fmt::Display;

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationTemplate {
    /// Sent to the customer for every new physical order, whatever the fulfillment outcome
    OrderConfirmation,
    OperatorNewOrder,
    OperatorFulfillmentFailed,
    DigitalReceipt,
    OperatorAlert,
}

impl NotificationTemplate {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationTemplate::OrderConfirmation => "order_confirmation",
            NotificationTemplate::OperatorNewOrder => "operator_new_order",
            NotificationTemplate::OperatorFulfillmentFailed => "operator_fulfillment_failed",
            NotificationTemplate::DigitalReceipt => "digital_receipt",
            NotificationTemplate::OperatorAlert => "operator_alert",
        }
    }

    /// A subject line for the message, filled in from `data` where the template refers to an order.
    pub fn subject(&self, data: &Value) -> String {
        let order_id = data["order_id"].as_str().unwrap_or_default();
        match self {
            NotificationTemplate::OrderConfirmation => format!("Thank you for your order {order_id}"),
            NotificationTemplate::OperatorNewOrder => format!("New order {order_id}"),
            NotificationTemplate::OperatorFulfillmentFailed => format!("Fulfillment failed for order {order_id}"),
            NotificationTemplate::DigitalReceipt => "Your receipt".to_string(),
            NotificationTemplate::OperatorAlert => {
                format!("Store alert: {}", data["subject"].as_str().unwrap_or("attention needed"))
            },
        }
    }
}

impl Display for NotificationTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotificationError {
    #[error("The email service rejected the message with status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("Could not reach the email service: {0}")]
    Transport(String),
    #[error("The email service did not respond in time")]
    Timeout,
    #[error("Invalid recipient: {0}")]
    InvalidRecipient(String),
}

/// Best-effort message delivery.
#[allow(async_fn_in_trait)]
pub trait Notifier {
    async fn send(&self, to: &str, template: NotificationTemplate, data: Value) -> Result<(), NotificationError>;
}
