//! Payment gateway events and the purchase payload carried by `purchase.completed`.
use std::fmt::Display;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use store_common::{MinorUnits, MoneyError};
use thiserror::Error;

use crate::db_types::{EventId, NewOrder, OrderItem, ShippingAddress};

pub const PURCHASE_COMPLETED: &str = "purchase.completed";
pub const PAYMENT_SUCCEEDED: &str = "payment.succeeded";
pub const PAYMENT_FAILED: &str = "payment.failed";

/// The envelope of every event the gateway delivers. Events arrive at least once and in no particular order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentEvent {
    pub id: EventId,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub data: Value,
    /// Unix time at which the gateway created the event
    #[serde(default)]
    pub created: Option<i64>,
}

impl PaymentEvent {
    pub fn new(id: &str, event_type: &str, data: Value) -> Self {
        Self { id: EventId::from(id), event_type: event_type.to_string(), data, created: None }
    }

    pub fn kind(&self) -> PaymentEventType {
        PaymentEventType::from(self.event_type.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentEventType {
    PurchaseCompleted,
    PaymentSucceeded,
    PaymentFailed,
    Unhandled(String),
}

impl From<&str> for PaymentEventType {
    fn from(value: &str) -> Self {
        match value {
            PURCHASE_COMPLETED => Self::PurchaseCompleted,
            PAYMENT_SUCCEEDED => Self::PaymentSucceeded,
            PAYMENT_FAILED => Self::PaymentFailed,
            other => Self::Unhandled(other.to_string()),
        }
    }
}

impl Display for PaymentEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PurchaseCompleted => f.write_str(PURCHASE_COMPLETED),
            Self::PaymentSucceeded => f.write_str(PAYMENT_SUCCEEDED),
            Self::PaymentFailed => f.write_str(PAYMENT_FAILED),
            Self::Unhandled(s) => f.write_str(s),
        }
    }
}

//--------------------------------------      Purchases      -----------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseKind {
    /// Goods that are manufactured and shipped by the fulfillment provider
    #[default]
    Physical,
    /// Downloads, sessions and other goods that only need a receipt
    Intangible,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub email: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    #[error("The purchase payload is malformed. {0}")]
    Malformed(String),
    #[error("A physical purchase must contain at least one item")]
    NoItems,
    #[error("Item {0} must have a quantity of at least one")]
    InvalidQuantity(String),
    #[error("Item {0} has no price")]
    MissingPrice(String),
    #[error("Item {sku} has an invalid price. {error}")]
    InvalidPrice { sku: String, error: MoneyError },
    #[error("The customer email address is missing")]
    MissingEmail,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum PriceValue {
    Text(String),
    Number(serde_json::Number),
}

impl PriceValue {
    fn as_decimal_string(&self) -> String {
        match self {
            PriceValue::Text(s) => s.clone(),
            PriceValue::Number(n) => n.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct RawItem {
    sku: String,
    #[serde(default, alias = "quantity")]
    qty: Option<i64>,
    #[serde(default)]
    price: Option<PriceValue>,
    #[serde(default)]
    unit_amount: Option<i64>,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawPurchase {
    #[serde(default)]
    purchase_kind: PurchaseKind,
    amount_total: i64,
    currency: String,
    customer: Customer,
    #[serde(default)]
    shipping: Option<ShippingAddress>,
    #[serde(default)]
    items: Vec<RawItem>,
}

/// A `purchase.completed` payload that has been checked and converted to our own types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Purchase {
    pub kind: PurchaseKind,
    pub amount_total: MinorUnits,
    pub currency: String,
    pub customer: Customer,
    pub shipping: Option<ShippingAddress>,
    pub items: Vec<OrderItem>,
}

impl Purchase {
    pub fn from_event_data(data: &Value) -> Result<Self, PayloadError> {
        let raw = RawPurchase::deserialize(data).map_err(|e| PayloadError::Malformed(e.to_string()))?;
        let currency = raw.currency.trim().to_ascii_lowercase();
        if raw.customer.email.trim().is_empty() {
            return Err(PayloadError::MissingEmail);
        }
        let items = raw.items.into_iter().map(|item| convert_item(item, &currency)).collect::<Result<Vec<_>, _>>()?;
        if raw.purchase_kind == PurchaseKind::Physical && items.is_empty() {
            return Err(PayloadError::NoItems);
        }
        Ok(Self {
            kind: raw.purchase_kind,
            amount_total: MinorUnits::from(raw.amount_total),
            currency,
            customer: raw.customer,
            shipping: raw.shipping,
            items,
        })
    }

    pub fn into_new_order(self, source_event_id: EventId) -> NewOrder {
        NewOrder {
            source_event_id,
            customer_email: self.customer.email,
            customer_name: self.customer.name,
            shipping_address: self.shipping,
            items: self.items,
            total_amount: self.amount_total,
            currency: self.currency,
        }
    }
}

fn convert_item(item: RawItem, currency: &str) -> Result<OrderItem, PayloadError> {
    let quantity = match item.qty {
        None => 1,
        Some(q) if q >= 1 => u32::try_from(q).map_err(|_| PayloadError::InvalidQuantity(item.sku.clone()))?,
        Some(_) => return Err(PayloadError::InvalidQuantity(item.sku)),
    };
    let unit_price = match (item.unit_amount, &item.price) {
        (Some(minor), _) => MinorUnits::from(minor),
        (None, Some(price)) => MinorUnits::from_major_str(&price.as_decimal_string(), currency)
            .map_err(|error| PayloadError::InvalidPrice { sku: item.sku.clone(), error })?,
        (None, None) => return Err(PayloadError::MissingPrice(item.sku)),
    };
    Ok(OrderItem { product_ref: item.sku, name: item.name, quantity, unit_price })
}
