use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};

use chrono::{DateTime, Utc};
use serde::{ser::SerializeStruct, Deserialize, Serialize, Serializer};
use sqlx::{FromRow, Type};
use store_common::MinorUnits;
use thiserror::Error;

//--------------------------------------        OrderId        ---------------------------------------------------------
/// Our own order identifier, e.g. `ORD-20240601120000123-0a9f`. Lexical order follows creation order to the
/// millisecond; the random suffix separates orders created within the same millisecond.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OrderId(pub String);

impl OrderId {
    pub fn generate() -> Self {
        let now = Utc::now();
        let suffix = rand::random::<u16>();
        Self(format!("ORD-{}-{suffix:04x}", now.format("%Y%m%d%H%M%S%3f")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrderId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

//--------------------------------------        EventId        ---------------------------------------------------------
/// The payment gateway's identifier for an event. It is the idempotency key for orders.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct EventId(pub String);

impl EventId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EventId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for EventId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for EventId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatusType {
    /// Payment has been received. Nothing has been sent to the fulfillment provider yet.
    Paid,
    /// The order is being submitted to the fulfillment provider.
    FulfillmentPending,
    /// The provider has accepted the order for production.
    FulfillmentConfirmed,
    /// Submission failed. The order needs manual follow-up.
    FulfillmentFailed,
}

impl OrderStatusType {
    /// The only legal status changes are `paid -> fulfillment_pending -> fulfillment_confirmed | fulfillment_failed`.
    pub fn can_transition_to(&self, next: &OrderStatusType) -> bool {
        use OrderStatusType::*;
        matches!(
            (self, next),
            (Paid, FulfillmentPending) | (FulfillmentPending, FulfillmentConfirmed) | (FulfillmentPending, FulfillmentFailed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatusType::FulfillmentConfirmed | OrderStatusType::FulfillmentFailed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatusType::Paid => "paid",
            OrderStatusType::FulfillmentPending => "fulfillment_pending",
            OrderStatusType::FulfillmentConfirmed => "fulfillment_confirmed",
            OrderStatusType::FulfillmentFailed => "fulfillment_failed",
        }
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid order status: {0}")]
pub struct ConversionError(String);

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "paid" => Ok(Self::Paid),
            "fulfillment_pending" => Ok(Self::FulfillmentPending),
            "fulfillment_confirmed" => Ok(Self::FulfillmentConfirmed),
            "fulfillment_failed" => Ok(Self::FulfillmentFailed),
            s => Err(ConversionError(s.to_string())),
        }
    }
}

//--------------------------------------    ShippingAddress    ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub name: String,
    pub line1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    /// ISO-3166 alpha-2 country code
    pub country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

//--------------------------------------       OrderItem       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct OrderItem {
    /// The storefront SKU. It is resolved to a provider variant through the product catalog.
    pub product_ref: String,
    pub name: Option<String>,
    pub quantity: u32,
    pub unit_price: MinorUnits,
}

impl OrderItem {
    pub fn new(product_ref: &str, quantity: u32, unit_price: MinorUnits) -> Self {
        Self { product_ref: product_ref.to_string(), name: None, quantity, unit_price }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }
}

//--------------------------------------        NewOrder       ---------------------------------------------------------
/// An order that has not been stored yet. The store assigns the id, status and timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub source_event_id: EventId,
    pub customer_email: String,
    pub customer_name: String,
    pub shipping_address: Option<ShippingAddress>,
    pub items: Vec<OrderItem>,
    pub total_amount: MinorUnits,
    /// Lower-case ISO-4217 code
    pub currency: String,
}

//--------------------------------------          Order        ---------------------------------------------------------
/// Serialises with an extra `total` field holding [`Order::total_in_major_units`] next to `total_amount`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub id: OrderId,
    pub source_event_id: EventId,
    pub customer_email: String,
    pub customer_name: String,
    pub shipping_address: Option<ShippingAddress>,
    pub items: Vec<OrderItem>,
    pub total_amount: MinorUnits,
    pub currency: String,
    pub status: OrderStatusType,
    pub fulfillment_provider_order_id: Option<String>,
    pub fulfillment_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn total_in_major_units(&self) -> f64 {
        self.total_amount.to_major(&self.currency)
    }

    /// The order total formatted in major units, e.g. "49.99"
    pub fn formatted_total(&self) -> String {
        self.total_amount.format_major(&self.currency)
    }
}

impl Serialize for Order {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Order", 14)?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("source_event_id", &self.source_event_id)?;
        state.serialize_field("customer_email", &self.customer_email)?;
        state.serialize_field("customer_name", &self.customer_name)?;
        state.serialize_field("shipping_address", &self.shipping_address)?;
        state.serialize_field("items", &self.items)?;
        state.serialize_field("total_amount", &self.total_amount)?;
        state.serialize_field("total", &self.total_in_major_units())?;
        state.serialize_field("currency", &self.currency)?;
        state.serialize_field("status", &self.status)?;
        state.serialize_field("fulfillment_provider_order_id", &self.fulfillment_provider_order_id)?;
        state.serialize_field("fulfillment_note", &self.fulfillment_note)?;
        state.serialize_field("created_at", &self.created_at)?;
        state.serialize_field("updated_at", &self.updated_at)?;
        state.end()
    }
}

//--------------------------------------    OrderIndexEntry    ---------------------------------------------------------
/// Summary projection of an order for listings. Never authoritative; always read the full [`Order`] for decisions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct OrderIndexEntry {
    pub order_id: OrderId,
    pub customer_email: String,
    pub total_amount: MinorUnits,
    pub currency: String,
    pub status: OrderStatusType,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------      OrderUpdate      ---------------------------------------------------------
/// A mutation of the fulfillment-related fields of an order. Fields left as `None` are not changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderUpdate {
    pub status: Option<OrderStatusType>,
    pub fulfillment_provider_order_id: Option<String>,
    pub fulfillment_note: Option<String>,
}

impl OrderUpdate {
    pub fn status(status: OrderStatusType) -> Self {
        Self { status: Some(status), ..Default::default() }
    }

    pub fn with_status(mut self, status: OrderStatusType) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_provider_order_id<S: Into<String>>(mut self, id: S) -> Self {
        self.fulfillment_provider_order_id = Some(id.into());
        self
    }

    pub fn with_note<S: Into<String>>(mut self, note: S) -> Self {
        self.fulfillment_note = Some(note.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.fulfillment_provider_order_id.is_none() && self.fulfillment_note.is_none()
    }
}
