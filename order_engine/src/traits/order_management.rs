use thiserror::Error;

use crate::{
    db_types::{EventId, NewOrder, Order, OrderId, OrderIndexEntry, OrderStatusType, OrderUpdate},
    order_objects::Pagination,
};

#[derive(Debug, Clone, Error)]
pub enum OrderStoreError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("Order {order_id} cannot move from {from} to {to}")]
    InvalidStatusTransition { order_id: OrderId, from: OrderStatusType, to: OrderStatusType },
    #[error("Order {order_id} already has provider order {existing}. Refusing to replace it with {new}")]
    ProviderOrderIdConflict { order_id: OrderId, existing: String, new: String },
    #[error("The update for order {0} changes nothing")]
    NoOp(OrderId),
    #[error("Order {0} was modified by another writer")]
    ConcurrentModification(OrderId),
    #[error("Stored data is inconsistent: {0}")]
    DataIntegrity(String),
}

impl From<sqlx::Error> for OrderStoreError {
    fn from(e: sqlx::Error) -> Self {
        OrderStoreError::DatabaseError(e.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOrderResult {
    /// The order was created by this call
    Inserted(Order),
    /// An order for the same source event was already on record. It is returned unchanged.
    AlreadyExists(Order),
}

impl InsertOrderResult {
    pub fn is_new(&self) -> bool {
        matches!(self, InsertOrderResult::Inserted(_))
    }

    pub fn order(&self) -> &Order {
        match self {
            InsertOrderResult::Inserted(o) | InsertOrderResult::AlreadyExists(o) => o,
        }
    }

    pub fn into_order(self) -> Order {
        match self {
            InsertOrderResult::Inserted(o) | InsertOrderResult::AlreadyExists(o) => o,
        }
    }
}

/// Durable order storage.
///
/// Implementations must guarantee that at most one order exists per `source_event_id`, even when the same event is
/// delivered concurrently, and that order status only ever moves forward.
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    /// Atomically stores the order, its items and its index entry, unless an order for the same source event already
    /// exists, in which case the existing order is returned and nothing is written.
    async fn create_order_if_absent(&self, order: NewOrder) -> Result<InsertOrderResult, OrderStoreError>;

    /// Applies `update` to the order and refreshes `updated_at`.
    ///
    /// Fails with [`OrderStoreError::OrderNotFound`] for unknown ids, [`OrderStoreError::NoOp`] for an empty update,
    /// [`OrderStoreError::InvalidStatusTransition`] for anything but a forward step of the status machine,
    /// [`OrderStoreError::ProviderOrderIdConflict`] when a different provider id is already recorded, and
    /// [`OrderStoreError::ConcurrentModification`] when another writer changed the order in the meantime.
    async fn update_order(&self, id: &OrderId, update: OrderUpdate) -> Result<Order, OrderStoreError>;

    async fn fetch_order(&self, id: &OrderId) -> Result<Option<Order>, OrderStoreError>;

    async fn fetch_order_by_source_event(&self, event_id: &EventId) -> Result<Option<Order>, OrderStoreError>;

    /// Reads a page of the order index, newest first.
    async fn list_orders(&self, page: Pagination) -> Result<Vec<OrderIndexEntry>, OrderStoreError>;

    /// Records that an event has been handled. Returns `false` if it had been recorded before.
    async fn record_event(&self, event_id: &EventId, event_type: &str) -> Result<bool, OrderStoreError>;
}
