use std::time::Duration;

use mockall::mock;
use order_engine::{
    db_types::{EventId, NewOrder, Order, OrderId, OrderIndexEntry, OrderUpdate},
    order_objects::Pagination,
    traits::{InsertOrderResult, OrderManagement, OrderStoreError},
    SqliteDatabase,
};

mock! {
    pub OrderStore {}
    impl OrderManagement for OrderStore {
        async fn create_order_if_absent(&self, order: NewOrder) -> Result<InsertOrderResult, OrderStoreError>;
        async fn update_order(&self, id: &OrderId, update: OrderUpdate) -> Result<Order, OrderStoreError>;
        async fn fetch_order(&self, id: &OrderId) -> Result<Option<Order>, OrderStoreError>;
        async fn fetch_order_by_source_event(&self, event_id: &EventId) -> Result<Option<Order>, OrderStoreError>;
        async fn list_orders(&self, page: Pagination) -> Result<Vec<OrderIndexEntry>, OrderStoreError>;
        async fn record_event(&self, event_id: &EventId, event_type: &str) -> Result<bool, OrderStoreError>;
    }
}

/// A store that sits on every new order for `delay` before writing it.
#[derive(Clone)]
pub struct SlowStore {
    db: SqliteDatabase,
    delay: Duration,
}

impl SlowStore {
    pub fn new(db: SqliteDatabase, delay: Duration) -> Self {
        Self { db, delay }
    }
}

impl OrderManagement for SlowStore {
    async fn create_order_if_absent(&self, order: NewOrder) -> Result<InsertOrderResult, OrderStoreError> {
        tokio::time::sleep(self.delay).await;
        self.db.create_order_if_absent(order).await
    }

    async fn update_order(&self, id: &OrderId, update: OrderUpdate) -> Result<Order, OrderStoreError> {
        self.db.update_order(id, update).await
    }

    async fn fetch_order(&self, id: &OrderId) -> Result<Option<Order>, OrderStoreError> {
        self.db.fetch_order(id).await
    }

    async fn fetch_order_by_source_event(&self, event_id: &EventId) -> Result<Option<Order>, OrderStoreError> {
        self.db.fetch_order_by_source_event(event_id).await
    }

    async fn list_orders(&self, page: Pagination) -> Result<Vec<OrderIndexEntry>, OrderStoreError> {
        self.db.list_orders(page).await
    }

    async fn record_event(&self, event_id: &EventId, event_type: &str) -> Result<bool, OrderStoreError> {
        self.db.record_event(event_id, event_type).await
    }
}
