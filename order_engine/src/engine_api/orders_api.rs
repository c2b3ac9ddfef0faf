use std::fmt::Debug;

use crate::{
    db_types::{Order, OrderId, OrderIndexEntry},
    order_objects::Pagination,
    traits::{OrderManagement, OrderStoreError},
};

/// Read-only access to stored orders.
pub struct OrdersApi<B> {
    db: B,
}

impl<B> Debug for OrdersApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrdersApi")
    }
}

impl<B> OrdersApi<B>
where B: OrderManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub async fn fetch_order(&self, id: &OrderId) -> Result<Option<Order>, OrderStoreError> {
        self.db.fetch_order(id).await
    }

    /// Lists orders from the summary index, newest first.
    pub async fn list_orders(&self, page: Pagination) -> Result<Vec<OrderIndexEntry>, OrderStoreError> {
        self.db.list_orders(page).await
    }
}
