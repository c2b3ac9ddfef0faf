use order_engine::{db_types::OrderIndexEntry, order_objects::Pagination, EventOutcome};
use serde::{Deserialize, Serialize};

/// The body returned to the payment gateway for every event it does not need to redeliver.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookResponse {
    pub received: bool,
    pub outcome: EventOutcome,
}

impl WebhookResponse {
    pub fn new(outcome: EventOutcome) -> Self {
        Self { received: true, outcome }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct OrderListParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl OrderListParams {
    pub fn pagination(&self) -> Pagination {
        Pagination::new(self.page, self.per_page)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderList {
    pub page: u32,
    pub per_page: u32,
    pub orders: Vec<OrderIndexEntry>,
}
