//! `SqliteDatabase` is the SQLite implementation of [`OrderManagement`].
//!
//! Creation relies on the `UNIQUE` constraint on `orders.source_event_id`: the insert uses
//! `ON CONFLICT DO NOTHING RETURNING`, so of two concurrent deliveries of the same event exactly one gets a row back.
//! Updates are compare-and-swap on the row version, so of two concurrent writers exactly one succeeds.
use std::fmt::Debug;

use chrono::Utc;
use log::*;
use sqlx::{migrate::MigrateError, SqlitePool};

use super::db::{db_url, events, new_pool, order_index, orders};
use crate::{
    db_types::{EventId, NewOrder, Order, OrderId, OrderIndexEntry, OrderUpdate},
    order_objects::Pagination,
    traits::{InsertOrderResult, OrderManagement, OrderStoreError},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Connects to the database named by `STORE_DATABASE_URL`.
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        Self::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    /// Brings the schema up to date. Safe to call on every start.
    pub async fn migrate(&self) -> Result<(), MigrateError> {
        sqlx::migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Checks an update against the current state of the order before it is attempted.
    fn validate_update(current: &Order, update: &OrderUpdate) -> Result<(), OrderStoreError> {
        if update.is_empty() {
            return Err(OrderStoreError::NoOp(current.id.clone()));
        }
        if let Some(next) = update.status {
            if !current.status.can_transition_to(&next) {
                return Err(OrderStoreError::InvalidStatusTransition {
                    order_id: current.id.clone(),
                    from: current.status,
                    to: next,
                });
            }
        }
        if let (Some(existing), Some(new)) =
            (&current.fulfillment_provider_order_id, &update.fulfillment_provider_order_id)
        {
            if existing != new {
                return Err(OrderStoreError::ProviderOrderIdConflict {
                    order_id: current.id.clone(),
                    existing: existing.clone(),
                    new: new.clone(),
                });
            }
        }
        Ok(())
    }
}

impl OrderManagement for SqliteDatabase {
    async fn create_order_if_absent(&self, order: NewOrder) -> Result<InsertOrderResult, OrderStoreError> {
        let id = OrderId::generate();
        let mut tx = self.pool.begin().await?;
        let inserted = orders::insert_if_absent(&id, &order, Utc::now(), &mut tx).await?;
        if let Some(new_order) = &inserted {
            order_index::insert_entry(new_order, &mut tx).await?;
        }
        tx.commit().await?;
        match inserted {
            Some(new_order) => {
                info!("🗃️ Order {} stored for event {}", new_order.id, new_order.source_event_id);
                Ok(InsertOrderResult::Inserted(new_order))
            },
            None => {
                let mut conn = self.pool.acquire().await?;
                let existing =
                    orders::fetch_order_by_source_event(&order.source_event_id, &mut conn).await?.ok_or_else(|| {
                        OrderStoreError::DataIntegrity(format!(
                            "Insert for event {} conflicted, but no order exists for it",
                            order.source_event_id
                        ))
                    })?;
                debug!("🗃️ Event {} already has order {}", order.source_event_id, existing.id);
                Ok(InsertOrderResult::AlreadyExists(existing))
            },
        }
    }

    async fn update_order(&self, id: &OrderId, update: OrderUpdate) -> Result<Order, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        let current_row = orders::fetch_row(id, &mut conn).await?.ok_or_else(|| OrderStoreError::OrderNotFound(id.clone()))?;
        let version = current_row.version;
        let items = orders::fetch_items(id, &mut conn).await?;
        let current = current_row.into_order(items)?;
        drop(conn);
        Self::validate_update(&current, &update)?;
        // updated_at never goes backwards, even if the clock does
        let updated_at = Utc::now().max(current.updated_at);
        let mut tx = self.pool.begin().await?;
        let row = orders::update_if_unchanged(id, version, &update, updated_at, &mut tx)
            .await?
            .ok_or_else(|| OrderStoreError::ConcurrentModification(id.clone()))?;
        if let Some(status) = update.status {
            order_index::update_status(id, status, &mut tx).await?;
        }
        tx.commit().await?;
        debug!("🗃️ Order {id} updated. Status: {}", row.status);
        row.into_order(current.items)
    }

    async fn fetch_order(&self, id: &OrderId) -> Result<Option<Order>, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order(id, &mut conn).await
    }

    async fn fetch_order_by_source_event(&self, event_id: &EventId) -> Result<Option<Order>, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order_by_source_event(event_id, &mut conn).await
    }

    async fn list_orders(&self, page: Pagination) -> Result<Vec<OrderIndexEntry>, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        order_index::fetch_page(page, &mut conn).await
    }

    async fn record_event(&self, event_id: &EventId, event_type: &str) -> Result<bool, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        let recorded = events::record_event(event_id, event_type, &mut conn).await?;
        if recorded {
            debug!("🗃️ Event {event_id} recorded");
        }
        Ok(recorded)
    }
}
