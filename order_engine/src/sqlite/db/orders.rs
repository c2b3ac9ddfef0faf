use chrono::{DateTime, Utc};
use log::{debug, trace};
use sqlx::{FromRow, QueryBuilder, SqliteConnection};
use store_common::MinorUnits;

use crate::{
    db_types::{EventId, NewOrder, Order, OrderId, OrderItem, OrderStatusType, OrderUpdate, ShippingAddress},
    traits::OrderStoreError,
};

/// A row of the `orders` table. Items live in their own table and the shipping address is stored as JSON.
#[derive(Debug, Clone, FromRow)]
pub struct OrderRow {
    pub order_id: OrderId,
    pub source_event_id: EventId,
    pub customer_email: String,
    pub customer_name: String,
    pub shipping_address: Option<String>,
    pub total_amount: MinorUnits,
    pub currency: String,
    pub status: OrderStatusType,
    pub fulfillment_provider_order_id: Option<String>,
    pub fulfillment_note: Option<String>,
    /// Bumped on every update and used for optimistic concurrency control
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderRow {
    pub fn into_order(self, items: Vec<OrderItem>) -> Result<Order, OrderStoreError> {
        let shipping_address = self
            .shipping_address
            .as_deref()
            .map(serde_json::from_str::<ShippingAddress>)
            .transpose()
            .map_err(|e| OrderStoreError::DataIntegrity(format!("Order {} has a bad shipping address. {e}", self.order_id)))?;
        Ok(Order {
            id: self.order_id,
            source_event_id: self.source_event_id,
            customer_email: self.customer_email,
            customer_name: self.customer_name,
            shipping_address,
            items,
            total_amount: self.total_amount,
            currency: self.currency,
            status: self.status,
            fulfillment_provider_order_id: self.fulfillment_provider_order_id,
            fulfillment_note: self.fulfillment_note,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Inserts the order and its items unless an order for the same source event exists, in which case `None` is
/// returned and nothing is written. This is not atomic on its own; run it inside a transaction.
pub async fn insert_if_absent(
    id: &OrderId,
    order: &NewOrder,
    created_at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, OrderStoreError> {
    let shipping = order
        .shipping_address
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(|e| OrderStoreError::DataIntegrity(format!("Could not serialize shipping address. {e}")))?;
    let row: Option<OrderRow> = sqlx::query_as(
        r#"
            INSERT INTO orders (
                order_id,
                source_event_id,
                customer_email,
                customer_name,
                shipping_address,
                total_amount,
                currency,
                status,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
            ON CONFLICT (source_event_id) DO NOTHING
            RETURNING *;
        "#,
    )
    .bind(id)
    .bind(&order.source_event_id)
    .bind(&order.customer_email)
    .bind(&order.customer_name)
    .bind(shipping)
    .bind(order.total_amount)
    .bind(&order.currency)
    .bind(OrderStatusType::Paid)
    .bind(created_at)
    .fetch_optional(&mut *conn)
    .await?;
    let row = match row {
        Some(row) => row,
        None => {
            debug!("🗃️ An order for event {} already exists. Nothing inserted.", order.source_event_id);
            return Ok(None);
        },
    };
    for (position, item) in order.items.iter().enumerate() {
        sqlx::query(
            r#"
                INSERT INTO order_items (order_id, position, product_ref, name, quantity, unit_price)
                VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(id)
        .bind(position as i64)
        .bind(&item.product_ref)
        .bind(&item.name)
        .bind(item.quantity)
        .bind(item.unit_price)
        .execute(&mut *conn)
        .await?;
    }
    debug!("🗃️ Order {id} inserted with {} items", order.items.len());
    row.into_order(order.items.clone()).map(Some)
}

pub async fn fetch_row(id: &OrderId, conn: &mut SqliteConnection) -> Result<Option<OrderRow>, OrderStoreError> {
    let row = sqlx::query_as("SELECT * FROM orders WHERE order_id = $1").bind(id).fetch_optional(conn).await?;
    Ok(row)
}

pub async fn fetch_items(id: &OrderId, conn: &mut SqliteConnection) -> Result<Vec<OrderItem>, OrderStoreError> {
    let items = sqlx::query_as(
        "SELECT product_ref, name, quantity, unit_price FROM order_items WHERE order_id = $1 ORDER BY position",
    )
    .bind(id)
    .fetch_all(conn)
    .await?;
    Ok(items)
}

pub async fn fetch_order(id: &OrderId, conn: &mut SqliteConnection) -> Result<Option<Order>, OrderStoreError> {
    match fetch_row(id, &mut *conn).await? {
        Some(row) => {
            let items = fetch_items(id, conn).await?;
            row.into_order(items).map(Some)
        },
        None => Ok(None),
    }
}

pub async fn fetch_order_by_source_event(
    event_id: &EventId,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, OrderStoreError> {
    let row: Option<OrderRow> = sqlx::query_as("SELECT * FROM orders WHERE source_event_id = $1")
        .bind(event_id)
        .fetch_optional(&mut *conn)
        .await?;
    match row {
        Some(row) => {
            let items = fetch_items(&row.order_id, conn).await?;
            row.into_order(items).map(Some)
        },
        None => Ok(None),
    }
}

/// Applies `update` only if the order is still at `expected_version`. Returns `None` when another writer got there
/// first (or the order does not exist).
pub async fn update_if_unchanged(
    id: &OrderId,
    expected_version: i64,
    update: &OrderUpdate,
    updated_at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<OrderRow>, OrderStoreError> {
    let mut builder = QueryBuilder::new("UPDATE orders SET version = version + 1, updated_at = ");
    builder.push_bind(updated_at);
    if let Some(status) = update.status {
        builder.push(", status = ");
        builder.push_bind(status);
    }
    if let Some(provider_id) = &update.fulfillment_provider_order_id {
        builder.push(", fulfillment_provider_order_id = ");
        builder.push_bind(provider_id.clone());
    }
    if let Some(note) = &update.fulfillment_note {
        builder.push(", fulfillment_note = ");
        builder.push_bind(note.clone());
    }
    builder.push(" WHERE order_id = ");
    builder.push_bind(id.clone());
    builder.push(" AND version = ");
    builder.push_bind(expected_version);
    builder.push(" RETURNING *");
    trace!("🗃️ Executing query: {}", builder.sql());
    let row = builder.build_query_as::<OrderRow>().fetch_optional(conn).await?;
    Ok(row)
}
