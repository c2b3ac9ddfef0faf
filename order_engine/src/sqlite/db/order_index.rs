use log::trace;
use sqlx::SqliteConnection;

use crate::{
    db_types::{Order, OrderId, OrderIndexEntry, OrderStatusType},
    order_objects::Pagination,
    traits::OrderStoreError,
};

pub async fn insert_entry(order: &Order, conn: &mut SqliteConnection) -> Result<(), OrderStoreError> {
    sqlx::query(
        r#"
            INSERT INTO order_index (order_id, customer_email, total_amount, currency, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(&order.id)
    .bind(&order.customer_email)
    .bind(order.total_amount)
    .bind(&order.currency)
    .bind(order.status)
    .bind(order.created_at)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn update_status(
    order_id: &OrderId,
    status: OrderStatusType,
    conn: &mut SqliteConnection,
) -> Result<(), OrderStoreError> {
    let result = sqlx::query("UPDATE order_index SET status = $1 WHERE order_id = $2")
        .bind(status)
        .bind(order_id)
        .execute(conn)
        .await?;
    if result.rows_affected() != 1 {
        return Err(OrderStoreError::DataIntegrity(format!("Order {order_id} has no index entry")));
    }
    Ok(())
}

/// Newest entries first
pub async fn fetch_page(page: Pagination, conn: &mut SqliteConnection) -> Result<Vec<OrderIndexEntry>, OrderStoreError> {
    trace!("🗃️ Fetching order index page {} ({} per page)", page.page, page.per_page);
    let entries = sqlx::query_as(
        r#"
            SELECT order_id, customer_email, total_amount, currency, status, created_at
            FROM order_index
            ORDER BY seq DESC
            LIMIT $1 OFFSET $2
        "#,
    )
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(conn)
    .await?;
    Ok(entries)
}
