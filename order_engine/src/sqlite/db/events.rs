use chrono::Utc;
use sqlx::SqliteConnection;

use crate::{db_types::EventId, traits::OrderStoreError};

/// Adds the event to the processed-event ledger. Returns `false`, and writes nothing, if it is already there.
pub async fn record_event(
    event_id: &EventId,
    event_type: &str,
    conn: &mut SqliteConnection,
) -> Result<bool, OrderStoreError> {
    let result = sqlx::query(
        "INSERT INTO processed_events (event_id, event_type, received_at) VALUES ($1, $2, $3) ON CONFLICT (event_id) \
         DO NOTHING",
    )
    .bind(event_id)
    .bind(event_type)
    .bind(Utc::now())
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}
