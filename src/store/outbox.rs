//! Transactional outbox: domain events are written in the same transaction
//! as the state change and drained to NATS by the sweep, so an event is
//! never published for a rolled-back write and never lost to a crash.

use crate::domain::events::DomainEvent;
use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OutboxRow {
    pub id: String,
    pub subject: String,
    pub aggregate_id: String,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

pub async fn append<'e, E: PgExecutor<'e>>(exec: E, event: &DomainEvent) -> sqlx::Result<()> {
    let payload = serde_json::to_value(event).unwrap_or(serde_json::Value::Null);
    sqlx::query(
        "INSERT INTO outbox (id, subject, aggregate_id, payload, created_at) \
         VALUES ($1, $2, $3, $4, NOW())",
    )
    .bind(Uuid::now_v7().to_string())
    .bind(event.subject())
    .bind(event.aggregate_id())
    .bind(payload)
    .execute(exec)
    .await?;
    Ok(())
}

pub async fn fetch_batch(db: &PgPool, limit: i64) -> sqlx::Result<Vec<OutboxRow>> {
    sqlx::query_as::<_, OutboxRow>("SELECT * FROM outbox ORDER BY created_at LIMIT $1")
        .bind(limit)
        .fetch_all(db)
        .await
}

pub async fn delete(db: &PgPool, id: &str) -> sqlx::Result<()> {
    sqlx::query("DELETE FROM outbox WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;
    Ok(())
}
