//! Consultation bookings.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::{PgExecutor, PgPool};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ConsultationRow {
    pub id: String,
    pub reference: String,
    pub user_id: String,
    pub client_name: String,
    pub client_email: String,
    pub client_phone: String,
    pub service: String,
    pub preferred_date: NaiveDate,
    pub time_slot: String,
    pub notes: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[allow(clippy::too_many_arguments)]
pub async fn insert<'e, E: PgExecutor<'e>>(
    exec: E,
    id: &str,
    reference: &str,
    user_id: &str,
    client_name: &str,
    client_email: &str,
    client_phone: &str,
    service: &str,
    preferred_date: NaiveDate,
    time_slot: &str,
    notes: Option<&str>,
) -> sqlx::Result<ConsultationRow> {
    sqlx::query_as::<_, ConsultationRow>(
        "INSERT INTO consultations \
         (id, reference, user_id, client_name, client_email, client_phone, service, \
          preferred_date, time_slot, notes, status, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 'pending', NOW(), NOW()) \
         RETURNING *",
    )
    .bind(id)
    .bind(reference)
    .bind(user_id)
    .bind(client_name)
    .bind(client_email)
    .bind(client_phone)
    .bind(service)
    .bind(preferred_date)
    .bind(time_slot)
    .bind(notes)
    .fetch_one(exec)
    .await
}

pub async fn get_by_reference(db: &PgPool, reference: &str) -> sqlx::Result<Option<ConsultationRow>> {
    sqlx::query_as::<_, ConsultationRow>("SELECT * FROM consultations WHERE reference = $1")
        .bind(reference)
        .fetch_optional(db)
        .await
}

pub async fn list_for_user(db: &PgPool, user_id: &str) -> sqlx::Result<Vec<ConsultationRow>> {
    sqlx::query_as::<_, ConsultationRow>(
        "SELECT * FROM consultations WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(db)
    .await
}

pub async fn list_all(
    db: &PgPool,
    status: Option<&str>,
    limit: i64,
    offset: i64,
) -> sqlx::Result<(Vec<ConsultationRow>, i64)> {
    let rows = sqlx::query_as::<_, ConsultationRow>(
        "SELECT * FROM consultations WHERE ($1::text IS NULL OR status = $1) \
         ORDER BY created_at DESC LIMIT $2 OFFSET $3",
    )
    .bind(status)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await?;
    let (total,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM consultations WHERE ($1::text IS NULL OR status = $1)",
    )
    .bind(status)
    .fetch_one(db)
    .await?;
    Ok((rows, total))
}

pub async fn set_status<'e, E: PgExecutor<'e>>(
    exec: E,
    id: &str,
    from: &str,
    to: &str,
) -> sqlx::Result<bool> {
    let result = sqlx::query(
        "UPDATE consultations SET status = $3, updated_at = NOW() WHERE id = $1 AND status = $2",
    )
    .bind(id)
    .bind(from)
    .bind(to)
    .execute(exec)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn stale_pending(
    db: &PgPool,
    cutoff: DateTime<Utc>,
    limit: i64,
) -> sqlx::Result<Vec<ConsultationRow>> {
    sqlx::query_as::<_, ConsultationRow>(
        "SELECT * FROM consultations WHERE status = 'pending' AND created_at < $1 \
         ORDER BY created_at LIMIT $2",
    )
    .bind(cutoff)
    .bind(limit)
    .fetch_all(db)
    .await
}
