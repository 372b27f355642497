//! Auth sessions (provisioned by the external identity provider) and
//! receipt sessions (the server-held replacement for the client's
//! last-order local-storage snapshot).

use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, PgPool};

/// Resolved identity for a bearer token.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SessionUser {
    pub user_id: String,
    pub email: String,
    pub display_name: Option<String>,
    pub is_admin: bool,
}

pub async fn resolve_token(db: &PgPool, token: &str) -> sqlx::Result<Option<SessionUser>> {
    sqlx::query_as::<_, SessionUser>(
        "SELECT u.id AS user_id, u.email, u.display_name, u.is_admin \
         FROM sessions s JOIN users u ON u.id = s.user_id \
         WHERE s.token = $1 AND s.expires_at > NOW()",
    )
    .bind(token)
    .fetch_optional(db)
    .await
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReceiptSessionRow {
    pub token: String,
    pub order_id: String,
    pub expires_at: DateTime<Utc>,
}

pub async fn insert_receipt<'e, E: PgExecutor<'e>>(
    exec: E,
    token: &str,
    order_id: &str,
    expires_at: DateTime<Utc>,
) -> sqlx::Result<()> {
    sqlx::query(
        "INSERT INTO receipt_sessions (token, order_id, expires_at) VALUES ($1, $2, $3)",
    )
    .bind(token)
    .bind(order_id)
    .bind(expires_at)
    .execute(exec)
    .await?;
    Ok(())
}

/// Resolves only unexpired tokens; the confirmation page 404s after the
/// TTL just as the old snapshot vanished, but against server state.
pub async fn resolve_receipt(db: &PgPool, token: &str) -> sqlx::Result<Option<ReceiptSessionRow>> {
    sqlx::query_as::<_, ReceiptSessionRow>(
        "SELECT * FROM receipt_sessions WHERE token = $1 AND expires_at > NOW()",
    )
    .bind(token)
    .fetch_optional(db)
    .await
}

pub async fn purge_expired_receipts(db: &PgPool) -> sqlx::Result<u64> {
    let result = sqlx::query("DELETE FROM receipt_sessions WHERE expires_at <= NOW()")
        .execute(db)
        .await?;
    Ok(result.rows_affected())
}
