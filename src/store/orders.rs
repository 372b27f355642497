//! Orders, order lines, and payment attempts.
//!
//! One table is the source of truth for both the storefront ("my orders")
//! and the back office; there is no per-user copy to keep in sync.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{PgExecutor, PgPool, Postgres, Transaction};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderRow {
    pub id: String,
    pub order_number: String,
    pub user_id: String,
    pub email: String,
    pub status: String,
    pub payment_status: String,
    pub subtotal: i64,
    pub shipping: i64,
    pub tax: i64,
    pub total: i64,
    pub currency: String,
    pub ship_name: String,
    pub ship_phone: String,
    pub ship_street: String,
    pub ship_city: String,
    pub ship_state: String,
    pub ship_country: String,
    pub ship_postal_code: Option<String>,
    pub payment_reference: Option<String>,
    pub payment_channel: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderItemRow {
    pub id: String,
    pub order_id: String,
    pub product_id: String,
    pub name: String,
    pub unit_price: i64,
    pub quantity: i32,
    pub line_total: i64,
}

/// A payment the client initialized for a draft. Lets the sweep re-check
/// the provider before expiring a draft whose callback never arrived.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PaymentAttemptRow {
    pub reference: String,
    pub order_id: String,
    pub amount: i64,
    pub currency: String,
    pub initialized_at: DateTime<Utc>,
}

pub struct NewOrder<'a> {
    pub id: &'a str,
    pub order_number: &'a str,
    pub user_id: &'a str,
    pub email: &'a str,
    pub subtotal: i64,
    pub shipping: i64,
    pub tax: i64,
    pub total: i64,
    pub currency: &'a str,
    pub ship_name: &'a str,
    pub ship_phone: &'a str,
    pub ship_street: &'a str,
    pub ship_city: &'a str,
    pub ship_state: &'a str,
    pub ship_country: &'a str,
    pub ship_postal_code: Option<&'a str>,
}

pub struct NewOrderItem<'a> {
    pub id: &'a str,
    pub product_id: &'a str,
    pub name: &'a str,
    pub unit_price: i64,
    pub quantity: i32,
    pub line_total: i64,
}

/// Writes the draft and its lines in one transaction.
pub async fn insert_draft(
    tx: &mut Transaction<'_, Postgres>,
    order: &NewOrder<'_>,
    items: &[NewOrderItem<'_>],
) -> sqlx::Result<OrderRow> {
    let row = sqlx::query_as::<_, OrderRow>(
        "INSERT INTO orders \
         (id, order_number, user_id, email, status, payment_status, subtotal, shipping, tax, total, \
          currency, ship_name, ship_phone, ship_street, ship_city, ship_state, ship_country, \
          ship_postal_code, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, 'pending_payment', 'pending', $5, $6, $7, $8, $9, $10, $11, $12, \
                 $13, $14, $15, $16, NOW(), NOW()) \
         RETURNING *",
    )
    .bind(order.id)
    .bind(order.order_number)
    .bind(order.user_id)
    .bind(order.email)
    .bind(order.subtotal)
    .bind(order.shipping)
    .bind(order.tax)
    .bind(order.total)
    .bind(order.currency)
    .bind(order.ship_name)
    .bind(order.ship_phone)
    .bind(order.ship_street)
    .bind(order.ship_city)
    .bind(order.ship_state)
    .bind(order.ship_country)
    .bind(order.ship_postal_code)
    .fetch_one(&mut **tx)
    .await?;

    for item in items {
        sqlx::query(
            "INSERT INTO order_items (id, order_id, product_id, name, unit_price, quantity, line_total) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(item.id)
        .bind(order.id)
        .bind(item.product_id)
        .bind(item.name)
        .bind(item.unit_price)
        .bind(item.quantity)
        .bind(item.line_total)
        .execute(&mut **tx)
        .await?;
    }
    Ok(row)
}

pub async fn get(db: &PgPool, id: &str) -> sqlx::Result<Option<OrderRow>> {
    sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await
}

pub async fn get_for_user(db: &PgPool, id: &str, user_id: &str) -> sqlx::Result<Option<OrderRow>> {
    sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .fetch_optional(db)
        .await
}

pub async fn items(db: &PgPool, order_id: &str) -> sqlx::Result<Vec<OrderItemRow>> {
    sqlx::query_as::<_, OrderItemRow>("SELECT * FROM order_items WHERE order_id = $1")
        .bind(order_id)
        .fetch_all(db)
        .await
}

pub async fn list_for_user(
    db: &PgPool,
    user_id: &str,
    limit: i64,
    offset: i64,
) -> sqlx::Result<(Vec<OrderRow>, i64)> {
    let rows = sqlx::query_as::<_, OrderRow>(
        "SELECT * FROM orders WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3",
    )
    .bind(user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await?;
    let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(db)
        .await?;
    Ok((rows, total))
}

pub async fn list_all(
    db: &PgPool,
    status: Option<&str>,
    limit: i64,
    offset: i64,
) -> sqlx::Result<(Vec<OrderRow>, i64)> {
    let rows = sqlx::query_as::<_, OrderRow>(
        "SELECT * FROM orders WHERE ($1::text IS NULL OR status = $1) \
         ORDER BY created_at DESC LIMIT $2 OFFSET $3",
    )
    .bind(status)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await?;
    let (total,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM orders WHERE ($1::text IS NULL OR status = $1)")
            .bind(status)
            .fetch_one(db)
            .await?;
    Ok((rows, total))
}

/// Guarded convergence write: only a `pending_payment` draft transitions,
/// so a callback/webhook race converges exactly once.
pub async fn mark_paid<'e, E: PgExecutor<'e>>(
    exec: E,
    id: &str,
    reference: &str,
    channel: Option<&str>,
    paid_at: DateTime<Utc>,
) -> sqlx::Result<bool> {
    let result = sqlx::query(
        "UPDATE orders SET status = 'processing', payment_status = 'completed', \
         payment_reference = $2, payment_channel = $3, paid_at = $4, updated_at = NOW() \
         WHERE id = $1 AND status = 'pending_payment'",
    )
    .bind(id)
    .bind(reference)
    .bind(channel)
    .bind(paid_at)
    .execute(exec)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn mark_payment_failed(db: &PgPool, id: &str) -> sqlx::Result<bool> {
    let result = sqlx::query(
        "UPDATE orders SET payment_status = 'failed', updated_at = NOW() \
         WHERE id = $1 AND status = 'pending_payment'",
    )
    .bind(id)
    .execute(db)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn set_status<'e, E: PgExecutor<'e>>(
    exec: E,
    id: &str,
    from: &str,
    to: &str,
) -> sqlx::Result<bool> {
    let result = sqlx::query(
        "UPDATE orders SET status = $3, updated_at = NOW() WHERE id = $1 AND status = $2",
    )
    .bind(id)
    .bind(from)
    .bind(to)
    .execute(exec)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Drafts past the TTL, oldest first, for the reconciliation sweep.
pub async fn stale_pending(
    db: &PgPool,
    cutoff: DateTime<Utc>,
    limit: i64,
) -> sqlx::Result<Vec<OrderRow>> {
    sqlx::query_as::<_, OrderRow>(
        "SELECT * FROM orders WHERE status = 'pending_payment' AND created_at < $1 \
         ORDER BY created_at LIMIT $2",
    )
    .bind(cutoff)
    .bind(limit)
    .fetch_all(db)
    .await
}

pub async fn record_attempt(
    db: &PgPool,
    reference: &str,
    order_id: &str,
    amount: i64,
    currency: &str,
) -> sqlx::Result<()> {
    sqlx::query(
        "INSERT INTO payment_attempts (reference, order_id, amount, currency, initialized_at) \
         VALUES ($1, $2, $3, $4, NOW()) \
         ON CONFLICT (reference) DO NOTHING",
    )
    .bind(reference)
    .bind(order_id)
    .bind(amount)
    .bind(currency)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn attempt_for_order(db: &PgPool, order_id: &str) -> sqlx::Result<Option<PaymentAttemptRow>> {
    sqlx::query_as::<_, PaymentAttemptRow>(
        "SELECT * FROM payment_attempts WHERE order_id = $1 ORDER BY initialized_at DESC LIMIT 1",
    )
    .bind(order_id)
    .fetch_optional(db)
    .await
}
