//! Per-user cart line items.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{PgExecutor, PgPool};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CartItemRow {
    pub id: String,
    pub user_id: String,
    pub product_id: String,
    pub name: String,
    pub unit_price: i64,
    pub quantity: i32,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub async fn list_for_user(db: &PgPool, user_id: &str) -> sqlx::Result<Vec<CartItemRow>> {
    sqlx::query_as::<_, CartItemRow>(
        "SELECT * FROM cart_items WHERE user_id = $1 ORDER BY created_at",
    )
    .bind(user_id)
    .fetch_all(db)
    .await
}

/// Add-to-cart with merge: same user + product bumps the quantity and keeps
/// the original snapshot (name, price, image) from first add.
pub async fn upsert_item(
    db: &PgPool,
    id: &str,
    user_id: &str,
    product_id: &str,
    name: &str,
    unit_price: i64,
    quantity: i32,
    image_url: Option<&str>,
) -> sqlx::Result<CartItemRow> {
    sqlx::query_as::<_, CartItemRow>(
        "INSERT INTO cart_items (id, user_id, product_id, name, unit_price, quantity, image_url, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, NOW(), NOW()) \
         ON CONFLICT (user_id, product_id) \
         DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity, updated_at = NOW() \
         RETURNING *",
    )
    .bind(id)
    .bind(user_id)
    .bind(product_id)
    .bind(name)
    .bind(unit_price)
    .bind(quantity)
    .bind(image_url)
    .fetch_one(db)
    .await
}

/// Quantity 0 deletes the line. Returns false when the line does not exist.
pub async fn update_quantity(
    db: &PgPool,
    user_id: &str,
    product_id: &str,
    quantity: i32,
) -> sqlx::Result<bool> {
    let result = if quantity == 0 {
        sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND product_id = $2")
            .bind(user_id)
            .bind(product_id)
            .execute(db)
            .await?
    } else {
        sqlx::query(
            "UPDATE cart_items SET quantity = $3, updated_at = NOW() \
             WHERE user_id = $1 AND product_id = $2",
        )
        .bind(user_id)
        .bind(product_id)
        .bind(quantity)
        .execute(db)
        .await?
    };
    Ok(result.rows_affected() == 1)
}

pub async fn remove_item(db: &PgPool, user_id: &str, product_id: &str) -> sqlx::Result<bool> {
    let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND product_id = $2")
        .bind(user_id)
        .bind(product_id)
        .execute(db)
        .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn clear<'e, E: PgExecutor<'e>>(exec: E, user_id: &str) -> sqlx::Result<u64> {
    let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
        .bind(user_id)
        .execute(exec)
        .await?;
    Ok(result.rows_affected())
}
