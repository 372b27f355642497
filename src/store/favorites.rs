//! User favorites (wishlist).

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;

/// Favorite joined with live product data; a favorite whose product was
/// archived still lists, flagged by `product_status`.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct FavoriteRow {
    pub product_id: String,
    pub name: String,
    pub original_price: i64,
    pub discounted_price: Option<i64>,
    pub stock_status: String,
    pub product_status: String,
    pub image_urls: Vec<String>,
    pub favorited_at: DateTime<Utc>,
}

pub async fn list_for_user(db: &PgPool, user_id: &str) -> sqlx::Result<Vec<FavoriteRow>> {
    sqlx::query_as::<_, FavoriteRow>(
        "SELECT p.id AS product_id, p.name, p.original_price, p.discounted_price, \
                p.stock_status, p.status AS product_status, p.image_urls, f.created_at AS favorited_at \
         FROM favorites f JOIN products p ON p.id = f.product_id \
         WHERE f.user_id = $1 ORDER BY f.created_at DESC",
    )
    .bind(user_id)
    .fetch_all(db)
    .await
}

/// Idempotent add.
pub async fn add(db: &PgPool, user_id: &str, product_id: &str) -> sqlx::Result<()> {
    sqlx::query(
        "INSERT INTO favorites (user_id, product_id, created_at) VALUES ($1, $2, NOW()) \
         ON CONFLICT (user_id, product_id) DO NOTHING",
    )
    .bind(user_id)
    .bind(product_id)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn remove(db: &PgPool, user_id: &str, product_id: &str) -> sqlx::Result<bool> {
    let result = sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND product_id = $2")
        .bind(user_id)
        .bind(product_id)
        .execute(db)
        .await?;
    Ok(result.rows_affected() == 1)
}
