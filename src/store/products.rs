//! Product table access.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{PgExecutor, PgPool};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ProductRow {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub original_price: i64,
    pub discounted_price: Option<i64>,
    pub currency: String,
    pub stock: i32,
    pub stock_status: String,
    pub status: String,
    pub image_urls: Vec<String>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProductRow {
    pub fn effective_price(&self) -> i64 {
        self.discounted_price.unwrap_or(self.original_price)
    }
}

pub struct ProductFilter {
    pub category: Option<String>,
    pub search: Option<String>,
}

pub async fn list_active(
    db: &PgPool,
    filter: &ProductFilter,
    limit: i64,
    offset: i64,
) -> sqlx::Result<(Vec<ProductRow>, i64)> {
    let pattern = filter.search.as_ref().map(|s| format!("%{s}%"));
    let rows = sqlx::query_as::<_, ProductRow>(
        "SELECT * FROM products \
         WHERE status = 'active' \
           AND ($1::text IS NULL OR category = $1) \
           AND ($2::text IS NULL OR name ILIKE $2 OR brand ILIKE $2) \
         ORDER BY created_at DESC LIMIT $3 OFFSET $4",
    )
    .bind(&filter.category)
    .bind(&pattern)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await?;
    let (total,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM products \
         WHERE status = 'active' \
           AND ($1::text IS NULL OR category = $1) \
           AND ($2::text IS NULL OR name ILIKE $2 OR brand ILIKE $2)",
    )
    .bind(&filter.category)
    .bind(&pattern)
    .fetch_one(db)
    .await?;
    Ok((rows, total))
}

pub async fn get(db: &PgPool, id: &str) -> sqlx::Result<Option<ProductRow>> {
    sqlx::query_as::<_, ProductRow>("SELECT * FROM products WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await
}

pub async fn get_active(db: &PgPool, id: &str) -> sqlx::Result<Option<ProductRow>> {
    sqlx::query_as::<_, ProductRow>("SELECT * FROM products WHERE id = $1 AND status = 'active'")
        .bind(id)
        .fetch_optional(db)
        .await
}

#[allow(clippy::too_many_arguments)]
pub async fn insert<'e, E: PgExecutor<'e>>(
    exec: E,
    id: &str,
    name: &str,
    description: Option<&str>,
    brand: Option<&str>,
    category: Option<&str>,
    original_price: i64,
    discounted_price: Option<i64>,
    currency: &str,
    stock: i32,
    stock_status: &str,
    status: &str,
    image_urls: &[String],
    tags: &[String],
) -> sqlx::Result<ProductRow> {
    sqlx::query_as::<_, ProductRow>(
        "INSERT INTO products \
         (id, name, description, brand, category, original_price, discounted_price, currency, \
          stock, stock_status, status, image_urls, tags, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, NOW(), NOW()) \
         RETURNING *",
    )
    .bind(id)
    .bind(name)
    .bind(description)
    .bind(brand)
    .bind(category)
    .bind(original_price)
    .bind(discounted_price)
    .bind(currency)
    .bind(stock)
    .bind(stock_status)
    .bind(status)
    .bind(image_urls)
    .bind(tags)
    .fetch_one(exec)
    .await
}

#[allow(clippy::too_many_arguments)]
pub async fn update(
    db: &PgPool,
    id: &str,
    name: &str,
    description: Option<&str>,
    brand: Option<&str>,
    category: Option<&str>,
    original_price: i64,
    discounted_price: Option<i64>,
    stock: i32,
    stock_status: &str,
    status: &str,
    image_urls: &[String],
    tags: &[String],
) -> sqlx::Result<Option<ProductRow>> {
    sqlx::query_as::<_, ProductRow>(
        "UPDATE products SET name = $2, description = $3, brand = $4, category = $5, \
         original_price = $6, discounted_price = $7, stock = $8, stock_status = $9, \
         status = $10, image_urls = $11, tags = $12, updated_at = NOW() \
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(name)
    .bind(description)
    .bind(brand)
    .bind(category)
    .bind(original_price)
    .bind(discounted_price)
    .bind(stock)
    .bind(stock_status)
    .bind(status)
    .bind(image_urls)
    .bind(tags)
    .fetch_optional(db)
    .await
}

pub async fn archive<'e, E: PgExecutor<'e>>(exec: E, id: &str) -> sqlx::Result<bool> {
    let result =
        sqlx::query("UPDATE products SET status = 'archived', updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(exec)
            .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn set_stock_status(db: &PgPool, id: &str, stock_status: &str) -> sqlx::Result<bool> {
    let result =
        sqlx::query("UPDATE products SET stock_status = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(stock_status)
            .execute(db)
            .await?;
    Ok(result.rows_affected() == 1)
}

/// Floor-checked decrement; returns false when stock is insufficient so the
/// surrounding transaction can abort. The guard lives in the WHERE clause,
/// which also serializes concurrent decrements on the row lock.
pub async fn decrement_stock<'e, E: PgExecutor<'e>>(
    exec: E,
    id: &str,
    qty: i32,
) -> sqlx::Result<bool> {
    let result = sqlx::query(
        "UPDATE products SET stock = stock - $2, updated_at = NOW() \
         WHERE id = $1 AND stock >= $2",
    )
    .bind(id)
    .bind(qty)
    .execute(exec)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn add_stock<'e, E: PgExecutor<'e>>(
    exec: E,
    id: &str,
    qty: i32,
) -> sqlx::Result<Option<i32>> {
    let row: Option<(i32,)> = sqlx::query_as(
        "UPDATE products SET stock = stock + $2, updated_at = NOW() WHERE id = $1 RETURNING stock",
    )
    .bind(id)
    .bind(qty)
    .fetch_optional(exec)
    .await?;
    Ok(row.map(|(s,)| s))
}
