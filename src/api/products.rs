//! Product catalog: public browsing plus the admin back office.

use super::auth::AdminUser;
use super::{PaginatedResponse, Pagination};
use crate::domain::aggregates::product::{Product, ProductStatus, StockStatus};
use crate::domain::events::{DomainEvent, ProductEvent};
use crate::domain::value_objects::Money;
use crate::error::{validation_errors, ApiError};
use crate::state::AppState;
use crate::store::products::{self, ProductFilter, ProductRow};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use validator::Validate;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/products", get(list))
        .route("/api/v1/products/:id", get(get_one))
        .route("/api/v1/admin/products", post(create))
        .route(
            "/api/v1/admin/products/:id",
            put(update).delete(archive),
        )
        .route("/api/v1/admin/products/:id/stock-status", put(set_stock_status))
        .route("/api/v1/admin/products/:id/stock", post(add_stock))
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    page: Option<u32>,
    per_page: Option<u32>,
    category: Option<String>,
    search: Option<String>,
}

async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<PaginatedResponse<ProductRow>>, ApiError> {
    let page = Pagination {
        page: query.page,
        per_page: query.per_page,
    };
    let (limit, offset) = page.limit_offset();
    let filter = ProductFilter {
        category: query.category,
        search: query.search,
    };
    let (data, total) = products::list_active(&state.db, &filter, limit, offset).await?;
    Ok(Json(PaginatedResponse {
        data,
        total,
        page: page.clamp().0,
    }))
}

async fn get_one(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ProductRow>, ApiError> {
    products::get_active(&state.db, &id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("product"))
}

#[derive(Debug, Deserialize, Validate)]
struct ProductPayload {
    #[validate(length(min = 1, max = 200))]
    name: String,
    description: Option<String>,
    brand: Option<String>,
    category: Option<String>,
    #[validate(range(min = 0))]
    original_price: i64,
    #[validate(range(min = 0))]
    discounted_price: Option<i64>,
    #[validate(range(min = 0))]
    stock: i32,
    stock_status: Option<String>,
    status: Option<String>,
    #[serde(default)]
    image_urls: Vec<String>,
    #[serde(default)]
    tags: Vec<String>,
}

fn parse_stock_status(s: Option<&str>) -> Result<StockStatus, ApiError> {
    match s {
        None => Ok(StockStatus::InStock),
        Some(raw) => StockStatus::parse(raw)
            .ok_or_else(|| ApiError::Validation(format!("unknown stock status {raw:?}"))),
    }
}

fn parse_status(s: Option<&str>) -> Result<ProductStatus, ApiError> {
    match s {
        None => Ok(ProductStatus::Draft),
        Some(raw) => ProductStatus::parse(raw)
            .ok_or_else(|| ApiError::Validation(format!("unknown product status {raw:?}"))),
    }
}

async fn create(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Json(payload): Json<ProductPayload>,
) -> Result<(StatusCode, Json<ProductRow>), ApiError> {
    payload.validate().map_err(validation_errors)?;
    let stock_status = parse_stock_status(payload.stock_status.as_deref())?;
    let status = parse_status(payload.status.as_deref())?;

    // The aggregate enforces naming and price rules before anything is
    // persisted; the row insert reuses its id.
    let mut product = Product::create(&payload.name, Money::from_minor(payload.original_price))?;
    product.set_prices(
        Money::from_minor(payload.original_price),
        payload.discounted_price.map(Money::from_minor),
    )?;
    if status == ProductStatus::Active {
        product.publish()?;
    }

    let mut tx = state.db.begin().await?;
    let row = products::insert(
        &mut *tx,
        product.id(),
        &payload.name,
        payload.description.as_deref(),
        payload.brand.as_deref(),
        payload.category.as_deref(),
        payload.original_price,
        payload.discounted_price,
        &state.config.payment.currency,
        payload.stock,
        stock_status.as_str(),
        status.as_str(),
        &payload.image_urls,
        &payload.tags,
    )
    .await?;
    for event in product.take_events() {
        crate::store::outbox::append(&mut *tx, &event).await?;
    }
    tx.commit().await?;
    tracing::info!(product_id = %row.id, "product created");
    Ok((StatusCode::CREATED, Json(row)))
}

async fn update(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(id): Path<String>,
    Json(payload): Json<ProductPayload>,
) -> Result<Json<ProductRow>, ApiError> {
    payload.validate().map_err(validation_errors)?;
    let stock_status = parse_stock_status(payload.stock_status.as_deref())?;
    let status = parse_status(payload.status.as_deref())?;
    if let Some(d) = payload.discounted_price {
        if d > payload.original_price {
            return Err(crate::domain::aggregates::ProductError::DiscountAbovePrice.into());
        }
    }

    products::update(
        &state.db,
        &id,
        &payload.name,
        payload.description.as_deref(),
        payload.brand.as_deref(),
        payload.category.as_deref(),
        payload.original_price,
        payload.discounted_price,
        payload.stock,
        stock_status.as_str(),
        status.as_str(),
        &payload.image_urls,
        &payload.tags,
    )
    .await?
    .map(Json)
    .ok_or(ApiError::NotFound("product"))
}

async fn archive(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let mut tx = state.db.begin().await?;
    if !products::archive(&mut *tx, &id).await? {
        tx.rollback().await?;
        return Err(ApiError::NotFound("product"));
    }
    let event = DomainEvent::Product(ProductEvent::Archived {
        product_id: id.clone(),
    });
    crate::store::outbox::append(&mut *tx, &event).await?;
    tx.commit().await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct StockStatusPayload {
    stock_status: String,
}

async fn set_stock_status(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(id): Path<String>,
    Json(payload): Json<StockStatusPayload>,
) -> Result<StatusCode, ApiError> {
    let status = parse_stock_status(Some(&payload.stock_status))?;
    if products::set_stock_status(&state.db, &id, status.as_str()).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("product"))
    }
}

#[derive(Debug, Deserialize, Validate)]
struct AddStockPayload {
    #[validate(range(min = 1, max = 1_000_000))]
    quantity: i32,
}

async fn add_stock(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(id): Path<String>,
    Json(payload): Json<AddStockPayload>,
) -> Result<Json<serde_json::Value>, ApiError> {
    payload.validate().map_err(validation_errors)?;
    let mut tx = state.db.begin().await?;
    let stock = products::add_stock(&mut *tx, &id, payload.quantity)
        .await?
        .ok_or(ApiError::NotFound("product"))?;
    let event = DomainEvent::Product(ProductEvent::StockAdjusted {
        product_id: id.clone(),
        delta: i64::from(payload.quantity),
    });
    crate::store::outbox::append(&mut *tx, &event).await?;
    tx.commit().await?;
    Ok(Json(serde_json::json!({ "id": id, "stock": stock })))
}
