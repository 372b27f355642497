//! Cart endpoints, scoped to the authenticated user.

use super::auth::AuthUser;
use crate::domain::aggregates::cart::{new_item_id, Cart, CartItem};
use crate::domain::value_objects::Money;
use crate::error::{validation_errors, ApiError};
use crate::state::AppState;
use crate::store::{carts, products};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use validator::Validate;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/cart", get(get_cart).delete(clear_cart))
        .route("/api/v1/cart/items", post(add_item))
        .route(
            "/api/v1/cart/items/:product_id",
            put(update_item).delete(remove_item),
        )
}

#[derive(Debug, Serialize)]
struct CartView {
    items: Vec<carts::CartItemRow>,
    subtotal: i64,
    item_count: usize,
}

fn to_domain(user_id: &str, rows: &[carts::CartItemRow]) -> Cart {
    Cart::from_items(
        user_id,
        rows.iter()
            .map(|r| CartItem {
                id: r.id.clone(),
                product_id: r.product_id.clone(),
                name: r.name.clone(),
                unit_price: Money::from_minor(r.unit_price),
                quantity: r.quantity as u32,
                image_url: r.image_url.clone(),
            })
            .collect(),
    )
}

async fn get_cart(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<CartView>, ApiError> {
    let rows = carts::list_for_user(&state.db, &user.user_id).await?;
    let cart = to_domain(&user.user_id, &rows);
    Ok(Json(CartView {
        subtotal: cart.subtotal().minor(),
        item_count: cart.item_count(),
        items: rows,
    }))
}

#[derive(Debug, Deserialize, Validate)]
struct AddItemPayload {
    product_id: String,
    #[validate(range(min = 1, max = 99))]
    quantity: i32,
}

async fn add_item(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(payload): Json<AddItemPayload>,
) -> Result<(StatusCode, Json<carts::CartItemRow>), ApiError> {
    payload.validate().map_err(validation_errors)?;
    let product = products::get_active(&state.db, &payload.product_id)
        .await?
        .ok_or(ApiError::NotFound("product"))?;

    // Snapshot name/price/image at add time.
    let row = carts::upsert_item(
        &state.db,
        &new_item_id(),
        &user.user_id,
        &product.id,
        &product.name,
        product.effective_price(),
        payload.quantity,
        product.image_urls.first().map(|s| s.as_str()),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(row)))
}

#[derive(Debug, Deserialize, Validate)]
struct UpdateItemPayload {
    #[validate(range(min = 0, max = 99))]
    quantity: i32,
}

async fn update_item(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(product_id): Path<String>,
    Json(payload): Json<UpdateItemPayload>,
) -> Result<StatusCode, ApiError> {
    payload.validate().map_err(validation_errors)?;
    if carts::update_quantity(&state.db, &user.user_id, &product_id, payload.quantity).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::Cart(crate::domain::aggregates::CartError::ItemNotFound))
    }
}

async fn remove_item(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(product_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if carts::remove_item(&state.db, &user.user_id, &product_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::Cart(crate::domain::aggregates::CartError::ItemNotFound))
    }
}

async fn clear_cart(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<StatusCode, ApiError> {
    carts::clear(&state.db, &user.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
