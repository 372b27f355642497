//! Favorites (wishlist) endpoints.

use super::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;
use crate::store::{favorites, products};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/favorites", get(list))
        .route("/api/v1/favorites/:product_id", put(add).delete(remove))
}

async fn list(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<favorites::FavoriteRow>>, ApiError> {
    let rows = favorites::list_for_user(&state.db, &user.user_id).await?;
    Ok(Json(rows))
}

async fn add(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(product_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    products::get_active(&state.db, &product_id)
        .await?
        .ok_or(ApiError::NotFound("product"))?;
    favorites::add(&state.db, &user.user_id, &product_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn remove(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(product_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if favorites::remove(&state.db, &user.user_id, &product_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("favorite"))
    }
}
