//! Order history (storefront) and order management (back office).

use super::auth::{AdminUser, AuthUser};
use super::{PaginatedResponse, Pagination};
use crate::domain::aggregates::order::{Order, OrderLine, OrderStatus, PaymentState, ShippingAddress};
use crate::domain::value_objects::Money;
use crate::error::ApiError;
use crate::state::AppState;
use crate::store::{orders, outbox};
use axum::extract::{Path, Query, State};
use axum::routing::{get, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/orders", get(list_mine))
        .route("/api/v1/orders/:id", get(get_mine))
        .route("/api/v1/admin/orders", get(list_all))
        .route("/api/v1/admin/orders/:id", get(get_any))
        .route("/api/v1/admin/orders/:id/status", put(set_status))
}

#[derive(Debug, Serialize)]
struct OrderDetail {
    order: orders::OrderRow,
    items: Vec<orders::OrderItemRow>,
}

async fn list_mine(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(page): Query<Pagination>,
) -> Result<Json<PaginatedResponse<orders::OrderRow>>, ApiError> {
    let (limit, offset) = page.limit_offset();
    let (data, total) = orders::list_for_user(&state.db, &user.user_id, limit, offset).await?;
    Ok(Json(PaginatedResponse {
        data,
        total,
        page: page.clamp().0,
    }))
}

async fn get_mine(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<OrderDetail>, ApiError> {
    let order = orders::get_for_user(&state.db, &id, &user.user_id)
        .await?
        .ok_or(ApiError::NotFound("order"))?;
    let items = orders::items(&state.db, &id).await?;
    Ok(Json(OrderDetail { order, items }))
}

#[derive(Debug, Deserialize)]
struct AdminListQuery {
    page: Option<u32>,
    per_page: Option<u32>,
    status: Option<String>,
}

async fn list_all(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Query(query): Query<AdminListQuery>,
) -> Result<Json<PaginatedResponse<orders::OrderRow>>, ApiError> {
    if let Some(s) = &query.status {
        if OrderStatus::parse(s).is_none() {
            return Err(ApiError::Validation(format!("unknown order status {s:?}")));
        }
    }
    let page = Pagination {
        page: query.page,
        per_page: query.per_page,
    };
    let (limit, offset) = page.limit_offset();
    let (data, total) =
        orders::list_all(&state.db, query.status.as_deref(), limit, offset).await?;
    Ok(Json(PaginatedResponse {
        data,
        total,
        page: page.clamp().0,
    }))
}

async fn get_any(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(id): Path<String>,
) -> Result<Json<OrderDetail>, ApiError> {
    let order = orders::get(&state.db, &id)
        .await?
        .ok_or(ApiError::NotFound("order"))?;
    let items = orders::items(&state.db, &id).await?;
    Ok(Json(OrderDetail { order, items }))
}

#[derive(Debug, Deserialize)]
struct StatusPayload {
    status: String,
}

/// Rebuilds the aggregate from its row so transitions go through the state
/// machine, then applies the guarded update.
fn restore(row: &orders::OrderRow, items: &[orders::OrderItemRow]) -> Result<Order, ApiError> {
    let status = OrderStatus::parse(&row.status)
        .ok_or_else(|| ApiError::Validation(format!("corrupt order status {:?}", row.status)))?;
    let payment = PaymentState::parse(&row.payment_status).ok_or_else(|| {
        ApiError::Validation(format!("corrupt payment status {:?}", row.payment_status))
    })?;
    let lines = items
        .iter()
        .map(|i| OrderLine {
            id: i.id.clone(),
            product_id: i.product_id.clone(),
            name: i.name.clone(),
            unit_price: Money::from_minor(i.unit_price),
            quantity: i.quantity as u32,
            line_total: Money::from_minor(i.line_total),
        })
        .collect();
    Ok(Order::restore(
        row.id.clone(),
        row.order_number.clone(),
        row.user_id.clone(),
        row.email.clone(),
        status,
        payment,
        lines,
        Money::from_minor(row.subtotal),
        Money::from_minor(row.shipping),
        Money::from_minor(row.tax),
        Money::from_minor(row.total),
        ShippingAddress {
            full_name: row.ship_name.clone(),
            phone: row.ship_phone.clone(),
            street: row.ship_street.clone(),
            city: row.ship_city.clone(),
            state: row.ship_state.clone(),
            country: row.ship_country.clone(),
            postal_code: row.ship_postal_code.clone(),
        },
        row.payment_reference.clone(),
        row.payment_channel.clone(),
        row.paid_at,
        row.created_at,
        row.updated_at,
    ))
}

async fn set_status(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(id): Path<String>,
    Json(payload): Json<StatusPayload>,
) -> Result<Json<orders::OrderRow>, ApiError> {
    let target = OrderStatus::parse(&payload.status)
        .ok_or_else(|| ApiError::Validation(format!("unknown order status {:?}", payload.status)))?;

    let row = orders::get(&state.db, &id)
        .await?
        .ok_or(ApiError::NotFound("order"))?;
    let items = orders::items(&state.db, &id).await?;
    let mut order = restore(&row, &items)?;

    // The aggregate decides whether the transition is legal; the guarded
    // SQL update makes it race-safe.
    match target {
        OrderStatus::Completed => order.complete()?,
        OrderStatus::Cancelled => order.cancel()?,
        other => {
            return Err(ApiError::Validation(format!(
                "status {:?} cannot be set directly",
                other.as_str()
            )))
        }
    }

    let mut tx = state.db.begin().await?;
    let moved = orders::set_status(&mut *tx, &id, &row.status, target.as_str()).await?;
    if !moved {
        tx.rollback().await?;
        return Err(ApiError::Order(
            crate::domain::aggregates::OrderError::InvalidTransition {
                from: OrderStatus::parse(&row.status).unwrap_or_default(),
                to: target,
            },
        ));
    }
    for event in order.take_events() {
        outbox::append(&mut *tx, &event).await?;
    }
    tx.commit().await?;

    orders::get(&state.db, &id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("order"))
}
