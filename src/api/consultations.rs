//! Consultation booking endpoints.

use super::auth::{AdminUser, AuthUser};
use super::{PaginatedResponse, Pagination};
use crate::domain::aggregates::consultation::{Consultation, ConsultationStatus};
use crate::domain::value_objects::Reference;
use crate::error::{validation_errors, ApiError};
use crate::state::AppState;
use crate::store::{consultations, outbox};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/consultations", get(list_mine).post(book))
        .route("/api/v1/consultations/:reference/finalize", post(finalize))
        .route("/api/v1/admin/consultations", get(list_all))
        .route("/api/v1/admin/consultations/:id/status", put(set_status))
}

#[derive(Debug, Deserialize, Validate)]
struct BookPayload {
    /// Client-generated reference; survives a page reload on the client
    /// side and makes re-submission idempotent. Generated when absent.
    reference: Option<String>,
    #[validate(length(min = 1, max = 120))]
    client_name: String,
    #[validate(email)]
    client_email: String,
    #[validate(length(min = 7, max = 20))]
    client_phone: String,
    #[validate(length(min = 1, max = 80))]
    service: String,
    preferred_date: NaiveDate,
    #[validate(length(min = 1, max = 20))]
    time_slot: String,
    notes: Option<String>,
}

async fn book(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(payload): Json<BookPayload>,
) -> Result<(StatusCode, Json<consultations::ConsultationRow>), ApiError> {
    payload.validate().map_err(validation_errors)?;
    let reference = match &payload.reference {
        Some(raw) => Reference::new(raw.clone())?,
        None => Reference::generate("CONS"),
    };

    // Re-submitting the same reference returns the existing draft instead
    // of double-booking.
    if let Some(existing) =
        consultations::get_by_reference(&state.db, reference.as_str()).await?
    {
        if existing.user_id != user.user_id {
            return Err(ApiError::Forbidden);
        }
        return Ok((StatusCode::OK, Json(existing)));
    }

    let mut booking = Consultation::book(
        reference,
        user.user_id.clone(),
        payload.client_name.clone(),
        payload.client_email.clone(),
        payload.client_phone.clone(),
        payload.service.clone(),
        payload.preferred_date,
        payload.time_slot.clone(),
        payload.notes.clone(),
    );

    let mut tx = state.db.begin().await?;
    let row = consultations::insert(
        &mut *tx,
        booking.id(),
        booking.reference().as_str(),
        booking.user_id(),
        booking.client_name(),
        booking.client_email(),
        booking.client_phone(),
        booking.service(),
        booking.preferred_date(),
        booking.time_slot(),
        booking.notes(),
    )
    .await?;
    for event in booking.take_events() {
        outbox::append(&mut *tx, &event).await?;
    }
    tx.commit().await?;
    tracing::info!(reference = %row.reference, "consultation booked");
    Ok((StatusCode::CREATED, Json(row)))
}

#[derive(Debug, Serialize)]
struct FinalizeResponse {
    reference: String,
    status: String,
    already_confirmed: bool,
}

/// Finalize a pending draft. Idempotent by reference.
async fn finalize(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(reference): Path<String>,
) -> Result<Json<FinalizeResponse>, ApiError> {
    let row = consultations::get_by_reference(&state.db, &reference)
        .await?
        .ok_or(ApiError::NotFound("consultation"))?;
    if row.user_id != user.user_id {
        return Err(ApiError::Forbidden);
    }

    match row.status.as_str() {
        "confirmed" => Ok(Json(FinalizeResponse {
            reference: row.reference,
            status: "confirmed".into(),
            already_confirmed: true,
        })),
        "pending" => {
            let mut tx = state.db.begin().await?;
            let confirmed =
                consultations::set_status(&mut *tx, &row.id, "pending", "confirmed").await?;
            if confirmed {
                let event = crate::domain::events::DomainEvent::Consultation(
                    crate::domain::events::ConsultationEvent::Confirmed {
                        reference: row.reference.clone(),
                    },
                );
                outbox::append(&mut *tx, &event).await?;
            }
            tx.commit().await?;
            Ok(Json(FinalizeResponse {
                reference: row.reference,
                status: "confirmed".into(),
                already_confirmed: !confirmed,
            }))
        }
        other => Err(ApiError::Consultation(
            crate::domain::aggregates::ConsultationError::InvalidTransition {
                from: ConsultationStatus::parse(other).unwrap_or_default(),
                to: ConsultationStatus::Confirmed,
            },
        )),
    }
}

async fn list_mine(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<consultations::ConsultationRow>>, ApiError> {
    let rows = consultations::list_for_user(&state.db, &user.user_id).await?;
    Ok(Json(rows))
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
) -> Result<Json<PaginatedResponse<consultations::ConsultationRow>>, ApiError> {
    if let Some(s) = &query.status {
        if ConsultationStatus::parse(s).is_none() {
            return Err(ApiError::Validation(format!(
                "unknown consultation status {s:?}"
            )));
        }
    }
    let page = Pagination {
        page: query.page,
        per_page: query.per_page,
    };
    let (limit, offset) = page.limit_offset();
    let (data, total) =
        consultations::list_all(&state.db, query.status.as_deref(), limit, offset).await?;
    Ok(Json(PaginatedResponse {
        data,
        total,
        page: page.clamp().0,
    }))
}

#[derive(Debug, Deserialize)]
struct StatusPayload {
    status: String,
}

async fn set_status(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(id): Path<String>,
    Json(payload): Json<StatusPayload>,
) -> Result<StatusCode, ApiError> {
    let target = ConsultationStatus::parse(&payload.status).ok_or_else(|| {
        ApiError::Validation(format!("unknown consultation status {:?}", payload.status))
    })?;
    let from = match target {
        ConsultationStatus::Completed => "confirmed",
        ConsultationStatus::Cancelled => "pending",
        _ => {
            return Err(ApiError::Validation(format!(
                "status {:?} cannot be set directly",
                target.as_str()
            )))
        }
    };
    // Cancellation is allowed from either live state.
    let moved = if target == ConsultationStatus::Cancelled {
        consultations::set_status(&state.db, &id, "pending", "cancelled").await?
            || consultations::set_status(&state.db, &id, "confirmed", "cancelled").await?
    } else {
        consultations::set_status(&state.db, &id, from, target.as_str()).await?
    };
    if moved {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("consultation"))
    }
}
