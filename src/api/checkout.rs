//! Checkout endpoints and the payment webhook.

use super::auth::AuthUser;
use crate::checkout;
use crate::domain::aggregates::order::ShippingAddress;
use crate::domain::value_objects::Reference;
use crate::error::{validation_errors, ApiError};
use crate::payments::paystack::WebhookEvent;
use crate::payments::VerifiedPayment;
use crate::state::AppState;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use validator::Validate;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/checkout", post(create_draft))
        .route("/api/v1/checkout/:order_id/pay", post(init_payment))
        .route("/api/v1/checkout/complete", post(complete))
        .route("/api/v1/checkout/receipt/:token", get(receipt))
        .route("/api/v1/webhooks/payment", post(webhook))
}

#[derive(Debug, Deserialize, Validate)]
struct ShippingPayload {
    #[validate(length(min = 1, max = 120))]
    full_name: String,
    #[validate(length(min = 7, max = 20))]
    phone: String,
    #[validate(length(min = 1, max = 200))]
    street: String,
    #[validate(length(min = 1, max = 80))]
    city: String,
    #[validate(length(min = 1, max = 80))]
    state: String,
    #[validate(length(min = 2, max = 80))]
    country: String,
    postal_code: Option<String>,
}

#[derive(Debug, Serialize)]
struct DraftResponse {
    order: crate::store::orders::OrderRow,
    items: Vec<crate::store::orders::OrderItemRow>,
}

async fn create_draft(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(payload): Json<ShippingPayload>,
) -> Result<(StatusCode, Json<DraftResponse>), ApiError> {
    payload.validate().map_err(validation_errors)?;
    let address = ShippingAddress {
        full_name: payload.full_name,
        phone: payload.phone,
        street: payload.street,
        city: payload.city,
        state: payload.state,
        country: payload.country,
        postal_code: payload.postal_code,
    };
    let draft = checkout::create_draft(&state, &user.user_id, &user.email, address).await?;
    Ok((
        StatusCode::CREATED,
        Json(DraftResponse {
            order: draft.order,
            items: draft.items,
        }),
    ))
}

async fn init_payment(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(order_id): Path<String>,
) -> Result<Json<crate::payments::WidgetConfig>, ApiError> {
    let config = checkout::init_payment(&state, &user.user_id, &order_id).await?;
    Ok(Json(config))
}

#[derive(Debug, Deserialize)]
struct CompletePayload {
    reference: String,
}

#[derive(Debug, Serialize)]
struct CompleteResponse {
    order_id: String,
    receipt_token: String,
    already_processed: bool,
}

/// The client's success callback. The reference is the only input taken
/// from the client, and only as a lookup key; settlement truth comes from
/// the provider.
async fn complete(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
    Json(payload): Json<CompletePayload>,
) -> Result<Json<CompleteResponse>, ApiError> {
    let reference = Reference::new(payload.reference)?;
    let completion = checkout::complete_by_reference(&state, reference.as_str()).await?;
    Ok(Json(CompleteResponse {
        order_id: completion.order_id,
        receipt_token: completion.receipt_token,
        already_processed: completion.already_processed,
    }))
}

#[derive(Debug, Serialize)]
struct ReceiptResponse {
    order: crate::store::orders::OrderRow,
    items: Vec<crate::store::orders::OrderItemRow>,
}

async fn receipt(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<ReceiptResponse>, ApiError> {
    let receipt = checkout::receipt(&state, &token).await?;
    Ok(Json(ReceiptResponse {
        order: receipt.order,
        items: receipt.items,
    }))
}

/// Provider webhook. Signature-checked against the raw body; unsigned or
/// tampered posts are rejected before any parsing.
async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let signature = headers
        .get("x-paystack-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::Unauthorized)?;
    state
        .paystack
        .verify_webhook_signature(&body, signature)
        .map_err(|_| ApiError::Unauthorized)?;

    let event: WebhookEvent = serde_json::from_slice(&body)
        .map_err(|e| ApiError::Validation(format!("malformed webhook body: {e}")))?;

    if event.event != "charge.success" || event.data.status != "success" {
        // Not ours to act on; acknowledge so the provider stops retrying.
        return Ok(StatusCode::OK);
    }

    let payment = VerifiedPayment {
        reference: event.data.reference,
        amount_minor: event.data.amount,
        currency: event.data.currency,
        channel: event.data.channel,
        paid_at: event.data.paid_at.unwrap_or_else(Utc::now),
    };
    match checkout::converge(&state, &payment).await {
        Ok(_) => Ok(StatusCode::OK),
        // An unknown reference may be a charge for a different system
        // sharing the key; acknowledged, logged, dropped.
        Err(ApiError::NotFound(_)) => {
            tracing::warn!(reference = %payment.reference, "webhook for unknown order");
            Ok(StatusCode::OK)
        }
        Err(err) => Err(err),
    }
}
