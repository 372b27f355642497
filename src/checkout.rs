//! Checkout workflow: draft writing, payment invocation, and the
//! post-payment convergence transaction.
//!
//! The client's success callback and the provider's webhook both funnel
//! into [`converge`]; whichever arrives first wins the guarded status
//! update and the other takes the idempotent path. Nothing here trusts
//! client-supplied success claims; the provider is always consulted.

use crate::domain::aggregates::order::{Order, OrderLine, ShippingAddress};
use crate::domain::events::{DomainEvent, OrderEvent, ProductEvent};
use crate::domain::value_objects::Money;
use crate::error::ApiError;
use crate::payments::{PaymentError, VerifiedPayment};
use crate::state::AppState;
use crate::store::{carts, orders, outbox, products, sessions};
use chrono::{Duration as ChronoDuration, Utc};
use uuid::Uuid;

/// Shipping and tax for a cart subtotal, from deployment pricing config.
pub fn quote(subtotal: Money, pricing: &crate::config::PricingConfig) -> (Money, Money) {
    let shipping = if subtotal.minor() >= pricing.free_shipping_threshold_minor {
        Money::zero()
    } else {
        Money::from_minor(pricing.shipping_fee_minor)
    };
    let tax = subtotal.percent_bps(pricing.tax_rate_bps);
    (shipping, tax)
}

pub struct DraftResult {
    pub order: orders::OrderRow,
    pub items: Vec<orders::OrderItemRow>,
}

/// Order-draft writer: snapshots the cart into a `pending_payment` order.
#[tracing::instrument(skip(state, address), fields(user_id = %user_id))]
pub async fn create_draft(
    state: &AppState,
    user_id: &str,
    email: &str,
    address: ShippingAddress,
) -> Result<DraftResult, ApiError> {
    let cart_rows = carts::list_for_user(&state.db, user_id).await?;

    let lines: Vec<OrderLine> = cart_rows
        .iter()
        .map(|row| {
            let unit_price = Money::from_minor(row.unit_price);
            OrderLine {
                id: Uuid::now_v7().to_string(),
                product_id: row.product_id.clone(),
                name: row.name.clone(),
                unit_price,
                quantity: row.quantity as u32,
                line_total: unit_price.multiply(row.quantity as u32),
            }
        })
        .collect();

    let subtotal = lines
        .iter()
        .fold(Money::zero(), |acc, l| acc.add(l.line_total));
    let (shipping, tax) = quote(subtotal, &state.config.pricing);
    let order_number = format!("BS-{:08}", rand::random::<u32>() % 100_000_000);

    // The aggregate validates (rejects an empty cart) and raises events.
    let mut draft = Order::draft(
        order_number,
        user_id,
        email,
        lines,
        shipping,
        tax,
        address,
    )?;

    let mut tx = state.db.begin().await?;
    let new_order = orders::NewOrder {
        id: draft.id(),
        order_number: draft.order_number(),
        user_id: draft.user_id(),
        email: draft.email(),
        subtotal: draft.subtotal().minor(),
        shipping: draft.shipping().minor(),
        tax: draft.tax().minor(),
        total: draft.total().minor(),
        currency: &state.config.payment.currency,
        ship_name: &draft.shipping_address().full_name,
        ship_phone: &draft.shipping_address().phone,
        ship_street: &draft.shipping_address().street,
        ship_city: &draft.shipping_address().city,
        ship_state: &draft.shipping_address().state,
        ship_country: &draft.shipping_address().country,
        ship_postal_code: draft.shipping_address().postal_code.as_deref(),
    };
    let new_items: Vec<orders::NewOrderItem<'_>> = draft
        .items()
        .iter()
        .map(|l| orders::NewOrderItem {
            id: &l.id,
            product_id: &l.product_id,
            name: &l.name,
            unit_price: l.unit_price.minor(),
            quantity: l.quantity as i32,
            line_total: l.line_total.minor(),
        })
        .collect();
    let row = orders::insert_draft(&mut tx, &new_order, &new_items).await?;
    for event in draft.take_events() {
        outbox::append(&mut *tx, &event).await?;
    }
    tx.commit().await?;

    let items = orders::items(&state.db, &row.id).await?;
    tracing::info!(order_id = %row.id, total = row.total, "order draft created");
    Ok(DraftResult { order: row, items })
}

/// Payment invocation: records the attempt and returns the widget config.
/// The draft order id is the payment reference, verbatim.
#[tracing::instrument(skip(state))]
pub async fn init_payment(
    state: &AppState,
    user_id: &str,
    order_id: &str,
) -> Result<crate::payments::WidgetConfig, ApiError> {
    let order = orders::get_for_user(&state.db, order_id, user_id)
        .await?
        .ok_or(ApiError::NotFound("order"))?;
    if order.status != "pending_payment" {
        return Err(ApiError::Validation(format!(
            "order is {}, not awaiting payment",
            order.status
        )));
    }
    orders::record_attempt(&state.db, &order.id, &order.id, order.total, &order.currency).await?;
    let config = state.paystack.widget_config(
        &order.email,
        order.total,
        &order.id,
        serde_json::json!({ "order_number": order.order_number }),
    );
    Ok(config)
}

/// Callback-path completion: verifies the reference with the provider
/// first. A declined verification is recorded on the draft before the
/// error propagates; the draft itself stays pending for the sweep.
pub async fn complete_by_reference(
    state: &AppState,
    reference: &str,
) -> Result<Completion, ApiError> {
    match state.verifier.verify(reference).await {
        Ok(payment) => converge(state, &payment).await,
        Err(err @ PaymentError::Declined { .. }) => {
            orders::mark_payment_failed(&state.db, reference).await?;
            Err(err.into())
        }
        Err(err) => Err(err.into()),
    }
}

pub struct Completion {
    pub order_id: String,
    pub receipt_token: String,
    /// True when another path (webhook vs callback) had already converged
    /// this order and this call changed nothing.
    pub already_processed: bool,
}

/// Converges an order after the provider confirmed the charge: stock
/// decrement, status transition, cart clearing, events and receipt are one
/// transaction, all or none.
#[tracing::instrument(skip(state, payment), fields(reference = %payment.reference))]
pub async fn converge(state: &AppState, payment: &VerifiedPayment) -> Result<Completion, ApiError> {
    let order = orders::get(&state.db, &payment.reference)
        .await?
        .ok_or(ApiError::NotFound("order"))?;

    if payment.amount_minor != order.total || payment.currency != order.currency {
        orders::mark_payment_failed(&state.db, &order.id).await?;
        tracing::warn!(
            order_id = %order.id,
            expected = order.total,
            actual = payment.amount_minor,
            "provider amount mismatch"
        );
        return Err(ApiError::PaymentMismatch {
            expected: order.total,
            actual: payment.amount_minor,
            currency: order.currency,
        });
    }

    let items = orders::items(&state.db, &order.id).await?;

    let mut tx = state.db.begin().await?;
    let won = orders::mark_paid(
        &mut *tx,
        &order.id,
        &payment.reference,
        payment.channel.as_deref(),
        payment.paid_at,
    )
    .await?;

    if !won {
        // Lost the callback/webhook race, or a replay. Nothing to apply;
        // hand back a fresh receipt for the already-converged order.
        tx.rollback().await?;
        let current = orders::get(&state.db, &order.id)
            .await?
            .ok_or(ApiError::NotFound("order"))?;
        if current.payment_status != "completed" {
            return Err(ApiError::Validation(format!(
                "order is {}, cannot complete payment",
                current.status
            )));
        }
        let token = issue_receipt(state, &order.id).await?;
        return Ok(Completion {
            order_id: order.id,
            receipt_token: token,
            already_processed: true,
        });
    }

    for item in &items {
        let ok = products::decrement_stock(&mut *tx, &item.product_id, item.quantity).await?;
        if !ok {
            tx.rollback().await?;
            orders::mark_payment_failed(&state.db, &order.id).await?;
            tracing::error!(
                order_id = %order.id,
                product_id = %item.product_id,
                "insufficient stock at convergence; order left for support"
            );
            return Err(ApiError::Product(
                crate::domain::aggregates::ProductError::InsufficientStock,
            ));
        }
    }

    carts::clear(&mut *tx, &order.user_id).await?;

    let paid_event = DomainEvent::Order(OrderEvent::Paid {
        order_id: order.id.clone(),
        reference: payment.reference.clone(),
        amount_minor: payment.amount_minor,
    });
    outbox::append(&mut *tx, &paid_event).await?;
    for item in &items {
        let stock_event = DomainEvent::Product(ProductEvent::StockAdjusted {
            product_id: item.product_id.clone(),
            delta: -i64::from(item.quantity),
        });
        outbox::append(&mut *tx, &stock_event).await?;
    }

    let token = Uuid::new_v4().simple().to_string();
    let expires_at = Utc::now()
        + ChronoDuration::from_std(state.config.receipt_ttl)
            .unwrap_or_else(|_| ChronoDuration::zero());
    sessions::insert_receipt(&mut *tx, &token, &order.id, expires_at).await?;

    tx.commit().await?;
    tracing::info!(order_id = %order.id, "order converged to processing");
    Ok(Completion {
        order_id: order.id,
        receipt_token: token,
        already_processed: false,
    })
}

async fn issue_receipt(state: &AppState, order_id: &str) -> Result<String, ApiError> {
    let token = Uuid::new_v4().simple().to_string();
    let expires_at = Utc::now()
        + ChronoDuration::from_std(state.config.receipt_ttl)
            .unwrap_or_else(|_| ChronoDuration::zero());
    sessions::insert_receipt(&state.db, &token, order_id, expires_at).await?;
    Ok(token)
}

pub struct Receipt {
    pub order: orders::OrderRow,
    pub items: Vec<orders::OrderItemRow>,
}

/// Confirmation rendering: the token resolves to the authoritative order,
/// never to a client-cached snapshot. Expired tokens 404.
pub async fn receipt(state: &AppState, token: &str) -> Result<Receipt, ApiError> {
    let session = sessions::resolve_receipt(&state.db, token)
        .await?
        .ok_or(ApiError::NotFound("receipt"))?;
    let order = orders::get(&state.db, &session.order_id)
        .await?
        .ok_or(ApiError::NotFound("order"))?;
    let items = orders::items(&state.db, &order.id).await?;
    Ok(Receipt { order, items })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PricingConfig;

    fn pricing() -> PricingConfig {
        PricingConfig {
            shipping_fee_minor: 1_500_00,
            free_shipping_threshold_minor: 50_000_00,
            tax_rate_bps: 750,
        }
    }

    #[test]
    fn quote_charges_flat_shipping_below_threshold() {
        let (shipping, tax) = quote(Money::from_minor(10_000_00), &pricing());
        assert_eq!(shipping.minor(), 1_500_00);
        assert_eq!(tax.minor(), 750_00);
    }

    #[test]
    fn quote_waives_shipping_at_threshold() {
        let (shipping, _) = quote(Money::from_minor(50_000_00), &pricing());
        assert!(shipping.is_zero());
    }

    #[test]
    fn quote_zero_cart() {
        let (shipping, tax) = quote(Money::zero(), &pricing());
        assert_eq!(shipping.minor(), 1_500_00);
        assert!(tax.is_zero());
    }
}
