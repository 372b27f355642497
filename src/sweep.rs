//! Background reconciliation: every draft reaches a terminal state.
//!
//! The sweep closes the gap the checkout flow cannot: a shopper whose
//! browser died between the widget's success screen and the callback.
//! Drafts with a recorded payment attempt get one provider re-check and
//! are converged if the charge actually settled; everything else past the
//! TTL is expired. The sweep also drains the transactional outbox.

use crate::checkout;
use crate::domain::events::{ConsultationEvent, DomainEvent, OrderEvent};
use crate::payments::PaymentError;
use crate::state::AppState;
use crate::store::{consultations, orders, outbox, sessions};
use chrono::{Duration as ChronoDuration, Utc};

const SWEEP_BATCH: i64 = 50;

pub async fn run(state: AppState) {
    let mut ticker = tokio::time::interval(state.config.sweep_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        if let Err(error) = tick(&state).await {
            tracing::error!(%error, "sweep tick failed");
        }
    }
}

#[tracing::instrument(skip(state))]
pub async fn tick(state: &AppState) -> anyhow::Result<()> {
    expire_stale_orders(state).await?;
    expire_stale_consultations(state).await?;
    drain_outbox(state).await?;
    let purged = sessions::purge_expired_receipts(&state.db).await?;
    if purged > 0 {
        tracing::debug!(purged, "expired receipt sessions purged");
    }
    Ok(())
}

async fn expire_stale_orders(state: &AppState) -> anyhow::Result<()> {
    let cutoff = Utc::now()
        - ChronoDuration::from_std(state.config.draft_ttl).unwrap_or(ChronoDuration::zero());
    let stale = orders::stale_pending(&state.db, cutoff, SWEEP_BATCH).await?;
    for order in stale {
        let attempted = orders::attempt_for_order(&state.db, &order.id).await?.is_some();
        if attempted {
            // The widget was opened for this draft; ask the provider
            // before declaring it dead.
            match state.verifier.verify(&order.id).await {
                Ok(payment) => {
                    match checkout::converge(state, &payment).await {
                        Ok(c) if !c.already_processed => {
                            tracing::info!(order_id = %order.id, "sweep recovered a paid draft");
                        }
                        Ok(_) => {}
                        Err(error) => {
                            tracing::warn!(order_id = %order.id, %error, "sweep convergence failed");
                        }
                    }
                    continue;
                }
                Err(PaymentError::UnknownReference { .. })
                | Err(PaymentError::Declined { .. }) => {
                    // No settled charge exists; safe to expire.
                }
                Err(error) => {
                    // Provider unreachable; leave the draft for next tick.
                    tracing::warn!(order_id = %order.id, %error, "verify failed, deferring");
                    continue;
                }
            }
        }
        expire_order(state, &order.id).await?;
    }
    Ok(())
}

async fn expire_order(state: &AppState, order_id: &str) -> anyhow::Result<()> {
    let mut tx = state.db.begin().await?;
    let expired = orders::set_status(&mut *tx, order_id, "pending_payment", "expired").await?;
    if expired {
        let event = DomainEvent::Order(OrderEvent::Expired {
            order_id: order_id.to_string(),
        });
        outbox::append(&mut *tx, &event).await?;
        tx.commit().await?;
        tracing::info!(order_id, "stale draft expired");
    } else {
        tx.rollback().await?;
    }
    Ok(())
}

async fn expire_stale_consultations(state: &AppState) -> anyhow::Result<()> {
    let cutoff = Utc::now()
        - ChronoDuration::from_std(state.config.draft_ttl).unwrap_or(ChronoDuration::zero());
    let stale = consultations::stale_pending(&state.db, cutoff, SWEEP_BATCH).await?;
    for booking in stale {
        let mut tx = state.db.begin().await?;
        let expired =
            consultations::set_status(&mut *tx, &booking.id, "pending", "expired").await?;
        if expired {
            let event = DomainEvent::Consultation(ConsultationEvent::Expired {
                reference: booking.reference.clone(),
            });
            outbox::append(&mut *tx, &event).await?;
            tx.commit().await?;
            tracing::info!(reference = %booking.reference, "stale consultation expired");
        } else {
            tx.rollback().await?;
        }
    }
    Ok(())
}

async fn drain_outbox(state: &AppState) -> anyhow::Result<()> {
    let batch = outbox::fetch_batch(&state.db, SWEEP_BATCH).await?;
    if batch.is_empty() {
        return Ok(());
    }
    for row in batch {
        if let Some(nats) = &state.nats {
            let payload = serde_json::to_vec(&row.payload)?;
            if let Err(error) = nats.publish(row.subject.clone(), payload.into()).await {
                tracing::warn!(%error, subject = %row.subject, "outbox publish failed");
                // Row stays; retried next tick.
                continue;
            }
        } else {
            tracing::debug!(subject = %row.subject, aggregate_id = %row.aggregate_id, "event dropped, no bus configured");
        }
        outbox::delete(&state.db, &row.id).await?;
    }
    if let Some(nats) = &state.nats {
        if let Err(error) = nats.flush().await {
            tracing::warn!(%error, "nats flush failed");
        }
    }
    Ok(())
}
