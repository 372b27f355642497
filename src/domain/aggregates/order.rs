//! Order aggregate and its state machine.
//!
//! Drafts are written with status `pending_payment` before the hosted
//! widget ever opens. Every draft reaches a terminal state: verified
//! payment moves it to `processing`, the reconciliation sweep moves
//! abandoned drafts to `expired`.

use crate::domain::events::{DomainEvent, OrderEvent};
use crate::domain::value_objects::Money;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug)]
pub struct Order {
    id: String,
    order_number: String,
    user_id: String,
    email: String,
    status: OrderStatus,
    payment: PaymentState,
    items: Vec<OrderLine>,
    subtotal: Money,
    shipping: Money,
    tax: Money,
    total: Money,
    shipping_address: ShippingAddress,
    payment_reference: Option<String>,
    payment_channel: Option<String>,
    paid_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    events: Vec<DomainEvent>,
}

#[derive(Clone, Debug)]
pub struct OrderLine {
    pub id: String,
    pub product_id: String,
    pub name: String,
    pub unit_price: Money,
    pub quantity: u32,
    pub line_total: Money,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub full_name: String,
    pub phone: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub postal_code: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    PendingPayment,
    Processing,
    Completed,
    Cancelled,
    Expired,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::PendingPayment => "pending_payment",
            OrderStatus::Processing => "processing",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Expired => "expired",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending_payment" => Some(OrderStatus::PendingPayment),
            "processing" => Some(OrderStatus::Processing),
            "completed" => Some(OrderStatus::Completed),
            "cancelled" => Some(OrderStatus::Cancelled),
            "expired" => Some(OrderStatus::Expired),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Completed | OrderStatus::Cancelled | OrderStatus::Expired
        )
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentState {
    #[default]
    Pending,
    Completed,
    Failed,
}

impl PaymentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentState::Pending => "pending",
            PaymentState::Completed => "completed",
            PaymentState::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(PaymentState::Pending),
            "completed" => Some(PaymentState::Completed),
            "failed" => Some(PaymentState::Failed),
            _ => None,
        }
    }
}

impl Order {
    /// Order-draft writer: snapshots the cart lines and totals into a new
    /// `pending_payment` draft.
    pub fn draft(
        order_number: impl Into<String>,
        user_id: impl Into<String>,
        email: impl Into<String>,
        items: Vec<OrderLine>,
        shipping: Money,
        tax: Money,
        shipping_address: ShippingAddress,
    ) -> Result<Self, OrderError> {
        if items.is_empty() {
            return Err(OrderError::NoItems);
        }
        let subtotal = items
            .iter()
            .fold(Money::zero(), |acc, i| acc.add(i.line_total));
        let total = subtotal.add(shipping).add(tax);
        let id = Uuid::now_v7().to_string();
        let user_id = user_id.into();
        let now = Utc::now();
        let mut order = Self {
            id: id.clone(),
            order_number: order_number.into(),
            user_id: user_id.clone(),
            email: email.into(),
            status: OrderStatus::PendingPayment,
            payment: PaymentState::Pending,
            items,
            subtotal,
            shipping,
            tax,
            total,
            shipping_address,
            payment_reference: None,
            payment_channel: None,
            paid_at: None,
            created_at: now,
            updated_at: now,
            events: vec![],
        };
        order.raise_event(DomainEvent::Order(OrderEvent::Created {
            order_id: id,
            user_id,
            total_minor: total.minor(),
        }));
        Ok(order)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        id: String,
        order_number: String,
        user_id: String,
        email: String,
        status: OrderStatus,
        payment: PaymentState,
        items: Vec<OrderLine>,
        subtotal: Money,
        shipping: Money,
        tax: Money,
        total: Money,
        shipping_address: ShippingAddress,
        payment_reference: Option<String>,
        payment_channel: Option<String>,
        paid_at: Option<DateTime<Utc>>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            order_number,
            user_id,
            email,
            status,
            payment,
            items,
            subtotal,
            shipping,
            tax,
            total,
            shipping_address,
            payment_reference,
            payment_channel,
            paid_at,
            created_at,
            updated_at,
            events: vec![],
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
    pub fn order_number(&self) -> &str {
        &self.order_number
    }
    pub fn user_id(&self) -> &str {
        &self.user_id
    }
    pub fn email(&self) -> &str {
        &self.email
    }
    pub fn status(&self) -> OrderStatus {
        self.status
    }
    pub fn payment(&self) -> PaymentState {
        self.payment
    }
    pub fn items(&self) -> &[OrderLine] {
        &self.items
    }
    pub fn subtotal(&self) -> Money {
        self.subtotal
    }
    pub fn shipping(&self) -> Money {
        self.shipping
    }
    pub fn tax(&self) -> Money {
        self.tax
    }
    pub fn total(&self) -> Money {
        self.total
    }
    pub fn shipping_address(&self) -> &ShippingAddress {
        &self.shipping_address
    }
    pub fn payment_reference(&self) -> Option<&str> {
        self.payment_reference.as_deref()
    }
    pub fn payment_channel(&self) -> Option<&str> {
        self.payment_channel.as_deref()
    }
    pub fn paid_at(&self) -> Option<DateTime<Utc>> {
        self.paid_at
    }
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Verified payment: `pending_payment` -> `processing`.
    pub fn mark_paid(
        &mut self,
        reference: impl Into<String>,
        channel: Option<String>,
        paid_at: DateTime<Utc>,
    ) -> Result<(), OrderError> {
        if self.status != OrderStatus::PendingPayment {
            return Err(OrderError::InvalidTransition {
                from: self.status,
                to: OrderStatus::Processing,
            });
        }
        let reference = reference.into();
        self.status = OrderStatus::Processing;
        self.payment = PaymentState::Completed;
        self.payment_reference = Some(reference.clone());
        self.payment_channel = channel;
        self.paid_at = Some(paid_at);
        self.touch();
        self.raise_event(DomainEvent::Order(OrderEvent::Paid {
            order_id: self.id.clone(),
            reference,
            amount_minor: self.total.minor(),
        }));
        Ok(())
    }

    /// Verification came back declined or mismatched. The draft stays
    /// pending for the sweep; only the payment state records the failure.
    pub fn mark_payment_failed(&mut self) {
        if self.status == OrderStatus::PendingPayment {
            self.payment = PaymentState::Failed;
            self.touch();
        }
    }

    /// Fulfillment done: `processing` -> `completed`.
    pub fn complete(&mut self) -> Result<(), OrderError> {
        if self.status != OrderStatus::Processing {
            return Err(OrderError::InvalidTransition {
                from: self.status,
                to: OrderStatus::Completed,
            });
        }
        self.status = OrderStatus::Completed;
        self.touch();
        self.raise_event(DomainEvent::Order(OrderEvent::Completed {
            order_id: self.id.clone(),
        }));
        Ok(())
    }

    pub fn cancel(&mut self) -> Result<(), OrderError> {
        if self.status.is_terminal() {
            return Err(OrderError::InvalidTransition {
                from: self.status,
                to: OrderStatus::Cancelled,
            });
        }
        self.status = OrderStatus::Cancelled;
        self.touch();
        self.raise_event(DomainEvent::Order(OrderEvent::Cancelled {
            order_id: self.id.clone(),
        }));
        Ok(())
    }

    /// Sweep transition for abandoned drafts.
    pub fn expire(&mut self) -> Result<(), OrderError> {
        if self.status != OrderStatus::PendingPayment {
            return Err(OrderError::InvalidTransition {
                from: self.status,
                to: OrderStatus::Expired,
            });
        }
        self.status = OrderStatus::Expired;
        self.touch();
        self.raise_event(DomainEvent::Order(OrderEvent::Expired {
            order_id: self.id.clone(),
        }));
        Ok(())
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> {
        std::mem::take(&mut self.events)
    }

    fn raise_event(&mut self, e: DomainEvent) {
        self.events.push(e);
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrderError {
    #[error("order has no items")]
    NoItems,
    #[error("invalid order transition {from:?} -> {to:?}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(product_id: &str, qty: u32, price: i64) -> OrderLine {
        OrderLine {
            id: Uuid::now_v7().to_string(),
            product_id: product_id.into(),
            name: format!("product {product_id}"),
            unit_price: Money::from_minor(price),
            quantity: qty,
            line_total: Money::from_minor(price).multiply(qty),
        }
    }

    fn draft() -> Order {
        Order::draft(
            "BS-00000001",
            "u1",
            "ada@example.com",
            vec![line("P1", 2, 5_000_00), line("P2", 1, 3_000_00)],
            Money::from_minor(1_500_00),
            Money::from_minor(975_00),
            ShippingAddress::default(),
        )
        .unwrap()
    }

    #[test]
    fn draft_totals() {
        let order = draft();
        assert_eq!(order.subtotal().minor(), 13_000_00);
        assert_eq!(order.total().minor(), 13_000_00 + 1_500_00 + 975_00);
        assert_eq!(order.status(), OrderStatus::PendingPayment);
        assert_eq!(order.payment(), PaymentState::Pending);
    }

    #[test]
    fn empty_draft_rejected() {
        let err = Order::draft(
            "BS-1",
            "u1",
            "a@b.c",
            vec![],
            Money::zero(),
            Money::zero(),
            ShippingAddress::default(),
        )
        .unwrap_err();
        assert_eq!(err, OrderError::NoItems);
    }

    #[test]
    fn paid_draft_moves_to_processing() {
        let mut order = draft();
        order.mark_paid("REF-1", Some("card".into()), Utc::now()).unwrap();
        assert_eq!(order.status(), OrderStatus::Processing);
        assert_eq!(order.payment(), PaymentState::Completed);
        assert_eq!(order.payment_reference(), Some("REF-1"));
    }

    #[test]
    fn double_payment_rejected() {
        let mut order = draft();
        order.mark_paid("REF-1", None, Utc::now()).unwrap();
        assert!(order.mark_paid("REF-2", None, Utc::now()).is_err());
        assert_eq!(order.payment_reference(), Some("REF-1"));
    }

    #[test]
    fn only_processing_orders_complete() {
        let mut order = draft();
        assert!(order.complete().is_err());
        order.mark_paid("REF-1", None, Utc::now()).unwrap();
        order.complete().unwrap();
        assert_eq!(order.status(), OrderStatus::Completed);
    }

    #[test]
    fn terminal_orders_cannot_cancel() {
        let mut order = draft();
        order.mark_paid("REF-1", None, Utc::now()).unwrap();
        order.complete().unwrap();
        assert!(order.cancel().is_err());
    }

    #[test]
    fn only_pending_drafts_expire() {
        let mut order = draft();
        order.expire().unwrap();
        assert_eq!(order.status(), OrderStatus::Expired);
        assert!(order.status().is_terminal());

        let mut paid = draft();
        paid.mark_paid("REF-1", None, Utc::now()).unwrap();
        assert!(paid.expire().is_err());
    }

    #[test]
    fn failed_verification_keeps_draft_pending() {
        let mut order = draft();
        order.mark_payment_failed();
        assert_eq!(order.status(), OrderStatus::PendingPayment);
        assert_eq!(order.payment(), PaymentState::Failed);
        // A later successful verification can still converge it.
        order.mark_paid("REF-1", None, Utc::now()).unwrap();
    }
}
