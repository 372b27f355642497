//! End-to-end walks of the order state machine and checkout totals.

use beauty_store::checkout::quote;
use beauty_store::config::PricingConfig;
use beauty_store::domain::aggregates::order::{Order, OrderLine, OrderStatus, ShippingAddress};
use beauty_store::domain::events::{DomainEvent, OrderEvent};
use beauty_store::domain::value_objects::Money;
use chrono::Utc;
use uuid::Uuid;

fn line(product_id: &str, qty: u32, price_minor: i64) -> OrderLine {
    let unit_price = Money::from_minor(price_minor);
    OrderLine {
        id: Uuid::now_v7().to_string(),
        product_id: product_id.into(),
        name: format!("product {product_id}"),
        unit_price,
        quantity: qty,
        line_total: unit_price.multiply(qty),
    }
}

fn address() -> ShippingAddress {
    ShippingAddress {
        full_name: "Ada Obi".into(),
        phone: "+2348012345678".into(),
        street: "12 Allen Avenue".into(),
        city: "Ikeja".into(),
        state: "Lagos".into(),
        country: "NG".into(),
        postal_code: Some("100001".into()),
    }
}

fn pricing() -> PricingConfig {
    PricingConfig {
        shipping_fee_minor: 1_500_00,
        free_shipping_threshold_minor: 50_000_00,
        tax_rate_bps: 750,
    }
}

#[test]
fn happy_path_draft_to_completed() {
    let lines = vec![line("serum", 2, 12_000_00), line("mask", 1, 8_000_00)];
    let subtotal: i64 = lines.iter().map(|l| l.line_total.minor()).sum();
    let (shipping, tax) = quote(Money::from_minor(subtotal), &pricing());

    let mut order = Order::draft(
        "BS-00000042",
        "user-1",
        "ada@example.com",
        lines,
        shipping,
        tax,
        address(),
    )
    .unwrap();

    assert_eq!(order.subtotal().minor(), 32_000_00);
    assert_eq!(order.shipping().minor(), 1_500_00);
    assert_eq!(order.tax().minor(), 2_400_00);
    assert_eq!(order.total().minor(), 35_900_00);
    assert_eq!(order.status(), OrderStatus::PendingPayment);

    order
        .mark_paid(order.id().to_string(), Some("card".into()), Utc::now())
        .unwrap();
    assert_eq!(order.status(), OrderStatus::Processing);

    order.complete().unwrap();
    assert_eq!(order.status(), OrderStatus::Completed);
    assert!(order.status().is_terminal());

    let events = order.take_events();
    let kinds: Vec<&str> = events
        .iter()
        .map(|e| match e {
            DomainEvent::Order(OrderEvent::Created { .. }) => "created",
            DomainEvent::Order(OrderEvent::Paid { .. }) => "paid",
            DomainEvent::Order(OrderEvent::Completed { .. }) => "completed",
            _ => "other",
        })
        .collect();
    assert_eq!(kinds, vec!["created", "paid", "completed"]);
}

#[test]
fn abandoned_draft_expires_terminally() {
    let mut order = Order::draft(
        "BS-00000043",
        "user-1",
        "ada@example.com",
        vec![line("toner", 1, 5_000_00)],
        Money::from_minor(1_500_00),
        Money::from_minor(375_00),
        address(),
    )
    .unwrap();

    order.expire().unwrap();
    assert_eq!(order.status(), OrderStatus::Expired);
    // Terminal: neither payment nor another expiry may land afterwards.
    assert!(order.mark_paid("ref", None, Utc::now()).is_err());
    assert!(order.expire().is_err());
    assert!(order.cancel().is_err());
}

#[test]
fn free_shipping_applies_to_large_orders() {
    let (shipping, tax) = quote(Money::from_minor(60_000_00), &pricing());
    assert!(shipping.is_zero());
    assert_eq!(tax.minor(), 4_500_00);
}

#[test]
fn payment_reference_is_recorded_once() {
    let mut order = Order::draft(
        "BS-00000044",
        "user-2",
        "ngozi@example.com",
        vec![line("oil", 3, 2_000_00)],
        Money::from_minor(1_500_00),
        Money::zero(),
        address(),
    )
    .unwrap();
    order.mark_paid("FIRST", None, Utc::now()).unwrap();
    assert!(order.mark_paid("SECOND", None, Utc::now()).is_err());
    assert_eq!(order.payment_reference(), Some("FIRST"));
}
