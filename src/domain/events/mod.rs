//! Domain events, recorded in the transactional outbox and published to NATS.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DomainEvent {
    Product(ProductEvent),
    Order(OrderEvent),
    Consultation(ConsultationEvent),
}

impl DomainEvent {
    /// NATS subject the event is published under.
    pub fn subject(&self) -> &'static str {
        match self {
            DomainEvent::Product(ProductEvent::Created { .. }) => "beauty.catalog.created",
            DomainEvent::Product(ProductEvent::Archived { .. }) => "beauty.catalog.archived",
            DomainEvent::Product(ProductEvent::StockAdjusted { .. }) => "beauty.catalog.stock",
            DomainEvent::Order(OrderEvent::Created { .. }) => "beauty.orders.created",
            DomainEvent::Order(OrderEvent::Paid { .. }) => "beauty.orders.paid",
            DomainEvent::Order(OrderEvent::Completed { .. }) => "beauty.orders.completed",
            DomainEvent::Order(OrderEvent::Cancelled { .. }) => "beauty.orders.cancelled",
            DomainEvent::Order(OrderEvent::Expired { .. }) => "beauty.orders.expired",
            DomainEvent::Consultation(ConsultationEvent::Booked { .. }) => {
                "beauty.consultations.booked"
            }
            DomainEvent::Consultation(ConsultationEvent::Confirmed { .. }) => {
                "beauty.consultations.confirmed"
            }
            DomainEvent::Consultation(ConsultationEvent::Expired { .. }) => {
                "beauty.consultations.expired"
            }
        }
    }

    pub fn aggregate_id(&self) -> &str {
        match self {
            DomainEvent::Product(ProductEvent::Created { product_id })
            | DomainEvent::Product(ProductEvent::Archived { product_id })
            | DomainEvent::Product(ProductEvent::StockAdjusted { product_id, .. }) => product_id,
            DomainEvent::Order(OrderEvent::Created { order_id, .. })
            | DomainEvent::Order(OrderEvent::Paid { order_id, .. })
            | DomainEvent::Order(OrderEvent::Completed { order_id })
            | DomainEvent::Order(OrderEvent::Cancelled { order_id })
            | DomainEvent::Order(OrderEvent::Expired { order_id }) => order_id,
            DomainEvent::Consultation(ConsultationEvent::Booked { reference, .. })
            | DomainEvent::Consultation(ConsultationEvent::Confirmed { reference })
            | DomainEvent::Consultation(ConsultationEvent::Expired { reference }) => reference,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProductEvent {
    Created { product_id: String },
    Archived { product_id: String },
    StockAdjusted { product_id: String, delta: i64 },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum OrderEvent {
    Created {
        order_id: String,
        user_id: String,
        total_minor: i64,
    },
    Paid {
        order_id: String,
        reference: String,
        amount_minor: i64,
    },
    Completed {
        order_id: String,
    },
    Cancelled {
        order_id: String,
    },
    Expired {
        order_id: String,
    },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ConsultationEvent {
    Booked { reference: String, user_id: String },
    Confirmed { reference: String },
    Expired { reference: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subjects_are_namespaced() {
        let e = DomainEvent::Order(OrderEvent::Paid {
            order_id: "o1".into(),
            reference: "r1".into(),
            amount_minor: 1000,
        });
        assert_eq!(e.subject(), "beauty.orders.paid");
        assert_eq!(e.aggregate_id(), "o1");
    }

    #[test]
    fn events_round_trip_through_json() {
        let e = DomainEvent::Consultation(ConsultationEvent::Booked {
            reference: "BS-X".into(),
            user_id: "u1".into(),
        });
        let json = serde_json::to_string(&e).unwrap();
        let back: DomainEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back.aggregate_id(), "BS-X");
    }
}
