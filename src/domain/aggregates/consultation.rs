//! Consultation booking aggregate.
//!
//! Bookings follow the same draft/finalize shape as orders, keyed by a
//! reference the client may supply up front (it survives page reloads on
//! the client side), with the sweep expiring drafts that never finalize.

use crate::domain::events::{ConsultationEvent, DomainEvent};
use crate::domain::value_objects::Reference;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug)]
pub struct Consultation {
    id: String,
    reference: Reference,
    user_id: String,
    client_name: String,
    client_email: String,
    client_phone: String,
    service: String,
    preferred_date: NaiveDate,
    time_slot: String,
    notes: Option<String>,
    status: ConsultationStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    events: Vec<DomainEvent>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsultationStatus {
    #[default]
    Pending,
    Confirmed,
    Completed,
    Cancelled,
    Expired,
}

impl ConsultationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsultationStatus::Pending => "pending",
            ConsultationStatus::Confirmed => "confirmed",
            ConsultationStatus::Completed => "completed",
            ConsultationStatus::Cancelled => "cancelled",
            ConsultationStatus::Expired => "expired",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ConsultationStatus::Pending),
            "confirmed" => Some(ConsultationStatus::Confirmed),
            "completed" => Some(ConsultationStatus::Completed),
            "cancelled" => Some(ConsultationStatus::Cancelled),
            "expired" => Some(ConsultationStatus::Expired),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ConsultationStatus::Completed
                | ConsultationStatus::Cancelled
                | ConsultationStatus::Expired
        )
    }
}

impl Consultation {
    #[allow(clippy::too_many_arguments)]
    pub fn book(
        reference: Reference,
        user_id: impl Into<String>,
        client_name: impl Into<String>,
        client_email: impl Into<String>,
        client_phone: impl Into<String>,
        service: impl Into<String>,
        preferred_date: NaiveDate,
        time_slot: impl Into<String>,
        notes: Option<String>,
    ) -> Self {
        let user_id = user_id.into();
        let now = Utc::now();
        let mut booking = Self {
            id: Uuid::now_v7().to_string(),
            reference: reference.clone(),
            user_id: user_id.clone(),
            client_name: client_name.into(),
            client_email: client_email.into(),
            client_phone: client_phone.into(),
            service: service.into(),
            preferred_date,
            time_slot: time_slot.into(),
            notes,
            status: ConsultationStatus::Pending,
            created_at: now,
            updated_at: now,
            events: vec![],
        };
        booking.raise_event(DomainEvent::Consultation(ConsultationEvent::Booked {
            reference: reference.as_str().to_string(),
            user_id,
        }));
        booking
    }

    pub fn id(&self) -> &str {
        &self.id
    }
    pub fn reference(&self) -> &Reference {
        &self.reference
    }
    pub fn user_id(&self) -> &str {
        &self.user_id
    }
    pub fn status(&self) -> ConsultationStatus {
        self.status
    }
    pub fn service(&self) -> &str {
        &self.service
    }
    pub fn preferred_date(&self) -> NaiveDate {
        self.preferred_date
    }
    pub fn time_slot(&self) -> &str {
        &self.time_slot
    }
    pub fn client_name(&self) -> &str {
        &self.client_name
    }
    pub fn client_email(&self) -> &str {
        &self.client_email
    }
    pub fn client_phone(&self) -> &str {
        &self.client_phone
    }
    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    /// Finalize: `pending` -> `confirmed`. Idempotent for an already
    /// confirmed booking, so a retried finalize does not error.
    pub fn confirm(&mut self) -> Result<bool, ConsultationError> {
        match self.status {
            ConsultationStatus::Confirmed => Ok(false),
            ConsultationStatus::Pending => {
                self.status = ConsultationStatus::Confirmed;
                self.touch();
                self.raise_event(DomainEvent::Consultation(ConsultationEvent::Confirmed {
                    reference: self.reference.as_str().to_string(),
                }));
                Ok(true)
            }
            from => Err(ConsultationError::InvalidTransition {
                from,
                to: ConsultationStatus::Confirmed,
            }),
        }
    }

    pub fn complete(&mut self) -> Result<(), ConsultationError> {
        if self.status != ConsultationStatus::Confirmed {
            return Err(ConsultationError::InvalidTransition {
                from: self.status,
                to: ConsultationStatus::Completed,
            });
        }
        self.status = ConsultationStatus::Completed;
        self.touch();
        Ok(())
    }

    pub fn cancel(&mut self) -> Result<(), ConsultationError> {
        if self.status.is_terminal() {
            return Err(ConsultationError::InvalidTransition {
                from: self.status,
                to: ConsultationStatus::Cancelled,
            });
        }
        self.status = ConsultationStatus::Cancelled;
        self.touch();
        Ok(())
    }

    pub fn expire(&mut self) -> Result<(), ConsultationError> {
        if self.status != ConsultationStatus::Pending {
            return Err(ConsultationError::InvalidTransition {
                from: self.status,
                to: ConsultationStatus::Expired,
            });
        }
        self.status = ConsultationStatus::Expired;
        self.touch();
        self.raise_event(DomainEvent::Consultation(ConsultationEvent::Expired {
            reference: self.reference.as_str().to_string(),
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
pub enum ConsultationError {
    #[error("invalid consultation transition {from:?} -> {to:?}")]
    InvalidTransition {
        from: ConsultationStatus,
        to: ConsultationStatus,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn booking() -> Consultation {
        Consultation::book(
            Reference::generate("CONS"),
            "u1",
            "Ada",
            "ada@example.com",
            "+2348000000000",
            "skin-analysis",
            NaiveDate::from_ymd_opt(2026, 9, 1).unwrap(),
            "10:00",
            None,
        )
    }

    #[test]
    fn confirm_is_idempotent() {
        let mut c = booking();
        assert!(c.confirm().unwrap());
        assert!(!c.confirm().unwrap());
        assert_eq!(c.status(), ConsultationStatus::Confirmed);
    }

    #[test]
    fn complete_requires_confirmed() {
        let mut c = booking();
        assert!(c.complete().is_err());
        c.confirm().unwrap();
        c.complete().unwrap();
        assert!(c.status().is_terminal());
    }

    #[test]
    fn expire_only_from_pending() {
        let mut c = booking();
        c.confirm().unwrap();
        assert!(c.expire().is_err());

        let mut stale = booking();
        stale.expire().unwrap();
        assert_eq!(stale.status(), ConsultationStatus::Expired);
    }

    #[test]
    fn cancelled_booking_cannot_confirm() {
        let mut c = booking();
        c.cancel().unwrap();
        assert!(c.confirm().is_err());
    }
}
