use super::event::{EventDefinition, EventId};
use super::payment::{Payment, PaymentId};
use super::registration::{Registration, RegistrationId};
use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Read-only lookup into the configured events.
#[async_trait]
pub trait EventCatalog: Send + Sync {
    async fn get(&self, event_id: EventId) -> Result<Option<EventDefinition>>;
    async fn all_events(&self) -> Result<Vec<EventDefinition>>;
}

/// A set of writes that must land together or not at all.
///
/// Every record carries the `revision` it was read at; the store rejects the whole
/// change with [`EngineError::Conflict`](crate::error::EngineError::Conflict) when
/// any of them has moved on since.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerChange {
    pub registration: Option<Registration>,
    pub payments: Vec<Payment>,
}

impl LedgerChange {
    pub fn registration(registration: Registration) -> Self {
        Self {
            registration: Some(registration),
            payments: Vec::new(),
        }
    }

    pub fn payment(payment: Payment) -> Self {
        Self {
            registration: None,
            payments: vec![payment],
        }
    }

    pub fn with_payments(mut self, payments: Vec<Payment>) -> Self {
        self.payments = payments;
        self
    }
}

/// Persistence for registrations and their payments.
///
/// Implementations must run `insert_registration`, `insert_payment` and `commit`
/// as single critical sections: the checks they describe and the write that follows
/// cannot interleave with another writer.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Stores a new registration. Fails with `ValidationError` if the id is taken.
    async fn insert_registration(&self, registration: Registration) -> Result<Registration>;
    async fn get_registration(&self, id: RegistrationId) -> Result<Option<Registration>>;
    async fn registrations(&self, event_id: Option<EventId>) -> Result<Vec<Registration>>;

    /// Assigns an id to `payment` and stores it.
    ///
    /// Fails with `NotFound` when the registration is missing, `InvalidTransition`
    /// when it is cancelled and `DuplicatePayment` when an active payment already
    /// covers the same installment.
    async fn insert_payment(&self, payment: Payment) -> Result<Payment>;
    async fn get_payment(&self, id: PaymentId) -> Result<Option<Payment>>;
    async fn payments_for(&self, registration_id: RegistrationId) -> Result<Vec<Payment>>;
    async fn all_payments(&self) -> Result<Vec<Payment>>;

    /// Applies `change` atomically and returns the records as stored.
    async fn commit(&self, change: LedgerChange) -> Result<LedgerChange>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Template {
    PaymentReminder,
    RegistrationCancelled,
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PaymentReminder => f.write_str("payment_reminder"),
            Self::RegistrationCancelled => f.write_str("registration_cancelled"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("notification to {recipient} failed: {reason}")]
pub struct NotifyError {
    pub recipient: String,
    pub reason: String,
}

/// Outbound email/notification collaborator.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(
        &self,
        recipient: &str,
        template: Template,
        data: &Value,
    ) -> std::result::Result<(), NotifyError>;
}

pub type EventCatalogBox = Box<dyn EventCatalog>;
pub type LedgerStoreBox = Box<dyn LedgerStore>;
pub type NotifierRef = Arc<dyn Notifier>;
