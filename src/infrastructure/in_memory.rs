use super::{check_payment_insert, check_revision};
use crate::domain::event::{EventDefinition, EventId};
use crate::domain::payment::{Payment, PaymentId};
use crate::domain::ports::{EventCatalog, LedgerChange, LedgerStore};
use crate::domain::registration::{Registration, RegistrationId};
use crate::error::{EngineError, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Event catalog backed by the definitions loaded at startup.
#[derive(Default, Clone)]
pub struct InMemoryEventCatalog {
    events: Arc<HashMap<EventId, EventDefinition>>,
}

impl InMemoryEventCatalog {
    pub fn new(events: impl IntoIterator<Item = EventDefinition>) -> Self {
        Self {
            events: Arc::new(events.into_iter().map(|e| (e.id, e)).collect()),
        }
    }
}

#[async_trait]
impl EventCatalog for InMemoryEventCatalog {
    async fn get(&self, event_id: EventId) -> Result<Option<EventDefinition>> {
        Ok(self.events.get(&event_id).cloned())
    }

    async fn all_events(&self) -> Result<Vec<EventDefinition>> {
        let mut events: Vec<EventDefinition> = self.events.values().cloned().collect();
        events.sort_by_key(|e| e.id);
        Ok(events)
    }
}

#[derive(Default)]
struct LedgerState {
    registrations: BTreeMap<RegistrationId, Registration>,
    payments: BTreeMap<PaymentId, Payment>,
    last_payment_id: PaymentId,
}

/// A thread-safe in-memory ledger.
///
/// Registrations and payments share one `RwLock`, so every write operation holds
/// the whole ledger for the duration of its checks and writes.
#[derive(Default, Clone)]
pub struct InMemoryLedgerStore {
    state: Arc<RwLock<LedgerState>>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn insert_registration(&self, registration: Registration) -> Result<Registration> {
        let mut state = self.state.write().await;
        if state.registrations.contains_key(&registration.id) {
            return Err(EngineError::ValidationError(format!(
                "registration {} already exists",
                registration.id
            )));
        }
        state
            .registrations
            .insert(registration.id, registration.clone());
        Ok(registration)
    }

    async fn get_registration(&self, id: RegistrationId) -> Result<Option<Registration>> {
        let state = self.state.read().await;
        Ok(state.registrations.get(&id).cloned())
    }

    async fn registrations(&self, event_id: Option<EventId>) -> Result<Vec<Registration>> {
        let state = self.state.read().await;
        Ok(state
            .registrations
            .values()
            .filter(|r| event_id.is_none_or(|id| r.event_id == id))
            .cloned()
            .collect())
    }

    async fn insert_payment(&self, mut payment: Payment) -> Result<Payment> {
        let mut state = self.state.write().await;
        check_payment_insert(
            state.registrations.get(&payment.registration_id),
            state.payments.values(),
            &payment,
        )?;

        state.last_payment_id += 1;
        payment.id = state.last_payment_id;
        payment.revision = 0;
        state.payments.insert(payment.id, payment.clone());
        Ok(payment)
    }

    async fn get_payment(&self, id: PaymentId) -> Result<Option<Payment>> {
        let state = self.state.read().await;
        Ok(state.payments.get(&id).cloned())
    }

    async fn payments_for(&self, registration_id: RegistrationId) -> Result<Vec<Payment>> {
        let state = self.state.read().await;
        Ok(state
            .payments
            .values()
            .filter(|p| p.registration_id == registration_id)
            .cloned()
            .collect())
    }

    async fn all_payments(&self) -> Result<Vec<Payment>> {
        let state = self.state.read().await;
        Ok(state.payments.values().cloned().collect())
    }

    async fn commit(&self, mut change: LedgerChange) -> Result<LedgerChange> {
        let mut state = self.state.write().await;

        // Validate everything before touching anything.
        if let Some(registration) = &change.registration {
            let stored = state.registrations.get(&registration.id).map(|r| r.revision);
            check_revision("registration", registration.id, stored, registration.revision)?;
        }
        for payment in &change.payments {
            let stored = state.payments.get(&payment.id).map(|p| p.revision);
            check_revision("payment", payment.id, stored, payment.revision)?;
        }

        if let Some(registration) = change.registration.as_mut() {
            registration.revision += 1;
            state
                .registrations
                .insert(registration.id, registration.clone());
        }
        for payment in change.payments.iter_mut() {
            payment.revision += 1;
            state.payments.insert(payment.id, payment.clone());
        }

        Ok(change)
    }
}
