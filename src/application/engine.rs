use crate::config::ReminderConfig;
use crate::domain::event::{EventDefinition, EventId};
use crate::domain::installment::{InstallmentSchedule, compute_installments};
use crate::domain::ports::{EventCatalogBox, LedgerStoreBox, NotifierRef};
use crate::domain::registration::{Registration, RegistrationId};
use crate::domain::report::{IncomeReport, build_income_report};
use crate::error::{EngineError, Result};

/// The entry point of the installment engine.
///
/// `InstallmentEngine` owns the event catalog, the ledger store and the
/// notification collaborator. Ledger writes live in [`ledger`](super::ledger),
/// registration transitions in [`lifecycle`](super::lifecycle) and the reminder
/// batch in [`reminders`](super::reminders); this module holds the read side.
pub struct InstallmentEngine {
    pub(crate) catalog: EventCatalogBox,
    pub(crate) store: LedgerStoreBox,
    pub(crate) notifier: NotifierRef,
    pub(crate) reminders: ReminderConfig,
}

impl InstallmentEngine {
    /// Creates a new engine.
    ///
    /// # Arguments
    ///
    /// * `catalog` - The read-only event definitions.
    /// * `store` - Persistence for registrations and payments.
    /// * `notifier` - Outbound notification sender.
    pub fn new(catalog: EventCatalogBox, store: LedgerStoreBox, notifier: NotifierRef) -> Self {
        Self {
            catalog,
            store,
            notifier,
            reminders: ReminderConfig::default(),
        }
    }

    pub fn with_reminder_config(mut self, reminders: ReminderConfig) -> Self {
        self.reminders = reminders;
        self
    }

    pub async fn events(&self) -> Result<Vec<EventDefinition>> {
        self.catalog.all_events().await
    }

    pub async fn event(&self, event_id: EventId) -> Result<EventDefinition> {
        self.catalog
            .get(event_id)
            .await?
            .ok_or_else(|| EngineError::not_found("event", event_id))
    }

    pub async fn registration(&self, id: RegistrationId) -> Result<Registration> {
        self.store
            .get_registration(id)
            .await?
            .ok_or_else(|| EngineError::not_found("registration", id))
    }

    pub async fn registrations(&self, event_id: Option<EventId>) -> Result<Vec<Registration>> {
        self.store.registrations(event_id).await
    }

    /// Derives the current installment schedule of a registration.
    pub async fn installments(
        &self,
        registration_id: RegistrationId,
    ) -> Result<InstallmentSchedule> {
        let registration = self.registration(registration_id).await?;
        self.schedule_of(&registration).await
    }

    pub(crate) async fn schedule_of(
        &self,
        registration: &Registration,
    ) -> Result<InstallmentSchedule> {
        let event = self.event(registration.event_id).await?;
        let payments = self.store.payments_for(registration.id).await?;
        Ok(compute_installments(registration, &event, &payments))
    }

    /// Builds the income report, optionally restricted to one event.
    pub async fn income_report(&self, event_id: Option<EventId>) -> Result<IncomeReport> {
        let events = match event_id {
            Some(id) => vec![self.event(id).await?],
            None => self.catalog.all_events().await?,
        };
        let registrations = self.store.registrations(event_id).await?;
        let payments = self.store.all_payments().await?;
        Ok(build_income_report(&registrations, &events, &payments))
    }
}
