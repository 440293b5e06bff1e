use super::engine::InstallmentEngine;
use crate::domain::event::EventId;
use crate::domain::ports::{LedgerChange, Template};
use crate::domain::registration::{Contact, Origin, Registration, RegistrationId};
use crate::error::{EngineError, Result};
use chrono::Utc;
use serde_json::json;

/// Input for enrolling an attendee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRegistration {
    pub id: RegistrationId,
    pub event_id: EventId,
    pub contact: Contact,
    pub venue: Option<String>,
    pub kind: String,
    pub origin: Origin,
}

impl InstallmentEngine {
    /// Enrolls an attendee in an active event. The registration starts Pending.
    pub async fn register(&self, request: NewRegistration) -> Result<Registration> {
        let event = self.event(request.event_id).await?;
        if !event.active {
            return Err(EngineError::ValidationError(format!(
                "event {} is not accepting registrations",
                event.id
            )));
        }
        if request.contact.email.trim().is_empty() {
            return Err(EngineError::ValidationError(
                "registration requires an email address".to_string(),
            ));
        }

        let mut registration = Registration::new(
            request.id,
            request.event_id,
            request.contact,
            request.kind,
            request.origin,
            Utc::now(),
        );
        registration.venue = request.venue;

        let registration = self.store.insert_registration(registration).await?;
        tracing::info!(
            registration_id = registration.id,
            event_id = registration.event_id,
            "registration created"
        );
        Ok(registration)
    }

    /// Confirms a registration whose installments are all paid.
    pub async fn confirm(&self, registration_id: RegistrationId) -> Result<Registration> {
        let mut registration = self.registration(registration_id).await?;
        let schedule = self.schedule_of(&registration).await?;
        if !schedule.is_fully_paid {
            return Err(EngineError::InvalidTransition(format!(
                "registration {registration_id} has {} of {} installments paid",
                schedule.paid_count,
                schedule.installments.len()
            )));
        }
        registration.confirm()?;

        let registration = self
            .commit_registration(LedgerChange::registration(registration))
            .await?;
        tracing::info!(registration_id, "registration confirmed");
        Ok(registration)
    }

    /// Cancels a registration and voids its payments awaiting review.
    ///
    /// The status change and the voided payments are committed together. The
    /// attendee is then notified; a failed notification is logged and does not
    /// undo the cancellation.
    pub async fn cancel(
        &self,
        registration_id: RegistrationId,
        reason: Option<String>,
    ) -> Result<Registration> {
        let mut registration = self.registration(registration_id).await?;
        registration.cancel(reason)?;

        let now = Utc::now();
        let voided: Vec<_> = self
            .store
            .payments_for(registration_id)
            .await?
            .into_iter()
            .filter_map(|mut payment| payment.void(now).then_some(payment))
            .collect();
        let voided_count = voided.len();

        let registration = self
            .commit_registration(LedgerChange::registration(registration).with_payments(voided))
            .await?;
        tracing::info!(
            registration_id,
            voided_payments = voided_count,
            reason = registration.cancellation_reason.as_deref().unwrap_or(""),
            "registration cancelled"
        );

        let data = json!({
            "registration_id": registration.id,
            "name": registration.contact.full_name(),
            "reason": registration.cancellation_reason,
        });
        if let Err(error) = self
            .notifier
            .send(&registration.contact.email, Template::RegistrationCancelled, &data)
            .await
        {
            tracing::warn!(registration_id, %error, "cancellation notice not delivered");
        }

        Ok(registration)
    }

    /// Returns a cancelled registration to Pending. Payments are left as they are.
    ///
    /// A registration whose completed payments already cover the fee stays Pending
    /// until [`confirm`](Self::confirm) or the next payment write confirms it.
    pub async fn rehabilitate(&self, registration_id: RegistrationId) -> Result<Registration> {
        let mut registration = self.registration(registration_id).await?;
        registration.rehabilitate()?;

        let registration = self
            .commit_registration(LedgerChange::registration(registration))
            .await?;
        tracing::info!(registration_id, "registration rehabilitated");
        Ok(registration)
    }

    async fn commit_registration(&self, change: LedgerChange) -> Result<Registration> {
        let committed = self.store.commit(change).await?;
        committed.registration.ok_or_else(|| {
            EngineError::InternalError("store returned a commit without its registration".into())
        })
    }
}
