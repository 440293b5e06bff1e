use super::engine::InstallmentEngine;
use crate::domain::installment::{InstallmentSchedule, compute_installments};
use crate::domain::payment::{NewPayment, Payment, PaymentId, PaymentPatch, PaymentStatus};
use crate::domain::ports::LedgerChange;
use crate::domain::registration::{Registration, RegistrationId, RegistrationStatus};
use crate::error::{EngineError, Result};
use chrono::Utc;

impl InstallmentEngine {
    pub async fn payment(&self, id: PaymentId) -> Result<Payment> {
        self.store
            .get_payment(id)
            .await?
            .ok_or_else(|| EngineError::not_found("payment", id))
    }

    pub async fn payments_for(&self, registration_id: RegistrationId) -> Result<Vec<Payment>> {
        self.registration(registration_id).await?;
        self.store.payments_for(registration_id).await
    }

    /// Records a payment against one installment of a registration.
    ///
    /// The duplicate and cancelled checks are repeated by the store inside the same
    /// critical section as the insert, so concurrent calls for one installment
    /// produce a single payment.
    pub async fn create_payment(&self, request: NewPayment) -> Result<Payment> {
        let registration = self.registration(request.registration_id).await?;
        if registration.is_cancelled() {
            return Err(EngineError::InvalidTransition(format!(
                "registration {} is cancelled and cannot take payments",
                registration.id
            )));
        }

        let event = self.event(registration.event_id).await?;
        if !event.has_installment(request.installment_number) {
            return Err(EngineError::ValidationError(format!(
                "installment {} is outside 1..={} for event {}",
                request.installment_number,
                event.installment_count(),
                event.id
            )));
        }

        let payment = self
            .store
            .insert_payment(request.into_payment(Utc::now()))
            .await?;
        tracing::info!(
            payment_id = payment.id,
            registration_id = payment.registration_id,
            installment = payment.installment_number,
            status = %payment.status,
            "payment recorded"
        );

        self.sync_confirmation(payment.registration_id).await;
        Ok(payment)
    }

    /// Applies an operator edit to a payment.
    ///
    /// Moving a completed payment back to review is accepted as an explicit
    /// correction and may reopen a confirmed registration. A status change is
    /// committed together with the registration it belongs to, so it fails with
    /// `Conflict` if the registration was cancelled or edited in the meantime.
    pub async fn update_payment(&self, id: PaymentId, patch: PaymentPatch) -> Result<Payment> {
        let mut payment = self.payment(id).await?;

        let mut registration = None;
        if let Some(status) = patch.status
            && status != payment.status
        {
            let owner = self.registration(payment.registration_id).await?;
            if owner.is_cancelled() {
                return Err(EngineError::InvalidTransition(format!(
                    "payment {id} belongs to cancelled registration {}",
                    owner.id
                )));
            }
            let previous = payment.set_status(status)?;
            if previous == PaymentStatus::Completed {
                tracing::warn!(
                    payment_id = id,
                    registration_id = payment.registration_id,
                    "completed payment moved back to review"
                );
            }
            registration = Some(owner);
        }
        patch.apply_details(&mut payment);

        let mut status_moved = false;
        let change = match registration {
            Some(mut registration) => {
                let schedule = self.schedule_with(&registration, &payment).await?;
                status_moved = align_status(&mut registration, schedule.is_fully_paid)?;
                LedgerChange::registration(registration).with_payments(vec![payment])
            }
            None => LedgerChange::payment(payment),
        };

        let committed = self.store.commit(change).await?;
        if status_moved && let Some(registration) = &committed.registration {
            tracing::info!(
                registration_id = registration.id,
                status = %registration.status,
                "registration status synchronised"
            );
        }
        let payment = committed
            .payments
            .into_iter()
            .next()
            .ok_or_else(|| EngineError::not_found("payment", id))?;
        tracing::info!(payment_id = id, status = %payment.status, "payment updated");
        Ok(payment)
    }

    /// The schedule `registration` will have once `updated` replaces its stored copy.
    async fn schedule_with(
        &self,
        registration: &Registration,
        updated: &Payment,
    ) -> Result<InstallmentSchedule> {
        let event = self.event(registration.event_id).await?;
        let mut payments = self.store.payments_for(registration.id).await?;
        payments.retain(|p| p.id != updated.id);
        payments.push(updated.clone());
        Ok(compute_installments(registration, &event, &payments))
    }

    /// Brings the registration status in line with its installments.
    ///
    /// Runs after a new payment has already been inserted. A failure here must not
    /// turn that insert into an error for the caller, so it is only logged; the next
    /// payment write for the registration runs the check again. A new payment can
    /// only confirm a registration, never reopen one.
    pub(crate) async fn sync_confirmation(&self, registration_id: RegistrationId) {
        if let Err(error) = self.try_sync_confirmation(registration_id).await {
            tracing::warn!(registration_id, %error, "could not synchronise confirmation");
        }
    }

    async fn try_sync_confirmation(&self, registration_id: RegistrationId) -> Result<()> {
        let mut registration = self.registration(registration_id).await?;
        let schedule = self.schedule_of(&registration).await?;

        if !align_status(&mut registration, schedule.is_fully_paid)? {
            return Ok(());
        }

        let status = registration.status;
        self.store
            .commit(LedgerChange::registration(registration))
            .await?;
        tracing::info!(registration_id, %status, "registration status synchronised");
        Ok(())
    }
}

/// Confirms a fully paid Pending registration or reopens a Confirmed one that is
/// no longer fully paid. Returns whether the status moved.
fn align_status(registration: &mut Registration, fully_paid: bool) -> Result<bool> {
    match (registration.status, fully_paid) {
        (RegistrationStatus::Pending, true) => registration.confirm()?,
        (RegistrationStatus::Confirmed, false) => registration.reopen()?,
        _ => return Ok(false),
    }
    Ok(true)
}
