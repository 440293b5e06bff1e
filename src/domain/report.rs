use super::event::{EventDefinition, EventId};
use super::installment::{InstallmentState, compute_installments};
use super::money::Total;
use super::payment::Payment;
use super::registration::{Registration, RegistrationId, RegistrationStatus};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Collected and outstanding money for one installment number.
#[derive(Debug, Serialize, PartialEq, Eq, Clone, Copy, Default)]
pub struct InstallmentTotals {
    pub collected: Total,
    pub outstanding: Total,
}

/// Financial summary across registrations.
///
/// `collected` counts paid installments of every registration, cancelled ones
/// included. `outstanding` only counts registrations that are still alive.
#[derive(Debug, Serialize, PartialEq, Eq, Clone, Default)]
pub struct IncomeReport {
    pub collected: Total,
    pub outstanding: Total,
    pub by_installment: BTreeMap<u32, InstallmentTotals>,
    pub total_registrations: usize,
    pub confirmed_count: usize,
    pub pending_count: usize,
    pub cancelled_count: usize,
}

pub fn build_income_report(
    registrations: &[Registration],
    events: &[EventDefinition],
    payments: &[Payment],
) -> IncomeReport {
    let events: HashMap<EventId, &EventDefinition> = events.iter().map(|e| (e.id, e)).collect();

    let mut payments_by_registration: HashMap<RegistrationId, Vec<Payment>> = HashMap::new();
    for payment in payments {
        payments_by_registration
            .entry(payment.registration_id)
            .or_default()
            .push(payment.clone());
    }

    let mut report = IncomeReport::default();
    for registration in registrations {
        let Some(event) = events.get(&registration.event_id) else {
            tracing::warn!(
                registration_id = registration.id,
                event_id = registration.event_id,
                "skipping registration of unknown event"
            );
            continue;
        };

        report.total_registrations += 1;
        match registration.status {
            RegistrationStatus::Pending => report.pending_count += 1,
            RegistrationStatus::Confirmed => report.confirmed_count += 1,
            RegistrationStatus::Cancelled => report.cancelled_count += 1,
        }

        let own_payments = payments_by_registration
            .get(&registration.id)
            .map(Vec::as_slice)
            .unwrap_or_default();
        let schedule = compute_installments(registration, event, own_payments);

        for installment in &schedule.installments {
            let totals = report.by_installment.entry(installment.number).or_default();
            match installment.state {
                InstallmentState::Paid => {
                    totals.collected += installment.expected_amount;
                    report.collected += installment.expected_amount;
                }
                InstallmentState::Unpaid | InstallmentState::AwaitingReview
                    if !registration.is_cancelled() =>
                {
                    totals.outstanding += installment.expected_amount;
                    report.outstanding += installment.expected_amount;
                }
                _ => {}
            }
        }
    }

    report
}
