use super::event::EventDefinition;
use super::money::{Amount, Total};
use super::payment::{Payment, PaymentStatus};
use super::registration::Registration;
use serde::Serialize;

#[derive(Debug, Serialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum InstallmentState {
    Paid,
    AwaitingReview,
    Unpaid,
}

/// One installment of a registration's fee, derived on every read.
#[derive(Debug, Serialize, PartialEq, Eq, Clone)]
pub struct Installment {
    pub number: u32,
    pub expected_amount: Total,
    pub state: InstallmentState,
    pub payment: Option<Payment>,
}

impl Installment {
    pub fn is_outstanding(&self) -> bool {
        self.state != InstallmentState::Paid
    }
}

#[derive(Debug, Serialize, PartialEq, Eq, Clone)]
pub struct InstallmentSchedule {
    pub installments: Vec<Installment>,
    pub paid_count: u32,
    pub is_fully_paid: bool,
}

impl InstallmentSchedule {
    pub fn outstanding(&self) -> impl Iterator<Item = &Installment> {
        self.installments.iter().filter(|i| i.is_outstanding())
    }

    pub fn outstanding_total(&self) -> Total {
        self.outstanding().map(|i| i.expected_amount).sum()
    }
}

/// Splits `fee` into `count` installment amounts.
///
/// Every installment gets the truncated quotient and the last one also takes the
/// remainder, so the parts always add up to exactly `fee`. A fee smaller than
/// `count` minor units leaves the leading installments at zero.
pub fn split_fee(fee: Amount, count: u32) -> Vec<Total> {
    let count = i64::from(count.max(1));
    let fee = fee.minor_units();
    let base = fee / count;
    let remainder = fee % count;

    (1..=count)
        .map(|n| Total(if n == count { base + remainder } else { base }))
        .collect()
}

/// Derives the installment schedule of `registration` from its payments.
///
/// Payments of other registrations, voided payments and payments whose installment
/// number falls outside the event's range are ignored. The caller guarantees the
/// event has at least one installment, which [`EventDefinition::new`] enforces.
pub fn compute_installments(
    registration: &Registration,
    event: &EventDefinition,
    payments: &[Payment],
) -> InstallmentSchedule {
    let amounts = split_fee(event.fee_amount(), event.installment_count());

    let installments: Vec<Installment> = amounts
        .into_iter()
        .zip(1..)
        .map(|(expected_amount, number)| {
            let payment = payments
                .iter()
                .filter(|p| {
                    p.registration_id == registration.id
                        && p.installment_number == number
                        && p.is_active()
                })
                // A completed payment wins should the ledger ever hold two.
                .max_by_key(|p| p.status == PaymentStatus::Completed)
                .cloned();

            let state = match payment.as_ref().map(|p| p.status) {
                Some(PaymentStatus::Completed) => InstallmentState::Paid,
                Some(PaymentStatus::PendingReview) => InstallmentState::AwaitingReview,
                None => InstallmentState::Unpaid,
            };

            Installment {
                number,
                expected_amount,
                state,
                payment,
            }
        })
        .collect();

    let paid_count = installments
        .iter()
        .filter(|i| i.state == InstallmentState::Paid)
        .count() as u32;

    InstallmentSchedule {
        is_fully_paid: paid_count == event.installment_count(),
        installments,
        paid_count,
    }
}
