use super::money::Amount;
use super::registration::RegistrationId;
use crate::error::EngineError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub type PaymentId = u64;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    PendingReview,
    Completed,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PendingReview => f.write_str("pending_review"),
            Self::Completed => f.write_str("completed"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    Cash,
    BankTransfer,
    Card,
    Other,
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Cash => "cash",
            Self::BankTransfer => "bank_transfer",
            Self::Card => "card",
            Self::Other => "other",
        };
        f.write_str(name)
    }
}

/// Money received, or awaiting review, against one installment of a registration.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct Payment {
    pub id: PaymentId,
    pub registration_id: RegistrationId,
    pub installment_number: u32,
    pub amount: Amount,
    pub method: PaymentMethod,
    pub reference: Option<String>,
    pub receipt_url: Option<String>,
    pub notes: Option<String>,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    /// Set when the owning registration was cancelled while this payment awaited review.
    pub voided_at: Option<DateTime<Utc>>,
    pub revision: u64,
}

impl Payment {
    /// Whether the payment occupies its installment slot.
    pub fn is_active(&self) -> bool {
        self.voided_at.is_none()
    }

    pub fn is_completed(&self) -> bool {
        self.is_active() && self.status == PaymentStatus::Completed
    }

    pub fn is_awaiting_review(&self) -> bool {
        self.is_active() && self.status == PaymentStatus::PendingReview
    }

    /// Moves the payment to `status`, returning the status it had before.
    ///
    /// Voided payments are frozen: they stay in the ledger for audit only.
    pub fn set_status(&mut self, status: PaymentStatus) -> Result<PaymentStatus, EngineError> {
        if !self.is_active() {
            return Err(EngineError::InvalidTransition(format!(
                "payment {} was voided and can no longer change status",
                self.id
            )));
        }
        Ok(std::mem::replace(&mut self.status, status))
    }

    /// Voids a payment awaiting review. Completed payments are never voided.
    pub fn void(&mut self, at: DateTime<Utc>) -> bool {
        if self.is_awaiting_review() {
            self.voided_at = Some(at);
            true
        } else {
            false
        }
    }
}

/// Input for recording a new payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPayment {
    pub registration_id: RegistrationId,
    pub installment_number: u32,
    pub amount: Amount,
    pub method: PaymentMethod,
    pub reference: Option<String>,
    pub receipt_url: Option<String>,
    pub notes: Option<String>,
    pub auto_approve: bool,
}

impl NewPayment {
    pub fn new(registration_id: RegistrationId, installment_number: u32, amount: Amount) -> Self {
        Self {
            registration_id,
            installment_number,
            amount,
            method: PaymentMethod::default(),
            reference: None,
            receipt_url: None,
            notes: None,
            auto_approve: false,
        }
    }

    pub fn approved(mut self) -> Self {
        self.auto_approve = true;
        self
    }

    pub fn with_method(mut self, method: PaymentMethod) -> Self {
        self.method = method;
        self
    }

    /// Builds the unsaved payment; the store assigns `id`.
    pub fn into_payment(self, created_at: DateTime<Utc>) -> Payment {
        Payment {
            id: 0,
            registration_id: self.registration_id,
            installment_number: self.installment_number,
            amount: self.amount,
            method: self.method,
            reference: self.reference,
            receipt_url: self.receipt_url,
            notes: self.notes,
            status: if self.auto_approve {
                PaymentStatus::Completed
            } else {
                PaymentStatus::PendingReview
            },
            created_at,
            voided_at: None,
            revision: 0,
        }
    }
}

/// Fields an operator may change on an existing payment. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaymentPatch {
    pub method: Option<PaymentMethod>,
    pub reference: Option<String>,
    pub receipt_url: Option<String>,
    pub notes: Option<String>,
    pub status: Option<PaymentStatus>,
}

impl PaymentPatch {
    pub fn approve() -> Self {
        Self {
            status: Some(PaymentStatus::Completed),
            ..Self::default()
        }
    }

    pub fn revert_to_review() -> Self {
        Self {
            status: Some(PaymentStatus::PendingReview),
            ..Self::default()
        }
    }

    pub(crate) fn apply_details(&self, payment: &mut Payment) {
        if let Some(method) = self.method {
            payment.method = method;
        }
        if let Some(reference) = &self.reference {
            payment.reference = Some(reference.clone());
        }
        if let Some(receipt_url) = &self.receipt_url {
            payment.receipt_url = Some(receipt_url.clone());
        }
        if let Some(notes) = &self.notes {
            payment.notes = Some(notes.clone());
        }
    }
}
