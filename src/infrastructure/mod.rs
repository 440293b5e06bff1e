//! Storage and notification adapters for the domain ports.

pub mod in_memory;
pub mod notifier;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;

use crate::domain::payment::Payment;
use crate::domain::registration::Registration;
use crate::error::{EngineError, Result};

/// Checks run by every store before inserting `payment`, under its write lock.
pub(crate) fn check_payment_insert<'a>(
    registration: Option<&Registration>,
    existing: impl IntoIterator<Item = &'a Payment>,
    payment: &Payment,
) -> Result<()> {
    let registration = registration
        .ok_or_else(|| EngineError::not_found("registration", payment.registration_id))?;

    if registration.is_cancelled() {
        return Err(EngineError::InvalidTransition(format!(
            "registration {} is cancelled and cannot take payments",
            registration.id
        )));
    }

    let taken = existing.into_iter().any(|p| {
        p.registration_id == payment.registration_id
            && p.installment_number == payment.installment_number
            && p.is_active()
    });
    if taken {
        return Err(EngineError::DuplicatePayment {
            registration_id: payment.registration_id,
            installment: payment.installment_number,
        });
    }

    Ok(())
}

/// Compare-and-swap check: the caller's copy must carry the stored revision.
pub(crate) fn check_revision(
    entity: &'static str,
    id: u64,
    stored: Option<u64>,
    expected: u64,
) -> Result<()> {
    match stored {
        None => Err(EngineError::not_found(entity, id)),
        Some(revision) if revision != expected => Err(EngineError::conflict(entity, id)),
        Some(_) => Ok(()),
    }
}
