use crate::application::engine::InstallmentEngine;
use crate::application::lifecycle::NewRegistration;
use crate::domain::event::EventId;
use crate::domain::money::Amount;
use crate::domain::payment::{NewPayment, PaymentMethod, PaymentPatch, PaymentStatus};
use crate::domain::registration::{Contact, Origin, RegistrationId};
use crate::error::{EngineError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Register,
    Pay,
    Approve,
    Revert,
    Cancel,
    Rehabilitate,
}

/// One row of a ledger journal. Which columns are required depends on `op`.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct JournalEntry {
    pub op: Operation,
    pub registration: RegistrationId,
    pub event: Option<EventId>,
    pub installment: Option<u32>,
    /// Major currency units, e.g. `50.00`.
    pub amount: Option<Decimal>,
    pub method: Option<PaymentMethod>,
    pub reference: Option<String>,
    pub receipt: Option<String>,
    pub notes: Option<String>,
    pub auto: Option<bool>,
    pub name: Option<String>,
    pub surname: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub venue: Option<String>,
    pub kind: Option<String>,
    pub origin: Option<Origin>,
    pub reason: Option<String>,
}

fn required<T>(value: Option<T>, op: Operation, column: &str) -> Result<T> {
    value.ok_or_else(|| EngineError::ValidationError(format!("{op:?} requires `{column}`")))
}

impl JournalEntry {
    /// Runs the operation this row describes against `engine`.
    pub async fn apply(self, engine: &InstallmentEngine) -> Result<()> {
        let op = self.op;
        match op {
            Operation::Register => {
                let request = NewRegistration {
                    id: self.registration,
                    event_id: required(self.event, op, "event")?,
                    contact: Contact {
                        name: required(self.name, op, "name")?,
                        surname: self.surname.unwrap_or_default(),
                        email: required(self.email, op, "email")?,
                        phone: self.phone,
                    },
                    venue: self.venue,
                    kind: self.kind.unwrap_or_else(|| "general".to_string()),
                    origin: self.origin.unwrap_or(Origin::Dashboard),
                };
                engine.register(request).await?;
            }
            Operation::Pay => {
                let amount = Amount::from_major(required(self.amount, op, "amount")?)?;
                let mut request = NewPayment::new(
                    self.registration,
                    required(self.installment, op, "installment")?,
                    amount,
                )
                .with_method(self.method.unwrap_or_default());
                request.reference = self.reference;
                request.receipt_url = self.receipt;
                request.notes = self.notes;
                request.auto_approve = self.auto.unwrap_or(false);
                engine.create_payment(request).await?;
            }
            Operation::Approve | Operation::Revert => {
                let installment = required(self.installment, op, "installment")?;
                let payment = engine
                    .payments_for(self.registration)
                    .await?
                    .into_iter()
                    .find(|p| p.installment_number == installment && p.is_active())
                    .ok_or_else(|| {
                        EngineError::not_found(
                            "payment",
                            format!(
                                "for registration {} installment {installment}",
                                self.registration
                            ),
                        )
                    })?;
                let status = if op == Operation::Approve {
                    PaymentStatus::Completed
                } else {
                    PaymentStatus::PendingReview
                };
                let patch = PaymentPatch {
                    status: Some(status),
                    notes: self.notes,
                    reference: self.reference,
                    ..PaymentPatch::default()
                };
                engine.update_payment(payment.id, patch).await?;
            }
            Operation::Cancel => {
                engine.cancel(self.registration, self.reason).await?;
            }
            Operation::Rehabilitate => {
                engine.rehabilitate(self.registration).await?;
            }
        }
        Ok(())
    }
}

/// Reads journal entries from a CSV source.
///
/// Wraps `csv::Reader` with whitespace trimming and flexible record lengths, so
/// rows may omit trailing columns their operation does not use.
pub struct JournalReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> JournalReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily reads and deserializes journal rows.
    pub fn entries(self) -> impl Iterator<Item = Result<JournalEntry>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(EngineError::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const HEADER: &str = "op,registration,event,installment,amount,method,reference,receipt,notes,auto,name,surname,email,phone,venue,kind,origin,reason";

    #[test]
    fn test_reader_valid_stream() {
        let data = format!(
            "{HEADER}\n\
             register, 1, 1, , , , , , , , Ana, Pérez, ana@example.com, , Norte, general, web,\n\
             pay, 1, , 1, 50.00, bank_transfer, TRX-1, , , true, , , , , , , ,"
        );
        let reader = JournalReader::new(data.as_bytes());
        let entries: Vec<Result<JournalEntry>> = reader.entries().collect();

        assert_eq!(entries.len(), 2);
        let register = entries[0].as_ref().unwrap();
        assert_eq!(register.op, Operation::Register);
        assert_eq!(register.email.as_deref(), Some("ana@example.com"));
        assert_eq!(register.origin, Some(Origin::Web));

        let pay = entries[1].as_ref().unwrap();
        assert_eq!(pay.amount, Some(dec!(50.00)));
        assert_eq!(pay.method, Some(PaymentMethod::BankTransfer));
        assert_eq!(pay.auto, Some(true));
        assert!(pay.name.is_none());
    }

    #[test]
    fn test_reader_short_rows() {
        let data = "op,registration,reason\ncancel, 4, moved away\nrehabilitate, 4";
        let entries: Vec<Result<JournalEntry>> =
            JournalReader::new(data.as_bytes()).entries().collect();

        let cancel = entries[0].as_ref().unwrap();
        assert_eq!(cancel.reason.as_deref(), Some("moved away"));
        let rehabilitate = entries[1].as_ref().unwrap();
        assert_eq!(rehabilitate.op, Operation::Rehabilitate);
        assert!(rehabilitate.reason.is_none());
    }

    #[test]
    fn test_reader_malformed_line() {
        let data = format!("{HEADER}\nrefund, 1, , 1, 1.0, , , , , , , , , , , , ,");
        let entries: Vec<Result<JournalEntry>> =
            JournalReader::new(data.as_bytes()).entries().collect();

        assert!(entries[0].is_err());
    }
}
