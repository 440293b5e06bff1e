use super::money::Amount;
use crate::error::EngineError;
use serde::Serialize;

pub type EventId = u32;

/// An event attendees register for, with its fee and how it is split.
///
/// Definitions are read-only configuration for the engine: they must not change
/// once registrations reference them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventDefinition {
    pub id: EventId,
    pub title: String,
    installment_count: u32,
    fee_amount: Amount,
    pub active: bool,
}

impl EventDefinition {
    pub fn new(
        id: EventId,
        title: impl Into<String>,
        installment_count: u32,
        fee_amount: Amount,
        active: bool,
    ) -> Result<Self, EngineError> {
        if installment_count == 0 {
            return Err(EngineError::ValidationError(format!(
                "Event {id} must have at least one installment"
            )));
        }
        Ok(Self {
            id,
            title: title.into(),
            installment_count,
            fee_amount,
            active,
        })
    }

    pub fn installment_count(&self) -> u32 {
        self.installment_count
    }

    pub fn fee_amount(&self) -> Amount {
        self.fee_amount
    }

    pub fn has_installment(&self, number: u32) -> bool {
        (1..=self.installment_count).contains(&number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_requires_installments() {
        let fee = Amount::new(15000).unwrap();
        assert!(matches!(
            EventDefinition::new(1, "Retiro", 0, fee, true),
            Err(EngineError::ValidationError(_))
        ));

        let event = EventDefinition::new(1, "Retiro", 3, fee, true).unwrap();
        assert!(event.has_installment(1));
        assert!(event.has_installment(3));
        assert!(!event.has_installment(0));
        assert!(!event.has_installment(4));
    }
}
