use super::event::EventId;
use crate::error::EngineError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub type RegistrationId = u64;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationStatus {
    #[default]
    Pending,
    Confirmed,
    Cancelled,
}

impl fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Channel through which a registration was submitted.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    #[default]
    Web,
    Dashboard,
    Mobile,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Default)]
pub struct Contact {
    pub name: String,
    pub surname: String,
    pub email: String,
    pub phone: Option<String>,
}

impl Contact {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.name, self.surname).trim().to_string()
    }
}

/// One attendee's enrollment in an event.
///
/// Status only changes through [`confirm`](Self::confirm),
/// [`reopen`](Self::reopen), [`cancel`](Self::cancel) and
/// [`rehabilitate`](Self::rehabilitate); each returns
/// [`EngineError::InvalidTransition`] and leaves the value untouched when the
/// move is not allowed from the current state.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct Registration {
    pub id: RegistrationId,
    pub event_id: EventId,
    pub contact: Contact,
    /// Venue or affiliation tag the attendee registered under.
    pub venue: Option<String>,
    /// Registration type as offered by the event (e.g. "general", "staff").
    pub kind: String,
    pub status: RegistrationStatus,
    pub origin: Origin,
    pub created_at: DateTime<Utc>,
    pub cancellation_reason: Option<String>,
    /// Bumped by the store on every committed write; used for compare-and-swap.
    pub revision: u64,
}

impl Registration {
    pub fn new(
        id: RegistrationId,
        event_id: EventId,
        contact: Contact,
        kind: impl Into<String>,
        origin: Origin,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            event_id,
            contact,
            venue: None,
            kind: kind.into(),
            status: RegistrationStatus::Pending,
            origin,
            created_at,
            cancellation_reason: None,
            revision: 0,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == RegistrationStatus::Cancelled
    }

    /// Pending -> Confirmed. Callers must only invoke it once every installment is paid.
    pub fn confirm(&mut self) -> Result<(), EngineError> {
        match self.status {
            RegistrationStatus::Pending => {
                self.status = RegistrationStatus::Confirmed;
                Ok(())
            }
            other => Err(self.rejected("confirm", other)),
        }
    }

    /// Confirmed -> Pending, used when a payment correction leaves an installment unpaid.
    pub fn reopen(&mut self) -> Result<(), EngineError> {
        match self.status {
            RegistrationStatus::Confirmed => {
                self.status = RegistrationStatus::Pending;
                Ok(())
            }
            other => Err(self.rejected("reopen", other)),
        }
    }

    /// {Pending, Confirmed} -> Cancelled.
    pub fn cancel(&mut self, reason: Option<String>) -> Result<(), EngineError> {
        match self.status {
            RegistrationStatus::Pending | RegistrationStatus::Confirmed => {
                self.status = RegistrationStatus::Cancelled;
                self.cancellation_reason = reason;
                Ok(())
            }
            other => Err(self.rejected("cancel", other)),
        }
    }

    /// Cancelled -> Pending.
    pub fn rehabilitate(&mut self) -> Result<(), EngineError> {
        match self.status {
            RegistrationStatus::Cancelled => {
                self.status = RegistrationStatus::Pending;
                self.cancellation_reason = None;
                Ok(())
            }
            other => Err(self.rejected("rehabilitate", other)),
        }
    }

    fn rejected(&self, action: &str, status: RegistrationStatus) -> EngineError {
        EngineError::InvalidTransition(format!(
            "cannot {action} registration {} while it is {status}",
            self.id
        ))
    }
}
