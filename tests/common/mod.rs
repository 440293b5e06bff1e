#![allow(dead_code)]

use async_trait::async_trait;
use cuotas::application::engine::InstallmentEngine;
use cuotas::application::lifecycle::NewRegistration;
use cuotas::domain::event::EventDefinition;
use cuotas::domain::money::Amount;
use cuotas::domain::payment::{NewPayment, Payment};
use cuotas::domain::ports::{Notifier, NotifierRef, NotifyError, Template};
use cuotas::domain::registration::{Contact, Origin, Registration};
use cuotas::infrastructure::in_memory::{InMemoryEventCatalog, InMemoryLedgerStore};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Event 1: three installments of 50.00. Event 2: two of 45.00. Event 3: closed.
pub fn events() -> Vec<EventDefinition> {
    vec![
        EventDefinition::new(1, "Retiro anual", 3, Amount::new(15000).unwrap(), true).unwrap(),
        EventDefinition::new(2, "Encuentro", 2, Amount::new(9000).unwrap(), true).unwrap(),
        EventDefinition::new(3, "Cerrado", 1, Amount::new(1000).unwrap(), false).unwrap(),
    ]
}

/// Notifier that records every send and fails for selected recipients.
#[derive(Default)]
pub struct RecordingNotifier {
    failing: HashSet<String>,
    delay: Option<Duration>,
    sent: Mutex<Vec<(String, Template, Value)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_for(recipients: &[&str]) -> Self {
        Self {
            failing: recipients.iter().map(|r| r.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn sent(&self) -> Vec<(String, Template, Value)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_with(&self, template: Template) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter(|(_, t, _)| *t == template)
            .map(|(recipient, _, _)| recipient)
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(
        &self,
        recipient: &str,
        template: Template,
        data: &Value,
    ) -> Result<(), NotifyError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.contains(recipient) {
            return Err(NotifyError {
                recipient: recipient.to_string(),
                reason: "mailbox unavailable".to_string(),
            });
        }
        self.sent
            .lock()
            .unwrap()
            .push((recipient.to_string(), template, data.clone()));
        Ok(())
    }
}

pub fn engine_with(notifier: Arc<RecordingNotifier>) -> InstallmentEngine {
    let notifier: NotifierRef = notifier;
    InstallmentEngine::new(
        Box::new(InMemoryEventCatalog::new(events())),
        Box::new(InMemoryLedgerStore::new()),
        notifier,
    )
}

pub fn engine() -> InstallmentEngine {
    engine_with(Arc::new(RecordingNotifier::new()))
}

pub fn email_of(id: u64) -> String {
    format!("attendee{id}@example.com")
}

pub fn new_registration(id: u64, event_id: u32) -> NewRegistration {
    NewRegistration {
        id,
        event_id,
        contact: Contact {
            name: format!("Attendee{id}"),
            surname: "Test".to_string(),
            email: email_of(id),
            phone: None,
        },
        venue: Some("Norte".to_string()),
        kind: "general".to_string(),
        origin: Origin::Web,
    }
}

pub async fn register(engine: &InstallmentEngine, id: u64) -> Registration {
    register_for(engine, id, 1).await
}

pub async fn register_for(engine: &InstallmentEngine, id: u64, event_id: u32) -> Registration {
    engine.register(new_registration(id, event_id)).await.unwrap()
}

pub fn installment_payment(registration_id: u64, number: u32) -> NewPayment {
    NewPayment::new(registration_id, number, Amount::new(5000).unwrap())
}

pub async fn pay(engine: &InstallmentEngine, registration_id: u64, number: u32) -> Payment {
    engine
        .create_payment(installment_payment(registration_id, number).approved())
        .await
        .unwrap()
}
