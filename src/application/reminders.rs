use super::engine::InstallmentEngine;
use crate::domain::event::{EventDefinition, EventId};
use crate::domain::installment::compute_installments;
use crate::domain::ports::{NotifierRef, Template};
use crate::domain::registration::{Registration, RegistrationId};
use crate::error::Result;
use serde::Serialize;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Delivery outcome for one reminded registration.
#[derive(Debug, Serialize, PartialEq, Eq, Clone)]
pub struct ReminderOutcome {
    pub registration_id: RegistrationId,
    pub name: String,
    pub email: String,
    #[serde(rename = "exito")]
    pub success: bool,
    pub error: Option<String>,
}

#[derive(Debug, Serialize, PartialEq, Eq, Clone, Default)]
pub struct ReminderReport {
    pub sent: usize,
    pub failed: usize,
    /// One entry per selected registration, ordered by registration id.
    pub results: Vec<ReminderOutcome>,
}

struct ReminderJob {
    registration: Registration,
    data: Value,
}

impl InstallmentEngine {
    /// Sends a payment reminder to every live registration with unpaid installments.
    ///
    /// Each send runs as its own task; a failure, timeout or panic is recorded for
    /// that recipient and the rest of the batch carries on. Calling it twice sends
    /// twice.
    pub async fn send_reminders(&self, event_id: Option<EventId>) -> Result<ReminderReport> {
        let jobs = self.reminder_jobs(event_id).await?;
        tracing::info!(selected = jobs.len(), ?event_id, "dispatching payment reminders");

        let results = dispatch(
            jobs,
            Arc::clone(&self.notifier),
            self.reminders.concurrency,
            self.reminders.send_timeout(),
        )
        .await;

        let sent = results.iter().filter(|r| r.success).count();
        let report = ReminderReport {
            sent,
            failed: results.len() - sent,
            results,
        };
        tracing::info!(sent = report.sent, failed = report.failed, "payment reminders done");
        Ok(report)
    }

    async fn reminder_jobs(&self, event_id: Option<EventId>) -> Result<Vec<ReminderJob>> {
        let events: HashMap<EventId, EventDefinition> = match event_id {
            Some(id) => HashMap::from([(id, self.event(id).await?)]),
            None => self
                .catalog
                .all_events()
                .await?
                .into_iter()
                .map(|e| (e.id, e))
                .collect(),
        };

        let mut jobs = Vec::new();
        for registration in self.store.registrations(event_id).await? {
            if registration.is_cancelled() {
                continue;
            }
            let Some(event) = events.get(&registration.event_id) else {
                tracing::warn!(
                    registration_id = registration.id,
                    event_id = registration.event_id,
                    "skipping reminder for registration of unknown event"
                );
                continue;
            };

            let payments = self.store.payments_for(registration.id).await?;
            let schedule = compute_installments(&registration, event, &payments);
            if schedule.is_fully_paid {
                continue;
            }

            let outstanding: Vec<u32> = schedule.outstanding().map(|i| i.number).collect();
            let data = json!({
                "name": registration.contact.full_name(),
                "event": event.title,
                "outstanding_installments": outstanding,
                "outstanding_amount": schedule.outstanding_total().to_string(),
            });
            jobs.push(ReminderJob { registration, data });
        }
        Ok(jobs)
    }
}

async fn dispatch(
    jobs: Vec<ReminderJob>,
    notifier: NotifierRef,
    concurrency: usize,
    send_timeout: Duration,
) -> Vec<ReminderOutcome> {
    let permits = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut tasks = JoinSet::new();
    let mut pending: HashMap<usize, ReminderOutcome> = HashMap::new();

    for (slot, job) in jobs.into_iter().enumerate() {
        pending.insert(
            slot,
            ReminderOutcome {
                registration_id: job.registration.id,
                name: job.registration.contact.full_name(),
                email: job.registration.contact.email.clone(),
                success: false,
                error: None,
            },
        );

        let notifier = Arc::clone(&notifier);
        let permits = Arc::clone(&permits);
        tasks.spawn(async move {
            // The semaphore is never closed, so acquiring only waits for a free slot.
            let _permit = permits.acquire_owned().await.ok();
            let email = job.registration.contact.email;
            let send = notifier.send(&email, Template::PaymentReminder, &job.data);
            let delivery = match tokio::time::timeout(send_timeout, send).await {
                Ok(Ok(())) => Ok(()),
                Ok(Err(error)) => Err(error.to_string()),
                Err(_) => Err(format!("timed out after {}ms", send_timeout.as_millis())),
            };
            (slot, delivery)
        });
    }

    let mut results = Vec::with_capacity(pending.len());
    while let Some(joined) = tasks.join_next().await {
        let (slot, delivery) = match joined {
            Ok(done) => done,
            Err(error) => {
                // The slot of a panicked task stays in `pending` and is reported below.
                tracing::error!(%error, "payment reminder task aborted");
                continue;
            }
        };
        let Some(mut outcome) = pending.remove(&slot) else {
            continue;
        };
        match delivery {
            Ok(()) => {
                tracing::debug!(registration_id = outcome.registration_id, "payment reminder sent");
                outcome.success = true;
            }
            Err(reason) => {
                tracing::warn!(
                    registration_id = outcome.registration_id,
                    %reason,
                    "payment reminder failed"
                );
                outcome.error = Some(reason);
            }
        }
        results.push(outcome);
    }

    results.extend(pending.into_values().map(|mut outcome| {
        outcome.error = Some("send task aborted".to_string());
        outcome
    }));
    results.sort_by_key(|r| r.registration_id);
    results
}
