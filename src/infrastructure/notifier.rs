use crate::domain::ports::{Notifier, NotifyError, Template};
use async_trait::async_trait;
use serde_json::Value;

/// Notifier that writes each message to the log instead of delivering it.
///
/// Used by the CLI, where the mail gateway is not wired in. Recipients without an
/// `@` are rejected so that obviously broken addresses still surface as failures.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(
        &self,
        recipient: &str,
        template: Template,
        data: &Value,
    ) -> Result<(), NotifyError> {
        if !recipient.contains('@') {
            return Err(NotifyError {
                recipient: recipient.to_string(),
                reason: "not an email address".to_string(),
            });
        }
        tracing::info!(%recipient, %template, %data, "notification sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_log_notifier_accepts_email() {
        let notifier = LogNotifier::new();
        let result = notifier
            .send("ana@example.com", Template::PaymentReminder, &json!({"name": "Ana"}))
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_log_notifier_rejects_malformed_recipient() {
        let notifier = LogNotifier::new();
        let err = notifier
            .send("", Template::RegistrationCancelled, &Value::Null)
            .await
            .unwrap_err();
        assert_eq!(err.reason, "not an email address");
    }
}
