//! TOML configuration: the event catalog and reminder dispatch settings.

use crate::domain::event::{EventDefinition, EventId};
use crate::domain::money::Amount;
use crate::error::{EngineError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct EventConfig {
    pub id: EventId,
    pub title: String,
    pub installment_count: u32,
    /// Registration fee in major currency units.
    pub fee: Decimal,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl EventConfig {
    pub fn to_definition(&self) -> Result<EventDefinition> {
        EventDefinition::new(
            self.id,
            self.title.clone(),
            self.installment_count,
            Amount::from_major(self.fee)?,
            self.active,
        )
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ReminderConfig {
    /// Maximum number of notifications in flight at once.
    pub concurrency: usize,
    pub send_timeout_ms: u64,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            concurrency: 8,
            send_timeout_ms: 5_000,
        }
    }
}

impl ReminderConfig {
    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub events: Vec<EventConfig>,
    #[serde(default)]
    pub reminders: ReminderConfig,
}

impl Config {
    pub fn from_toml(source: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(source).map_err(|e| EngineError::ConfigError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let source = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            EngineError::ConfigError(format!("cannot read {}: {e}", path.as_ref().display()))
        })?;
        Self::from_toml(&source)
    }

    fn validate(&self) -> Result<()> {
        if self.reminders.concurrency == 0 {
            return Err(EngineError::ConfigError(
                "reminders.concurrency must be at least 1".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for event in &self.events {
            if !seen.insert(event.id) {
                return Err(EngineError::ConfigError(format!(
                    "event {} is defined more than once",
                    event.id
                )));
            }
        }
        Ok(())
    }

    /// Builds the event catalog entries, validating every definition.
    pub fn event_definitions(&self) -> Result<Vec<EventDefinition>> {
        self.events.iter().map(EventConfig::to_definition).collect()
    }
}
