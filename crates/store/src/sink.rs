//! Reminder delivery sinks.

use async_trait::async_trait;
use concierge_core::error::DeliveryError;
use concierge_core::store::ReminderSink;
use tokio::sync::Mutex;
use tracing::info;

/// Prints reminders to stdout. The delivery channel for CLI sessions.
#[derive(Default)]
pub struct ConsoleSink;

impl ConsoleSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ReminderSink for ConsoleSink {
    async fn deliver(&self, user_id: i64, message: &str) -> Result<(), DeliveryError> {
        info!(user_id, "Delivering reminder");
        println!("{message}");
        Ok(())
    }
}

/// Captures delivered reminders for inspection in tests.
#[derive(Default)]
pub struct CollectingSink {
    delivered: Mutex<Vec<(i64, String)>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn delivered(&self) -> Vec<(i64, String)> {
        self.delivered.lock().await.clone()
    }
}

#[async_trait]
impl ReminderSink for CollectingSink {
    async fn deliver(&self, user_id: i64, message: &str) -> Result<(), DeliveryError> {
        self.delivered
            .lock()
            .await
            .push((user_id, message.to_string()));
        Ok(())
    }
}
