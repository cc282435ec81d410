//! Background reminder delivery.
//!
//! Each run finds pending tasks whose reminder time has passed and
//! delivers at most one message per task, ever. The sent-log claim is a
//! single atomic insert and it happens *before* delivery: a task whose
//! delivery then fails is logged and skipped, never retried, which is the
//! trade chosen over double-sending.

use chrono::Utc;
use concierge_core::error::StoreError;
use concierge_core::store::{ReminderLog, ReminderSink, TaskRecord, TaskStore};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub struct ReminderJob {
    tasks: Arc<dyn TaskStore>,
    log: Arc<dyn ReminderLog>,
    sink: Arc<dyn ReminderSink>,
    interval: Duration,
}

impl ReminderJob {
    pub fn new(
        tasks: Arc<dyn TaskStore>,
        log: Arc<dyn ReminderLog>,
        sink: Arc<dyn ReminderSink>,
        interval: Duration,
    ) -> Self {
        Self { tasks, log, sink, interval }
    }

    /// One sweep over due tasks. Returns how many reminders were delivered.
    pub async fn run_once(&self) -> Result<usize, StoreError> {
        let now = Utc::now();
        let due = self.tasks.due_reminders(now).await?;
        if due.is_empty() {
            return Ok(0);
        }
        debug!(count = due.len(), "Reminder sweep: tasks with elapsed reminder time");

        let mut delivered = 0;
        for task in due {
            if !self.log.record_if_new(task.id).await? {
                continue;
            }
            let message = format_reminder(&task);
            match self.sink.deliver(task.user_id, &message).await {
                Ok(()) => {
                    info!(task_id = task.id, title = %task.title, "Reminder sent");
                    delivered += 1;
                }
                Err(e) => {
                    warn!(task_id = task.id, "Reminder delivery failed: {e}");
                }
            }
        }
        Ok(delivered)
    }

    /// Fixed-delay loop: the interval is measured from the end of one
    /// sweep to the start of the next. Runs until the task is dropped.
    pub async fn run(&self) {
        loop {
            if let Err(e) = self.run_once().await {
                warn!("Reminder sweep failed: {e}");
            }
            tokio::time::sleep(self.interval).await;
        }
    }
}

fn format_reminder(task: &TaskRecord) -> String {
    let mut message = format!("Reminder: {}", task.title);
    if let Some(due) = task.due_time {
        message.push_str(&format!(" (due {})", due.format("%b %-d, %-I:%M %p")));
    }
    if let Some(description) = task.description.as_deref() {
        if !description.trim().is_empty() {
            message.push('\n');
            message.push_str(description);
        }
    }
    message
}
