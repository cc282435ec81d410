//! Domain-store traits: tasks, contacts, assistant profiles, and the
//! reminder sent-log.
//!
//! Actual CRUD persistence is an external collaborator; this crate only
//! defines the seams the tool handlers and the reminder job talk through.
//! In-memory reference implementations live in `concierge-store`.

use crate::error::{DeliveryError, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Persona used when a user has no assistant profile yet.
pub const DEFAULT_PERSONA: &str = "You are a highly intelligent, organized and emotionally aware \
personal assistant.\nYou help the user remember tasks, people, and commitments clearly and concisely.";

/// Task lifecycle status. Closed set; anything else is a business error
/// payload, not a panic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Done,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "PENDING",
            TaskStatus::InProgress => "IN_PROGRESS",
            TaskStatus::Done => "DONE",
        }
    }

    /// Case-insensitive parse; `None` for anything outside the set.
    pub fn parse(s: &str) -> Option<TaskStatus> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Some(TaskStatus::Pending),
            "IN_PROGRESS" => Some(TaskStatus::InProgress),
            "DONE" => Some(TaskStatus::Done),
            _ => None,
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub due_time: Option<DateTime<Utc>>,
    pub reminder_time: Option<DateTime<Utc>>,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub due_time: Option<DateTime<Utc>>,
    pub reminder_time: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn create(&self, user_id: i64, task: NewTask) -> Result<TaskRecord, StoreError>;

    /// Active tasks (pending and in-progress) for listing.
    async fn active(&self, user_id: i64) -> Result<Vec<TaskRecord>, StoreError>;

    /// Case-insensitive substring search over title and description.
    async fn search(
        &self,
        user_id: i64,
        query: &str,
        limit: usize,
    ) -> Result<Vec<TaskRecord>, StoreError>;

    /// `None` when no task with that id belongs to the user.
    async fn update_status(
        &self,
        user_id: i64,
        task_id: i64,
        status: TaskStatus,
    ) -> Result<Option<TaskRecord>, StoreError>;

    /// `false` when no task with that id belongs to the user.
    async fn delete(&self, user_id: i64, task_id: i64) -> Result<bool, StoreError>;

    /// Pending tasks whose reminder time has passed, across all users.
    async fn due_reminders(&self, now: DateTime<Utc>) -> Result<Vec<TaskRecord>, StoreError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactRecord {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub notes: Option<String>,
    /// Free-form JSON string for birthdays and the like.
    pub important_dates: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct NewContact {
    pub name: String,
    pub notes: Option<String>,
    pub important_dates: Option<String>,
}

#[async_trait]
pub trait ContactStore: Send + Sync {
    async fn add(&self, user_id: i64, contact: NewContact) -> Result<ContactRecord, StoreError>;
    async fn list(&self, user_id: i64) -> Result<Vec<ContactRecord>, StoreError>;
}

/// Per-user assistant persona, used as the LLM system context.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// The persona prompt for this user; implementations fall back to
    /// [`DEFAULT_PERSONA`] when no profile exists or the prompt is blank.
    async fn persona(&self, user_id: i64) -> Result<String, StoreError>;
}

/// Append-only sent-log keyed by task id, for exactly-once reminders.
#[async_trait]
pub trait ReminderLog: Send + Sync {
    /// Atomic conditional insert: returns `true` exactly once per task id.
    /// The single-operation contract is what removes the double-send race.
    async fn record_if_new(&self, task_id: i64) -> Result<bool, StoreError>;
}

/// Outbound notification channel for the reminder job.
#[async_trait]
pub trait ReminderSink: Send + Sync {
    async fn deliver(&self, user_id: i64, message: &str) -> Result<(), DeliveryError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parse_accepts_mixed_case() {
        assert_eq!(TaskStatus::parse("done"), Some(TaskStatus::Done));
        assert_eq!(TaskStatus::parse(" in_progress "), Some(TaskStatus::InProgress));
        assert_eq!(TaskStatus::parse("PENDING"), Some(TaskStatus::Pending));
    }

    #[test]
    fn status_parse_rejects_unknown() {
        assert_eq!(TaskStatus::parse("CANCELLED"), None);
        assert_eq!(TaskStatus::parse(""), None);
    }

    #[test]
    fn status_roundtrip() {
        for s in [TaskStatus::Pending, TaskStatus::InProgress, TaskStatus::Done] {
            assert_eq!(TaskStatus::parse(s.as_str()), Some(s));
        }
    }
}
