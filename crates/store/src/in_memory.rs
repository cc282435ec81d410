//! In-memory backends for tasks, contacts, profiles and the reminder log.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use concierge_core::error::StoreError;
use concierge_core::store::{
    ContactRecord, ContactStore, NewContact, NewTask, ProfileStore, ReminderLog, TaskRecord,
    TaskStatus, TaskStore, DEFAULT_PERSONA,
};
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;

#[derive(Default)]
pub struct InMemoryTaskStore {
    tasks: RwLock<Vec<TaskRecord>>,
    next_id: RwLock<i64>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn create(&self, user_id: i64, task: NewTask) -> Result<TaskRecord, StoreError> {
        let mut next_id = self.next_id.write().await;
        *next_id += 1;
        let record = TaskRecord {
            id: *next_id,
            user_id,
            title: task.title,
            description: task.description,
            status: TaskStatus::Pending,
            due_time: task.due_time,
            reminder_time: task.reminder_time,
            created_at: Utc::now(),
        };
        drop(next_id);
        self.tasks.write().await.push(record.clone());
        Ok(record)
    }

    async fn active(&self, user_id: i64) -> Result<Vec<TaskRecord>, StoreError> {
        let tasks = self.tasks.read().await;
        Ok(tasks
            .iter()
            .filter(|t| t.user_id == user_id)
            .filter(|t| matches!(t.status, TaskStatus::Pending | TaskStatus::InProgress))
            .cloned()
            .collect())
    }

    async fn search(
        &self,
        user_id: i64,
        query: &str,
        limit: usize,
    ) -> Result<Vec<TaskRecord>, StoreError> {
        let needle = query.to_lowercase();
        let tasks = self.tasks.read().await;
        Ok(tasks
            .iter()
            .filter(|t| t.user_id == user_id)
            .filter(|t| {
                t.title.to_lowercase().contains(&needle)
                    || t.description
                        .as_deref()
                        .is_some_and(|d| d.to_lowercase().contains(&needle))
            })
            .take(limit)
            .cloned()
            .collect())
    }

    async fn update_status(
        &self,
        user_id: i64,
        task_id: i64,
        status: TaskStatus,
    ) -> Result<Option<TaskRecord>, StoreError> {
        let mut tasks = self.tasks.write().await;
        match tasks
            .iter_mut()
            .find(|t| t.id == task_id && t.user_id == user_id)
        {
            Some(task) => {
                task.status = status;
                Ok(Some(task.clone()))
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, user_id: i64, task_id: i64) -> Result<bool, StoreError> {
        let mut tasks = self.tasks.write().await;
        let before = tasks.len();
        tasks.retain(|t| !(t.id == task_id && t.user_id == user_id));
        Ok(tasks.len() < before)
    }

    async fn due_reminders(&self, now: DateTime<Utc>) -> Result<Vec<TaskRecord>, StoreError> {
        let tasks = self.tasks.read().await;
        Ok(tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Pending)
            .filter(|t| t.reminder_time.is_some_and(|r| r <= now))
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct InMemoryContactStore {
    contacts: RwLock<Vec<ContactRecord>>,
    next_id: RwLock<i64>,
}

impl InMemoryContactStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ContactStore for InMemoryContactStore {
    async fn add(&self, user_id: i64, contact: NewContact) -> Result<ContactRecord, StoreError> {
        let mut next_id = self.next_id.write().await;
        *next_id += 1;
        let record = ContactRecord {
            id: *next_id,
            user_id,
            name: contact.name,
            notes: contact.notes,
            important_dates: contact.important_dates,
            created_at: Utc::now(),
        };
        drop(next_id);
        self.contacts.write().await.push(record.clone());
        Ok(record)
    }

    async fn list(&self, user_id: i64) -> Result<Vec<ContactRecord>, StoreError> {
        let contacts = self.contacts.read().await;
        Ok(contacts
            .iter()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect())
    }
}

/// Persona lookup with a built-in default when no profile is registered.
#[derive(Default)]
pub struct InMemoryProfileStore {
    personas: RwLock<HashMap<i64, String>>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_persona(&self, user_id: i64, persona: String) {
        self.personas.write().await.insert(user_id, persona);
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn persona(&self, user_id: i64) -> Result<String, StoreError> {
        let personas = self.personas.read().await;
        Ok(personas
            .get(&user_id)
            .cloned()
            .unwrap_or_else(|| DEFAULT_PERSONA.to_string()))
    }
}

#[derive(Default)]
pub struct InMemoryReminderLog {
    sent: RwLock<HashSet<i64>>,
}

impl InMemoryReminderLog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReminderLog for InMemoryReminderLog {
    async fn record_if_new(&self, task_id: i64) -> Result<bool, StoreError> {
        Ok(self.sent.write().await.insert(task_id))
    }
}
