//! In-memory history store for tests and ephemeral sessions.

use async_trait::async_trait;
use chrono::Utc;
use concierge_core::error::HistoryError;
use concierge_core::history::{self, HistoryStore};
use concierge_core::message::{ChatRecord, Message, Role, Visibility};
use tokio::sync::RwLock;

/// Keeps every record in a vector behind a lock. Same visibility and
/// ordering semantics as the SQLite backend.
#[derive(Default)]
pub struct InMemoryHistory {
    records: RwLock<Vec<ChatRecord>>,
    next_id: RwLock<i64>,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    async fn insert(
        &self,
        user_id: i64,
        role: Role,
        content: String,
        visibility: Visibility,
    ) -> ChatRecord {
        let mut next_id = self.next_id.write().await;
        *next_id += 1;
        let record = ChatRecord {
            id: *next_id,
            user_id,
            role,
            content,
            visibility,
            created_at: Utc::now(),
        };
        drop(next_id);
        self.records.write().await.push(record.clone());
        record
    }

    async fn select(
        &self,
        user_id: i64,
        limit: usize,
        user_facing_only: bool,
    ) -> Vec<ChatRecord> {
        let records = self.records.read().await;
        let matching: Vec<ChatRecord> = records
            .iter()
            .filter(|r| r.user_id == user_id)
            .filter(|r| !user_facing_only || r.visibility == Visibility::UserFacing)
            .cloned()
            .collect();
        let skip = matching.len().saturating_sub(limit);
        matching.into_iter().skip(skip).collect()
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistory {
    async fn append_user(&self, user_id: i64, content: &str) -> Result<ChatRecord, HistoryError> {
        Ok(self
            .insert(user_id, Role::User, content.to_string(), Visibility::UserFacing)
            .await)
    }

    async fn append_assistant(
        &self,
        user_id: i64,
        content: &str,
        visibility: Visibility,
    ) -> Result<ChatRecord, HistoryError> {
        Ok(self
            .insert(user_id, Role::Assistant, content.to_string(), visibility)
            .await)
    }

    async fn append_tool_result(
        &self,
        user_id: i64,
        call_id: &str,
        result: &str,
    ) -> Result<ChatRecord, HistoryError> {
        let content = history::encode_tool_result(call_id, result);
        Ok(self
            .insert(user_id, Role::Tool, content, Visibility::Internal)
            .await)
    }

    async fn context(&self, user_id: i64, limit: usize) -> Result<Vec<Message>, HistoryError> {
        let records = self.select(user_id, limit, false).await;
        Ok(records.iter().map(history::record_to_turn).collect())
    }

    async fn transcript(
        &self,
        user_id: i64,
        limit: usize,
    ) -> Result<Vec<ChatRecord>, HistoryError> {
        Ok(self.select(user_id, limit, true).await)
    }

    async fn all_records(&self, user_id: i64) -> Result<Vec<ChatRecord>, HistoryError> {
        Ok(self.select(user_id, usize::MAX, false).await)
    }

    async fn replace_with_summary(
        &self,
        user_id: i64,
        summary: &str,
    ) -> Result<(), HistoryError> {
        self.records.write().await.retain(|r| r.user_id != user_id);
        self.insert(user_id, Role::System, summary.to_string(), Visibility::Internal)
            .await;
        Ok(())
    }
}
