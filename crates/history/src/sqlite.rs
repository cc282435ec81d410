//! SQLite history backend.
//!
//! A single database file with two tables:
//! - `chat_messages` — the append-only per-user turn log
//! - `reminder_log` — the sent-log for exactly-once reminder delivery
//!
//! Rows are written once and never updated; compaction is the only delete
//! path and runs inside one transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use concierge_core::error::{HistoryError, StoreError};
use concierge_core::history::{self, HistoryStore};
use concierge_core::message::{ChatRecord, Message, Role, Visibility};
use concierge_core::store::ReminderLog;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info};

/// Production SQLite history store.
pub struct SqliteHistory {
    pool: SqlitePool,
}

impl SqliteHistory {
    /// Open (and migrate) the database at `path`. Pass `":memory:"` for an
    /// in-process ephemeral database, useful in tests.
    pub async fn new(path: &str) -> Result<Self, HistoryError> {
        let options = SqliteConnectOptions::from_str(path)
            .map_err(|e| HistoryError::Storage(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .pragma("foreign_keys", "ON");

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| HistoryError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!("SQLite history store initialized at {path}");
        Ok(store)
    }

    /// Create from an existing pool (useful for testing).
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, HistoryError> {
        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn run_migrations(&self) -> Result<(), HistoryError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS chat_messages (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id     INTEGER NOT NULL,
                role        TEXT NOT NULL,
                content     TEXT NOT NULL,
                visibility  TEXT NOT NULL DEFAULT 'USER_FACING',
                created_at  TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| HistoryError::MigrationFailed(format!("chat_messages table: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_chat_messages_user
             ON chat_messages(user_id, id)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| HistoryError::MigrationFailed(format!("chat_messages index: {e}")))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS reminder_log (
                task_id  INTEGER PRIMARY KEY,
                sent_at  TEXT NOT NULL,
                status   TEXT NOT NULL DEFAULT 'SENT'
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| HistoryError::MigrationFailed(format!("reminder_log table: {e}")))?;

        debug!("SQLite history migrations complete");
        Ok(())
    }

    async fn insert(
        &self,
        user_id: i64,
        role: Role,
        content: &str,
        visibility: Visibility,
    ) -> Result<ChatRecord, HistoryError> {
        let created_at = Utc::now();
        let row = sqlx::query(
            "INSERT INTO chat_messages (user_id, role, content, visibility, created_at)
             VALUES (?, ?, ?, ?, ?)
             RETURNING id",
        )
        .bind(user_id)
        .bind(role.as_str())
        .bind(content)
        .bind(visibility.as_str())
        .bind(created_at.to_rfc3339())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| HistoryError::Storage(format!("Insert failed: {e}")))?;

        let id: i64 = row
            .try_get("id")
            .map_err(|e| HistoryError::Storage(format!("id column: {e}")))?;

        Ok(ChatRecord {
            id,
            user_id,
            role,
            content: content.to_string(),
            visibility,
            created_at,
        })
    }

    fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> Result<ChatRecord, HistoryError> {
        let id: i64 = row
            .try_get("id")
            .map_err(|e| HistoryError::QueryFailed(format!("id column: {e}")))?;
        let user_id: i64 = row
            .try_get("user_id")
            .map_err(|e| HistoryError::QueryFailed(format!("user_id column: {e}")))?;
        let role: String = row
            .try_get("role")
            .map_err(|e| HistoryError::QueryFailed(format!("role column: {e}")))?;
        let content: String = row
            .try_get("content")
            .map_err(|e| HistoryError::QueryFailed(format!("content column: {e}")))?;
        let visibility: String = row
            .try_get("visibility")
            .map_err(|e| HistoryError::QueryFailed(format!("visibility column: {e}")))?;
        let created_at_str: String = row
            .try_get("created_at")
            .map_err(|e| HistoryError::QueryFailed(format!("created_at column: {e}")))?;

        let created_at = DateTime::parse_from_rfc3339(&created_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        Ok(ChatRecord {
            id,
            user_id,
            role: Role::parse(&role),
            content,
            visibility: Visibility::parse(&visibility),
            created_at,
        })
    }

    /// Most recent `limit` rows, returned oldest first.
    async fn recent(
        &self,
        user_id: i64,
        limit: i64,
        user_facing_only: bool,
    ) -> Result<Vec<ChatRecord>, HistoryError> {
        let sql = if user_facing_only {
            "SELECT * FROM (
                 SELECT id, user_id, role, content, visibility, created_at
                 FROM chat_messages
                 WHERE user_id = ? AND visibility = 'USER_FACING'
                 ORDER BY id DESC LIMIT ?
             ) ORDER BY id ASC"
        } else {
            "SELECT * FROM (
                 SELECT id, user_id, role, content, visibility, created_at
                 FROM chat_messages
                 WHERE user_id = ?
                 ORDER BY id DESC LIMIT ?
             ) ORDER BY id ASC"
        };

        let rows = sqlx::query(sql)
            .bind(user_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| HistoryError::QueryFailed(format!("History select: {e}")))?;

        rows.iter().map(Self::row_to_record).collect()
    }
}

#[async_trait]
impl HistoryStore for SqliteHistory {
    async fn append_user(&self, user_id: i64, content: &str) -> Result<ChatRecord, HistoryError> {
        self.insert(user_id, Role::User, content, Visibility::UserFacing)
            .await
    }

    async fn append_assistant(
        &self,
        user_id: i64,
        content: &str,
        visibility: Visibility,
    ) -> Result<ChatRecord, HistoryError> {
        self.insert(user_id, Role::Assistant, content, visibility)
            .await
    }

    async fn append_tool_result(
        &self,
        user_id: i64,
        call_id: &str,
        result: &str,
    ) -> Result<ChatRecord, HistoryError> {
        let content = history::encode_tool_result(call_id, result);
        self.insert(user_id, Role::Tool, &content, Visibility::Internal)
            .await
    }

    async fn context(&self, user_id: i64, limit: usize) -> Result<Vec<Message>, HistoryError> {
        let records = self.recent(user_id, limit as i64, false).await?;
        Ok(records.iter().map(history::record_to_turn).collect())
    }

    async fn transcript(
        &self,
        user_id: i64,
        limit: usize,
    ) -> Result<Vec<ChatRecord>, HistoryError> {
        self.recent(user_id, limit as i64, true).await
    }

    async fn all_records(&self, user_id: i64) -> Result<Vec<ChatRecord>, HistoryError> {
        self.recent(user_id, i64::MAX, false).await
    }

    async fn replace_with_summary(
        &self,
        user_id: i64,
        summary: &str,
    ) -> Result<(), HistoryError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| HistoryError::Storage(format!("Begin transaction: {e}")))?;

        sqlx::query("DELETE FROM chat_messages WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| HistoryError::Storage(format!("History delete: {e}")))?;

        sqlx::query(
            "INSERT INTO chat_messages (user_id, role, content, visibility, created_at)
             VALUES (?, 'SYSTEM', ?, 'INTERNAL', ?)",
        )
        .bind(user_id)
        .bind(summary)
        .bind(Utc::now().to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(|e| HistoryError::Storage(format!("Summary insert: {e}")))?;

        tx.commit()
            .await
            .map_err(|e| HistoryError::Storage(format!("Commit: {e}")))?;

        info!(user_id, "History replaced with compaction summary");
        Ok(())
    }
}

/// Sent-log backed by the same database, using `INSERT OR IGNORE` so the
/// existence check and the claim are one atomic operation.
pub struct SqliteReminderLog {
    pool: SqlitePool,
}

impl SqliteReminderLog {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReminderLog for SqliteReminderLog {
    async fn record_if_new(&self, task_id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO reminder_log (task_id, sent_at, status)
             VALUES (?, ?, 'SENT')",
        )
        .bind(task_id)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("reminder_log insert: {e}")))?;

        Ok(result.rows_affected() > 0)
    }
}
