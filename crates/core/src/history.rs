//! History store trait and the persisted-content encoding rules.
//!
//! The log is append-only: rows are never mutated after creation, and the
//! only deletion is compaction, which atomically replaces a user's entire
//! history with one SYSTEM summary row.
//!
//! Structured turns are stored as JSON-encoded text so the log stays a flat
//! `(role, content, visibility)` table:
//! - assistant tool-call turns: `{"content":"","tool_calls":[{"id",
//!   "type":"function","function":{"name","arguments"}}]}` where
//!   `arguments` is itself a JSON string;
//! - tool results: `{"tool_call_id":"...","result":"..."}`.
//!
//! Rehydration tolerates malformed or legacy content by degrading to a
//! plain text turn (tool rows fall back to call id `"legacy"`).

use crate::error::HistoryError;
use crate::message::{ChatRecord, Message, Role, ToolCallRequest, Visibility};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Default lookback when rebuilding model context.
pub const HISTORY_LIMIT: usize = 50;

/// Append-only per-user message log with visibility-aware reconstruction.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Persist the user's inbound message (always USER_FACING).
    async fn append_user(&self, user_id: i64, content: &str) -> Result<ChatRecord, HistoryError>;

    /// Persist an assistant message with the given visibility
    /// (USER_FACING for final replies, INTERNAL for tool-call turns).
    async fn append_assistant(
        &self,
        user_id: i64,
        content: &str,
        visibility: Visibility,
    ) -> Result<ChatRecord, HistoryError>;

    /// Persist a tool result (always INTERNAL), keyed by call id.
    async fn append_tool_result(
        &self,
        user_id: i64,
        call_id: &str,
        result: &str,
    ) -> Result<ChatRecord, HistoryError>;

    /// Full model-context view: all visibilities, oldest first, bounded by
    /// `limit`, rehydrated into gateway-ready turns.
    async fn context(&self, user_id: i64, limit: usize) -> Result<Vec<Message>, HistoryError>;

    /// User-facing transcript view: USER_FACING rows only, oldest first.
    async fn transcript(
        &self,
        user_id: i64,
        limit: usize,
    ) -> Result<Vec<ChatRecord>, HistoryError>;

    /// Every row for the user, oldest first. Used by compaction.
    async fn all_records(&self, user_id: i64) -> Result<Vec<ChatRecord>, HistoryError>;

    /// Atomically delete the user's history and insert one SYSTEM summary
    /// row in its place. Destructive and irreversible.
    async fn replace_with_summary(&self, user_id: i64, summary: &str)
    -> Result<(), HistoryError>;
}

// --- Stored-content wire shapes ---

#[derive(Debug, Serialize, Deserialize)]
struct StoredAssistantTurn {
    #[serde(default)]
    content: String,
    #[serde(default)]
    tool_calls: Vec<StoredToolCall>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredToolCall {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    function: StoredFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredFunction {
    name: String,
    /// JSON-encoded argument map.
    arguments: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredToolResult {
    tool_call_id: String,
    #[serde(default)]
    result: String,
}

/// Encode an assistant tool-call turn for persistence.
pub fn encode_tool_call_turn(calls: &[ToolCallRequest]) -> String {
    let stored = StoredAssistantTurn {
        content: String::new(),
        tool_calls: calls
            .iter()
            .map(|c| StoredToolCall {
                id: c.id.clone(),
                kind: "function".into(),
                function: StoredFunction {
                    name: c.name.clone(),
                    arguments: serde_json::to_string(&c.arguments)
                        .unwrap_or_else(|_| "{}".into()),
                },
            })
            .collect(),
    };
    serde_json::to_string(&stored).unwrap_or_else(|_| r#"{"content":"","tool_calls":[]}"#.into())
}

/// Encode a tool result for persistence, keyed by call id.
pub fn encode_tool_result(call_id: &str, result: &str) -> String {
    serde_json::to_string(&StoredToolResult {
        tool_call_id: call_id.to_string(),
        result: result.to_string(),
    })
    .unwrap_or_else(|_| format!(r#"{{"tool_call_id":"{call_id}","result":""}}"#))
}

/// Rehydrate one persisted row into a gateway-ready context turn.
pub fn record_to_turn(record: &ChatRecord) -> Message {
    match record.role {
        Role::User => Message::user(record.content.as_str()),
        Role::System => Message::system(record.content.as_str()),
        Role::Assistant => rehydrate_assistant(&record.content),
        Role::Tool => rehydrate_tool_result(&record.content),
    }
}

fn rehydrate_assistant(content: &str) -> Message {
    if !content.trim_start().starts_with('{') {
        return Message::assistant(content);
    }
    match serde_json::from_str::<StoredAssistantTurn>(content) {
        Ok(stored) if !stored.tool_calls.is_empty() => {
            let calls = stored
                .tool_calls
                .into_iter()
                .map(|c| ToolCallRequest {
                    id: c.id,
                    name: c.function.name,
                    arguments: parse_argument_map(&c.function.arguments),
                })
                .collect();
            let mut msg = Message::assistant_tool_calls(calls);
            msg.content = stored.content;
            msg
        }
        _ => Message::assistant(content),
    }
}

fn rehydrate_tool_result(content: &str) -> Message {
    if !content.trim_start().starts_with('{') {
        return Message::tool_result("legacy", content);
    }
    match serde_json::from_str::<StoredToolResult>(content) {
        Ok(stored) => Message::tool_result(stored.tool_call_id, stored.result),
        Err(_) => Message::tool_result("legacy", content),
    }
}

fn parse_argument_map(raw: &str) -> serde_json::Map<String, Value> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => map,
        _ => serde_json::Map::new(),
    }
}
