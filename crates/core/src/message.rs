//! Message and conversation-turn domain types.
//!
//! Two shapes matter here and they are deliberately distinct:
//! - [`ChatRecord`] is the *persisted* row: one turn in the append-only
//!   per-user log, tagged with a visibility class.
//! - [`Message`] is the *reconstructed* context turn handed to the LLM
//!   gateway: plain text, or an assistant turn carrying pending tool calls,
//!   or a tool result keyed by call id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The role of a turn in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user
    User,
    /// The assistant
    Assistant,
    /// System instructions or a compaction summary
    System,
    /// Tool execution result
    Tool,
}

impl Role {
    /// Uppercase form used in the persisted log.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Assistant => "ASSISTANT",
            Role::System => "SYSTEM",
            Role::Tool => "TOOL",
        }
    }

    /// Parse the persisted form. Unknown roles map to Assistant so a
    /// legacy row still renders as a plain turn instead of failing the load.
    pub fn parse(s: &str) -> Role {
        match s.to_ascii_uppercase().as_str() {
            "USER" => Role::User,
            "SYSTEM" => Role::System,
            "TOOL" => Role::Tool,
            _ => Role::Assistant,
        }
    }
}

/// Visibility class of a persisted turn.
///
/// USER_FACING rows, read in creation order, form the displayable chat
/// transcript. INTERNAL rows carry tool-call bookkeeping and are only
/// included when rebuilding full model context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Visibility {
    Internal,
    UserFacing,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Internal => "INTERNAL",
            Visibility::UserFacing => "USER_FACING",
        }
    }

    pub fn parse(s: &str) -> Visibility {
        if s.eq_ignore_ascii_case("INTERNAL") {
            Visibility::Internal
        } else {
            Visibility::UserFacing
        }
    }
}

/// One persisted turn in a user's conversation log.
///
/// Content for structured assistant/tool turns is itself JSON-encoded text;
/// see [`crate::history`] for the encoding and rehydration rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRecord {
    pub id: i64,
    pub user_id: i64,
    pub role: Role,
    pub content: String,
    pub visibility: Visibility,
    pub created_at: DateTime<Utc>,
}

/// A tool call the model requested within one gateway response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Unique within the response; the orchestrator enforces uniqueness
    /// rather than trusting the model.
    pub id: String,

    /// Tool name; must resolve through the router's allow-list.
    pub name: String,

    /// Loosely-typed argument map as the model produced it.
    pub arguments: serde_json::Map<String, serde_json::Value>,
}

/// A reconstructed context turn, ready for wire translation by the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,

    /// The text content (empty for assistant turns that only carry calls).
    pub content: String,

    /// Tool calls pending on an assistant turn.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallRequest>,

    /// For tool-result turns, the call id this result answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    /// An assistant turn that requested tool calls (no text yet).
    pub fn assistant_tool_calls(calls: Vec<ToolCallRequest>) -> Self {
        Self {
            role: Role::Assistant,
            content: String::new(),
            tool_calls: calls,
            tool_call_id: None,
        }
    }

    /// A tool result turn, keyed by the call id it answers.
    pub fn tool_result(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: Some(call_id.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_roundtrip() {
        for role in [Role::User, Role::Assistant, Role::System, Role::Tool] {
            assert_eq!(Role::parse(role.as_str()), role);
        }
    }

    #[test]
    fn unknown_role_degrades_to_assistant() {
        assert_eq!(Role::parse("FUNCTION"), Role::Assistant);
        assert_eq!(Role::parse(""), Role::Assistant);
    }

    #[test]
    fn visibility_parse_is_case_insensitive() {
        assert_eq!(Visibility::parse("internal"), Visibility::Internal);
        assert_eq!(Visibility::parse("USER_FACING"), Visibility::UserFacing);
        // Anything unrecognized is treated as displayable
        assert_eq!(Visibility::parse("???"), Visibility::UserFacing);
    }

    #[test]
    fn tool_result_carries_call_id() {
        let msg = Message::tool_result("call_7", "{\"ok\":true}");
        assert_eq!(msg.role, Role::Tool);
        assert_eq!(msg.tool_call_id.as_deref(), Some("call_7"));
    }

    #[test]
    fn message_serialization_roundtrip() {
        let msg = Message::user("Hello there");
        let json = serde_json::to_string(&msg).unwrap();
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(back.content, "Hello there");
        assert_eq!(back.role, Role::User);
        assert!(back.tool_calls.is_empty());
    }
}
