//! Gateway trait — the abstraction over the LLM backend.
//!
//! A gateway translates reconstructed context turns into the provider's
//! wire format and classifies the reply. The classification is a closed
//! union: either the model produced final text, or it requested tool calls.
//!
//! Failure policy: a gateway failure must never propagate as an error out
//! of the conversation loop. Transport errors, empty bodies, and
//! unparseable replies all degrade to a fixed apologetic [`ChatOutcome::Content`],
//! which is why these methods are infallible by signature.

use crate::message::{Message, ToolCallRequest};
use async_trait::async_trait;
use serde_json::Value;

/// Reply returned when the backend is unreachable, unconfigured, or the
/// response cannot be parsed. The loop exits with a message instead of
/// re-calling tools.
pub const UNAVAILABLE_REPLY: &str = "Sorry, I had trouble processing that. Please try again.";

/// Outcome of one model call: final text, or requested tool calls.
/// Any tool-call item in the reply wins over text found alongside it.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatOutcome {
    /// Plain text reply; nothing left to execute.
    Content(String),
    /// One or more structured calls; execute and loop.
    ToolCalls(Vec<ToolCallRequest>),
}

#[async_trait]
pub trait Gateway: Send + Sync {
    /// Multi-turn call with tool definitions attached. `messages` is the
    /// full reconstructed context, oldest first. Degrades to
    /// `Content(UNAVAILABLE_REPLY)` on any failure.
    async fn chat_with_tools(&self, user_id: i64, messages: &[Message]) -> ChatOutcome;

    /// Single-shot plain chat (system prompt + user text → text), no tools.
    /// Used for compaction summarization; degrades by returning `user_text`
    /// verbatim.
    async fn chat(&self, system_prompt: &str, user_text: &str) -> String;

    /// Single-shot natural-language formatting of a tool result. Degrades
    /// to a deterministic textual dump of the result.
    async fn format_tool_result(
        &self,
        user_id: i64,
        user_message: &str,
        tool_name: &str,
        result: &Value,
    ) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_is_a_closed_union() {
        let content = ChatOutcome::Content("hi".into());
        let calls = ChatOutcome::ToolCalls(vec![]);
        assert_ne!(content, calls);
        match content {
            ChatOutcome::Content(text) => assert_eq!(text, "hi"),
            ChatOutcome::ToolCalls(_) => unreachable!(),
        }
    }
}
