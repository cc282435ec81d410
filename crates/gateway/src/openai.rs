//! OpenAI-compatible gateway implementation.
//!
//! Two endpoints are used:
//! - `/v1/responses` for the multi-turn tool loop (the tool-capable model
//!   only speaks this endpoint);
//! - `/v1/chat/completions` for the single-shot formatting and plain chat
//!   calls, where no tool calling is needed.
//!
//! When no base URL is configured, every call degrades to its deterministic
//! fallback instead of failing the request.

use async_trait::async_trait;
use chrono::Utc;
use concierge_core::error::StoreError;
use concierge_core::gateway::{ChatOutcome, Gateway, UNAVAILABLE_REPLY};
use concierge_core::message::{Message, Role, ToolCallRequest};
use concierge_core::store::ProfileStore;
use concierge_core::tool::ToolDefinition;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// An OpenAI-compatible LLM gateway.
pub struct OpenAiGateway {
    /// `None` when unconfigured; every call then takes its fallback path.
    base_url: Option<String>,
    api_key: String,
    /// Model used for the tool loop via `/v1/responses`.
    tool_model: String,
    /// Cheaper model used for single-shot chat via `/v1/chat/completions`.
    chat_model: String,
    client: reqwest::Client,
    profiles: Arc<dyn ProfileStore>,
    tool_definitions: Vec<ToolDefinition>,
}

impl OpenAiGateway {
    pub fn new(
        base_url: Option<String>,
        api_key: impl Into<String>,
        tool_model: impl Into<String>,
        chat_model: impl Into<String>,
        profiles: Arc<dyn ProfileStore>,
        tool_definitions: Vec<ToolDefinition>,
    ) -> Self {
        let base_url = base_url
            .map(|u| u.trim().trim_end_matches('/').to_string())
            .filter(|u| !u.is_empty());

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .unwrap_or_default();

        Self {
            base_url,
            api_key: api_key.into(),
            tool_model: tool_model.into(),
            chat_model: chat_model.into(),
            client,
            profiles,
            tool_definitions,
        }
    }

    async fn persona(&self, user_id: i64) -> String {
        match self.profiles.persona(user_id).await {
            Ok(p) => p,
            Err(StoreError::Storage(e)) | Err(StoreError::QueryFailed(e)) => {
                warn!(user_id, error = %e, "Profile lookup failed, using default persona");
                concierge_core::store::DEFAULT_PERSONA.to_string()
            }
        }
    }

    /// Persona + current-time context + post-tool guidance.
    fn build_instructions(persona: &str) -> String {
        format!(
            "{persona}\n\n--- Current time (use this to resolve relative times like \
'tomorrow at 3pm', 'next Friday', 'in 2 hours') ---\n\
Current date and time in ISO-8601 (UTC): {now}\n\
Always output dueTime and reminderTime as full ISO-8601 timestamps \
(e.g. 2025-02-24T15:00:00Z). Never use placeholders or incomplete values.\n\n\
After receiving any tool result, respond to the user in natural language. \
Do not call the same tool again without a new explicit user request.",
            now = Utc::now().to_rfc3339(),
        )
    }

    /// Translate context turns into Responses API input items, oldest first.
    /// System/compaction turns are folded into instructions upstream and
    /// never sent as a wire role.
    fn build_input(messages: &[Message]) -> Vec<InputItem> {
        let mut input = Vec::with_capacity(messages.len());
        for m in messages {
            match m.role {
                Role::User => input.push(InputItem::turn("user", &m.content)),
                Role::System => {}
                Role::Assistant => {
                    if m.tool_calls.is_empty() {
                        input.push(InputItem::turn("assistant", &m.content));
                    } else {
                        for call in &m.tool_calls {
                            let arguments = serde_json::to_string(&call.arguments)
                                .unwrap_or_else(|_| "{}".into());
                            input.push(InputItem::FunctionCall {
                                kind: "function_call",
                                call_id: call.id.clone(),
                                name: call.name.clone(),
                                arguments,
                            });
                        }
                    }
                }
                Role::Tool => {
                    let call_id = m.tool_call_id.clone().unwrap_or_else(|| "call".into());
                    input.push(InputItem::FunctionOutput {
                        kind: "function_call_output",
                        call_id,
                        output: m.content.clone(),
                    });
                }
            }
        }
        input
    }

    /// Force tool usage right after a fresh user utterance; relax to
    /// advisory once a tool round is in flight so the model can summarize.
    fn tool_choice(input: &[InputItem]) -> &'static str {
        match input.last() {
            Some(InputItem::Turn { role: "user", .. }) => "required",
            _ => "auto",
        }
    }

    fn api_tools(&self) -> Vec<ApiToolDefinition<'_>> {
        self.tool_definitions
            .iter()
            .map(|t| ApiToolDefinition {
                kind: "function",
                name: &t.name,
                description: &t.description,
                parameters: &t.parameters,
            })
            .collect()
    }

    /// Partition the output array: any function_call item yields ToolCalls
    /// (text alongside is ignored); otherwise non-blank text yields Content;
    /// otherwise the fixed fallback.
    fn classify(reply: ResponsesReply) -> ChatOutcome {
        let mut calls: Vec<ToolCallRequest> = Vec::new();
        let mut text: Option<String> = None;

        for (index, item) in reply.output.into_iter().enumerate() {
            match item {
                OutputItem::FunctionCall {
                    name,
                    arguments,
                    call_id,
                    id,
                } => {
                    if name.trim().is_empty() {
                        continue;
                    }
                    let id = call_id
                        .or(id)
                        .filter(|s| !s.is_empty())
                        .unwrap_or_else(|| format!("call_{index}"));
                    calls.push(ToolCallRequest {
                        id,
                        name,
                        arguments: parse_arguments(arguments),
                    });
                }
                OutputItem::Message { content } => {
                    if let Some(t) = extract_text(&content) {
                        text = Some(t);
                    }
                }
                OutputItem::OutputText { text: t } => {
                    let t = t.trim();
                    if !t.is_empty() {
                        text = Some(t.to_string());
                    }
                }
                OutputItem::Unknown => {}
            }
        }

        if !calls.is_empty() {
            return ChatOutcome::ToolCalls(calls);
        }
        if let Some(t) = text {
            return ChatOutcome::Content(t);
        }
        warn!("No recognized tool calls or text in model output");
        ChatOutcome::Content(UNAVAILABLE_REPLY.to_string())
    }

    /// Single-shot Chat Completions call. `None` on any failure so callers
    /// pick their own fallback.
    async fn chat_completions(&self, system_prompt: &str, user_text: &str) -> Option<String> {
        let base_url = self.base_url.as_deref()?;
        let body = serde_json::json!({
            "model": self.chat_model,
            "messages": [
                { "role": "system", "content": system_prompt },
                { "role": "user", "content": user_text },
            ],
        });

        let response = self
            .client
            .post(format!("{base_url}/v1/chat/completions"))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| warn!(error = %e, "Chat completion request failed"))
            .ok()?;

        if !response.status().is_success() {
            warn!(status = %response.status(), "Chat completion returned error status");
            return None;
        }

        let reply: ChatReply = response
            .json()
            .await
            .map_err(|e| warn!(error = %e, "Failed to parse chat completion body"))
            .ok()?;

        reply
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    fn fallback_format(tool_name: &str, result_json: &str) -> String {
        format!("Here's what I found ({tool_name}):\n{result_json}")
    }
}

#[async_trait]
impl Gateway for OpenAiGateway {
    async fn chat_with_tools(&self, user_id: i64, messages: &[Message]) -> ChatOutcome {
        let Some(base_url) = self.base_url.as_deref() else {
            warn!("LLM base URL not configured; returning user-facing message so loop exits");
            return ChatOutcome::Content(UNAVAILABLE_REPLY.to_string());
        };

        let persona = self.persona(user_id).await;
        let instructions = Self::build_instructions(&persona);
        let input = Self::build_input(messages);
        let tool_choice = Self::tool_choice(&input);

        let body = serde_json::json!({
            "model": self.tool_model,
            "instructions": instructions,
            "input": input,
            "tools": self.api_tools(),
            "tool_choice": tool_choice,
        });

        debug!(user_id, turns = input.len(), tool_choice, "Sending tool-loop request");

        let response = match self
            .client
            .post(format!("{base_url}/v1/responses"))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "Tool-loop request failed; returning user-facing message");
                return ChatOutcome::Content(UNAVAILABLE_REPLY.to_string());
            }
        };

        if !response.status().is_success() {
            warn!(status = %response.status(), "Model returned error status");
            return ChatOutcome::Content(UNAVAILABLE_REPLY.to_string());
        }

        match response.json::<ResponsesReply>().await {
            Ok(reply) => Self::classify(reply),
            Err(e) => {
                warn!(error = %e, "Model response is not valid JSON; returning user-facing message");
                ChatOutcome::Content(UNAVAILABLE_REPLY.to_string())
            }
        }
    }

    async fn chat(&self, system_prompt: &str, user_text: &str) -> String {
        match self.chat_completions(system_prompt, user_text).await {
            Some(reply) => reply,
            None => {
                debug!("Plain chat degraded; returning input verbatim");
                user_text.to_string()
            }
        }
    }

    async fn format_tool_result(
        &self,
        user_id: i64,
        user_message: &str,
        tool_name: &str,
        result: &Value,
    ) -> String {
        let result_json =
            serde_json::to_string(result).unwrap_or_else(|_| result.to_string());

        let persona = self.persona(user_id).await;
        let system_prompt = format!(
            "{persona}\n\nYou just executed a tool on behalf of the user. \
Summarize the result below in a warm, concise, natural-language message. \
Do NOT mention tool names, JSON, or technical details. \
Respond as if you are chatting with a friend — keep it short and helpful.",
        );
        let tool_context = format!(
            "The user said: \"{user_message}\"\nTool executed: {tool_name}\nResult:\n{result_json}"
        );

        match self.chat_completions(&system_prompt, &tool_context).await {
            Some(reply) => reply,
            None => Self::fallback_format(tool_name, &result_json),
        }
    }
}

// --- Wire types ---

/// One item in the Responses API `input` array.
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum InputItem {
    Turn {
        role: &'static str,
        content: String,
    },
    FunctionCall {
        #[serde(rename = "type")]
        kind: &'static str,
        call_id: String,
        name: String,
        arguments: String,
    },
    FunctionOutput {
        #[serde(rename = "type")]
        kind: &'static str,
        call_id: String,
        output: String,
    },
}

impl InputItem {
    fn turn(role: &'static str, content: &str) -> Self {
        InputItem::Turn {
            role,
            content: content.to_string(),
        }
    }
}

/// Flat tool definition shape the Responses API expects.
#[derive(Debug, Serialize)]
struct ApiToolDefinition<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    name: &'a str,
    description: &'a str,
    parameters: &'a Value,
}

#[derive(Debug, Deserialize)]
struct ResponsesReply {
    #[serde(default)]
    output: Vec<OutputItem>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum OutputItem {
    #[serde(rename = "function_call")]
    FunctionCall {
        #[serde(default)]
        name: String,
        #[serde(default)]
        arguments: Option<Value>,
        #[serde(default)]
        call_id: Option<String>,
        #[serde(default)]
        id: Option<String>,
    },
    #[serde(rename = "message")]
    Message {
        #[serde(default)]
        content: Value,
    },
    #[serde(rename = "output_text")]
    OutputText {
        #[serde(default)]
        text: String,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageBody,
}

#[derive(Debug, Deserialize)]
struct ChatMessageBody {
    #[serde(default)]
    content: Option<String>,
}

/// Arguments may arrive as a JSON object, a JSON-encoded string, or be
/// missing entirely; anything unusable becomes an empty map.
fn parse_arguments(raw: Option<Value>) -> serde_json::Map<String, Value> {
    match raw {
        Some(Value::Object(map)) => map,
        Some(Value::String(s)) => match serde_json::from_str::<Value>(&s) {
            Ok(Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        },
        _ => serde_json::Map::new(),
    }
}

/// Extract plain text from message content: a string, or a list of parts
/// whose `text` fields are concatenated.
fn extract_text(content: &Value) -> Option<String> {
    match content {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Array(parts) => {
            let joined = parts
                .iter()
                .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join(" ");
            (!joined.is_empty()).then_some(joined)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use concierge_core::store::DEFAULT_PERSONA;

    struct FixedProfiles;

    #[async_trait]
    impl ProfileStore for FixedProfiles {
        async fn persona(&self, _user_id: i64) -> Result<String, StoreError> {
            Ok(DEFAULT_PERSONA.to_string())
        }
    }

    fn unconfigured_gateway() -> OpenAiGateway {
        OpenAiGateway::new(
            None,
            "",
            "tool-model",
            "chat-model",
            Arc::new(FixedProfiles),
            vec![],
        )
    }

    fn call_request(id: &str, name: &str) -> ToolCallRequest {
        ToolCallRequest {
            id: id.into(),
            name: name.into(),
            arguments: serde_json::Map::new(),
        }
    }

    #[test]
    fn input_maps_user_and_assistant_turns() {
        let messages = vec![Message::user("hi"), Message::assistant("hello")];
        let input = OpenAiGateway::build_input(&messages);
        assert_eq!(input.len(), 2);
        assert!(matches!(&input[0], InputItem::Turn { role: "user", .. }));
        assert!(matches!(&input[1], InputItem::Turn { role: "assistant", .. }));
    }

    #[test]
    fn input_expands_tool_call_turns() {
        let messages = vec![
            Message::user("delete the milk task"),
            Message::assistant_tool_calls(vec![
                call_request("call_1", "find_tasks"),
                call_request("call_2", "list_tasks"),
            ]),
            Message::tool_result("call_1", "{}"),
        ];
        let input = OpenAiGateway::build_input(&messages);
        assert_eq!(input.len(), 4);
        assert!(matches!(&input[1], InputItem::FunctionCall { call_id, .. } if call_id == "call_1"));
        assert!(matches!(&input[2], InputItem::FunctionCall { call_id, .. } if call_id == "call_2"));
        assert!(
            matches!(&input[3], InputItem::FunctionOutput { call_id, .. } if call_id == "call_1")
        );
    }

    #[test]
    fn system_turns_are_omitted_from_the_wire() {
        let messages = vec![Message::system("summary of old history"), Message::user("hi")];
        let input = OpenAiGateway::build_input(&messages);
        assert_eq!(input.len(), 1);
        assert!(matches!(&input[0], InputItem::Turn { role: "user", .. }));
    }

    #[test]
    fn tool_choice_required_after_fresh_user_turn() {
        let input = OpenAiGateway::build_input(&[Message::user("hi")]);
        assert_eq!(OpenAiGateway::tool_choice(&input), "required");
    }

    #[test]
    fn tool_choice_auto_when_tool_round_in_flight() {
        let messages = vec![
            Message::user("hi"),
            Message::assistant_tool_calls(vec![call_request("call_1", "list_tasks")]),
            Message::tool_result("call_1", "{\"tasks\":[]}"),
        ];
        let input = OpenAiGateway::build_input(&messages);
        assert_eq!(OpenAiGateway::tool_choice(&input), "auto");
    }

    #[test]
    fn classify_prefers_tool_calls_over_text() {
        let reply: ResponsesReply = serde_json::from_value(serde_json::json!({
            "output": [
                { "type": "output_text", "text": "thinking out loud" },
                { "type": "function_call", "name": "create_task",
                  "arguments": "{\"title\":\"buy milk\"}", "call_id": "call_abc" },
            ]
        }))
        .unwrap();
        match OpenAiGateway::classify(reply) {
            ChatOutcome::ToolCalls(calls) => {
                assert_eq!(calls.len(), 1);
                assert_eq!(calls[0].id, "call_abc");
                assert_eq!(calls[0].arguments["title"], "buy milk");
            }
            ChatOutcome::Content(_) => panic!("expected tool calls"),
        }
    }

    #[test]
    fn classify_concatenates_message_parts() {
        let reply: ResponsesReply = serde_json::from_value(serde_json::json!({
            "output": [
                { "type": "message", "content": [
                    { "type": "output_text", "text": "Task created." },
                    { "type": "output_text", "text": "Anything else?" },
                ]}
            ]
        }))
        .unwrap();
        assert_eq!(
            OpenAiGateway::classify(reply),
            ChatOutcome::Content("Task created. Anything else?".into())
        );
    }

    #[test]
    fn classify_synthesizes_missing_call_ids() {
        let reply: ResponsesReply = serde_json::from_value(serde_json::json!({
            "output": [
                { "type": "function_call", "name": "list_tasks", "arguments": {} },
            ]
        }))
        .unwrap();
        match OpenAiGateway::classify(reply) {
            ChatOutcome::ToolCalls(calls) => assert_eq!(calls[0].id, "call_0"),
            ChatOutcome::Content(_) => panic!("expected tool calls"),
        }
    }

    #[test]
    fn classify_falls_back_on_empty_output() {
        let reply: ResponsesReply = serde_json::from_value(serde_json::json!({ "output": [] })).unwrap();
        assert_eq!(
            OpenAiGateway::classify(reply),
            ChatOutcome::Content(UNAVAILABLE_REPLY.into())
        );
    }

    #[test]
    fn classify_skips_unknown_item_types() {
        let reply: ResponsesReply = serde_json::from_value(serde_json::json!({
            "output": [
                { "type": "reasoning", "summary": [] },
                { "type": "output_text", "text": "Done!" },
            ]
        }))
        .unwrap();
        assert_eq!(OpenAiGateway::classify(reply), ChatOutcome::Content("Done!".into()));
    }

    #[test]
    fn arguments_accept_object_or_string() {
        let from_obj = parse_arguments(Some(serde_json::json!({"a": 1})));
        assert_eq!(from_obj["a"], 1);
        let from_str = parse_arguments(Some(Value::String("{\"b\":\"x\"}".into())));
        assert_eq!(from_str["b"], "x");
        assert!(parse_arguments(Some(Value::String("garbage".into()))).is_empty());
        assert!(parse_arguments(None).is_empty());
    }

    #[tokio::test]
    async fn unconfigured_gateway_degrades_everywhere() {
        let gw = unconfigured_gateway();
        let outcome = gw.chat_with_tools(1, &[Message::user("hi")]).await;
        assert_eq!(outcome, ChatOutcome::Content(UNAVAILABLE_REPLY.into()));

        let chat = gw.chat("summarize", "the raw history").await;
        assert_eq!(chat, "the raw history");

        let formatted = gw
            .format_tool_result(1, "list my tasks", "list_tasks", &serde_json::json!({"count": 0}))
            .await;
        assert!(formatted.contains("list_tasks"));
        assert!(formatted.contains("\"count\":0"));
    }

    #[test]
    fn instructions_include_time_and_persona() {
        let instructions = OpenAiGateway::build_instructions("Be helpful.");
        assert!(instructions.starts_with("Be helpful."));
        assert!(instructions.contains("ISO-8601"));
        assert!(instructions.contains("natural language"));
    }
}
