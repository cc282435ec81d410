//! The conversation loop.
//!
//! One inbound user message drives at most [`MAX_ITERATIONS`] rounds of
//! model consultation. Each round either produces a final text reply or a
//! batch of tool calls; tool results are fed back and the model is asked
//! again. The loop owns the trust boundary bookkeeping: call-id dedup,
//! caller-identity injection, and the visibility class of every persisted
//! row.

use concierge_core::error::HistoryError;
use concierge_core::gateway::{ChatOutcome, Gateway};
use concierge_core::history::{self, HistoryStore, HISTORY_LIMIT};
use concierge_core::message::{Message, ToolCallRequest, Visibility};
use concierge_core::tool::ToolRouter;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

/// Upper bound on model consultations per inbound message.
pub const MAX_ITERATIONS: usize = 5;

/// Reply sent when the iteration budget runs out before a final answer.
pub const FALLBACK_REPLY: &str = "I couldn't complete that in time. Please try again.";

pub struct Orchestrator {
    history: Arc<dyn HistoryStore>,
    gateway: Arc<dyn Gateway>,
    router: Arc<ToolRouter>,
    max_iterations: usize,
    history_limit: usize,
}

impl Orchestrator {
    pub fn new(
        history: Arc<dyn HistoryStore>,
        gateway: Arc<dyn Gateway>,
        router: Arc<ToolRouter>,
    ) -> Self {
        Self::with_limits(history, gateway, router, MAX_ITERATIONS, HISTORY_LIMIT)
    }

    /// Construct with explicit limits, e.g. from configuration. A zero
    /// `max_iterations` would short-circuit every message to the fallback
    /// reply, so config validation rejects it upstream.
    pub fn with_limits(
        history: Arc<dyn HistoryStore>,
        gateway: Arc<dyn Gateway>,
        router: Arc<ToolRouter>,
        max_iterations: usize,
        history_limit: usize,
    ) -> Self {
        Self {
            history,
            gateway,
            router,
            max_iterations,
            history_limit,
        }
    }

    /// Process one inbound user message and return the final reply text.
    ///
    /// The reply is already persisted USER_FACING by the time this returns;
    /// every intermediate tool-call round is persisted INTERNAL.
    pub async fn handle_message(
        &self,
        user_id: i64,
        text: &str,
    ) -> Result<String, HistoryError> {
        self.history.append_user(user_id, text).await?;

        // Context is loaded once; tool rounds extend the in-memory copy.
        let mut context = self.history.context(user_id, self.history_limit).await?;

        for iteration in 0..self.max_iterations {
            match self.gateway.chat_with_tools(user_id, &context).await {
                ChatOutcome::Content(reply) => {
                    self.history
                        .append_assistant(user_id, &reply, Visibility::UserFacing)
                        .await?;
                    info!(user_id, iteration, "Conversation round complete");
                    return Ok(reply);
                }
                ChatOutcome::ToolCalls(calls) => {
                    let calls = dedup_calls(calls);
                    info!(user_id, iteration, count = calls.len(), "Executing tool calls");

                    context.push(Message::assistant_tool_calls(calls.clone()));
                    self.history
                        .append_assistant(
                            user_id,
                            &history::encode_tool_call_turn(&calls),
                            Visibility::Internal,
                        )
                        .await?;

                    for call in &calls {
                        let result = self.execute_call(user_id, call).await;
                        context.push(Message::tool_result(call.id.clone(), result.clone()));
                        self.history
                            .append_tool_result(user_id, &call.id, &result)
                            .await?;
                    }
                }
            }
        }

        warn!(user_id, "Iteration budget exhausted without a final reply");
        self.history
            .append_assistant(user_id, FALLBACK_REPLY, Visibility::UserFacing)
            .await?;
        Ok(FALLBACK_REPLY.to_string())
    }

    /// Run one call through the router. The caller identity is injected
    /// here, overwriting anything the model put in the argument map, so a
    /// tool can never act on behalf of another user.
    async fn execute_call(&self, user_id: i64, call: &ToolCallRequest) -> String {
        let mut arguments = call.arguments.clone();
        arguments.insert("userId".to_string(), Value::from(user_id));

        match self.router.invoke(&call.name, &arguments).await {
            Ok(result) => result.to_string(),
            Err(e) => {
                warn!(user_id, tool = %call.name, "Tool call failed: {e}");
                format!("Error: {e}")
            }
        }
    }
}

/// Drop repeated call ids, keeping the first occurrence of each.
fn dedup_calls(calls: Vec<ToolCallRequest>) -> Vec<ToolCallRequest> {
    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(calls.len());
    for call in calls {
        if seen.insert(call.id.clone()) {
            unique.push(call);
        } else {
            warn!(call_id = %call.id, tool = %call.name, "Dropping duplicate tool call id");
        }
    }
    unique
}
