//! Tool trait and the allow-listed router — the trust boundary.
//!
//! Only a fixed, closed set of named operations may ever be invoked from
//! model output. The router is an immutable table built once at startup
//! from an explicit enumeration of handlers; there is no way to register
//! a tool after construction, so the table *is* the allow-list.

use crate::error::ToolError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// A tool definition published to the LLM so it knows what it can call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema describing the tool's parameters, sent verbatim.
    pub parameters: Value,
}

/// One allow-listed operation the model may request.
///
/// Arguments arrive as a loosely-typed JSON map (numbers may be numeric or
/// string literals); each handler decodes them into its own typed argument
/// struct with explicit coercion. Expected business conditions ("no matching
/// task", "ambiguous") are returned as result payloads, never as errors —
/// `Err` is reserved for contract violations like a missing required key.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name (e.g. "create_task").
    fn name(&self) -> &str;

    /// What this tool does, phrased for the model.
    fn description(&self) -> &str;

    /// JSON Schema for the parameters.
    fn parameters_schema(&self) -> Value;

    /// Execute with the given argument map; returns a structured result.
    async fn execute(
        &self,
        arguments: &serde_json::Map<String, Value>,
    ) -> Result<Value, ToolError>;

    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// Immutable name → handler table with case-insensitive lookup.
pub struct ToolRouter {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRouter {
    /// Build the router from a fixed enumeration of handlers.
    /// Names are keyed lowercase; a duplicate name keeps the first handler.
    pub fn from_tools(tools: Vec<Arc<dyn Tool>>) -> Self {
        let mut table: BTreeMap<String, Arc<dyn Tool>> = BTreeMap::new();
        for tool in tools {
            table.entry(tool.name().to_ascii_lowercase()).or_insert(tool);
        }
        Self { tools: table }
    }

    /// Case-insensitive lookup; `None` for anything outside the allow-list.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(&name.to_ascii_lowercase()).map(|t| t.as_ref())
    }

    /// Definitions for every registered tool, in stable name order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.to_definition()).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    /// Invoke a tool by name. Fails hard for any name not in the table —
    /// that is the one condition treated as a trust-boundary violation.
    pub async fn invoke(
        &self,
        name: &str,
        arguments: &serde_json::Map<String, Value>,
    ) -> Result<Value, ToolError> {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;
        debug!(tool = %tool.name(), "Invoking tool");
        tool.execute(arguments).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Echoes back the input"
        }
        fn parameters_schema(&self) -> Value {
            json!({
                "type": "object",
                "properties": { "text": { "type": "string" } },
                "required": ["text"]
            })
        }
        async fn execute(
            &self,
            arguments: &serde_json::Map<String, Value>,
        ) -> Result<Value, ToolError> {
            let text = arguments
                .get("text")
                .and_then(|v| v.as_str())
                .ok_or_else(|| ToolError::InvalidArguments("text is required".into()))?;
            Ok(json!({ "echo": text }))
        }
    }

    fn router() -> ToolRouter {
        ToolRouter::from_tools(vec![Arc::new(EchoTool)])
    }

    #[tokio::test]
    async fn invoke_allow_listed_tool() {
        let args = json!({"text": "hello"});
        let result = router()
            .invoke("echo", args.as_object().unwrap())
            .await
            .unwrap();
        assert_eq!(result["echo"], "hello");
    }

    #[tokio::test]
    async fn invoke_is_case_insensitive() {
        let args = json!({"text": "hello"});
        let result = router()
            .invoke("Echo", args.as_object().unwrap())
            .await
            .unwrap();
        assert_eq!(result["echo"], "hello");
    }

    #[tokio::test]
    async fn unknown_name_is_rejected() {
        let args = serde_json::Map::new();
        let err = router().invoke("drop_tables", &args).await.unwrap_err();
        assert!(matches!(err, ToolError::NotFound(_)));
    }

    #[test]
    fn definitions_are_stable_and_complete() {
        let defs = router().definitions();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name, "echo");
        assert!(defs[0].parameters["required"][0] == json!("text"));
    }
}
