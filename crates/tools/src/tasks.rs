//! Task tool handlers.
//!
//! Handlers delegate to the [`TaskStore`] only. Expected business
//! conditions ("no matching task", "multiple matches") are returned to
//! the model as result payloads so it can phrase them back to the user;
//! `Err` is reserved for malformed argument maps.

use crate::args;
use async_trait::async_trait;
use chrono::SecondsFormat;
use concierge_core::error::ToolError;
use concierge_core::store::{NewTask, TaskRecord, TaskStatus, TaskStore};
use concierge_core::tool::Tool;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::warn;

const DEFAULT_SEARCH_LIMIT: usize = 10;
const MAX_TITLE_LEN: usize = 255;
const MAX_DESCRIPTION_LEN: usize = 2000;

fn task_to_value(task: &TaskRecord) -> Value {
    let iso = |t: &chrono::DateTime<chrono::Utc>| t.to_rfc3339_opts(SecondsFormat::Secs, true);
    json!({
        "id": task.id,
        "userId": task.user_id,
        "title": task.title,
        "description": task.description,
        "dueTime": task.due_time.as_ref().map(iso),
        "reminderTime": task.reminder_time.as_ref().map(iso),
        "status": task.status.as_str(),
        "createdAt": iso(&task.created_at),
    })
}

pub struct CreateTask {
    store: Arc<dyn TaskStore>,
}

impl CreateTask {
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for CreateTask {
    fn name(&self) -> &str {
        "create_task"
    }

    fn description(&self) -> &str {
        "Use when the user wants to add, create, or save a task, to-do, or reminder \
         (e.g. 'add task buy milk', 'remind me to call John', 'I have a meet tomorrow at 3pm'). \
         Creates a new task. Parameters: userId (required), title (required), description \
         (optional), dueTime (full ISO-8601 only, e.g. 2025-02-24T15:00:00Z; resolve 'tomorrow \
         at 3pm' using current time from context; omit if not specified), reminderTime (full \
         ISO-8601 only; omit if not specified)."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "userId": { "type": "integer" },
                "title": { "type": "string" },
                "description": { "type": "string" },
                "dueTime": { "type": "string", "description": "Full ISO-8601 timestamp" },
                "reminderTime": { "type": "string", "description": "Full ISO-8601 timestamp" }
            },
            "required": ["userId", "title"]
        })
    }

    async fn execute(&self, arguments: &Map<String, Value>) -> Result<Value, ToolError> {
        let user_id = args::require_user_id(arguments)?;
        let title = match args::require_str(arguments, "title") {
            Ok(t) => t,
            Err(e) => {
                warn!("create_task validation error: {e}");
                return Ok(json!({ "error": "validation_error", "message": e.to_string() }));
            }
        };
        let task = NewTask {
            title: args::sanitize(&title, MAX_TITLE_LEN),
            description: args::opt_str(arguments, "description")
                .map(|d| args::sanitize(&d, MAX_DESCRIPTION_LEN))
                .filter(|d| !d.is_empty()),
            due_time: args::opt_datetime(arguments, "dueTime"),
            reminder_time: args::opt_datetime(arguments, "reminderTime"),
        };
        let created = self
            .store
            .create(user_id, task)
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: "create_task".into(),
                reason: e.to_string(),
            })?;
        Ok(task_to_value(&created))
    }
}

pub struct ListTasks {
    store: Arc<dyn TaskStore>,
}

impl ListTasks {
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for ListTasks {
    fn name(&self) -> &str {
        "list_tasks"
    }

    fn description(&self) -> &str {
        "Use when the user asks to see their tasks, to-dos, list, what they need to do, \
         what's pending, or what they have scheduled (e.g. 'what are my tasks?', 'show my \
         to-do list', 'what do I have due?'). Returns active tasks (pending and in progress). \
         Parameters: userId (required)."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": { "userId": { "type": "integer" } },
            "required": ["userId"]
        })
    }

    async fn execute(&self, arguments: &Map<String, Value>) -> Result<Value, ToolError> {
        let user_id = args::require_user_id(arguments)?;
        let tasks = self
            .store
            .active(user_id)
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: "list_tasks".into(),
                reason: e.to_string(),
            })?;
        let items: Vec<Value> = tasks.iter().map(task_to_value).collect();
        Ok(json!({ "tasks": items, "count": items.len() }))
    }
}

pub struct FindTasks {
    store: Arc<dyn TaskStore>,
}

impl FindTasks {
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for FindTasks {
    fn name(&self) -> &str {
        "find_tasks"
    }

    fn description(&self) -> &str {
        "Use when the user refers to a task by description (e.g. 'the milk task', 'call John', \
         'tomorrow's meeting') or when you need to find which task they mean before acting. \
         Returns tasks matching the query (id, title, description, status). Call this for \
         search-only or use resolve_and_act_on_task to find and perform an action in one step. \
         Parameters: userId (required), query (required, normalized task reference)."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "userId": { "type": "integer" },
                "query": { "type": "string" },
                "maxResults": { "type": "integer" }
            },
            "required": ["userId", "query"]
        })
    }

    async fn execute(&self, arguments: &Map<String, Value>) -> Result<Value, ToolError> {
        let user_id = args::require_user_id(arguments)?;
        let query = args::opt_str(arguments, "query").unwrap_or_default();
        let limit = args::opt_usize(arguments, "maxResults").unwrap_or(DEFAULT_SEARCH_LIMIT);
        let tasks = self
            .store
            .search(user_id, query.trim(), limit)
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: "find_tasks".into(),
                reason: e.to_string(),
            })?;
        let items: Vec<Value> = tasks.iter().map(task_to_value).collect();
        Ok(json!({ "tasks": items, "count": items.len() }))
    }
}

pub struct UpdateTaskStatus {
    store: Arc<dyn TaskStore>,
}

impl UpdateTaskStatus {
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for UpdateTaskStatus {
    fn name(&self) -> &str {
        "update_task_status"
    }

    fn description(&self) -> &str {
        "Use to set a task's status to PENDING, IN_PROGRESS, or DONE. Requires taskId from \
         find_tasks or from a previous resolve_and_act_on_task disambiguation. Call after \
         find_tasks when the user has picked one (e.g. 'the first one') or when you already \
         have the task id. Parameters: userId (required), taskId (required), status \
         (required: PENDING | IN_PROGRESS | DONE)."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "userId": { "type": "integer" },
                "taskId": { "type": "integer" },
                "status": { "type": "string", "enum": ["PENDING", "IN_PROGRESS", "DONE"] }
            },
            "required": ["userId", "taskId", "status"]
        })
    }

    async fn execute(&self, arguments: &Map<String, Value>) -> Result<Value, ToolError> {
        let user_id = args::require_user_id(arguments)?;
        let task_id = args::require_i64(arguments, "taskId")?;
        let raw_status = args::require_str(arguments, "status")?;
        let Some(status) = TaskStatus::parse(&raw_status) else {
            return Ok(json!({
                "success": false,
                "error": format!("Invalid status: {raw_status}. Must be PENDING, IN_PROGRESS, or DONE.")
            }));
        };
        let updated = self
            .store
            .update_status(user_id, task_id, status)
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: "update_task_status".into(),
                reason: e.to_string(),
            })?;
        match updated {
            Some(task) => Ok(json!({ "success": true, "task": task_to_value(&task) })),
            None => {
                warn!(user_id, task_id, "update_task_status: no such task");
                Ok(json!({ "success": false, "error": format!("Task not found: {task_id}") }))
            }
        }
    }
}

pub struct DeleteTask {
    store: Arc<dyn TaskStore>,
}

impl DeleteTask {
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for DeleteTask {
    fn name(&self) -> &str {
        "delete_task"
    }

    fn description(&self) -> &str {
        "Use to delete (remove) a task. Requires taskId from find_tasks or from a previous \
         resolve_and_act_on_task disambiguation. Call after find_tasks when the user has \
         picked one (e.g. 'the first one') or when you already have the task id. \
         Parameters: userId (required), taskId (required)."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "userId": { "type": "integer" },
                "taskId": { "type": "integer" }
            },
            "required": ["userId", "taskId"]
        })
    }

    async fn execute(&self, arguments: &Map<String, Value>) -> Result<Value, ToolError> {
        let user_id = args::require_user_id(arguments)?;
        let task_id = args::require_i64(arguments, "taskId")?;
        let deleted = self
            .store
            .delete(user_id, task_id)
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: "delete_task".into(),
                reason: e.to_string(),
            })?;
        if deleted {
            Ok(json!({ "deleted": true, "taskId": task_id }))
        } else {
            Ok(json!({ "deleted": false, "error": format!("Task not found: {task_id}") }))
        }
    }
}

/// Finds task(s) by the user's description and performs one action when
/// exactly one matches. Zero or many matches perform nothing and report
/// back so the model can ask the user instead of guessing.
pub struct ResolveAndActOnTask {
    store: Arc<dyn TaskStore>,
}

impl ResolveAndActOnTask {
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self { store }
    }

    const MAX_CANDIDATES: usize = 10;
}

#[async_trait]
impl Tool for ResolveAndActOnTask {
    fn name(&self) -> &str {
        "resolve_and_act_on_task"
    }

    fn description(&self) -> &str {
        "Use when the user wants to delete a task, mark it done, mark it pending, or mark it \
         in progress and refers to the task by description (e.g. 'remove the milk task', \
         'mark call John as done', 'set the meeting to in progress'). Extract a normalized \
         task reference (e.g. 'milk', 'call John', 'meeting') as userDescription. Action must \
         be one of: delete, mark_done, mark_pending, mark_in_progress. If exactly one task \
         matches, the action is performed. If 0 match, reply that no task was found. If \
         multiple match, return candidates and ask the user which one (do not auto-pick). \
         Parameters: userId (required), userDescription (required), action (required)."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "userId": { "type": "integer" },
                "userDescription": { "type": "string" },
                "action": {
                    "type": "string",
                    "enum": ["delete", "mark_done", "mark_pending", "mark_in_progress"]
                }
            },
            "required": ["userId", "userDescription", "action"]
        })
    }

    async fn execute(&self, arguments: &Map<String, Value>) -> Result<Value, ToolError> {
        let user_id = args::require_user_id(arguments)?;
        let description = args::opt_str(arguments, "userDescription").unwrap_or_default();
        let description = description.trim();
        let action = args::require_str(arguments, "action")?;

        if description.is_empty() {
            return Ok(json!({ "resolved": false, "message": "No task description provided." }));
        }

        let store_err = |e: concierge_core::error::StoreError| ToolError::ExecutionFailed {
            tool_name: "resolve_and_act_on_task".into(),
            reason: e.to_string(),
        };

        let candidates = self
            .store
            .search(user_id, description, Self::MAX_CANDIDATES)
            .await
            .map_err(store_err)?;

        if candidates.is_empty() {
            return Ok(json!({
                "resolved": false,
                "message": "No matching task found. Suggest the user list their tasks or rephrase."
            }));
        }

        if candidates.len() > 1 {
            let list: Vec<Value> = candidates.iter().map(task_to_value).collect();
            return Ok(json!({
                "resolved": false,
                "ambiguous": true,
                "message": "Multiple tasks match; ask the user which one (e.g. by number or more specific description).",
                "candidates": list
            }));
        }

        let task = &candidates[0];
        let action = action.trim().to_lowercase();

        if action == "delete" {
            self.store.delete(user_id, task.id).await.map_err(store_err)?;
            return Ok(json!({
                "resolved": true,
                "action": "delete",
                "task": task_to_value(task),
                "message": format!("Task deleted: {}", task.title)
            }));
        }

        let (status, verb) = match action.as_str() {
            "mark_done" => (TaskStatus::Done, "Marked as done"),
            "mark_pending" => (TaskStatus::Pending, "Marked as pending"),
            "mark_in_progress" => (TaskStatus::InProgress, "Marked in progress"),
            other => {
                return Ok(json!({
                    "resolved": false,
                    "message": format!("Unknown action: {other}")
                }));
            }
        };

        let updated = self
            .store
            .update_status(user_id, task.id, status)
            .await
            .map_err(store_err)?;
        match updated {
            Some(task) => Ok(json!({
                "resolved": true,
                "action": action,
                "task": task_to_value(&task),
                "message": format!("{verb}: {}", task.title)
            })),
            None => Ok(json!({
                "resolved": false,
                "message": format!("Task not found: {}", task.id)
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use concierge_store::InMemoryTaskStore;

    fn margs(v: Value) -> Map<String, Value> {
        v.as_object().unwrap().clone()
    }

    async fn seeded() -> Arc<InMemoryTaskStore> {
        let store = Arc::new(InMemoryTaskStore::new());
        for title in ["buy milk", "call John", "team meeting"] {
            store
                .create(
                    1,
                    NewTask {
                        title: title.into(),
                        ..NewTask::default()
                    },
                )
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn create_task_with_placeholder_due_time_still_creates() {
        let store = Arc::new(InMemoryTaskStore::new());
        let tool = CreateTask::new(store.clone());
        let result = tool
            .execute(&margs(json!({
                "userId": 1,
                "title": "dentist",
                "dueTime": "2024-10-???"
            })))
            .await
            .unwrap();
        assert_eq!(result["title"], "dentist");
        assert!(result["dueTime"].is_null());
        assert_eq!(result["status"], "PENDING");
    }

    #[tokio::test]
    async fn create_task_cleans_free_text_fields() {
        let tool = CreateTask::new(Arc::new(InMemoryTaskStore::new()));
        let result = tool
            .execute(&margs(json!({
                "userId": 1,
                "title": " \u{7}dentist  ",
                "description": "   "
            })))
            .await
            .unwrap();
        assert_eq!(result["title"], "dentist");
        assert!(result["description"].is_null());
    }

    #[tokio::test]
    async fn create_task_without_title_is_a_validation_payload() {
        let tool = CreateTask::new(Arc::new(InMemoryTaskStore::new()));
        let result = tool.execute(&margs(json!({ "userId": 1 }))).await.unwrap();
        assert_eq!(result["error"], "validation_error");
    }

    #[tokio::test]
    async fn list_tasks_reports_count() {
        let tool = ListTasks::new(seeded().await);
        let result = tool.execute(&margs(json!({ "userId": 1 }))).await.unwrap();
        assert_eq!(result["count"], 3);
        assert_eq!(result["tasks"][0]["title"], "buy milk");
    }

    #[tokio::test]
    async fn find_tasks_matches_substring() {
        let tool = FindTasks::new(seeded().await);
        let result = tool
            .execute(&margs(json!({ "userId": 1, "query": "john" })))
            .await
            .unwrap();
        assert_eq!(result["count"], 1);
        assert_eq!(result["tasks"][0]["title"], "call John");
    }

    #[tokio::test]
    async fn update_status_rejects_unknown_status_as_payload() {
        let store = seeded().await;
        let tool = UpdateTaskStatus::new(store);
        let result = tool
            .execute(&margs(json!({ "userId": 1, "taskId": 1, "status": "CANCELLED" })))
            .await
            .unwrap();
        assert_eq!(result["success"], false);
    }

    #[tokio::test]
    async fn update_status_accepts_string_task_id() {
        let store = seeded().await;
        let tool = UpdateTaskStatus::new(store);
        let result = tool
            .execute(&margs(json!({ "userId": "1", "taskId": "2", "status": "done" })))
            .await
            .unwrap();
        assert_eq!(result["success"], true);
        assert_eq!(result["task"]["status"], "DONE");
    }

    #[tokio::test]
    async fn delete_missing_task_is_a_payload_not_an_error() {
        let tool = DeleteTask::new(seeded().await);
        let result = tool
            .execute(&margs(json!({ "userId": 1, "taskId": 99 })))
            .await
            .unwrap();
        assert_eq!(result["deleted"], false);
    }

    #[tokio::test]
    async fn resolve_with_zero_matches_reports_not_found() {
        let tool = ResolveAndActOnTask::new(seeded().await);
        let result = tool
            .execute(&margs(json!({
                "userId": 1, "userDescription": "laundry", "action": "delete"
            })))
            .await
            .unwrap();
        assert_eq!(result["resolved"], false);
        assert!(result["message"].as_str().unwrap().contains("No matching task"));
    }

    #[tokio::test]
    async fn resolve_with_many_matches_refuses_to_guess() {
        let store = Arc::new(InMemoryTaskStore::new());
        for title in ["call mom", "call dad"] {
            store
                .create(1, NewTask { title: title.into(), ..NewTask::default() })
                .await
                .unwrap();
        }
        let tool = ResolveAndActOnTask::new(store.clone());
        let result = tool
            .execute(&margs(json!({
                "userId": 1, "userDescription": "call", "action": "mark_done"
            })))
            .await
            .unwrap();
        assert_eq!(result["resolved"], false);
        assert_eq!(result["ambiguous"], true);
        assert_eq!(result["candidates"].as_array().unwrap().len(), 2);
        // nothing was performed
        assert_eq!(store.active(1).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn resolve_with_one_match_performs_the_action() {
        let store = seeded().await;
        let tool = ResolveAndActOnTask::new(store.clone());
        let result = tool
            .execute(&margs(json!({
                "userId": 1, "userDescription": "milk", "action": "delete"
            })))
            .await
            .unwrap();
        assert_eq!(result["resolved"], true);
        assert_eq!(result["message"], "Task deleted: buy milk");
        assert_eq!(store.active(1).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn resolve_unknown_action_is_reported() {
        let tool = ResolveAndActOnTask::new(seeded().await);
        let result = tool
            .execute(&margs(json!({
                "userId": 1, "userDescription": "milk", "action": "archive"
            })))
            .await
            .unwrap();
        assert_eq!(result["resolved"], false);
        assert_eq!(result["message"], "Unknown action: archive");
    }
}
