//! Built-in tool handlers and the router factory.
//!
//! `builtin_router` is the only place tools are registered. The set is a
//! fixed enumeration; the router it returns is immutable, so nothing can
//! widen the allow-list after startup.

pub mod args;
pub mod people;
pub mod tasks;

use concierge_core::store::{ContactStore, TaskStore};
use concierge_core::tool::{Tool, ToolRouter};
use std::sync::Arc;

pub use people::{AddPerson, RetrievePeople};
pub use tasks::{
    CreateTask, DeleteTask, FindTasks, ListTasks, ResolveAndActOnTask, UpdateTaskStatus,
};

/// Build the router over the full built-in tool set.
pub fn builtin_router(
    tasks: Arc<dyn TaskStore>,
    contacts: Arc<dyn ContactStore>,
) -> ToolRouter {
    let tools: Vec<Arc<dyn Tool>> = vec![
        Arc::new(CreateTask::new(tasks.clone())),
        Arc::new(ListTasks::new(tasks.clone())),
        Arc::new(FindTasks::new(tasks.clone())),
        Arc::new(UpdateTaskStatus::new(tasks.clone())),
        Arc::new(DeleteTask::new(tasks.clone())),
        Arc::new(ResolveAndActOnTask::new(tasks)),
        Arc::new(AddPerson::new(contacts.clone())),
        Arc::new(RetrievePeople::new(contacts)),
    ];
    ToolRouter::from_tools(tools)
}

#[cfg(test)]
mod tests {
    use super::*;
    use concierge_core::error::ToolError;
    use concierge_store::{InMemoryContactStore, InMemoryTaskStore};

    fn router() -> ToolRouter {
        builtin_router(
            Arc::new(InMemoryTaskStore::new()),
            Arc::new(InMemoryContactStore::new()),
        )
    }

    #[test]
    fn router_carries_exactly_the_builtin_set() {
        let router = router();
        let names = router.names();
        assert_eq!(
            names,
            vec![
                "add_person",
                "create_task",
                "delete_task",
                "find_tasks",
                "list_tasks",
                "resolve_and_act_on_task",
                "retrieve_people",
                "update_task_status",
            ]
        );
    }

    #[tokio::test]
    async fn names_outside_the_set_are_rejected() {
        let args = serde_json::Map::new();
        let err = router().invoke("run_shell", &args).await.unwrap_err();
        assert!(matches!(err, ToolError::NotFound(_)));
    }

    #[test]
    fn every_tool_publishes_a_schema() {
        for def in router().definitions() {
            assert_eq!(def.parameters["type"], "object");
            assert!(def.parameters["required"]
                .as_array()
                .is_some_and(|r| r.iter().any(|v| v == "userId")));
        }
    }
}
