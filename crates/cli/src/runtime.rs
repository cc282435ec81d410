//! Shared wiring for CLI commands: config, stores, gateway, orchestrator.

use concierge_agent::{Orchestrator, ReminderJob};
use concierge_config::AppConfig;
use concierge_core::history::HistoryStore;
use concierge_core::store::{ContactStore, ProfileStore, TaskStore};
use concierge_core::tool::ToolRouter;
use concierge_gateway::OpenAiGateway;
use concierge_history::{SqliteHistory, SqliteReminderLog};
use concierge_store::{ConsoleSink, InMemoryContactStore, InMemoryProfileStore, InMemoryTaskStore};
use concierge_tools::builtin_router;
use std::sync::Arc;
use std::time::Duration;

/// Everything a command needs, built from one config load.
pub struct Runtime {
    pub config: AppConfig,
    pub history: Arc<SqliteHistory>,
    pub gateway: Arc<OpenAiGateway>,
    pub router: Arc<ToolRouter>,
    pub tasks: Arc<dyn TaskStore>,
}

impl Runtime {
    pub async fn build() -> Result<Self, Box<dyn std::error::Error>> {
        let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

        if let Some(parent) = std::path::Path::new(&config.history.database_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let history = Arc::new(SqliteHistory::new(&config.history.database_path).await?);

        let tasks: Arc<dyn TaskStore> = Arc::new(InMemoryTaskStore::new());
        let contacts: Arc<dyn ContactStore> = Arc::new(InMemoryContactStore::new());
        let profiles: Arc<dyn ProfileStore> = Arc::new(InMemoryProfileStore::new());

        let router = Arc::new(builtin_router(tasks.clone(), contacts));

        let base_url = Some(config.llm.base_url.clone()).filter(|u| !u.trim().is_empty());
        let gateway = Arc::new(OpenAiGateway::new(
            base_url,
            config.api_key.clone().unwrap_or_default(),
            config.llm.tool_model.clone(),
            config.llm.chat_model.clone(),
            profiles,
            router.definitions(),
        ));

        Ok(Self { config, history, gateway, router, tasks })
    }

    pub fn orchestrator(&self) -> Orchestrator {
        Orchestrator::with_limits(
            self.history.clone() as Arc<dyn HistoryStore>,
            self.gateway.clone(),
            self.router.clone(),
            self.config.orchestrator.max_iterations,
            self.config.history.context_limit,
        )
    }

    pub fn reminder_job(&self) -> ReminderJob {
        let log = Arc::new(SqliteReminderLog::new(self.history.pool().clone()));
        ReminderJob::new(
            self.tasks.clone(),
            log,
            Arc::new(ConsoleSink::new()),
            Duration::from_secs(self.config.reminder.interval_secs),
        )
    }
}
