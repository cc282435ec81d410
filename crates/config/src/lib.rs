//! Configuration loading and validation for Concierge.
//!
//! Loads configuration from `~/.concierge/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.concierge/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// OpenAI-compatible API key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// LLM endpoint configuration
    #[serde(default)]
    pub llm: LlmConfig,

    /// Conversation history configuration
    #[serde(default)]
    pub history: HistoryConfig,

    /// Orchestrator limits
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,

    /// Reminder job configuration
    #[serde(default)]
    pub reminder: ReminderConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL of the OpenAI-compatible API. Empty leaves the gateway
    /// unconfigured; it then degrades to its fixed fallback replies.
    #[serde(default)]
    pub base_url: String,

    /// Model used for tool-driving conversation rounds
    #[serde(default = "default_tool_model")]
    pub tool_model: String,

    /// Model used for single-shot chat and result phrasing
    #[serde(default = "default_chat_model")]
    pub chat_model: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            tool_model: default_tool_model(),
            chat_model: default_chat_model(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Path to the SQLite database file
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Most recent turns loaded as model context
    #[serde(default = "default_context_limit")]
    pub context_limit: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            context_limit: default_context_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Model consultations allowed per inbound message
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self { max_iterations: default_max_iterations() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderConfig {
    /// Seconds between reminder sweeps (fixed delay, end to start)
    #[serde(default = "default_reminder_interval")]
    pub interval_secs: u64,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self { interval_secs: default_reminder_interval() }
    }
}

fn default_tool_model() -> String {
    "gpt-4o".into()
}
fn default_chat_model() -> String {
    "gpt-4o-mini".into()
}
fn default_database_path() -> String {
    AppConfig::config_dir()
        .join("concierge.db")
        .to_string_lossy()
        .into_owned()
}
fn default_context_limit() -> usize {
    50
}
fn default_max_iterations() -> usize {
    5
}
fn default_reminder_interval() -> u64 {
    60
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let api_key = match &self.api_key {
            Some(_) => "[REDACTED]",
            None => "None",
        };
        f.debug_struct("AppConfig")
            .field("api_key", &api_key)
            .field("llm", &self.llm)
            .field("history", &self.history)
            .field("orchestrator", &self.orchestrator)
            .field("reminder", &self.reminder)
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.concierge/config.toml).
    ///
    /// Environment variables take priority over the file:
    /// - `CONCIERGE_API_KEY`, then `OPENAI_API_KEY`
    /// - `CONCIERGE_BASE_URL`
    /// - `CONCIERGE_MODEL`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;

        if config.api_key.is_none() {
            config.api_key = std::env::var("CONCIERGE_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENAI_API_KEY").ok());
        }

        if let Ok(base_url) = std::env::var("CONCIERGE_BASE_URL") {
            config.llm.base_url = base_url;
        }

        if let Ok(model) = std::env::var("CONCIERGE_MODEL") {
            config.llm.tool_model = model;
        }

        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".concierge")
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.orchestrator.max_iterations == 0 {
            return Err(ConfigError::ValidationError(
                "orchestrator.max_iterations must be at least 1".into(),
            ));
        }

        if self.reminder.interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "reminder.interval_secs must be at least 1".into(),
            ));
        }

        if self.history.context_limit == 0 {
            return Err(ConfigError::ValidationError(
                "history.context_limit must be at least 1".into(),
            ));
        }

        Ok(())
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generate a default config TOML string (for first-run setup).
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            llm: LlmConfig::default(),
            history: HistoryConfig::default(),
            orchestrator: OrchestratorConfig::default(),
            reminder: ReminderConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert_eq!(config.orchestrator.max_iterations, 5);
        assert_eq!(config.history.context_limit, 50);
        assert_eq!(config.reminder.interval_secs, 60);
        assert!(config.llm.base_url.is_empty());
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.llm.tool_model, config.llm.tool_model);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[llm]\nbase_url = \"https://api.openai.com\"").unwrap();
        let config = AppConfig::load_from(file.path()).unwrap();
        assert_eq!(config.llm.base_url, "https://api.openai.com");
        assert_eq!(config.orchestrator.max_iterations, 5);
    }

    #[test]
    fn zero_iterations_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[orchestrator]\nmax_iterations = 0").unwrap();
        let err = AppConfig::load_from(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn missing_file_uses_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert!(config.api_key.is_none());
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = AppConfig {
            api_key: Some("sk-secret".into()),
            ..AppConfig::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
