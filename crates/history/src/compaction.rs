//! On-demand history compaction.
//!
//! Collapses a user's entire history into a single SYSTEM summary row.
//! The summary is produced by the model, then the swap happens in one
//! atomic replace so the history is never left half-compacted.

use concierge_core::error::HistoryError;
use concierge_core::gateway::Gateway;
use concierge_core::history::HistoryStore;
use tracing::info;

pub const COMPACTION_PROMPT: &str = "Summarize this conversation history into a highly \
concise context block. Retain key facts, pending tasks, and user preferences. Drop \
pleasantries and filler. Output only the summary, nothing else.";

/// Compact `user_id`'s history. Returns the user-facing status line.
pub async fn compact_history(
    store: &dyn HistoryStore,
    gateway: &dyn Gateway,
    user_id: i64,
) -> Result<String, HistoryError> {
    let records = store.all_records(user_id).await?;
    if records.is_empty() {
        return Ok("Nothing to compact.".to_string());
    }

    let raw: String = records
        .iter()
        .map(|r| format!("{}: {}", r.role.as_str(), r.content))
        .collect::<Vec<_>>()
        .join("\n");

    let summary = gateway.chat(COMPACTION_PROMPT, &raw).await;
    store.replace_with_summary(user_id, &summary).await?;

    info!(user_id, rows = records.len(), "History compacted");
    Ok("Context compacted successfully.".to_string())
}
