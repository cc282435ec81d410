//! Conversation orchestration and background jobs.

pub mod orchestrator;
pub mod reminder;

pub use orchestrator::{Orchestrator, FALLBACK_REPLY, MAX_ITERATIONS};
pub use reminder::ReminderJob;
