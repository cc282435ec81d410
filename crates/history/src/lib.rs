//! History store implementations for Concierge.
//!
//! The SQLite backend is the production store; the in-memory backend backs
//! tests and ephemeral sessions. Both persist the same append-only
//! `(role, content, visibility)` log and share the rehydration rules from
//! `concierge-core::history`.

pub mod compaction;
pub mod in_memory;
pub mod sqlite;

pub use compaction::{COMPACTION_PROMPT, compact_history};
pub use in_memory::InMemoryHistory;
pub use sqlite::{SqliteHistory, SqliteReminderLog};
