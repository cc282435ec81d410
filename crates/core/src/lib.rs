//! # Concierge Core
//!
//! Domain types, traits, and error definitions for the Concierge
//! conversational assistant engine. This crate has no framework
//! dependencies — it defines the seams every other crate implements
//! against.
//!
//! ## Design Philosophy
//!
//! Every subsystem is a trait here: the LLM gateway, the history store,
//! the tool handlers, and the domain stores. Implementations live in their
//! respective crates, which keeps the dependency graph pointing inward and
//! makes the orchestrator testable with mocks.

pub mod error;
pub mod gateway;
pub mod history;
pub mod message;
pub mod store;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{Error, Result};
pub use gateway::{ChatOutcome, Gateway, UNAVAILABLE_REPLY};
pub use history::{HISTORY_LIMIT, HistoryStore};
pub use message::{ChatRecord, Message, Role, ToolCallRequest, Visibility};
pub use store::{
    ContactRecord, ContactStore, NewContact, NewTask, ProfileStore, ReminderLog, ReminderSink,
    TaskRecord, TaskStatus, TaskStore,
};
pub use tool::{Tool, ToolDefinition, ToolRouter};
