//! Task, contact and profile store backends.
//!
//! The in-memory implementations here are the reference backends wired
//! into the CLI session. They implement the traits from
//! [`concierge_core::store`] with the same semantics a database-backed
//! store would have.

pub mod in_memory;
pub mod sink;

pub use in_memory::{
    InMemoryContactStore, InMemoryProfileStore, InMemoryReminderLog, InMemoryTaskStore,
};
pub use sink::{CollectingSink, ConsoleSink};
