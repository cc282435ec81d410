//! LLM gateway implementations for Concierge.
//!
//! The gateway is a stateless translation layer: it turns the internal
//! ordered turn list into the provider's wire shape, sends it, and
//! classifies the reply into final text or requested tool calls. All
//! failure paths degrade to deterministic assistant text — a gateway
//! problem must read like an apologetic reply, never like an exception.

pub mod openai;

pub use openai::OpenAiGateway;
