// ABOUTME: Root library module exposing all public modules.
// ABOUTME: Provides access to config, engine, router, commands, and platform adapters.

pub mod commands;
pub mod config;
pub mod engine;
pub mod format;
pub mod metrics;
pub mod paths;
pub mod platform;
pub mod router;

// Re-export core and agent types for convenience
pub use courier_agent::{AgentEvent, AgentRuntime, EventFeed, RuntimeRegistry};
pub use courier_core::session::SessionStore;
pub use courier_core::traits::{ChannelAdapter, InboundMessage, OutboundMessage};
