// ABOUTME: Agent runtime abstraction for courier.
// ABOUTME: Typed events, the AgentRuntime trait, feed subscriptions, and a mock backend.

pub mod backends;
pub mod event;
pub mod registry;
pub mod runtime;
pub mod subscription;

pub use event::{
    AgentEvent, QuestionEntry, QuestionOption, QuestionPrompt, SessionErrorPayload, ToolStatus,
};
pub use registry::{RuntimeFactory, RuntimeRegistry};
pub use runtime::{AgentRuntime, SessionInfo};
pub use subscription::{EventFeed, EventSubscription};
