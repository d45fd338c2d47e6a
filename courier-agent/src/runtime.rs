// ABOUTME: Core AgentRuntime trait the router and streaming engine consume.
// ABOUTME: Session management, fire-and-forget prompting, aborts, and question replies.

use crate::subscription::EventSubscription;
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Metadata for a session known to the runtime
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionInfo {
    pub id: String,
    pub title: String,
    /// RFC 3339 creation timestamp
    pub created_at: String,
}

/// The agent runtime as consumed by courier.
///
/// The runtime is authoritative for session existence and lifecycle; courier
/// only keeps its own conversation-to-session bindings. Prompting is
/// fire-and-forget: results arrive on the shared event feed.
#[async_trait]
pub trait AgentRuntime: Send + Sync {
    /// Runtime name for logging and registry lookup
    fn name(&self) -> &'static str;

    /// Create a new session, returns the session id
    async fn create_session(&self, title: Option<&str>) -> Result<String>;

    /// Fork an existing session, returns the new session id
    async fn fork_session(&self, session_id: &str) -> Result<String>;

    /// All sessions the runtime knows about
    async fn list_sessions(&self) -> Result<Vec<SessionInfo>>;

    /// Fire a prompt without waiting for it to complete.
    ///
    /// Returns once the prompt is accepted. Progress and the final text
    /// arrive as events; open a subscription BEFORE calling this.
    async fn prompt_async(&self, session_id: &str, text: &str) -> Result<()>;

    /// Open a new consumer on the shared event feed
    fn subscribe_events(&self) -> EventSubscription;

    /// Abort the in-flight turn for a session.
    ///
    /// Returns whether the runtime acknowledged the abort.
    async fn abort(&self, session_id: &str) -> Result<bool>;

    /// Answer a pending question. `answers` holds one answer set per
    /// question entry.
    async fn reply_question(&self, question_id: &str, answers: Vec<Vec<String>>) -> Result<()>;

    /// Decline a pending question so the agent proceeds on its own
    async fn reject_question(&self, question_id: &str) -> Result<()>;
}
