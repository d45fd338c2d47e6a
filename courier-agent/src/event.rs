// ABOUTME: Event types emitted on the shared agent runtime feed during prompt execution.
// ABOUTME: Every event carries a session id; consumers filter the feed to their own session.

use serde::{Deserialize, Serialize};

/// Execution state of a tool invocation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    Running,
    Completed,
    Error,
}

/// A selectable option attached to a question entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuestionOption {
    /// Short label the user can answer with
    pub label: String,
    /// Optional longer explanation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// One question entry within a question-asked event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuestionEntry {
    /// Optional section header shown above the question
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<String>,
    /// The question text itself
    pub text: String,
    /// Labeled options, empty for free-form questions
    #[serde(default)]
    pub options: Vec<QuestionOption>,
    /// Whether more than one option may be selected
    #[serde(default)]
    pub multiple: bool,
}

/// A question the agent is blocked on, as handed to progress callbacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionPrompt {
    /// Identifier used to reply to or reject the question
    pub question_id: String,
    /// Ordered question entries
    pub entries: Vec<QuestionEntry>,
}

/// Terminal error payload for a session turn.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionErrorPayload {
    /// True when the turn ended because the user aborted it
    pub aborted: bool,
    /// Human-readable error message
    pub message: String,
}

impl SessionErrorPayload {
    pub fn aborted() -> Self {
        Self {
            aborted: true,
            message: "aborted by user".to_string(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            aborted: false,
            message: message.into(),
        }
    }
}

/// Events emitted by the agent runtime during prompt execution.
///
/// The feed is a single multiplexed channel shared by every concurrently
/// running session; consumers discard events whose `session_id` is not theirs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum AgentEvent {
    /// A tool invocation changed state
    ToolActivity {
        session_id: String,
        /// Unique identifier for this tool invocation
        call_id: String,
        /// Tool name (e.g., "read_file", "web_search")
        name: String,
        status: ToolStatus,
        /// Human-oriented title, when the runtime provides one
        title: Option<String>,
    },

    /// Authoritative current text for one output part
    TextUpdate {
        session_id: String,
        /// Identifies which output part this text belongs to
        part_id: String,
        /// Full or incremental snapshot; later updates replace earlier ones
        text: String,
    },

    /// The agent is blocked awaiting user input
    QuestionAsked {
        session_id: String,
        question_id: String,
        entries: Vec<QuestionEntry>,
    },

    /// The turn completed and the session returned to idle
    SessionIdle { session_id: String },

    /// The turn ended with an error (including user-initiated aborts)
    SessionError {
        session_id: String,
        error: SessionErrorPayload,
    },
}

impl AgentEvent {
    /// The session this event belongs to
    pub fn session_id(&self) -> &str {
        match self {
            AgentEvent::ToolActivity { session_id, .. }
            | AgentEvent::TextUpdate { session_id, .. }
            | AgentEvent::QuestionAsked { session_id, .. }
            | AgentEvent::SessionIdle { session_id }
            | AgentEvent::SessionError { session_id, .. } => session_id,
        }
    }
}
