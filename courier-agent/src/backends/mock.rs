// ABOUTME: Mock runtime for testing - replays scripted event sequences.
// ABOUTME: Allows deterministic tests without a real agent process.
//!
//! # Example
//!
//! ```no_run
//! use courier_agent::backends::mock::{script, MockRuntime};
//! use courier_agent::AgentRuntime;
//!
//! # async fn example() {
//! let mock = MockRuntime::new()
//!     .on_prompt("hello")
//!     .respond(vec![script::text("p0", "Hi there!"), script::idle()]);
//!
//! let session_id = mock.create_session(None).await.unwrap();
//! let mut sub = mock.subscribe_events();
//! mock.prompt_async(&session_id, "hello").await.unwrap();
//!
//! while let Some(event) = sub.recv().await {
//!     // text update, then idle
//! }
//! # }
//! ```

use crate::event::{AgentEvent, QuestionEntry, SessionErrorPayload, ToolStatus};
use crate::registry::RuntimeFactory;
use crate::runtime::{AgentRuntime, SessionInfo};
use crate::subscription::{EventFeed, EventSubscription};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Session id placeholder replaced at replay time with the prompted session
pub const SESSION_PLACEHOLDER: &str = "{session}";

/// Helpers for building scripted events against the session placeholder.
///
/// Events built here are rewritten to the actual session id when the script
/// replays; events constructed with an explicit id pass through untouched,
/// which lets tests inject cross-session noise.
pub mod script {
    use super::*;

    pub fn text(part_id: &str, text: &str) -> AgentEvent {
        AgentEvent::TextUpdate {
            session_id: SESSION_PLACEHOLDER.to_string(),
            part_id: part_id.to_string(),
            text: text.to_string(),
        }
    }

    pub fn tool_running(call_id: &str, name: &str, title: Option<&str>) -> AgentEvent {
        AgentEvent::ToolActivity {
            session_id: SESSION_PLACEHOLDER.to_string(),
            call_id: call_id.to_string(),
            name: name.to_string(),
            status: ToolStatus::Running,
            title: title.map(String::from),
        }
    }

    pub fn question(question_id: &str, entries: Vec<QuestionEntry>) -> AgentEvent {
        AgentEvent::QuestionAsked {
            session_id: SESSION_PLACEHOLDER.to_string(),
            question_id: question_id.to_string(),
            entries,
        }
    }

    pub fn idle() -> AgentEvent {
        AgentEvent::SessionIdle {
            session_id: SESSION_PLACEHOLDER.to_string(),
        }
    }

    pub fn aborted() -> AgentEvent {
        AgentEvent::SessionError {
            session_id: SESSION_PLACEHOLDER.to_string(),
            error: SessionErrorPayload::aborted(),
        }
    }

    pub fn failed(message: &str) -> AgentEvent {
        AgentEvent::SessionError {
            session_id: SESSION_PLACEHOLDER.to_string(),
            error: SessionErrorPayload::failed(message),
        }
    }
}

struct Expectation {
    pattern: String,
    /// (delay before emitting, event) pairs replayed in order
    events: Vec<(Duration, AgentEvent)>,
}

#[derive(Default)]
struct MockState {
    expectations: VecDeque<Expectation>,
    session_counter: u64,
    sessions: Vec<SessionInfo>,
    prompts: Vec<(String, String)>,
    aborts: Vec<String>,
    replies: Vec<(String, Vec<Vec<String>>)>,
    rejections: Vec<String>,
    abort_ack: bool,
}

/// Mock runtime for testing
#[derive(Clone)]
pub struct MockRuntime {
    feed: EventFeed,
    state: Arc<Mutex<MockState>>,
}

impl MockRuntime {
    /// Create a new mock runtime with no expectations
    pub fn new() -> Self {
        Self {
            feed: EventFeed::new(),
            state: Arc::new(Mutex::new(MockState {
                abort_ack: true,
                ..MockState::default()
            })),
        }
    }

    /// Set up an expectation for a prompt containing the given pattern
    pub fn on_prompt(self, pattern: &str) -> ExpectationBuilder {
        ExpectationBuilder {
            runtime: self,
            pattern: pattern.to_string(),
        }
    }

    /// Whether `abort` reports acknowledgement
    pub fn ack_aborts(self, ack: bool) -> Self {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).abort_ack = ack;
        self
    }

    /// Emit an event directly onto the feed, bypassing any script
    pub fn emit(&self, event: AgentEvent) {
        self.feed.emit(event);
    }

    /// Prompts received so far as (session id, text)
    pub fn prompts(&self) -> Vec<(String, String)> {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .prompts
            .clone()
    }

    /// Session ids abort was called with
    pub fn aborts(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .aborts
            .clone()
    }

    /// Question replies received so far as (question id, answers)
    pub fn replies(&self) -> Vec<(String, Vec<Vec<String>>)> {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .replies
            .clone()
    }

    /// Question ids rejected so far
    pub fn rejections(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .rejections
            .clone()
    }

    /// Factory function for the registry
    pub fn factory() -> RuntimeFactory {
        Box::new(|_config| Ok(Arc::new(MockRuntime::new()) as Arc<dyn AgentRuntime>))
    }

    fn rewrite(session_id: &str, event: AgentEvent) -> AgentEvent {
        if event.session_id() != SESSION_PLACEHOLDER {
            return event;
        }
        match event {
            AgentEvent::ToolActivity {
                call_id,
                name,
                status,
                title,
                ..
            } => AgentEvent::ToolActivity {
                session_id: session_id.to_string(),
                call_id,
                name,
                status,
                title,
            },
            AgentEvent::TextUpdate { part_id, text, .. } => AgentEvent::TextUpdate {
                session_id: session_id.to_string(),
                part_id,
                text,
            },
            AgentEvent::QuestionAsked {
                question_id,
                entries,
                ..
            } => AgentEvent::QuestionAsked {
                session_id: session_id.to_string(),
                question_id,
                entries,
            },
            AgentEvent::SessionIdle { .. } => AgentEvent::SessionIdle {
                session_id: session_id.to_string(),
            },
            AgentEvent::SessionError { error, .. } => AgentEvent::SessionError {
                session_id: session_id.to_string(),
                error,
            },
        }
    }
}

impl Default for MockRuntime {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AgentRuntime for MockRuntime {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn create_session(&self, title: Option<&str>) -> Result<String> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.session_counter += 1;
        let id = format!("mock-session-{}", state.session_counter);
        let created_at = format!("2024-01-01T00:00:{:02}Z", state.session_counter % 60);
        state.sessions.push(SessionInfo {
            id: id.clone(),
            title: title.unwrap_or("untitled").to_string(),
            created_at,
        });
        Ok(id)
    }

    async fn fork_session(&self, session_id: &str) -> Result<String> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.session_counter += 1;
        let id = format!("mock-session-{}", state.session_counter);
        let created_at = format!("2024-01-01T00:00:{:02}Z", state.session_counter % 60);
        state.sessions.push(SessionInfo {
            id: id.clone(),
            title: format!("fork of {}", session_id),
            created_at,
        });
        Ok(id)
    }

    async fn list_sessions(&self) -> Result<Vec<SessionInfo>> {
        Ok(self
            .state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .sessions
            .clone())
    }

    async fn prompt_async(&self, session_id: &str, text: &str) -> Result<()> {
        // Match expectations with FIFO preference: check the front first,
        // fall back to searching the queue if the front doesn't match.
        let events = {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            state
                .prompts
                .push((session_id.to_string(), text.to_string()));
            let exp = &mut state.expectations;
            if let Some(front) = exp.front() {
                if text.contains(&front.pattern) {
                    exp.pop_front().map(|e| e.events)
                } else {
                    exp.iter()
                        .position(|e| text.contains(&e.pattern))
                        .and_then(|i| exp.remove(i))
                        .map(|e| e.events)
                }
            } else {
                None
            }
        };

        let feed = self.feed.clone();
        let session = session_id.to_string();
        tokio::spawn(async move {
            match events {
                Some(events) => {
                    for (delay, event) in events {
                        if !delay.is_zero() {
                            tokio::time::sleep(delay).await;
                        }
                        feed.emit(MockRuntime::rewrite(&session, event));
                    }
                }
                None => {
                    feed.emit(AgentEvent::TextUpdate {
                        session_id: session.clone(),
                        part_id: "p0".to_string(),
                        text: "Mock: no expectation matched".to_string(),
                    });
                    feed.emit(AgentEvent::SessionIdle {
                        session_id: session,
                    });
                }
            }
        });

        Ok(())
    }

    fn subscribe_events(&self) -> EventSubscription {
        self.feed.subscribe()
    }

    async fn abort(&self, session_id: &str) -> Result<bool> {
        let ack = {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            state.aborts.push(session_id.to_string());
            state.abort_ack
        };
        if ack {
            self.feed.emit(AgentEvent::SessionError {
                session_id: session_id.to_string(),
                error: SessionErrorPayload::aborted(),
            });
        }
        Ok(ack)
    }

    async fn reply_question(&self, question_id: &str, answers: Vec<Vec<String>>) -> Result<()> {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .replies
            .push((question_id.to_string(), answers));
        Ok(())
    }

    async fn reject_question(&self, question_id: &str) -> Result<()> {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .rejections
            .push(question_id.to_string());
        Ok(())
    }
}

/// Builder for setting up mock expectations with a fluent API
pub struct ExpectationBuilder {
    runtime: MockRuntime,
    pattern: String,
}

impl ExpectationBuilder {
    /// Respond with events emitted back-to-back
    pub fn respond(self, events: Vec<AgentEvent>) -> MockRuntime {
        self.respond_timed(events.into_iter().map(|e| (Duration::ZERO, e)).collect())
    }

    /// Respond with (delay, event) pairs; each delay is relative to the
    /// previous emission
    pub fn respond_timed(self, events: Vec<(Duration, AgentEvent)>) -> MockRuntime {
        self.runtime
            .state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .expectations
            .push_back(Expectation {
                pattern: self.pattern,
                events,
            });
        self.runtime
    }

    /// Respond with a single text part followed by idle
    pub fn respond_text(self, text: &str) -> MockRuntime {
        self.respond(vec![script::text("p0", text), script::idle()])
    }
}
