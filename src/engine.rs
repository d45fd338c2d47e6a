// ABOUTME: Streaming prompt engine reducing the shared event feed to one turn's behavior.
// ABOUTME: Tool-notice throttling, heartbeats, question suspension, and timeout bounds.

use anyhow::{anyhow, Result};
use courier_agent::{AgentEvent, AgentRuntime, QuestionPrompt, ToolStatus};
use futures::future::BoxFuture;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep_until, Instant, MissedTickBehavior};

/// Default minimum gap between tool-activity notices
pub const DEFAULT_TOOL_THROTTLE: Duration = Duration::from_millis(5_000);
/// Default silence threshold before a heartbeat fires
pub const DEFAULT_HEARTBEAT: Duration = Duration::from_millis(60_000);

/// Called when a tool starts running: (tool name, display title)
pub type ToolNoticeFn = Box<dyn Fn(String, String) -> BoxFuture<'static, ()> + Send + Sync>;
/// Called after a full heartbeat interval of silence
pub type HeartbeatFn = Box<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;
/// Called when the agent is blocked on a question; resolves to the answers
pub type QuestionFn =
    Box<dyn Fn(QuestionPrompt) -> BoxFuture<'static, Result<Vec<Vec<String>>>> + Send + Sync>;

/// Progress callbacks and tunables for one engine invocation.
///
/// All callbacks are optional; an absent callback degrades to a no-op (or a
/// question rejection). Callback failures never abort the turn.
pub struct ProgressOptions {
    pub on_tool_running: Option<ToolNoticeFn>,
    pub on_heartbeat: Option<HeartbeatFn>,
    pub on_question: Option<QuestionFn>,
    /// Global gap between tool notices, across all tool invocations
    pub tool_throttle: Duration,
    /// Silence threshold between heartbeats
    pub heartbeat_interval: Duration,
}

impl Default for ProgressOptions {
    fn default() -> Self {
        Self {
            on_tool_running: None,
            on_heartbeat: None,
            on_question: None,
            tool_throttle: DEFAULT_TOOL_THROTTLE,
            heartbeat_interval: DEFAULT_HEARTBEAT,
        }
    }
}

/// How a turn ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The session went idle; carries the accumulated final text
    Completed(String),
    /// The user aborted the turn; nothing further should be sent
    Aborted,
    /// The deadline elapsed; partial text is discarded, never delivered
    TimedOut,
}

/// Accumulated text parts in first-observed order. Each update is the
/// authoritative current value for its part id.
#[derive(Default)]
struct TextParts {
    parts: Vec<(String, String)>,
}

impl TextParts {
    fn update(&mut self, part_id: &str, text: String) {
        match self.parts.iter_mut().find(|(id, _)| id == part_id) {
            Some(entry) => entry.1 = text,
            None => self.parts.push((part_id.to_string(), text)),
        }
    }

    fn join(self) -> String {
        self.parts
            .into_iter()
            .map(|(_, text)| text)
            .filter(|text| !text.trim().is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Runs one prompt against the agent runtime and reduces the shared event
/// feed into callbacks plus a final outcome.
pub struct PromptEngine {
    runtime: Arc<dyn AgentRuntime>,
}

impl PromptEngine {
    pub fn new(runtime: Arc<dyn AgentRuntime>) -> Self {
        Self { runtime }
    }

    /// Execute one turn: fire `prompt` into `session_id` and consume events
    /// until the session goes idle, errors, or the deadline elapses.
    ///
    /// The subscription opens before the prompt fires so no event in the gap
    /// is lost. Events for other sessions are discarded. The subscription,
    /// heartbeat timer, and deadline are all released on every exit path by
    /// leaving this scope.
    pub async fn run(
        &self,
        session_id: &str,
        prompt: &str,
        timeout: Duration,
        progress: ProgressOptions,
    ) -> Result<TurnOutcome> {
        let mut sub = self.runtime.subscribe_events();
        self.runtime.prompt_async(session_id, prompt).await?;

        let deadline = Instant::now() + timeout;
        let mut heartbeat = tokio::time::interval_at(
            Instant::now() + progress.heartbeat_interval,
            progress.heartbeat_interval,
        );
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut last_activity = Instant::now();
        let mut parts = TextParts::default();
        let mut notified_calls: HashSet<String> = HashSet::new();
        let mut last_tool_notice: Option<Instant> = None;

        let outcome = loop {
            tokio::select! {
                _ = sleep_until(deadline) => {
                    tracing::warn!(
                        session = %session_id,
                        timeout_secs = timeout.as_secs(),
                        "Turn deadline elapsed, discarding partial output"
                    );
                    break TurnOutcome::TimedOut;
                }

                _ = heartbeat.tick() => {
                    if last_activity.elapsed() >= progress.heartbeat_interval {
                        if let Some(on_heartbeat) = &progress.on_heartbeat {
                            on_heartbeat().await;
                        }
                        last_activity = Instant::now();
                    }
                }

                event = sub.recv() => {
                    let Some(event) = event else {
                        return Err(anyhow!("Event feed closed while turn was in flight"));
                    };
                    // The feed carries every concurrent session
                    if event.session_id() != session_id {
                        continue;
                    }
                    match event {
                        AgentEvent::TextUpdate { part_id, text, .. } => {
                            parts.update(&part_id, text);
                        }
                        AgentEvent::ToolActivity {
                            call_id,
                            name,
                            status: ToolStatus::Running,
                            title,
                            ..
                        } => {
                            // Dedup by call id first, then the global throttle window
                            if notified_calls.insert(call_id) {
                                let throttled = last_tool_notice
                                    .is_some_and(|at| at.elapsed() < progress.tool_throttle);
                                if !throttled {
                                    last_tool_notice = Some(Instant::now());
                                    last_activity = Instant::now();
                                    if let Some(on_tool) = &progress.on_tool_running {
                                        let label = title.unwrap_or_else(|| name.clone());
                                        on_tool(name, label).await;
                                    }
                                }
                            }
                        }
                        AgentEvent::ToolActivity { .. } => {
                            // Completions and tool errors are not narrated
                        }
                        AgentEvent::QuestionAsked { question_id, entries, .. } => {
                            last_activity = Instant::now();
                            self.handle_question(
                                &question_id,
                                entries,
                                &progress,
                                deadline,
                                &mut last_activity,
                            )
                            .await?;
                            if Instant::now() >= deadline {
                                break TurnOutcome::TimedOut;
                            }
                        }
                        AgentEvent::SessionIdle { .. } => {
                            break TurnOutcome::Completed(parts.join());
                        }
                        AgentEvent::SessionError { error, .. } => {
                            if error.aborted {
                                tracing::info!(session = %session_id, "Turn aborted by user");
                                break TurnOutcome::Aborted;
                            }
                            return Err(anyhow!("Agent error: {}", error.message));
                        }
                    }
                }
            }
        };

        sub.close();
        Ok(outcome)
    }

    /// Suspend on a question until the callback resolves or the turn deadline
    /// hits. Answers forward via reply; failures (or no callback) forward a
    /// rejection so the agent proceeds on its own terms.
    async fn handle_question(
        &self,
        question_id: &str,
        entries: Vec<courier_agent::QuestionEntry>,
        progress: &ProgressOptions,
        deadline: Instant,
        last_activity: &mut Instant,
    ) -> Result<()> {
        let Some(on_question) = &progress.on_question else {
            if let Err(e) = self.runtime.reject_question(question_id).await {
                tracing::warn!(error = %e, question = %question_id, "Failed to reject question");
            }
            return Ok(());
        };

        let prompt = QuestionPrompt {
            question_id: question_id.to_string(),
            entries,
        };

        tokio::select! {
            answers = on_question(prompt) => {
                match answers {
                    Ok(answers) => {
                        if let Err(e) = self.runtime.reply_question(question_id, answers).await {
                            tracing::warn!(
                                error = %e,
                                question = %question_id,
                                "Failed to forward question answers"
                            );
                        }
                    }
                    Err(e) => {
                        tracing::debug!(
                            error = %e,
                            question = %question_id,
                            "Question unanswered, rejecting"
                        );
                        if let Err(e) = self.runtime.reject_question(question_id).await {
                            tracing::warn!(
                                error = %e,
                                question = %question_id,
                                "Failed to reject question"
                            );
                        }
                    }
                }
                *last_activity = Instant::now();
            }
            _ = sleep_until(deadline) => {
                // The caller observes the elapsed deadline and times the turn out
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_parts_replace_by_part_id() {
        let mut parts = TextParts::default();
        parts.update("p0", "first".to_string());
        parts.update("p0", "first, revised".to_string());
        assert_eq!(parts.join(), "first, revised");
    }

    #[test]
    fn test_text_parts_join_in_first_observed_order() {
        let mut parts = TextParts::default();
        parts.update("p1", "one".to_string());
        parts.update("p2", "two".to_string());
        parts.update("p1", "one, updated".to_string());
        assert_eq!(parts.join(), "one, updated\n\ntwo");
    }

    #[test]
    fn test_text_parts_skip_blank_parts() {
        let mut parts = TextParts::default();
        parts.update("p0", "   ".to_string());
        parts.update("p1", "real".to_string());
        assert_eq!(parts.join(), "real");
    }

    #[test]
    fn test_progress_defaults() {
        let progress = ProgressOptions::default();
        assert_eq!(progress.tool_throttle, Duration::from_millis(5_000));
        assert_eq!(progress.heartbeat_interval, Duration::from_millis(60_000));
        assert!(progress.on_tool_running.is_none());
    }
}
