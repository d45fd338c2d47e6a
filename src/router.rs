// ABOUTME: Router state machine owning per-peer turns and the question rendezvous.
// ABOUTME: Inbound pipeline: rendezvous, allowlist, command interception, then the engine.

use crate::commands::{self, CommandContext};
use crate::config::{AllowlistAction, Config};
use crate::engine::{ProgressOptions, PromptEngine, TurnOutcome};
use crate::format;
use crate::metrics;
use anyhow::{anyhow, Result};
use courier_agent::AgentRuntime;
use courier_core::commands::{parse_message, ParseResult};
use courier_core::keys;
use courier_core::session::SessionStore;
use courier_core::traits::{ChannelAdapter, InboundMessage, OutboundMessage};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Instant;
use tokio::sync::oneshot;
use tokio_stream::StreamExt;

/// Fixed reply when an unexpected error reaches the outer handler
const GENERIC_FAILURE: &str = "⚠️ Something went wrong handling that message. Please try again.";
/// Fixed reply when the turn deadline elapses
const TIMEOUT_MESSAGE: &str = "⏰ Request timed out. The agent may still be working; try again in a moment.";
/// Fixed reply for a second message while a turn is active
const BUSY_NOTICE: &str = "⏳ Still working on your previous message. Use /cancel to stop it.";
/// Fixed reply when the allowlist rejects a sender (notify mode)
const NOT_ALLOWED: &str = "🚫 You are not authorized to use this bot.";
/// Fixed reply when a turn completes without any text
const NO_RESPONSE: &str = "(the agent finished without a response)";

/// Ephemeral record for one in-flight turn, keyed by peer key.
///
/// Exactly one may exist per peer at any instant; `/cancel` and `/status`
/// operate on this record rather than the conversation's session binding.
pub struct ActiveTurn {
    pub session_id: String,
    pub started_at: Instant,
    pub last_tool: Option<String>,
}

/// A suspended question wait, resolved by the peer's next inbound message
struct PendingQuestion {
    answer_tx: oneshot::Sender<String>,
}

/// Routes inbound chat messages to the agent runtime and streams progress
/// back through the owning channel adapter.
///
/// The two maps below are the only shared mutable state. Locks are never
/// held across an await, and every check-then-set runs inside a single
/// lock acquisition.
pub struct Router {
    runtime: Arc<dyn AgentRuntime>,
    engine: PromptEngine,
    store: SessionStore,
    config: Arc<Config>,
    adapters: RwLock<HashMap<String, Arc<dyn ChannelAdapter>>>,
    active_turns: Arc<Mutex<HashMap<String, ActiveTurn>>>,
    pending_questions: Arc<Mutex<HashMap<String, PendingQuestion>>>,
}

impl Router {
    pub fn new(runtime: Arc<dyn AgentRuntime>, store: SessionStore, config: Arc<Config>) -> Self {
        Self {
            engine: PromptEngine::new(Arc::clone(&runtime)),
            runtime,
            store,
            config,
            adapters: RwLock::new(HashMap::new()),
            active_turns: Arc::new(Mutex::new(HashMap::new())),
            pending_questions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Register an adapter for its channel id. Later registrations for the
    /// same channel replace earlier ones.
    pub fn register_adapter(&self, adapter: Arc<dyn ChannelAdapter>) {
        let channel = adapter.channel_id().to_string();
        self.adapters
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(channel, adapter);
    }

    fn adapter(&self, channel: &str) -> Option<Arc<dyn ChannelAdapter>> {
        self.adapters
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(channel)
            .cloned()
    }

    /// Start an adapter and feed its inbound stream into the router until
    /// the stream ends. Each message is handled on its own task so one
    /// peer's turn never blocks another's.
    pub async fn run_adapter(self: Arc<Self>, adapter: Arc<dyn ChannelAdapter>) -> Result<()> {
        self.register_adapter(Arc::clone(&adapter));
        let mut stream = adapter.start().await?;
        tracing::info!(channel = adapter.channel_id(), "Adapter started");

        while let Some(msg) = stream.next().await {
            let router = Arc::clone(&self);
            tokio::spawn(async move {
                router.handle_inbound(msg).await;
            });
        }

        tracing::info!(channel = adapter.channel_id(), "Adapter stream ended");
        adapter.stop().await
    }

    /// Entry point for one inbound message. This is the single last-resort
    /// catch-all: unexpected errors produce exactly one generic reply and
    /// one log line.
    pub async fn handle_inbound(&self, msg: InboundMessage) {
        let started = Instant::now();
        if let Err(e) = self.route(&msg).await {
            tracing::error!(
                error = %e,
                channel = %msg.channel,
                peer = %msg.peer,
                "Failed to handle inbound message"
            );
            metrics::record_error("inbound");
            self.send_best_effort(&msg, GENERIC_FAILURE).await;
        }
        metrics::record_message_processing_duration(started.elapsed().as_secs_f64());
    }

    async fn route(&self, msg: &InboundMessage) -> Result<()> {
        let peer_key = keys::peer_key(&msg.channel, &msg.peer);

        // A pending question consumes the very next message from this peer,
        // slash commands included; it is never reparsed
        let pending = self
            .pending_questions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&peer_key);
        if let Some(pending) = pending {
            metrics::record_message_received("answer");
            tracing::info!(peer = %peer_key, "Inbound message resolves pending question");
            if pending.answer_tx.send(msg.body.clone()).is_err() {
                tracing::debug!(peer = %peer_key, "Question wait already gone; answer dropped");
            }
            return Ok(());
        }

        if !self.config.is_peer_allowed(&msg.channel, &msg.peer) {
            tracing::debug!(
                peer = %msg.peer,
                channel = %msg.channel,
                "Ignoring message from unauthorized peer"
            );
            if self.config.router.allowlist_action == AllowlistAction::Notify {
                self.send_best_effort(msg, NOT_ALLOWED).await;
            }
            return Ok(());
        }

        let message_preview = format::preview(&msg.body, 50);
        tracing::info!(
            peer = %msg.peer,
            channel = %msg.channel,
            message_preview,
            "Processing incoming message"
        );

        match parse_message(&msg.body) {
            ParseResult::Ignore => Ok(()),
            ParseResult::Command(cmd) => {
                metrics::record_message_received("command");
                let adapter = self
                    .adapter(&msg.channel)
                    .ok_or_else(|| anyhow!("No adapter registered for channel {}", msg.channel))?;
                let ctx = CommandContext {
                    adapter: &adapter,
                    peer: &msg.peer,
                    thread_id: msg.thread_id.as_deref(),
                    conversation_key: keys::conversation_key(
                        &msg.channel,
                        &msg.peer,
                        self.config.thread_scoped(&msg.channel),
                        msg.thread_id.as_deref(),
                    ),
                    peer_key,
                };
                commands::handle_command(&ctx, &cmd, &self.store, &self.runtime, &self.active_turns)
                    .await
            }
            ParseResult::Message(text) => {
                metrics::record_message_received("chat");
                self.run_turn(msg, &text).await
            }
        }
    }

    /// Drive one full agent turn for a chat message.
    async fn run_turn(&self, msg: &InboundMessage, text: &str) -> Result<()> {
        let adapter = self
            .adapter(&msg.channel)
            .ok_or_else(|| anyhow!("No adapter registered for channel {}", msg.channel))?;
        let peer_key = keys::peer_key(&msg.channel, &msg.peer);

        // Busy check and reservation in one lock acquisition so two racing
        // messages cannot both start turns for the same peer
        let already_active = {
            let mut turns = self.active_turns.lock().unwrap_or_else(|e| e.into_inner());
            if turns.contains_key(&peer_key) {
                true
            } else {
                turns.insert(
                    peer_key.clone(),
                    ActiveTurn {
                        session_id: String::new(),
                        started_at: Instant::now(),
                        last_tool: None,
                    },
                );
                false
            }
        };
        if already_active {
            tracing::info!(peer = %peer_key, "Peer already has an active turn, rejecting");
            self.send(&adapter, msg, BUSY_NOTICE).await?;
            return Ok(());
        }

        let result = self.drive_turn(&adapter, msg, text, &peer_key).await;

        // Unconditional teardown on success, timeout, abort, and error alike
        self.active_turns
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&peer_key);
        self.pending_questions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&peer_key);
        if let Some(typing) = adapter.typing_indicator() {
            if let Err(e) = typing.stop_typing(&msg.peer).await {
                tracing::debug!(error = %e, "Failed to stop typing indicator");
            }
        }

        result
    }

    async fn drive_turn(
        &self,
        adapter: &Arc<dyn ChannelAdapter>,
        msg: &InboundMessage,
        text: &str,
        peer_key: &str,
    ) -> Result<()> {
        let conversation_key = keys::conversation_key(
            &msg.channel,
            &msg.peer,
            self.config.thread_scoped(&msg.channel),
            msg.thread_id.as_deref(),
        );

        // Resolve the binding, creating a session lazily on first use
        let session_id = match self.store.binding(&conversation_key)? {
            Some(id) => id,
            None => {
                let id = self.runtime.create_session(None).await?;
                self.store.record_session(peer_key, &id, "untitled")?;
                self.store.bind(&conversation_key, &id)?;
                tracing::info!(
                    conversation = %conversation_key,
                    session = %id,
                    "Created session binding"
                );
                id
            }
        };
        if let Some(turn) = self
            .active_turns
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get_mut(peer_key)
        {
            turn.session_id = session_id.clone();
        }

        // Best-effort typing indicator; absence or failure never matters
        if let Some(typing) = adapter.typing_indicator() {
            if let Err(e) = typing.send_typing(&msg.peer).await {
                tracing::debug!(error = %e, "Failed to send typing indicator");
            }
        }

        let progress = self.build_progress(adapter, msg, peer_key);
        let outcome = self
            .engine
            .run(&session_id, text, self.config.turn_timeout(), progress)
            .await?;

        match outcome {
            TurnOutcome::Completed(final_text) => {
                metrics::record_turn_outcome("completed");
                let reply = if final_text.is_empty() {
                    NO_RESPONSE
                } else {
                    final_text.as_str()
                };
                // Exactly one outbound send carries the final text
                self.send(adapter, msg, reply).await?;
            }
            TurnOutcome::TimedOut => {
                metrics::record_turn_outcome("timeout");
                self.send(adapter, msg, TIMEOUT_MESSAGE).await?;
            }
            TurnOutcome::Aborted => {
                // /cancel already confirmed; stay silent
                metrics::record_turn_outcome("aborted");
            }
        }

        Ok(())
    }

    /// Wire the engine's progress callbacks to adapter-visible side effects.
    /// Returns callback-free options when progress reporting is disabled.
    fn build_progress(
        &self,
        adapter: &Arc<dyn ChannelAdapter>,
        msg: &InboundMessage,
        peer_key: &str,
    ) -> ProgressOptions {
        let mut progress = ProgressOptions {
            tool_throttle: self.config.tool_throttle(),
            heartbeat_interval: self.config.heartbeat_interval(),
            ..ProgressOptions::default()
        };
        if !self.config.progress.enabled {
            return progress;
        }

        let turns = Arc::clone(&self.active_turns);
        let tool_adapter = Arc::clone(adapter);
        let tool_peer = msg.peer.clone();
        let tool_thread = msg.thread_id.clone();
        let tool_peer_key = peer_key.to_string();
        progress.on_tool_running = Some(Box::new(move |name, title| {
            let adapter = Arc::clone(&tool_adapter);
            let peer = tool_peer.clone();
            let thread = tool_thread.clone();
            let turns = Arc::clone(&turns);
            let peer_key = tool_peer_key.clone();
            Box::pin(async move {
                metrics::record_tool_used(&name);
                if let Some(turn) = turns
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .get_mut(&peer_key)
                {
                    turn.last_tool = Some(name);
                }
                let notice = format!("🔧 {}...", title);
                if let Err(e) = adapter
                    .send(&peer, OutboundMessage::in_thread(notice, thread))
                    .await
                {
                    tracing::warn!(error = %e, "Failed to send tool notice");
                } else {
                    metrics::record_message_sent();
                }
            })
        }));

        let hb_adapter = Arc::clone(adapter);
        let hb_peer = msg.peer.clone();
        let hb_thread = msg.thread_id.clone();
        progress.on_heartbeat = Some(Box::new(move || {
            let adapter = Arc::clone(&hb_adapter);
            let peer = hb_peer.clone();
            let thread = hb_thread.clone();
            Box::pin(async move {
                if let Some(typing) = adapter.typing_indicator() {
                    if let Err(e) = typing.send_typing(&peer).await {
                        tracing::debug!(error = %e, "Failed to refresh typing indicator");
                    }
                }
                if let Err(e) = adapter
                    .send(
                        &peer,
                        OutboundMessage::in_thread("⏳ Still working...", thread),
                    )
                    .await
                {
                    tracing::warn!(error = %e, "Failed to send heartbeat message");
                } else {
                    metrics::record_message_sent();
                }
            })
        }));

        let pending = Arc::clone(&self.pending_questions);
        let q_adapter = Arc::clone(adapter);
        let q_peer = msg.peer.clone();
        let q_thread = msg.thread_id.clone();
        let q_peer_key = peer_key.to_string();
        let question_timeout = self.config.turn_timeout();
        progress.on_question = Some(Box::new(move |prompt| {
            let adapter = Arc::clone(&q_adapter);
            let peer = q_peer.clone();
            let thread = q_thread.clone();
            let pending = Arc::clone(&pending);
            let peer_key = q_peer_key.clone();
            Box::pin(async move {
                let text = format::format_question(&prompt);
                adapter
                    .send(&peer, OutboundMessage::in_thread(text, thread))
                    .await?;
                metrics::record_message_sent();

                let (answer_tx, answer_rx) = oneshot::channel();
                pending
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .insert(peer_key.clone(), PendingQuestion { answer_tx });

                // The peer's next inbound message resolves this wait
                match tokio::time::timeout(question_timeout, answer_rx).await {
                    Ok(Ok(answer)) => Ok(vec![vec![answer]]),
                    Ok(Err(_)) => {
                        pending
                            .lock()
                            .unwrap_or_else(|e| e.into_inner())
                            .remove(&peer_key);
                        Err(anyhow!("question wait cancelled"))
                    }
                    Err(_) => {
                        pending
                            .lock()
                            .unwrap_or_else(|e| e.into_inner())
                            .remove(&peer_key);
                        Err(anyhow!("question timed out"))
                    }
                }
            })
        }));

        progress
    }

    async fn send(
        &self,
        adapter: &Arc<dyn ChannelAdapter>,
        msg: &InboundMessage,
        text: &str,
    ) -> Result<()> {
        adapter
            .send(&msg.peer, OutboundMessage::in_thread(text, msg.thread_id.clone()))
            .await?;
        metrics::record_message_sent();
        Ok(())
    }

    /// Send that swallows failures; used where a reply is itself best-effort
    async fn send_best_effort(&self, msg: &InboundMessage, text: &str) {
        let Some(adapter) = self.adapter(&msg.channel) else {
            return;
        };
        if let Err(e) = self.send(&adapter, msg, text).await {
            tracing::warn!(error = %e, peer = %msg.peer, "Failed to send reply");
        }
    }
}
