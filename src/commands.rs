// ABOUTME: Command interpreter for slash commands.
// ABOUTME: Session management against the store, the runtime, and the active-turn map.

use crate::format::{format_elapsed, humanize_tool_label};
use crate::metrics;
use crate::router::ActiveTurn;
use anyhow::Result;
use courier_agent::AgentRuntime;
use courier_core::commands::Command;
use courier_core::session::SessionStore;
use courier_core::traits::{ChannelAdapter, OutboundMessage};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Fixed page size for /sessions listings
const SESSIONS_PAGE_SIZE: usize = 10;

/// Fixed command summary shown by /help and unknown commands
pub const HELP: &str = "Available commands:\n\
/new [title] - Start a fresh session for this conversation\n\
/switch <id> - Point this conversation at an existing session\n\
/sessions [page] - List sessions known for you\n\
/current - Show the session bound to this conversation\n\
/fork - Fork the current session and switch to the fork\n\
/cancel - Abort the turn that is currently running\n\
/status - Show what the running turn is doing\n\
/help - Show this summary";

/// Where a command came from and where its reply goes.
pub struct CommandContext<'a> {
    pub adapter: &'a Arc<dyn ChannelAdapter>,
    pub peer: &'a str,
    pub thread_id: Option<&'a str>,
    /// Binding scope: commands like /new and /switch operate here
    pub conversation_key: String,
    /// Turn scope: /cancel and /status operate here, ignoring threads
    pub peer_key: String,
}

impl CommandContext<'_> {
    async fn reply(&self, text: impl Into<String>) -> Result<()> {
        self.adapter
            .send(
                self.peer,
                OutboundMessage::in_thread(text, self.thread_id.map(String::from)),
            )
            .await?;
        metrics::record_message_sent();
        Ok(())
    }
}

/// Handle a parsed command and send its reply as a single outbound message.
///
/// Takes the adapter capability rather than a concrete platform so command
/// behavior is testable with a capturing mock.
pub async fn handle_command(
    ctx: &CommandContext<'_>,
    cmd: &Command,
    store: &SessionStore,
    runtime: &Arc<dyn AgentRuntime>,
    active_turns: &Mutex<HashMap<String, ActiveTurn>>,
) -> Result<()> {
    metrics::record_command(&cmd.name);

    match cmd.name.as_str() {
        "new" => {
            let title = (!cmd.raw_args.is_empty()).then_some(cmd.raw_args.as_str());
            let session_id = runtime.create_session(title).await?;
            store.record_session(&ctx.peer_key, &session_id, title.unwrap_or("untitled"))?;
            store.bind(&ctx.conversation_key, &session_id)?;
            tracing::info!(
                conversation = %ctx.conversation_key,
                session = %session_id,
                "Rebound conversation to new session"
            );
            ctx.reply(format!("✨ Started new session {}", session_id))
                .await?;
        }

        "switch" => {
            let Some(session_id) = cmd.first_arg() else {
                ctx.reply("Usage: /switch <session-id>").await?;
                return Ok(());
            };
            // No existence validation: the runtime is authoritative
            store.record_session(&ctx.peer_key, session_id, "untitled")?;
            store.bind(&ctx.conversation_key, session_id)?;
            ctx.reply(format!("✅ Switched this conversation to session {}", session_id))
                .await?;
        }

        "sessions" => {
            let sessions = store.sessions_for(&ctx.peer_key)?;
            if sessions.is_empty() {
                ctx.reply("📋 No sessions yet. Send a message or use /new to start one.")
                    .await?;
                return Ok(());
            }

            let total_pages = sessions.len().div_ceil(SESSIONS_PAGE_SIZE);
            // Non-numeric arguments behave like page 1; out-of-range pages clamp
            let page = cmd
                .first_arg()
                .and_then(|arg| arg.parse::<usize>().ok())
                .unwrap_or(1)
                .clamp(1, total_pages);

            let active = store.binding(&ctx.conversation_key)?;
            let start = (page - 1) * SESSIONS_PAGE_SIZE;
            let mut listing = String::from("📋 Sessions:\n");
            for record in sessions.iter().skip(start).take(SESSIONS_PAGE_SIZE) {
                let marker = if active.as_deref() == Some(record.session_id.as_str()) {
                    " (active)"
                } else {
                    ""
                };
                listing.push_str(&format!(
                    "• {} — {}{}\n",
                    record.session_id, record.title, marker
                ));
            }
            if total_pages > 1 {
                listing.push_str(&format!("\nPage {}/{}", page, total_pages));
                if page < total_pages {
                    listing.push_str(&format!("\nUse /sessions {} for the next page.", page + 1));
                }
            }
            ctx.reply(listing.trim_end().to_string()).await?;
        }

        "current" => match store.binding(&ctx.conversation_key)? {
            Some(session_id) => {
                ctx.reply(format!("Current session: {}", session_id)).await?;
            }
            None => {
                ctx.reply("No session bound yet — send a message to start one.")
                    .await?;
            }
        },

        "fork" => match store.binding(&ctx.conversation_key)? {
            Some(session_id) => {
                let forked = runtime.fork_session(&session_id).await?;
                store.record_session(&ctx.peer_key, &forked, &format!("fork of {}", session_id))?;
                store.bind(&ctx.conversation_key, &forked)?;
                tracing::info!(
                    conversation = %ctx.conversation_key,
                    source = %session_id,
                    session = %forked,
                    "Forked session"
                );
                ctx.reply(format!("🌱 Forked into new session {}", forked))
                    .await?;
            }
            None => {
                ctx.reply("Nothing to fork yet — send a message to start a session.")
                    .await?;
            }
        },

        "cancel" => {
            // Turn-scoped, not thread-scoped: consult the active-turn map
            let session_id = active_turns
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .get(&ctx.peer_key)
                .map(|turn| turn.session_id.clone())
                .filter(|id| !id.is_empty());
            match session_id {
                None => {
                    ctx.reply("Nothing is running right now.").await?;
                }
                Some(session_id) => {
                    let acknowledged = runtime.abort(&session_id).await?;
                    if acknowledged {
                        ctx.reply("🛑 Cancelled.").await?;
                    } else {
                        ctx.reply("⚠️ The runtime did not acknowledge the cancel request.")
                            .await?;
                    }
                }
            }
        }

        "status" => {
            let snapshot = active_turns
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .get(&ctx.peer_key)
                .map(|turn| (turn.started_at.elapsed(), turn.last_tool.clone()));
            match snapshot {
                None => {
                    ctx.reply("Nothing is running right now.").await?;
                }
                Some((elapsed, last_tool)) => {
                    let mut status =
                        format!("⏱️ Working for {}", format_elapsed(elapsed.as_secs()));
                    if let Some(tool) = last_tool {
                        status.push_str(&format!("\nLast tool: {}", humanize_tool_label(&tool)));
                    }
                    ctx.reply(status).await?;
                }
            }
        }

        "help" => {
            ctx.reply(HELP).await?;
        }

        other => {
            ctx.reply(format!("❓ Unknown command: /{}\n\n{}", other, HELP))
                .await?;
        }
    }

    Ok(())
}
