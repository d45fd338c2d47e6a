// ABOUTME: Capability traits for chat channel adapters.
// ABOUTME: Inbound/outbound message types, typing indicators, and connection state.

use anyhow::Result;
use async_trait::async_trait;
use std::pin::Pin;
use tokio_stream::Stream;

// =============================================================================
// Message Types
// =============================================================================

/// Incoming message normalized by a channel adapter
#[derive(Debug, Clone)]
pub struct InboundMessage {
    /// Channel identifier (e.g., "telegram", "slack", "console")
    pub channel: String,
    /// Peer identifier within the channel (user id or DM id)
    pub peer: String,
    /// Thread identifier for platforms that scope conversations by thread
    pub thread_id: Option<String>,
    /// Message body (text content)
    pub body: String,
    /// Platform-specific event id, when the platform provides one
    pub event_id: Option<String>,
}

/// Outgoing message handed to a channel adapter.
///
/// Has no identity beyond the act of sending; nothing is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub text: String,
    /// Thread to route the message into, when the channel supports threads
    pub thread_id: Option<String>,
    /// Message to mark this send as a reply to
    pub reply_to_id: Option<String>,
}

impl OutboundMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            thread_id: None,
            reply_to_id: None,
        }
    }

    pub fn in_thread(text: impl Into<String>, thread_id: Option<String>) -> Self {
        Self {
            text: text.into(),
            thread_id,
            reply_to_id: None,
        }
    }
}

// =============================================================================
// Adapter Interface
// =============================================================================

/// Boxed stream of normalized inbound messages
pub type InboundStream = Pin<Box<dyn Stream<Item = InboundMessage> + Send>>;

/// Connection state reported by each adapter for health checks
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    Connecting,
    Disconnected,
    Error(String),
}

/// A chat platform adapter as consumed by the router.
///
/// Adapters normalize inbound traffic into [`InboundMessage`] values and
/// deliver outbound text. Optional capabilities (typing indicators) degrade
/// to no-ops when absent; their failures never surface to the user.
#[async_trait]
pub trait ChannelAdapter: Send + Sync {
    /// Channel identifier this adapter serves (e.g., "telegram")
    fn channel_id(&self) -> &'static str;

    /// Begin receiving; returns the stream of normalized inbound messages
    async fn start(&self) -> Result<InboundStream>;

    /// Stop receiving and release platform resources
    async fn stop(&self) -> Result<()>;

    /// Deliver a message to a peer
    async fn send(&self, peer_id: &str, message: OutboundMessage) -> Result<()>;

    /// Optional typing indicator capability
    fn typing_indicator(&self) -> Option<&dyn TypingIndicator> {
        None
    }

    /// Current connection state
    fn status(&self) -> ConnectionState {
        ConnectionState::Connected
    }
}

/// Typing indicator capability
#[async_trait]
pub trait TypingIndicator: Send + Sync {
    /// Show the typing indicator to a peer
    async fn send_typing(&self, peer_id: &str) -> Result<()>;

    /// Clear the typing indicator for a peer
    async fn stop_typing(&self, peer_id: &str) -> Result<()>;
}
