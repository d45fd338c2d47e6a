// ABOUTME: Mock channel adapter for testing router and command behavior.
// ABOUTME: Captures outbound sends and typing events without a real platform.

use anyhow::Result;
use async_trait::async_trait;
use courier_core::traits::{
    ChannelAdapter, InboundStream, OutboundMessage, TypingIndicator,
};
use std::sync::{Arc, Mutex};

/// Capturing adapter for tests. Typing support is on by default and can be
/// disabled to exercise capability-absence paths.
#[derive(Clone)]
pub struct MockAdapter {
    channel: &'static str,
    typing_supported: bool,
    pub sent: Arc<Mutex<Vec<(String, OutboundMessage)>>>,
    /// (peer, started) pairs for typing indicator calls
    pub typing_events: Arc<Mutex<Vec<(String, bool)>>>,
}

impl MockAdapter {
    pub fn new(channel: &'static str) -> Self {
        Self {
            channel,
            typing_supported: true,
            sent: Arc::new(Mutex::new(Vec::new())),
            typing_events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// An adapter without the typing capability
    pub fn without_typing(channel: &'static str) -> Self {
        Self {
            typing_supported: false,
            ..Self::new(channel)
        }
    }

    /// All sent message texts, in order
    pub fn sent_texts(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(_, msg)| msg.text.clone())
            .collect()
    }

    /// The last sent message text
    pub fn last_text(&self) -> Option<String> {
        self.sent_texts().last().cloned()
    }

    /// Whether any sent message contains the given text
    pub fn has_message_containing(&self, text: &str) -> bool {
        self.sent_texts().iter().any(|t| t.contains(text))
    }

    /// Clear captured messages and typing events
    pub fn clear(&self) {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clear();
        self.typing_events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

#[async_trait]
impl ChannelAdapter for MockAdapter {
    fn channel_id(&self) -> &'static str {
        self.channel
    }

    async fn start(&self) -> Result<InboundStream> {
        Ok(Box::pin(tokio_stream::empty()))
    }

    async fn stop(&self) -> Result<()> {
        Ok(())
    }

    async fn send(&self, peer_id: &str, message: OutboundMessage) -> Result<()> {
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((peer_id.to_string(), message));
        Ok(())
    }

    fn typing_indicator(&self) -> Option<&dyn TypingIndicator> {
        self.typing_supported.then_some(self as &dyn TypingIndicator)
    }
}

#[async_trait]
impl TypingIndicator for MockAdapter {
    async fn send_typing(&self, peer_id: &str) -> Result<()> {
        self.typing_events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((peer_id.to_string(), true));
        Ok(())
    }

    async fn stop_typing(&self, peer_id: &str) -> Result<()> {
        self.typing_events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((peer_id.to_string(), false));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_adapter_captures_sends() {
        let adapter = MockAdapter::new("test");
        adapter
            .send("peer1", OutboundMessage::text("hello"))
            .await
            .unwrap();

        assert_eq!(adapter.sent_texts(), vec!["hello"]);
        assert_eq!(adapter.last_text().unwrap(), "hello");
        assert!(adapter.has_message_containing("ell"));
        assert!(!adapter.has_message_containing("bye"));
    }

    #[tokio::test]
    async fn test_mock_adapter_typing_capability() {
        let adapter = MockAdapter::new("test");
        let typing = adapter.typing_indicator().unwrap();
        typing.send_typing("peer1").await.unwrap();
        typing.stop_typing("peer1").await.unwrap();

        let events = adapter.typing_events.lock().unwrap().clone();
        assert_eq!(events, vec![("peer1".to_string(), true), ("peer1".to_string(), false)]);
    }

    #[test]
    fn test_mock_adapter_without_typing() {
        let adapter = MockAdapter::without_typing("test");
        assert!(adapter.typing_indicator().is_none());
    }
}
