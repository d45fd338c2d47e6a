// ABOUTME: Console adapter reading stdin lines and printing outbound messages.
// ABOUTME: Makes the bridge locally usable end-to-end without an external platform.

use anyhow::Result;
use async_trait::async_trait;
use courier_core::traits::{ChannelAdapter, InboundMessage, InboundStream, OutboundMessage};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// Peer id used for the local console user
const CONSOLE_PEER: &str = "local";

/// Stdin/stdout adapter for local use. One peer, no threads, no typing
/// indicator.
pub struct ConsoleAdapter;

impl ConsoleAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ConsoleAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChannelAdapter for ConsoleAdapter {
    fn channel_id(&self) -> &'static str {
        "console"
    }

    async fn start(&self) -> Result<InboundStream> {
        let (tx, rx) = mpsc::channel(32);

        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        if line.trim().is_empty() {
                            continue;
                        }
                        let msg = InboundMessage {
                            channel: "console".to_string(),
                            peer: CONSOLE_PEER.to_string(),
                            thread_id: None,
                            body: line,
                            event_id: None,
                        };
                        if tx.send(msg).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to read from stdin");
                        break;
                    }
                }
            }
        });

        Ok(Box::pin(ReceiverStream::new(rx)))
    }

    async fn stop(&self) -> Result<()> {
        Ok(())
    }

    async fn send(&self, _peer_id: &str, message: OutboundMessage) -> Result<()> {
        let mut stdout = tokio::io::stdout();
        stdout
            .write_all(format!("{}\n", message.text).as_bytes())
            .await?;
        stdout.flush().await?;
        Ok(())
    }
}
