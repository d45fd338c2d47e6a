// ABOUTME: Session key resolution for conversations and peers.
// ABOUTME: Pure functions mapping (channel, peer, thread) to stable string keys.

/// Stable key for one logical conversation: `<channel>:<peer>` with a
/// `:thread:<id>` suffix when the channel scopes conversations by thread.
///
/// Deterministic and side-effect free; identical inputs always produce the
/// identical key.
pub fn conversation_key(
    channel: &str,
    peer: &str,
    thread_scoped: bool,
    thread_id: Option<&str>,
) -> String {
    match thread_id {
        Some(thread) if thread_scoped => format!("{}:{}:thread:{}", channel, peer, thread),
        _ => format!("{}:{}", channel, peer),
    }
}

/// Key for a peer within a channel, ignoring threads.
///
/// Turn tracking and question rendezvous use this coarser key: one active
/// turn per peer regardless of which thread it came from.
pub fn peer_key(channel: &str, peer: &str) -> String {
    format!("{}:{}", channel, peer)
}
