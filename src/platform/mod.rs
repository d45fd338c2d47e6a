// ABOUTME: Built-in channel adapters.
// ABOUTME: Real platform adapters implement courier_core::traits::ChannelAdapter externally.

pub mod console;
pub mod mock;

pub use console::ConsoleAdapter;
pub use mock::MockAdapter;
