// ABOUTME: Platform-agnostic routing core for courier.
// ABOUTME: Adapter traits, slash-command grammar, session keys, and the binding store.

pub mod commands;
pub mod keys;
pub mod session;
pub mod traits;
