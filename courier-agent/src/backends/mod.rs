// ABOUTME: Runtime backend implementations.
// ABOUTME: Only the mock backend is built in; real runtimes register externally.

pub mod mock;
