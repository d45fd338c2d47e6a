// ABOUTME: Registry pattern for runtime backend selection.
// ABOUTME: Backends register factories, courier creates by name from config.

use crate::runtime::AgentRuntime;
use anyhow::{anyhow, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Factory function that creates a runtime from config
pub type RuntimeFactory = Box<dyn Fn(&Value) -> Result<Arc<dyn AgentRuntime>> + Send + Sync>;

/// Registry for runtime backend selection
pub struct RuntimeRegistry {
    factories: HashMap<String, RuntimeFactory>,
}

impl RuntimeRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a runtime factory by name
    pub fn register<F>(mut self, name: &str, factory: F) -> Self
    where
        F: Fn(&Value) -> Result<Arc<dyn AgentRuntime>> + Send + Sync + 'static,
    {
        self.factories.insert(name.to_string(), Box::new(factory));
        self
    }

    /// Create a runtime by name with the given config
    pub fn create(&self, name: &str, config: &Value) -> Result<Arc<dyn AgentRuntime>> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| anyhow!("Unknown runtime backend: {}", name))?;
        factory(config)
    }

    /// List available backend names
    pub fn available(&self) -> Vec<&str> {
        self.factories.keys().map(|s| s.as_str()).collect()
    }
}

impl Default for RuntimeRegistry {
    fn default() -> Self {
        use crate::backends::mock::MockRuntime;

        Self::new().register("mock", MockRuntime::factory())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry_has_mock() {
        let registry = RuntimeRegistry::default();
        assert!(registry.available().contains(&"mock"));
    }

    #[test]
    fn test_unknown_backend_errors() {
        let registry = RuntimeRegistry::new();
        let err = registry
            .create("nope", &serde_json::json!({}))
            .err()
            .unwrap();
        assert!(err.to_string().contains("Unknown runtime backend"));
    }

    #[test]
    fn test_create_mock_from_default_registry() {
        let registry = RuntimeRegistry::default();
        let runtime = registry.create("mock", &serde_json::json!({})).unwrap();
        assert_eq!(runtime.name(), "mock");
    }
}
