// ABOUTME: Configuration parsing from TOML file with environment variable overrides.
// ABOUTME: Validates required fields and provides sensible defaults for optional ones.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub runtime: RuntimeConfig,
    #[serde(default)]
    pub router: RouterConfig,
    #[serde(default)]
    pub progress: ProgressConfig,
    #[serde(default)]
    pub channels: ChannelsConfig,
}

/// Agent runtime backend selection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Backend name resolved through the runtime registry
    #[serde(default = "default_backend", rename = "type")]
    pub backend_type: String,
    /// Remaining fields passed to the backend factory
    #[serde(flatten)]
    pub options: toml::Table,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Overall per-turn deadline in seconds; also bounds question waits
    #[serde(default = "default_turn_timeout_secs")]
    pub turn_timeout_secs: u64,
    /// Permitted senders as "peer" or "channel:peer"; empty allows everyone
    #[serde(default)]
    pub allowed_peers: Vec<String>,
    /// What to do with messages from non-permitted senders
    #[serde(default)]
    pub allowlist_action: AllowlistAction,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AllowlistAction {
    /// Drop the message without replying
    #[default]
    Silent,
    /// Send a fixed rejection reply
    Notify,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressConfig {
    /// Whether to narrate tool activity, heartbeats, and questions
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Minimum gap between tool-activity notices, across all tools
    #[serde(default = "default_tool_throttle_ms")]
    pub tool_throttle_ms: u64,
    /// Silence threshold before a still-working heartbeat
    #[serde(default = "default_heartbeat_ms")]
    pub heartbeat_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelsConfig {
    /// Channels whose conversations are scoped per thread
    #[serde(default)]
    pub thread_scoped: Vec<String>,
    /// Whether to run the built-in console adapter
    #[serde(default = "default_true")]
    pub console: bool,
}

fn default_backend() -> String {
    "mock".to_string()
}

fn default_turn_timeout_secs() -> u64 {
    600
}

fn default_tool_throttle_ms() -> u64 {
    5_000
}

fn default_heartbeat_ms() -> u64 {
    60_000
}

fn default_true() -> bool {
    true
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            backend_type: default_backend(),
            options: toml::Table::new(),
        }
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            turn_timeout_secs: default_turn_timeout_secs(),
            allowed_peers: Vec::new(),
            allowlist_action: AllowlistAction::default(),
        }
    }
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tool_throttle_ms: default_tool_throttle_ms(),
            heartbeat_ms: default_heartbeat_ms(),
        }
    }
}

impl Default for ChannelsConfig {
    fn default() -> Self {
        Self {
            thread_scoped: Vec::new(),
            console: true,
        }
    }
}

impl Config {
    /// Load configuration from the default config file with environment
    /// variable overrides
    pub fn load() -> Result<Self> {
        let default_path = crate::paths::config_file();
        let path = if default_path.exists() {
            default_path
        } else {
            std::path::PathBuf::from("config.toml")
        };
        Self::load_from(&path)
    }

    /// Load configuration from a specific TOML file (missing file is fine;
    /// defaults apply) with environment variable overrides
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            Self::parse(&content)?
        } else {
            Config::default()
        };

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config TOML")
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(val) = std::env::var("COURIER_RUNTIME") {
            self.runtime.backend_type = val;
        }
        if let Ok(val) = std::env::var("COURIER_TURN_TIMEOUT_SECS") {
            self.router.turn_timeout_secs = val.parse().with_context(|| {
                format!("COURIER_TURN_TIMEOUT_SECS must be a number, got: {}", val)
            })?;
        }
        if let Ok(val) = std::env::var("COURIER_ALLOWED_PEERS") {
            self.router.allowed_peers = val
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Ok(val) = std::env::var("COURIER_PROGRESS") {
            self.progress.enabled = matches!(val.as_str(), "1" | "true" | "on");
        }
        if let Ok(val) = std::env::var("COURIER_TOOL_THROTTLE_MS") {
            self.progress.tool_throttle_ms = val.parse().with_context(|| {
                format!("COURIER_TOOL_THROTTLE_MS must be a number, got: {}", val)
            })?;
        }
        if let Ok(val) = std::env::var("COURIER_HEARTBEAT_MS") {
            self.progress.heartbeat_ms = val
                .parse()
                .with_context(|| format!("COURIER_HEARTBEAT_MS must be a number, got: {}", val))?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.router.turn_timeout_secs == 0 {
            anyhow::bail!("router.turn_timeout_secs must be greater than zero");
        }
        if self.progress.tool_throttle_ms == 0 {
            anyhow::bail!("progress.tool_throttle_ms must be greater than zero");
        }
        if self.progress.heartbeat_ms == 0 {
            anyhow::bail!("progress.heartbeat_ms must be greater than zero");
        }
        self.router.allowed_peers.iter().try_for_each(|entry| {
            if entry.trim().is_empty() {
                anyhow::bail!("router.allowed_peers entries must not be blank");
            }
            Ok(())
        })
    }

    /// Whether a sender is permitted. Entries match the bare peer id or the
    /// scoped "channel:peer" form; an empty list permits everyone.
    pub fn is_peer_allowed(&self, channel: &str, peer: &str) -> bool {
        if self.router.allowed_peers.is_empty() {
            return true;
        }
        let allowed: HashSet<&str> = self
            .router
            .allowed_peers
            .iter()
            .map(|s| s.as_str())
            .collect();
        allowed.contains(peer) || allowed.contains(format!("{}:{}", channel, peer).as_str())
    }

    /// Whether a channel scopes conversations per thread
    pub fn thread_scoped(&self, channel: &str) -> bool {
        self.channels.thread_scoped.iter().any(|c| c == channel)
    }

    pub fn turn_timeout(&self) -> Duration {
        Duration::from_secs(self.router.turn_timeout_secs)
    }

    pub fn tool_throttle(&self) -> Duration {
        Duration::from_millis(self.progress.tool_throttle_ms)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.progress.heartbeat_ms)
    }

    /// Runtime options as JSON for the registry factory
    pub fn runtime_options(&self) -> serde_json::Value {
        let json_str = serde_json::to_string(&self.runtime.options).unwrap_or_default();
        serde_json::from_str(&json_str).unwrap_or(serde_json::json!({}))
    }
}
