//! Engine configuration
//!
//! Tunables for both evaluators: mailbox sizing, the three actor-mode
//! timeouts, the per-run firing budget, and the default execution mode.
//! Loadable from TOML; every field has a default.

use std::time::Duration;

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Execution Mode
// ─────────────────────────────────────────────────────────────────────────────

/// Which evaluator drives a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// Sequential depth-first evaluator
    #[default]
    Standard,
    /// Actor-per-node evaluator
    Actor,
}

impl std::fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionMode::Standard => write!(f, "standard"),
            ExecutionMode::Actor => write!(f, "actor"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Engine Config
// ─────────────────────────────────────────────────────────────────────────────

/// Configuration for the execution engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Default evaluator for new runs
    pub mode: ExecutionMode,
    /// Actor mailbox capacity
    pub mailbox_capacity: usize,
    /// Time allowed to enqueue a synchronous actor message (ms)
    pub enqueue_timeout_ms: u64,
    /// Time allowed for an actor to reply to a synchronous send (ms)
    pub reply_timeout_ms: u64,
    /// Wall-clock limit for a whole actor-mode run (ms)
    pub run_timeout_ms: u64,
    /// Maximum node firings per run; the cycle backstop
    pub firing_budget: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::Standard,
            mailbox_capacity: 50,
            enqueue_timeout_ms: 1_000,
            reply_timeout_ms: 5_000,
            run_timeout_ms: 30_000,
            firing_budget: 10_000,
        }
    }
}

/// Errors loading an engine configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

impl EngineConfig {
    /// Parse a TOML document; absent fields take their defaults
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(input)?)
    }

    /// Load from a TOML file
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    pub fn enqueue_timeout(&self) -> Duration {
        Duration::from_millis(self.enqueue_timeout_ms)
    }

    pub fn reply_timeout(&self) -> Duration {
        Duration::from_millis(self.reply_timeout_ms)
    }

    pub fn run_timeout(&self) -> Duration {
        Duration::from_millis(self.run_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.mode, ExecutionMode::Standard);
        assert_eq!(config.mailbox_capacity, 50);
        assert_eq!(config.run_timeout(), Duration::from_secs(30));
        assert_eq!(config.firing_budget, 10_000);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
            mode = "actor"
            firing_budget = 500
            "#,
        )
        .unwrap();
        assert_eq!(config.mode, ExecutionMode::Actor);
        assert_eq!(config.firing_budget, 500);
        assert_eq!(config.mailbox_capacity, 50);
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(EngineConfig::from_toml_str("mode = 5").is_err());
    }
}
