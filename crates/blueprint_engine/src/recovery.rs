//! Error recovery
//!
//! The recovery manager holds pluggable strategies keyed by (error kind,
//! error code). Strategies are consulted after the evaluator returns, and
//! the default-value strategy additionally takes effect inline during input
//! resolution through the error-aware context. Every attempt is recorded
//! against the run.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use blueprint_types::ConnectionKind;

use crate::error::{ErrorKind, ErrorReport, codes};
use crate::evaluator::sequential;
use crate::run::RunHost;

/// Execution pin a node exposes for alternate-path routing
pub const FAIL_PIN: &str = "fail";

/// Wildcard code matching any error of a kind
pub const ANY_CODE: &str = "*";

// ─────────────────────────────────────────────────────────────────────────────
// Attempts & Outcomes
// ─────────────────────────────────────────────────────────────────────────────

/// Structured record of one recovery attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryAttempt {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    pub error_code: String,
    pub strategy: String,
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    #[serde(default)]
    pub details: serde_json::Value,
}

/// What a strategy did with an error
pub enum RecoveryOutcome {
    /// The error is handled; the run may continue as partial
    Recovered(serde_json::Value),
    /// The strategy does not apply to this error
    NotApplicable,
    /// The strategy tried and failed
    Failed(String),
}

// ─────────────────────────────────────────────────────────────────────────────
// Strategy Contract
// ─────────────────────────────────────────────────────────────────────────────

/// A pluggable recovery strategy
#[async_trait]
pub trait RecoveryStrategy: Send + Sync {
    fn name(&self) -> &str;

    async fn attempt(&self, error: &ErrorReport, host: &Arc<RunHost>) -> RecoveryOutcome;
}

// ─────────────────────────────────────────────────────────────────────────────
// Built-in Strategies
// ─────────────────────────────────────────────────────────────────────────────

/// Synthesizes zero values for missing required inputs
///
/// This strategy acts inline during input resolution (the error-aware
/// context checks for its registration); by the time the evaluator has
/// returned there is nothing left for it to do.
pub struct DefaultValueStrategy;

#[async_trait]
impl RecoveryStrategy for DefaultValueStrategy {
    fn name(&self) -> &str {
        "default-value"
    }

    async fn attempt(&self, _error: &ErrorReport, _host: &Arc<RunHost>) -> RecoveryOutcome {
        RecoveryOutcome::NotApplicable
    }
}

/// Routes a failed node down its `fail` execution pin instead of failing
pub struct AlternatePathStrategy;

#[async_trait]
impl RecoveryStrategy for AlternatePathStrategy {
    fn name(&self) -> &str {
        "alternate-path"
    }

    async fn attempt(&self, error: &ErrorReport, host: &Arc<RunHost>) -> RecoveryOutcome {
        let Some(node_id) = error.node_id.as_deref() else {
            return RecoveryOutcome::NotApplicable;
        };
        if host
            .blueprint()
            .wires_from(node_id, FAIL_PIN, ConnectionKind::Execution)
            .is_empty()
        {
            return RecoveryOutcome::NotApplicable;
        }

        tracing::info!(
            node_id = node_id,
            run_id = %host.run.run_id,
            "routing failed node down its fail pin"
        );
        match sequential::fire_successors(host, node_id, FAIL_PIN).await {
            Ok(()) => RecoveryOutcome::Recovered(serde_json::json!({"path": FAIL_PIN})),
            Err(err) => RecoveryOutcome::Failed(err.to_string()),
        }
    }
}

/// Leaves the node errored and lets the run finish as partial
pub struct SkipNodeStrategy;

#[async_trait]
impl RecoveryStrategy for SkipNodeStrategy {
    fn name(&self) -> &str {
        "skip"
    }

    async fn attempt(&self, error: &ErrorReport, _host: &Arc<RunHost>) -> RecoveryOutcome {
        match error.node_id.as_deref() {
            Some(node_id) => RecoveryOutcome::Recovered(serde_json::json!({"skipped": node_id})),
            None => RecoveryOutcome::NotApplicable,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Manager
// ─────────────────────────────────────────────────────────────────────────────

/// Holds registered strategies and applies them to collected errors
#[derive(Default)]
pub struct RecoveryManager {
    strategies: DashMap<(ErrorKind, String), Arc<dyn RecoveryStrategy>>,
}

impl RecoveryManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a strategy for an (error kind, code) pair; `ANY_CODE`
    /// matches every code of the kind
    pub fn register(
        &self,
        kind: ErrorKind,
        code: impl Into<String>,
        strategy: Arc<dyn RecoveryStrategy>,
    ) {
        self.strategies.insert((kind, code.into()), strategy);
    }

    /// Register the default-value strategy at its canonical key
    pub fn register_default_values(&self) {
        self.register(
            ErrorKind::DataType,
            codes::REQUIRED_INPUT_MISSING,
            Arc::new(DefaultValueStrategy),
        );
    }

    fn find(&self, kind: ErrorKind, code: &str) -> Option<Arc<dyn RecoveryStrategy>> {
        self.strategies
            .get(&(kind, code.to_string()))
            .or_else(|| self.strategies.get(&(kind, ANY_CODE.to_string())))
            .map(|entry| entry.value().clone())
    }

    /// Whether a strategy is registered for the pair (exact or wildcard)
    pub fn has_strategy(&self, kind: ErrorKind, code: &str) -> bool {
        self.find(kind, code).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Attempt recovery for one error; records the attempt and returns
    /// whether the error is handled
    pub async fn recover(&self, error: &ErrorReport, host: &Arc<RunHost>) -> bool {
        if !error.recoverable {
            return false;
        }
        let Some(strategy) = self.find(error.kind, &error.code) else {
            return false;
        };

        let outcome = strategy.attempt(error, host).await;
        match outcome {
            RecoveryOutcome::Recovered(details) => {
                host.run.record_recovery(RecoveryAttempt {
                    node_id: error.node_id.clone(),
                    error_code: error.code.clone(),
                    strategy: strategy.name().to_string(),
                    timestamp: Utc::now(),
                    success: true,
                    details,
                });
                true
            }
            RecoveryOutcome::Failed(reason) => {
                host.run.record_recovery(RecoveryAttempt {
                    node_id: error.node_id.clone(),
                    error_code: error.code.clone(),
                    strategy: strategy.name().to_string(),
                    timestamp: Utc::now(),
                    success: false,
                    details: serde_json::json!({"reason": reason}),
                });
                false
            }
            RecoveryOutcome::NotApplicable => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BlueprintError;

    #[test]
    fn wildcard_lookup() {
        let manager = RecoveryManager::new();
        manager.register(ErrorKind::Execution, ANY_CODE, Arc::new(SkipNodeStrategy));

        assert!(manager.has_strategy(ErrorKind::Execution, codes::NODE_EXECUTION_FAILED));
        assert!(manager.has_strategy(ErrorKind::Execution, "AnythingElse"));
        assert!(!manager.has_strategy(ErrorKind::Network, codes::NODE_EXECUTION_FAILED));
    }

    #[test]
    fn exact_beats_wildcard() {
        let manager = RecoveryManager::new();
        manager.register(ErrorKind::Execution, ANY_CODE, Arc::new(SkipNodeStrategy));
        manager.register(
            ErrorKind::Execution,
            codes::NODE_EXECUTION_FAILED,
            Arc::new(AlternatePathStrategy),
        );

        let found = manager
            .find(ErrorKind::Execution, codes::NODE_EXECUTION_FAILED)
            .unwrap();
        assert_eq!(found.name(), "alternate-path");
    }

    #[test]
    fn unrecoverable_errors_are_not_retried() {
        let report = BlueprintError::execution(codes::NODE_EXECUTION_FAILED, "x")
            .unrecoverable()
            .report();
        assert!(!report.recoverable);
    }
}
