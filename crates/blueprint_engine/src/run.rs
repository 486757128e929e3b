//! Per-run state and results
//!
//! A run owns everything mutable that exists only between Execute and the
//! returned result: the variable table, per-node statuses, collected errors
//! and recovery attempts, and the firing counter that backs the cycle
//! budget. The [`RunHost`] bundles the run with the process-wide services
//! the evaluators need.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use blueprint_types::{Blueprint, PinTypeRegistry};

use crate::config::EngineConfig;
use crate::error::{BlueprintError, ErrorAnalysis, ErrorKind, ErrorReport, Severity, codes};
use crate::listener::{EventKind, ExecutionEvent, ListenerSet};
use crate::recovery::{RecoveryAttempt, RecoveryManager};
use crate::registry::NodeRegistry;
use crate::store::DebugStore;
use crate::variables::VariableTable;

// ─────────────────────────────────────────────────────────────────────────────
// Statuses
// ─────────────────────────────────────────────────────────────────────────────

/// Lifecycle of one node within a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Idle,
    Executing,
    Completed,
    Error,
}

/// Lifecycle of a whole run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
    Partial,
}

// ─────────────────────────────────────────────────────────────────────────────
// Run State
// ─────────────────────────────────────────────────────────────────────────────

/// Mutable state owned by one run
pub struct RunState {
    pub run_id: String,
    pub blueprint: Arc<Blueprint>,
    pub started_at: DateTime<Utc>,
    variables: VariableTable,
    statuses: DashMap<String, NodeStatus>,
    errors: Mutex<Vec<ErrorReport>>,
    recovery_attempts: Mutex<Vec<RecoveryAttempt>>,
    firings: AtomicU64,
}

impl RunState {
    pub fn new(run_id: impl Into<String>, blueprint: Arc<Blueprint>) -> Self {
        let statuses = DashMap::new();
        for node in &blueprint.nodes {
            statuses.insert(node.id.clone(), NodeStatus::Idle);
        }
        Self {
            run_id: run_id.into(),
            blueprint,
            started_at: Utc::now(),
            variables: VariableTable::new(),
            statuses,
            errors: Mutex::new(Vec::new()),
            recovery_attempts: Mutex::new(Vec::new()),
            firings: AtomicU64::new(0),
        }
    }

    /// The run's variable table
    pub fn variables(&self) -> &VariableTable {
        &self.variables
    }

    pub fn set_status(&self, node_id: &str, status: NodeStatus) {
        self.statuses.insert(node_id.to_string(), status);
    }

    pub fn status_of(&self, node_id: &str) -> NodeStatus {
        self.statuses
            .get(node_id)
            .map(|s| *s)
            .unwrap_or(NodeStatus::Idle)
    }

    /// Node ids that ended in error, in blueprint declaration order
    pub fn failed_nodes(&self) -> Vec<String> {
        self.blueprint
            .nodes
            .iter()
            .filter(|n| self.status_of(&n.id) == NodeStatus::Error)
            .map(|n| n.id.clone())
            .collect()
    }

    /// Node ids that completed, in blueprint declaration order
    pub fn successful_nodes(&self) -> Vec<String> {
        self.blueprint
            .nodes
            .iter()
            .filter(|n| self.status_of(&n.id) == NodeStatus::Completed)
            .map(|n| n.id.clone())
            .collect()
    }

    pub fn record_error(&self, report: ErrorReport) {
        self.errors.lock().push(report);
    }

    pub fn errors(&self) -> Vec<ErrorReport> {
        self.errors.lock().clone()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.lock().is_empty()
    }

    pub fn record_recovery(&self, attempt: RecoveryAttempt) {
        self.recovery_attempts.lock().push(attempt);
    }

    pub fn recovery_attempts(&self) -> Vec<RecoveryAttempt> {
        self.recovery_attempts.lock().clone()
    }

    /// Count a firing against the run's budget
    pub fn note_firing(&self, budget: u64) -> Result<(), BlueprintError> {
        let fired = self.firings.fetch_add(1, Ordering::SeqCst) + 1;
        if fired > budget {
            return Err(BlueprintError::new(
                ErrorKind::Execution,
                codes::FIRING_BUDGET_EXCEEDED,
                format!("run exceeded its firing budget of {budget}"),
            )
            .with_severity(Severity::Critical)
            .with_run(&self.run_id)
            .unrecoverable());
        }
        Ok(())
    }

    pub fn firings(&self) -> u64 {
        self.firings.load(Ordering::SeqCst)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Run Host
// ─────────────────────────────────────────────────────────────────────────────

/// Everything an evaluator needs to drive one run
pub struct RunHost {
    pub config: EngineConfig,
    pub registry: Arc<NodeRegistry>,
    pub pin_types: Arc<PinTypeRegistry>,
    pub store: Arc<DebugStore>,
    pub listeners: Arc<ListenerSet>,
    pub recovery: Arc<RecoveryManager>,
    pub run: Arc<RunState>,
}

impl RunHost {
    pub fn blueprint(&self) -> &Arc<Blueprint> {
        &self.run.blueprint
    }

    /// Emit a lifecycle event to the listener set
    pub fn emit(&self, kind: EventKind, node_id: Option<&str>, data: serde_json::Value) {
        let mut event = ExecutionEvent::new(kind, data);
        if let Some(id) = node_id {
            event = event.with_node(id);
        }
        self.listeners.emit(&event);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Results
// ─────────────────────────────────────────────────────────────────────────────

/// An issue found by pre-execution static validation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationIssue {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_id: Option<String>,
}

/// The outcome of one run, returned by the facade
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partial_success: Option<bool>,
    pub run_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorReport>,
    /// node → pin → raw value
    pub node_results: HashMap<String, HashMap<String, serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_analysis: Option<ErrorAnalysis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recovery_attempts: Option<Vec<RecoveryAttempt>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_results: Option<Vec<ValidationIssue>>,
    pub failed_nodes: Vec<String>,
    pub successful_nodes: Vec<String>,
}

impl RunResult {
    /// Result pin value helper for callers inspecting outputs
    pub fn output(&self, node_id: &str, pin_id: &str) -> Option<&serde_json::Value> {
        self.node_results.get(node_id)?.get(pin_id)
    }
}
