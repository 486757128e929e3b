//! Execution contexts
//!
//! The contract a node implementation programs against while firing. Two
//! evaluator-specific shapes (standard and actor) share one interface and
//! one buffering core; an event-handler variant merges event parameters
//! into the inputs, and an error-aware wrapper composes over any shape.

mod actor;
mod event;
mod recovery;
mod standard;

pub(crate) use actor::ActorContext;
pub use event::EventContext;
pub(crate) use recovery::RecoveringContext;
pub use standard::StandardContext;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use blueprint_types::{BlueprintNode, Value};

use crate::error::BlueprintError;
use crate::listener::EventKind;
use crate::run::RunHost;

// ─────────────────────────────────────────────────────────────────────────────
// Contract
// ─────────────────────────────────────────────────────────────────────────────

/// A buffered, timestamped debug record
///
/// Buffered during the firing; flushed to the store only when the node
/// completes successfully.
#[derive(Debug, Clone)]
pub struct DebugRecord {
    pub key: String,
    pub value: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

/// What a node sees while it executes
#[async_trait]
pub trait ExecutionContext: Send + Sync {
    /// Resolve an input pin: a wire-delivered value if present, else a
    /// literal from the node's properties. Never blocks.
    fn get_input(&self, pin_id: &str) -> Option<Value>;

    /// Publish an output value. Later writes override; the store sees the
    /// final value when the firing publishes.
    fn set_output(&self, pin_id: &str, value: Value);

    /// Defer a flow activation: the successors fire after `execute` returns.
    fn activate_output_flow(&self, pin_id: &str);

    /// Fire successors along the pin before returning. Used by loop
    /// constructs to drive their bodies.
    async fn execute_connected_nodes(&self, pin_id: &str) -> Result<(), BlueprintError>;

    /// Read a run variable
    fn get_variable(&self, name: &str) -> Option<Value>;

    /// Write a run variable
    fn set_variable(&self, name: &str, value: Value);

    /// Buffer a debug record, flushed on successful completion
    fn record_debug(&self, key: &str, value: serde_json::Value);

    fn node_id(&self) -> &str;
    fn node_type(&self) -> &str;
    fn blueprint_id(&self) -> &str;
    fn run_id(&self) -> &str;

    /// A tracing span carrying this firing's identity, for node code that
    /// wants its log lines attributed
    fn span(&self) -> tracing::Span {
        tracing::info_span!(
            "node",
            node_id = %self.node_id(),
            node_type = %self.node_type(),
            run_id = %self.run_id(),
        )
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Shared Core
// ─────────────────────────────────────────────────────────────────────────────

/// Property prefix for literal input defaults
pub const INPUT_PROPERTY_PREFIX: &str = "input_";
/// Property prefix for loop-carried literal defaults
pub const LOOP_PROPERTY_PREFIX: &str = "_loop_";
/// Property name for constant-node values
pub const CONSTANT_VALUE_PROPERTY: &str = "constantValue";

/// State shared by every context shape: resolved inputs, buffered outputs,
/// the activated-flow list and buffered debug records
pub(crate) struct ContextCore {
    pub host: Arc<RunHost>,
    pub node: BlueprintNode,
    inputs: HashMap<String, Value>,
    outputs: Mutex<Vec<(String, Value)>>,
    activated: Mutex<Vec<String>>,
    debug: Mutex<Vec<DebugRecord>>,
    /// Pins whose `value.produced` already fired this firing
    emitted: Mutex<HashSet<String>>,
}

impl ContextCore {
    pub fn new(host: Arc<RunHost>, node: BlueprintNode, inputs: HashMap<String, Value>) -> Self {
        Self {
            host,
            node,
            inputs,
            outputs: Mutex::new(Vec::new()),
            activated: Mutex::new(Vec::new()),
            debug: Mutex::new(Vec::new()),
            emitted: Mutex::new(HashSet::new()),
        }
    }

    pub fn get_input(&self, pin_id: &str) -> Option<Value> {
        if let Some(value) = self.inputs.get(pin_id) {
            return Some(value.clone());
        }
        // Literal fallbacks from node properties
        let literal = self
            .node
            .property(&format!("{INPUT_PROPERTY_PREFIX}{pin_id}"))
            .or_else(|| self.node.property(&format!("{LOOP_PROPERTY_PREFIX}{pin_id}")))
            .or_else(|| self.node.property(CONSTANT_VALUE_PROPERTY))?;
        Some(Value::infer(literal.clone()))
    }

    pub fn set_output(&self, pin_id: &str, value: Value) {
        let mut outputs = self.outputs.lock();
        if let Some(slot) = outputs.iter_mut().find(|(pin, _)| pin == pin_id) {
            slot.1 = value;
        } else {
            outputs.push((pin_id.to_string(), value));
        }
    }

    pub fn activate(&self, pin_id: &str) {
        let mut activated = self.activated.lock();
        if !activated.iter().any(|p| p == pin_id) {
            activated.push(pin_id.to_string());
        }
    }

    pub fn activated(&self) -> Vec<String> {
        self.activated.lock().clone()
    }

    pub fn record_debug(&self, key: &str, value: serde_json::Value) {
        self.debug.lock().push(DebugRecord {
            key: key.to_string(),
            value,
            timestamp: Utc::now(),
        });
    }

    pub fn drain_debug(&self) -> Vec<DebugRecord> {
        std::mem::take(&mut *self.debug.lock())
    }

    pub fn outputs_snapshot(&self) -> Vec<(String, serde_json::Value)> {
        self.outputs
            .lock()
            .iter()
            .map(|(pin, value)| (pin.clone(), value.raw().clone()))
            .collect()
    }

    /// Persist buffered outputs to the value store
    ///
    /// `value.produced` fires at most once per pin per firing, even when a
    /// loop construct publishes mid-firing and the final publication runs
    /// again.
    pub fn publish_outputs(&self) {
        let outputs: Vec<(String, Value)> = self.outputs.lock().clone();
        let run_id = &self.host.run.run_id;
        for (pin, value) in outputs {
            self.host
                .store
                .store_output(run_id, &self.node.id, &pin, value.raw().clone());
            if self.emitted.lock().insert(pin.clone()) {
                self.host.emit(
                    EventKind::ValueProduced,
                    Some(&self.node.id),
                    serde_json::json!({
                        "runId": run_id,
                        "pin": pin,
                        "value": value.raw(),
                    }),
                );
            }
        }
    }

    pub fn get_variable(&self, name: &str) -> Option<Value> {
        self.host.run.variables().get(name)
    }

    pub fn set_variable(&self, name: &str, value: Value) {
        self.host.run.variables().set(name, value);
    }
}

/// Crate-internal access to the buffering core behind a context
pub(crate) trait ContextInternal: ExecutionContext {
    fn core(&self) -> &ContextCore;
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
