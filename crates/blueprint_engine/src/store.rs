//! Debug/value store
//!
//! The single source of truth for cross-node values within a run. Three
//! run-keyed maps: published pin outputs, per-node debug records, and
//! run-level execution records. Entries are raw JSON with no pin-type tag;
//! consumers reconstruct a tagged value as `Any` and re-coerce.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Records
// ─────────────────────────────────────────────────────────────────────────────

/// A raw value with the moment it was recorded
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimedValue {
    pub value: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl TimedValue {
    pub fn now(value: serde_json::Value) -> Self {
        Self {
            value,
            timestamp: Utc::now(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Store
// ─────────────────────────────────────────────────────────────────────────────

type OutputMap = HashMap<String, HashMap<String, serde_json::Value>>;
type DebugMap = HashMap<String, HashMap<String, TimedValue>>;

/// Per-run value and debug storage, safe for concurrent writers and readers
#[derive(Default)]
pub struct DebugStore {
    /// run → node → pin → raw value
    outputs: DashMap<String, RwLock<OutputMap>>,
    /// run → node → key → timestamped record
    debug_data: DashMap<String, RwLock<DebugMap>>,
    /// run → key → timestamped record
    execution_data: DashMap<String, RwLock<HashMap<String, TimedValue>>>,
}

impl DebugStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a node output
    pub fn store_output(&self, run_id: &str, node_id: &str, pin_id: &str, raw: serde_json::Value) {
        let entry = self
            .outputs
            .entry(run_id.to_string())
            .or_insert_with(|| RwLock::new(HashMap::new()));
        entry
            .write()
            .entry(node_id.to_string())
            .or_default()
            .insert(pin_id.to_string(), raw);
    }

    /// Look up a published output; the exact (run, node, pin) key is required
    pub fn get_output(&self, run_id: &str, node_id: &str, pin_id: &str) -> Option<serde_json::Value> {
        let entry = self.outputs.get(run_id)?;
        let guard = entry.read();
        guard.get(node_id)?.get(pin_id).cloned()
    }

    /// All outputs of one node
    pub fn node_outputs(&self, run_id: &str, node_id: &str) -> HashMap<String, serde_json::Value> {
        self.outputs
            .get(run_id)
            .and_then(|entry| entry.read().get(node_id).cloned())
            .unwrap_or_default()
    }

    /// Deep-copied view of every output published during a run
    pub fn snapshot_run(&self, run_id: &str) -> OutputMap {
        self.outputs
            .get(run_id)
            .map(|entry| entry.read().clone())
            .unwrap_or_default()
    }

    /// Record a per-node debug entry
    pub fn record_debug(&self, run_id: &str, node_id: &str, key: &str, value: serde_json::Value) {
        let entry = self
            .debug_data
            .entry(run_id.to_string())
            .or_insert_with(|| RwLock::new(HashMap::new()));
        entry
            .write()
            .entry(node_id.to_string())
            .or_default()
            .insert(key.to_string(), TimedValue::now(value));
    }

    /// Deep-copied debug records for one node
    pub fn node_debug(&self, run_id: &str, node_id: &str) -> HashMap<String, TimedValue> {
        self.debug_data
            .get(run_id)
            .and_then(|entry| entry.read().get(node_id).cloned())
            .unwrap_or_default()
    }

    /// Record a run-level execution entry
    pub fn record_execution(&self, run_id: &str, key: &str, value: serde_json::Value) {
        let entry = self
            .execution_data
            .entry(run_id.to_string())
            .or_insert_with(|| RwLock::new(HashMap::new()));
        entry.write().insert(key.to_string(), TimedValue::now(value));
    }

    /// Deep-copied run-level execution records
    pub fn execution_snapshot(&self, run_id: &str) -> HashMap<String, TimedValue> {
        self.execution_data
            .get(run_id)
            .map(|entry| entry.read().clone())
            .unwrap_or_default()
    }

    /// Free every entry held for a terminated run
    pub fn clear_run(&self, run_id: &str) {
        self.outputs.remove(run_id);
        self.debug_data.remove(run_id);
        self.execution_data.remove(run_id);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
