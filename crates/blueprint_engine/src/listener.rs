//! Execution lifecycle events and listeners
//!
//! Listeners observe a run from the outside: start/end, per-node lifecycle,
//! value production/consumption and debug records. The wire format is
//! `{type, timestamp, nodeId?, data}`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Event Kinds
// ─────────────────────────────────────────────────────────────────────────────

/// The eight lifecycle event types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ExecutionStart,
    ExecutionEnd,
    NodeStarted,
    NodeCompleted,
    NodeError,
    ValueProduced,
    ValueConsumed,
    DebugData,
}

impl EventKind {
    /// Dotted type string used on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::ExecutionStart => "execution.start",
            EventKind::ExecutionEnd => "execution.end",
            EventKind::NodeStarted => "node.started",
            EventKind::NodeCompleted => "node.completed",
            EventKind::NodeError => "node.error",
            EventKind::ValueProduced => "value.produced",
            EventKind::ValueConsumed => "value.consumed",
            EventKind::DebugData => "debug.data",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for EventKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EventKind {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        match s.as_str() {
            "execution.start" => Ok(EventKind::ExecutionStart),
            "execution.end" => Ok(EventKind::ExecutionEnd),
            "node.started" => Ok(EventKind::NodeStarted),
            "node.completed" => Ok(EventKind::NodeCompleted),
            "node.error" => Ok(EventKind::NodeError),
            "value.produced" => Ok(EventKind::ValueProduced),
            "value.consumed" => Ok(EventKind::ValueConsumed),
            "debug.data" => Ok(EventKind::DebugData),
            other => Err(serde::de::Error::custom(format!(
                "unknown event type: {other}"
            ))),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Events
// ─────────────────────────────────────────────────────────────────────────────

/// A lifecycle event emitted to listeners
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "nodeId", default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl ExecutionEvent {
    /// Create an event stamped with the current time
    pub fn new(kind: EventKind, data: serde_json::Value) -> Self {
        Self {
            kind,
            timestamp: Utc::now(),
            node_id: None,
            data,
        }
    }

    /// Attach node attribution
    pub fn with_node(mut self, node_id: impl Into<String>) -> Self {
        self.node_id = Some(node_id.into());
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Listeners
// ─────────────────────────────────────────────────────────────────────────────

/// Observer of execution lifecycle events
pub trait ExecutionListener: Send + Sync {
    fn on_event(&self, event: &ExecutionEvent);
}

/// A set of listeners
///
/// Registration is rare; emission clones the listener slice under the read
/// lock and iterates without holding it.
#[derive(Default)]
pub struct ListenerSet {
    listeners: RwLock<Vec<Arc<dyn ExecutionListener>>>,
}

impl ListenerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener
    pub fn add(&self, listener: Arc<dyn ExecutionListener>) {
        self.listeners.write().push(listener);
    }

    /// Emit an event to every registered listener
    pub fn emit(&self, event: &ExecutionEvent) {
        let listeners = self.listeners.read().clone();
        for listener in listeners {
            listener.on_event(event);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.read().is_empty()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
