// Blueprint Types - Core data structures for the visual dataflow system
//
// These types define the persisted shape of blueprints: nodes, pins,
// connections, variables, events and bindings. Blueprints are stored as JSON
// and are immutable after load.

use serde::{Deserialize, Serialize};

use crate::value::PinType;

// ─────────────────────────────────────────────────────────────────────────────
// Pins
// ─────────────────────────────────────────────────────────────────────────────

/// Direction of a pin on a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PinDirection {
    Input,
    Output,
}

/// Definition of a pin exposed by a node type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PinDef {
    /// Pin id (used in connections)
    pub id: String,
    /// Pin direction
    pub direction: PinDirection,
    /// Data type of the pin
    #[serde(rename = "type")]
    pub pin_type: PinType,
    /// Default value for input pins
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl PinDef {
    /// Create an execution input pin
    pub fn exec_in(id: &str) -> Self {
        Self {
            id: id.to_string(),
            direction: PinDirection::Input,
            pin_type: PinType::Execution,
            default: None,
            description: None,
        }
    }

    /// Create an execution output pin
    pub fn exec_out(id: &str) -> Self {
        Self {
            id: id.to_string(),
            direction: PinDirection::Output,
            pin_type: PinType::Execution,
            default: None,
            description: None,
        }
    }

    /// Create a data input pin
    pub fn data_in(id: &str, pin_type: PinType) -> Self {
        Self {
            id: id.to_string(),
            direction: PinDirection::Input,
            pin_type,
            default: None,
            description: None,
        }
    }

    /// Create a data output pin
    pub fn data_out(id: &str, pin_type: PinType) -> Self {
        Self {
            id: id.to_string(),
            direction: PinDirection::Output,
            pin_type,
            default: None,
            description: None,
        }
    }

    /// Attach a default value (input pins)
    pub fn with_default(mut self, default: serde_json::Value) -> Self {
        self.default = Some(default);
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Nodes
// ─────────────────────────────────────────────────────────────────────────────

/// A named static property on a node instance
///
/// Literal input defaults use the `input_<pinId>` naming; loop-carried
/// literals use `_loop_<pinId>`; constant nodes carry `constantValue`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Property {
    pub name: String,
    #[serde(default)]
    pub value: serde_json::Value,
}

impl Property {
    pub fn new(name: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Position in the visual editor
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

/// A node instance within a blueprint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlueprintNode {
    /// Unique instance id within the blueprint
    pub id: String,
    /// Node type id (resolved through the node registry)
    #[serde(rename = "type")]
    pub node_type: String,
    /// Position in the visual editor
    #[serde(default)]
    pub position: Position,
    /// Static properties (ordered)
    #[serde(default)]
    pub properties: Vec<Property>,
    /// Free-form editor data, opaque to the engine
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub data: serde_json::Value,
}

impl BlueprintNode {
    /// Create a node instance with no properties
    pub fn new(id: impl Into<String>, node_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            position: Position::default(),
            properties: Vec::new(),
            data: serde_json::Value::Null,
        }
    }

    /// Builder-style property attachment
    pub fn with_property(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.properties.push(Property::new(name, value));
        self
    }

    /// Look up a property by name
    pub fn property(&self, name: &str) -> Option<&serde_json::Value> {
        self.properties
            .iter()
            .find(|p| p.name == name)
            .map(|p| &p.value)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Connections
// ─────────────────────────────────────────────────────────────────────────────

/// Kind of wire between two pins
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionKind {
    /// Sequences control flow; carries no value
    Execution,
    /// Propagates a value; never triggers execution by itself
    Data,
}

/// A directed wire between a source pin and a target pin
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub id: String,
    pub source_node_id: String,
    pub source_pin_id: String,
    pub target_node_id: String,
    pub target_pin_id: String,
    #[serde(rename = "connectionType")]
    pub kind: ConnectionKind,
}

impl Connection {
    /// Create an execution wire
    pub fn execution(
        id: impl Into<String>,
        source_node: impl Into<String>,
        source_pin: impl Into<String>,
        target_node: impl Into<String>,
        target_pin: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            source_node_id: source_node.into(),
            source_pin_id: source_pin.into(),
            target_node_id: target_node.into(),
            target_pin_id: target_pin.into(),
            kind: ConnectionKind::Execution,
        }
    }

    /// Create a data wire
    pub fn data(
        id: impl Into<String>,
        source_node: impl Into<String>,
        source_pin: impl Into<String>,
        target_node: impl Into<String>,
        target_pin: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            source_node_id: source_node.into(),
            source_pin_id: source_pin.into(),
            target_node_id: target_node.into(),
            target_pin_id: target_pin.into(),
            kind: ConnectionKind::Data,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Variables
// ─────────────────────────────────────────────────────────────────────────────

/// A blueprint-level variable with its initial value
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    /// Pin-type id of the variable
    #[serde(rename = "type")]
    pub type_id: String,
    /// Initial value
    #[serde(default)]
    pub value: serde_json::Value,
}

impl Variable {
    pub fn new(name: impl Into<String>, type_id: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            type_id: type_id.into(),
            value,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Events
// ─────────────────────────────────────────────────────────────────────────────

/// A parameter of an event definition
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventParameter {
    pub name: String,
    pub type_id: String,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub default: serde_json::Value,
}

/// An event that handler nodes can be bound to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventDefinition {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub parameters: Vec<EventParameter>,
    #[serde(default)]
    pub category: String,
}

/// Binding of an event to a handler node
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventBinding {
    pub id: String,
    pub event_id: String,
    pub handler_id: String,
    #[serde(default)]
    pub handler_type: String,
    #[serde(default)]
    pub priority: i32,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

// ─────────────────────────────────────────────────────────────────────────────
// Blueprint
// ─────────────────────────────────────────────────────────────────────────────

/// Complete blueprint record
///
/// Immutable after load. `functions` holds nested blueprints that the engine
/// addresses as sub-blueprints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blueprint {
    pub id: String,
    pub name: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub nodes: Vec<BlueprintNode>,
    #[serde(default)]
    pub connections: Vec<Connection>,
    #[serde(default)]
    pub variables: Vec<Variable>,
    #[serde(default)]
    pub events: Vec<EventDefinition>,
    #[serde(default)]
    pub event_bindings: Vec<EventBinding>,
    #[serde(default)]
    pub functions: Vec<Blueprint>,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub metadata: serde_json::Value,
}

fn default_version() -> String {
    "1.0.0".to_string()
}

impl Blueprint {
    /// Create a new empty blueprint
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            version: default_version(),
            nodes: Vec::new(),
            connections: Vec::new(),
            variables: Vec::new(),
            events: Vec::new(),
            event_bindings: Vec::new(),
            functions: Vec::new(),
            metadata: serde_json::Value::Null,
        }
    }

    /// Get a node by id
    pub fn get_node(&self, id: &str) -> Option<&BlueprintNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Get a variable definition by name
    pub fn get_variable(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name == name)
    }

    /// All wires of a kind leaving a specific pin, in declaration order
    pub fn wires_from(&self, node_id: &str, pin_id: &str, kind: ConnectionKind) -> Vec<&Connection> {
        self.connections
            .iter()
            .filter(|c| {
                c.kind == kind && c.source_node_id == node_id && c.source_pin_id == pin_id
            })
            .collect()
    }

    /// All data wires arriving at a node, in declaration order
    pub fn data_wires_into(&self, node_id: &str) -> Vec<&Connection> {
        self.connections
            .iter()
            .filter(|c| c.kind == ConnectionKind::Data && c.target_node_id == node_id)
            .collect()
    }

    /// All execution wires leaving a node (any pin)
    pub fn execution_wires_from(&self, node_id: &str) -> Vec<&Connection> {
        self.connections
            .iter()
            .filter(|c| c.kind == ConnectionKind::Execution && c.source_node_id == node_id)
            .collect()
    }

    /// Whether a node has at least one incoming execution wire
    pub fn has_incoming_execution(&self, node_id: &str) -> bool {
        self.connections
            .iter()
            .any(|c| c.kind == ConnectionKind::Execution && c.target_node_id == node_id)
    }

    /// Nodes with no incoming execution wires, in declaration order
    ///
    /// The engine further excludes variable pre-pass nodes and event-bound
    /// handlers when selecting entry points for a run.
    pub fn nodes_without_incoming_execution(&self) -> Vec<&BlueprintNode> {
        self.nodes
            .iter()
            .filter(|n| !self.has_incoming_execution(&n.id))
            .collect()
    }

    /// Node ids referenced as event-binding handlers
    pub fn event_handler_ids(&self) -> Vec<&str> {
        self.event_bindings
            .iter()
            .map(|b| b.handler_id.as_str())
            .collect()
    }

    /// Get an event definition by id
    pub fn get_event(&self, event_id: &str) -> Option<&EventDefinition> {
        self.events.iter().find(|e| e.id == event_id)
    }

    /// Get a nested function blueprint by id
    pub fn get_function(&self, id: &str) -> Option<&Blueprint> {
        self.functions.iter().find(|f| f.id == id)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_blueprint() -> Blueprint {
        let mut bp = Blueprint::new("bp-1", "Sample");
        bp.nodes = vec![
            BlueprintNode::new("start", "flow.start"),
            BlueprintNode::new("work", "flow.work")
                .with_property("input_message", serde_json::json!("hi")),
        ];
        bp.connections = vec![
            Connection::execution("c1", "start", "out", "work", "in"),
            Connection::data("c2", "start", "value", "work", "message"),
        ];
        bp.variables = vec![Variable::new("counter", "number", serde_json::json!(0))];
        bp
    }

    #[test]
    fn graph_accessors() {
        let bp = sample_blueprint();
        assert_eq!(bp.wires_from("start", "out", ConnectionKind::Execution).len(), 1);
        assert_eq!(bp.wires_from("start", "out", ConnectionKind::Data).len(), 0);
        assert_eq!(bp.data_wires_into("work").len(), 1);
        assert!(bp.has_incoming_execution("work"));
        assert!(!bp.has_incoming_execution("start"));

        let entries = bp.nodes_without_incoming_execution();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, "start");
    }

    #[test]
    fn node_properties() {
        let bp = sample_blueprint();
        let work = bp.get_node("work").unwrap();
        assert_eq!(work.property("input_message"), Some(&serde_json::json!("hi")));
        assert_eq!(work.property("missing"), None);
    }

    #[test]
    fn blueprint_json_round_trip() {
        let json = serde_json::json!({
            "id": "bp-rt",
            "name": "Round Trip",
            "version": "2.0.0",
            "nodes": [
                {"id": "a", "type": "flow.start", "position": {"x": 0.0, "y": 0.0}, "properties": []},
                {"id": "b", "type": "flow.end", "position": {"x": 100.0, "y": 0.0},
                 "properties": [{"name": "input_x", "value": 5}]}
            ],
            "connections": [
                {"id": "c1", "sourceNodeId": "a", "sourcePinId": "out",
                 "targetNodeId": "b", "targetPinId": "in", "connectionType": "execution"}
            ],
            "variables": [{"name": "v", "type": "string", "value": "init"}],
            "events": [
                {"id": "ev", "name": "Tick",
                 "parameters": [{"name": "count", "typeId": "number", "optional": false, "default": null}],
                 "category": "system"}
            ],
            "eventBindings": [
                {"id": "eb", "eventId": "ev", "handlerId": "b", "handlerType": "node",
                 "priority": 1, "enabled": true}
            ],
            "functions": []
        });

        let bp: Blueprint = serde_json::from_value(json.clone()).unwrap();
        let back = serde_json::to_value(&bp).unwrap();
        assert_eq!(back, json);
    }
}
