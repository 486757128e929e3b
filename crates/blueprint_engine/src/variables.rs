//! Variables
//!
//! A variable is (name, type, cell): setter nodes write the cell, getter
//! nodes read it on each firing. The per-run table serializes concurrent
//! writers; last writer wins, with no deterministic order between racing
//! setters. The pre-pass executes setters then getters once each before the
//! main flow, so every downstream node observes initial values regardless of
//! evaluator.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use blueprint_types::{PinDef, PinType, Value};

use crate::context::ExecutionContext;
use crate::error::BlueprintError;
use crate::evaluator::{FiringMode, fire_node_once};
use crate::node::{Node, NodeMetadata};
use crate::run::RunHost;

/// Type-id prefix of variable setter nodes
pub const SET_VARIABLE_PREFIX: &str = "set-variable-";
/// Type-id prefix of variable getter nodes
pub const GET_VARIABLE_PREFIX: &str = "get-variable-";

/// Whether a node type belongs to the variable pre-pass
pub fn is_variable_node_type(type_id: &str) -> bool {
    type_id.starts_with(SET_VARIABLE_PREFIX) || type_id.starts_with(GET_VARIABLE_PREFIX)
}

// ─────────────────────────────────────────────────────────────────────────────
// Variable Table
// ─────────────────────────────────────────────────────────────────────────────

/// Per-run variable binding table
#[derive(Default)]
pub struct VariableTable {
    cells: RwLock<HashMap<String, Value>>,
}

impl VariableTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.cells.read().get(name).cloned()
    }

    /// Write a variable cell. Concurrent writers serialize on the table
    /// lock; the final order between racing setters is unspecified.
    pub fn set(&self, name: &str, value: Value) {
        self.cells.write().insert(name.to_string(), value);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.cells.read().contains_key(name)
    }

    pub fn snapshot(&self) -> HashMap<String, Value> {
        self.cells.read().clone()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Variable Nodes
// ─────────────────────────────────────────────────────────────────────────────

/// Setter node for one named variable; type id `set-variable-<name>`
pub struct SetVariableNode {
    name: String,
    pin_type: PinType,
}

impl SetVariableNode {
    pub fn new(name: impl Into<String>, pin_type: PinType) -> Self {
        Self {
            name: name.into(),
            pin_type,
        }
    }
}

#[async_trait]
impl Node for SetVariableNode {
    fn metadata(&self) -> NodeMetadata {
        NodeMetadata::new(
            format!("{SET_VARIABLE_PREFIX}{}", self.name),
            format!("Set {}", self.name),
        )
        .with_category("Variables")
    }

    fn input_pins(&self) -> Vec<PinDef> {
        vec![
            PinDef::exec_in("in"),
            PinDef::data_in("value", self.pin_type.clone()),
        ]
    }

    fn output_pins(&self) -> Vec<PinDef> {
        vec![
            PinDef::exec_out("out"),
            PinDef::data_out("value", self.pin_type.clone()),
        ]
    }

    async fn execute(&self, ctx: &dyn ExecutionContext) -> Result<(), BlueprintError> {
        let value = ctx
            .get_input("value")
            .unwrap_or_else(|| Value::nil(self.pin_type.clone()));
        ctx.set_variable(&self.name, value.clone());
        ctx.set_output("value", value);
        ctx.activate_output_flow("out");
        Ok(())
    }
}

/// Getter node for one named variable; type id `get-variable-<name>`
pub struct GetVariableNode {
    name: String,
    pin_type: PinType,
}

impl GetVariableNode {
    pub fn new(name: impl Into<String>, pin_type: PinType) -> Self {
        Self {
            name: name.into(),
            pin_type,
        }
    }
}

#[async_trait]
impl Node for GetVariableNode {
    fn metadata(&self) -> NodeMetadata {
        NodeMetadata::new(
            format!("{GET_VARIABLE_PREFIX}{}", self.name),
            format!("Get {}", self.name),
        )
        .with_category("Variables")
    }

    fn input_pins(&self) -> Vec<PinDef> {
        vec![PinDef::exec_in("in")]
    }

    fn output_pins(&self) -> Vec<PinDef> {
        vec![
            PinDef::exec_out("out"),
            PinDef::data_out("value", self.pin_type.clone()),
        ]
    }

    async fn execute(&self, ctx: &dyn ExecutionContext) -> Result<(), BlueprintError> {
        let value = ctx
            .get_variable(&self.name)
            .unwrap_or_else(|| Value::nil(self.pin_type.clone()));
        ctx.set_output("value", value);
        ctx.activate_output_flow("out");
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Pre-pass
// ─────────────────────────────────────────────────────────────────────────────

/// Execute setters then getters, once each, before the main flow
///
/// Each node fires in a context whose flow activation is a no-op; outputs
/// land in the store, setter writes land in the variable table.
pub(crate) async fn run_prepass(host: &Arc<RunHost>) -> Result<(), BlueprintError> {
    let blueprint = host.blueprint().clone();

    let setters: Vec<String> = blueprint
        .nodes
        .iter()
        .filter(|n| n.node_type.starts_with(SET_VARIABLE_PREFIX))
        .map(|n| n.id.clone())
        .collect();
    let getters: Vec<String> = blueprint
        .nodes
        .iter()
        .filter(|n| n.node_type.starts_with(GET_VARIABLE_PREFIX))
        .map(|n| n.id.clone())
        .collect();

    for node_id in setters.iter().chain(getters.iter()) {
        fire_node_once(
            host,
            node_id,
            HashMap::new(),
            FiringMode::Standard { follow_flows: false },
        )
        .await?;
    }

    if !setters.is_empty() || !getters.is_empty() {
        tracing::debug!(
            run_id = %host.run.run_id,
            setters = setters.len(),
            getters = getters.len(),
            "variable pre-pass complete"
        );
    }
    Ok(())
}
