//! Standard context
//!
//! Used by the sequential evaluator and the variable pre-pass. Flow
//! activation is recorded in the core; `execute_connected_nodes` publishes
//! the outputs buffered so far and drives successors depth-first inline.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use blueprint_types::{BlueprintNode, Value};

use super::{ContextCore, ContextInternal, ExecutionContext};
use crate::error::BlueprintError;
use crate::evaluator::sequential;
use crate::run::RunHost;

pub struct StandardContext {
    core: ContextCore,
    /// Pre-pass contexts keep flow activation a no-op
    follow_flows: bool,
}

impl StandardContext {
    pub(crate) fn new(
        host: Arc<RunHost>,
        node: BlueprintNode,
        inputs: HashMap<String, Value>,
    ) -> Self {
        Self {
            core: ContextCore::new(host, node, inputs),
            follow_flows: true,
        }
    }

    /// A context whose flow activation does nothing (variable pre-pass)
    pub(crate) fn without_flows(
        host: Arc<RunHost>,
        node: BlueprintNode,
        inputs: HashMap<String, Value>,
    ) -> Self {
        Self {
            core: ContextCore::new(host, node, inputs),
            follow_flows: false,
        }
    }
}

#[async_trait]
impl ExecutionContext for StandardContext {
    fn get_input(&self, pin_id: &str) -> Option<Value> {
        self.core.get_input(pin_id)
    }

    fn set_output(&self, pin_id: &str, value: Value) {
        self.core.set_output(pin_id, value);
    }

    fn activate_output_flow(&self, pin_id: &str) {
        if self.follow_flows {
            self.core.activate(pin_id);
        }
    }

    async fn execute_connected_nodes(&self, pin_id: &str) -> Result<(), BlueprintError> {
        if !self.follow_flows {
            return Ok(());
        }
        // Publish what the node has produced so far, so driven successors
        // observe the current iteration's values.
        self.core.publish_outputs();
        sequential::fire_successors(&self.core.host, &self.core.node.id, pin_id).await
    }

    fn get_variable(&self, name: &str) -> Option<Value> {
        self.core.get_variable(name)
    }

    fn set_variable(&self, name: &str, value: Value) {
        self.core.set_variable(name, value);
    }

    fn record_debug(&self, key: &str, value: serde_json::Value) {
        self.core.record_debug(key, value);
    }

    fn node_id(&self) -> &str {
        &self.core.node.id
    }

    fn node_type(&self) -> &str {
        &self.core.node.node_type
    }

    fn blueprint_id(&self) -> &str {
        &self.core.host.run.blueprint.id
    }

    fn run_id(&self) -> &str {
        &self.core.host.run.run_id
    }
}

impl ContextInternal for StandardContext {
    fn core(&self) -> &ContextCore {
        &self.core
    }
}
