//! Actor context
//!
//! Used by the actor evaluator. Output publication and deferred flow
//! activation land in the owning actor's firing buffers; synchronous
//! successor driving goes through the run's actor router so loop bodies
//! execute on their own actors while the caller waits.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use blueprint_types::{BlueprintNode, Value};

use super::{ContextCore, ContextInternal, ExecutionContext};
use crate::error::BlueprintError;
use crate::evaluator::actor::ActorRouter;
use crate::run::RunHost;

pub(crate) struct ActorContext {
    core: ContextCore,
    router: Arc<ActorRouter>,
}

impl ActorContext {
    pub(crate) fn new(
        host: Arc<RunHost>,
        node: BlueprintNode,
        inputs: HashMap<String, Value>,
        router: Arc<ActorRouter>,
    ) -> Self {
        Self {
            core: ContextCore::new(host, node, inputs),
            router,
        }
    }
}

#[async_trait]
impl ExecutionContext for ActorContext {
    fn get_input(&self, pin_id: &str) -> Option<Value> {
        self.core.get_input(pin_id)
    }

    fn set_output(&self, pin_id: &str, value: Value) {
        self.core.set_output(pin_id, value);
    }

    fn activate_output_flow(&self, pin_id: &str) {
        self.core.activate(pin_id);
    }

    async fn execute_connected_nodes(&self, pin_id: &str) -> Result<(), BlueprintError> {
        self.core.publish_outputs();
        self.router
            .drive_successors(&self.core.node.id, pin_id)
            .await
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

impl ContextInternal for ActorContext {
    fn core(&self) -> &ContextCore {
        &self.core
    }
}
