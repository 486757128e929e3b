//! Error-aware context wrapper
//!
//! Composes over either context shape. When a default-value recovery
//! strategy is registered, `get_input` synthesizes a zero value of the
//! declared pin type for inputs that resolved to nothing, so the node
//! observes the default as if it came from a wire. Also exposes explicit
//! error reporting and recovery entry points to node code.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;

use blueprint_types::{PinType, Value};

use super::{ContextCore, ContextInternal, ExecutionContext};
use crate::error::{BlueprintError, ErrorKind, codes};
use crate::recovery::RecoveryAttempt;

pub(crate) struct RecoveringContext<C: ContextInternal> {
    inner: C,
    /// Declared data input pins and their types, from the node contract
    expected_inputs: HashMap<String, PinType>,
}

impl<C: ContextInternal> RecoveringContext<C> {
    pub(crate) fn new(inner: C, expected_inputs: HashMap<String, PinType>) -> Self {
        Self {
            inner,
            expected_inputs,
        }
    }

    fn synthesize_default(&self, pin_id: &str) -> Option<Value> {
        let host = &self.inner.core().host;
        if !host
            .recovery
            .has_strategy(ErrorKind::DataType, codes::REQUIRED_INPUT_MISSING)
        {
            return None;
        }
        let pin_type = self.expected_inputs.get(pin_id)?;
        let default = host.pin_types.default_value(pin_type);
        let value = Value::new(pin_type.clone(), default).ok()?;

        host.run.record_recovery(RecoveryAttempt {
            node_id: Some(self.inner.node_id().to_string()),
            error_code: codes::REQUIRED_INPUT_MISSING.to_string(),
            strategy: "default-value".to_string(),
            timestamp: Utc::now(),
            success: true,
            details: serde_json::json!({
                "pin": pin_id,
                "synthesized": value.raw(),
            }),
        });
        tracing::debug!(
            node_id = %self.inner.node_id(),
            pin = pin_id,
            "synthesized default for missing input"
        );
        Some(value)
    }

    /// Record an error against the run without failing the firing
    #[allow(dead_code)]
    pub(crate) fn report_error(&self, error: &BlueprintError) {
        self.inner.core().host.run.record_error(error.report());
    }

    /// Ask the recovery manager to handle an error now
    #[allow(dead_code)]
    pub(crate) async fn attempt_recovery(&self, error: &BlueprintError) -> bool {
        let host = &self.inner.core().host;
        let recovery = host.recovery.clone();
        recovery.recover(&error.report(), host).await
    }
}

#[async_trait]
impl<C: ContextInternal> ExecutionContext for RecoveringContext<C> {
    fn get_input(&self, pin_id: &str) -> Option<Value> {
        self.inner
            .get_input(pin_id)
            .or_else(|| self.synthesize_default(pin_id))
    }

    fn set_output(&self, pin_id: &str, value: Value) {
        self.inner.set_output(pin_id, value);
    }

    fn activate_output_flow(&self, pin_id: &str) {
        self.inner.activate_output_flow(pin_id);
    }

    async fn execute_connected_nodes(&self, pin_id: &str) -> Result<(), BlueprintError> {
        self.inner.execute_connected_nodes(pin_id).await
    }

    fn get_variable(&self, name: &str) -> Option<Value> {
        self.inner.get_variable(name)
    }

    fn set_variable(&self, name: &str, value: Value) {
        self.inner.set_variable(name, value);
    }

    fn record_debug(&self, key: &str, value: serde_json::Value) {
        self.inner.record_debug(key, value);
    }

    fn node_id(&self) -> &str {
        self.inner.node_id()
    }

    fn node_type(&self) -> &str {
        self.inner.node_type()
    }

    fn blueprint_id(&self) -> &str {
        self.inner.blueprint_id()
    }

    fn run_id(&self) -> &str {
        self.inner.run_id()
    }
}

impl<C: ContextInternal> ContextInternal for RecoveringContext<C> {
    fn core(&self) -> &ContextCore {
        self.inner.core()
    }
}
