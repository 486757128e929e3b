//! Shared node-firing path
//!
//! Both evaluators fire a node through this module, so input resolution,
//! lifecycle hooks, status transitions, output publication and the
//! `value.produced` emission have exactly one implementation site. The
//! evaluators differ only in how activated flows are followed afterwards.

pub(crate) mod actor;
pub(crate) mod sequential;

use std::collections::HashMap;
use std::sync::Arc;

use blueprint_types::{PinDirection, PinType, Value};

use crate::context::{
    ActorContext, ContextInternal, RecoveringContext, StandardContext,
};
use crate::error::{BlueprintError, ErrorKind, Severity, codes};
use crate::listener::EventKind;
use crate::node::Node;
use crate::run::{NodeStatus, RunHost};
use crate::variables::GET_VARIABLE_PREFIX;

// ─────────────────────────────────────────────────────────────────────────────
// Firing Modes
// ─────────────────────────────────────────────────────────────────────────────

/// How a firing's context realizes flow following
pub(crate) enum FiringMode {
    Standard {
        /// False for the variable pre-pass, whose activations are no-ops
        follow_flows: bool,
    },
    Actor(Arc<actor::ActorRouter>),
}

/// What one firing produced
pub(crate) struct FiringOutcome {
    /// Activated execution output pins, in insertion order
    pub activated: Vec<String>,
    /// Published outputs (pin, raw), in publication order
    pub outputs: Vec<(String, serde_json::Value)>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Input Resolution
// ─────────────────────────────────────────────────────────────────────────────

/// Collect a node's wire-delivered inputs
///
/// For every incoming data wire the producer's stored output is looked up
/// under the exact (run, node, pin) key. Wires whose source is a
/// `get-variable-*` node read the variable table directly, which keeps
/// variable reads fresh regardless of evaluator ordering. Absent values are
/// skipped; the context falls back to property literals.
pub(crate) fn resolve_inputs(host: &Arc<RunHost>, node_id: &str) -> HashMap<String, Value> {
    let blueprint = host.blueprint();
    let run_id = host.run.run_id.clone();
    let mut inputs = HashMap::new();

    for wire in blueprint.data_wires_into(node_id) {
        let source_node = blueprint.get_node(&wire.source_node_id);
        let variable_name = source_node
            .and_then(|n| n.node_type.strip_prefix(GET_VARIABLE_PREFIX))
            .map(str::to_string);

        let value = match variable_name {
            Some(name) => host.run.variables().get(&name),
            None => host
                .store
                .get_output(&run_id, &wire.source_node_id, &wire.source_pin_id)
                .map(Value::any),
        };

        if let Some(value) = value {
            host.emit(
                EventKind::ValueConsumed,
                Some(node_id),
                serde_json::json!({
                    "runId": run_id,
                    "pin": wire.target_pin_id,
                    "sourceNodeId": wire.source_node_id,
                    "sourcePinId": wire.source_pin_id,
                }),
            );
            inputs.insert(wire.target_pin_id.clone(), value);
        }
    }

    inputs
}

// ─────────────────────────────────────────────────────────────────────────────
// Firing
// ─────────────────────────────────────────────────────────────────────────────

/// Fire one node exactly once
///
/// Counts against the run's firing budget, resolves the factory and inputs,
/// builds the mode's context wrapped in the error-aware shell, and runs the
/// `start → (complete | error)` lifecycle.
pub(crate) async fn fire_node_once(
    host: &Arc<RunHost>,
    node_id: &str,
    extra_inputs: HashMap<String, Value>,
    mode: FiringMode,
) -> Result<FiringOutcome, BlueprintError> {
    let run = &host.run;

    if let Err(err) = run.note_firing(host.config.firing_budget) {
        run.record_error(err.report());
        return Err(err);
    }

    let Some(node_cfg) = host.blueprint().get_node(node_id).cloned() else {
        let err = BlueprintError::execution(
            codes::NODE_NOT_FOUND,
            format!("node '{node_id}' not found in blueprint"),
        )
        .with_run(&run.run_id)
        .with_node(node_id);
        run.record_error(err.report());
        return Err(err);
    };

    let Some(node) = host.registry.create(&node_cfg.node_type) else {
        let err = BlueprintError::execution(
            codes::NODE_TYPE_NOT_REGISTERED,
            format!("node type '{}' is not registered", node_cfg.node_type),
        )
        .with_severity(Severity::High)
        .with_run(&run.run_id)
        .with_node(node_id);
        run.record_error(err.report());
        return Err(err);
    };

    let mut inputs = resolve_inputs(host, node_id);
    inputs.extend(extra_inputs);

    let expected_inputs: HashMap<String, PinType> = node
        .input_pins()
        .into_iter()
        .filter(|p| p.direction == PinDirection::Input && p.pin_type.is_data())
        .map(|p| (p.id, p.pin_type))
        .collect();

    match mode {
        FiringMode::Standard { follow_flows } => {
            let ctx = if follow_flows {
                StandardContext::new(host.clone(), node_cfg, inputs)
            } else {
                StandardContext::without_flows(host.clone(), node_cfg, inputs)
            };
            run_firing(host, node, node_id, RecoveringContext::new(ctx, expected_inputs)).await
        }
        FiringMode::Actor(router) => {
            let ctx = ActorContext::new(host.clone(), node_cfg, inputs, router);
            run_firing(host, node, node_id, RecoveringContext::new(ctx, expected_inputs)).await
        }
    }
}

async fn run_firing<C: ContextInternal>(
    host: &Arc<RunHost>,
    node: Arc<dyn Node>,
    node_id: &str,
    ctx: C,
) -> Result<FiringOutcome, BlueprintError> {
    let run = &host.run;

    run.set_status(node_id, NodeStatus::Executing);
    host.emit(
        EventKind::NodeStarted,
        Some(node_id),
        serde_json::json!({"runId": run.run_id}),
    );
    tracing::debug!(
        node_id = node_id,
        node_type = %ctx.node_type(),
        run_id = %run.run_id,
        "executing node"
    );

    match node.execute(&ctx).await {
        Err(err) => {
            let err = normalize_node_error(err).contextualize(&run.run_id, node_id);
            run.set_status(node_id, NodeStatus::Error);
            run.record_error(err.report());
            host.emit(
                EventKind::NodeError,
                Some(node_id),
                serde_json::json!({
                    "runId": run.run_id,
                    "code": err.code,
                    "message": err.message,
                }),
            );
            tracing::error!(node_id = node_id, error = %err, "node execution failed");
            Err(err)
        }
        Ok(()) => {
            let core = ctx.core();
            core.publish_outputs();

            for record in core.drain_debug() {
                host.store
                    .record_debug(&run.run_id, node_id, &record.key, record.value.clone());
                host.emit(
                    EventKind::DebugData,
                    Some(node_id),
                    serde_json::json!({
                        "runId": run.run_id,
                        "key": record.key,
                        "value": record.value,
                    }),
                );
            }

            run.set_status(node_id, NodeStatus::Completed);
            host.emit(
                EventKind::NodeCompleted,
                Some(node_id),
                serde_json::json!({"runId": run.run_id}),
            );

            Ok(FiringOutcome {
                activated: core.activated(),
                outputs: core.outputs_snapshot(),
            })
        }
    }
}

/// Untyped node failures become `Execution/NodeExecutionFailed`
fn normalize_node_error(err: BlueprintError) -> BlueprintError {
    if err.kind == ErrorKind::Unknown {
        let mut wrapped = BlueprintError::execution(codes::NODE_EXECUTION_FAILED, err.message.clone());
        wrapped.severity = err.severity;
        wrapped.node_id = err.node_id.clone();
        wrapped.pin_id = err.pin_id.clone();
        wrapped.details = err.details.clone();
        wrapped.source = Some(Box::new(err));
        wrapped
    } else {
        err
    }
}
