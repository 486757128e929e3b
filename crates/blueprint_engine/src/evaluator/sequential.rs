// Sequential Evaluator - Recursive depth-first firing
//
// One worker per entry point; within an entry, activated flows are followed
// depth-first in insertion order. Recursion goes through boxed futures, the
// same shape a recursive async graph walk takes anywhere in this codebase.

use std::collections::HashMap;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;

use blueprint_types::{ConnectionKind, Value};

use super::{FiringMode, fire_node_once};
use crate::error::{BlueprintError, Severity, codes};
use crate::run::RunHost;

/// Run every entry point in parallel and aggregate errors (last error wins)
pub(crate) async fn run_entries(
    host: &Arc<RunHost>,
    entries: Vec<String>,
) -> Result<(), BlueprintError> {
    let mut handles = Vec::with_capacity(entries.len());
    for entry in entries {
        let host = host.clone();
        handles.push(tokio::spawn(async move { fire_node(host, entry).await }));
    }

    let mut last_error = None;
    for handle in handles {
        match handle.await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => last_error = Some(err),
            Err(join_err) => {
                last_error = Some(
                    BlueprintError::execution(
                        codes::NODE_EXECUTION_FAILED,
                        format!("entry worker panicked: {join_err}"),
                    )
                    .with_severity(Severity::Critical),
                );
            }
        }
    }

    match last_error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Fire a node, then recurse along its activated flows
pub(crate) fn fire_node(
    host: Arc<RunHost>,
    node_id: String,
) -> BoxFuture<'static, Result<(), BlueprintError>> {
    async move {
        let outcome = fire_node_once(
            &host,
            &node_id,
            HashMap::new(),
            FiringMode::Standard { follow_flows: true },
        )
        .await?;

        for pin in outcome.activated {
            fire_successors(&host, &node_id, &pin).await?;
        }
        Ok(())
    }
    .boxed()
}

/// Follow every execution wire leaving a pin, in declaration order
pub(crate) fn fire_successors<'a>(
    host: &'a Arc<RunHost>,
    node_id: &'a str,
    pin_id: &'a str,
) -> BoxFuture<'a, Result<(), BlueprintError>> {
    async move {
        let targets: Vec<String> = host
            .blueprint()
            .wires_from(node_id, pin_id, ConnectionKind::Execution)
            .iter()
            .map(|wire| wire.target_node_id.clone())
            .collect();

        for target in targets {
            fire_node(host.clone(), target).await?;
        }
        Ok(())
    }
    .boxed()
}

/// Fire a single node with extra inputs merged in, then follow its flows
///
/// The re-entry path used for event-handler invocation.
pub(crate) async fn fire_node_with_inputs(
    host: &Arc<RunHost>,
    node_id: &str,
    extra_inputs: HashMap<String, Value>,
) -> Result<(), BlueprintError> {
    let outcome = fire_node_once(
        host,
        node_id,
        extra_inputs,
        FiringMode::Standard { follow_flows: true },
    )
    .await?;

    for pin in outcome.activated {
        fire_successors(host, node_id, &pin).await?;
    }
    Ok(())
}
