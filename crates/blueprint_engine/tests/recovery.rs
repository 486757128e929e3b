//! Recovery strategies: skip, default-value synthesis, and how recovered
//! runs end up partial instead of failed

mod common;

use std::collections::HashMap;
use std::sync::Arc;

use blueprint_engine::{ErrorKind, ExecutionMode, SkipNodeStrategy, codes};
use blueprint_types::{Blueprint, BlueprintNode, Connection};

use common::engine_in_mode;

fn exec(id: &str, sn: &str, sp: &str, tn: &str, tp: &str) -> Connection {
    Connection::execution(id, sn, sp, tn, tp)
}

fn failing_blueprint() -> Blueprint {
    let mut bp = Blueprint::new("recovery-skip", "Failing");
    bp.nodes = vec![
        BlueprintNode::new("start", "test.start"),
        BlueprintNode::new("broken", "test.maybe_error")
            .with_property("input_shouldError", serde_json::json!(true))
            .with_property("input_message", serde_json::json!("nope")),
    ];
    bp.connections = vec![exec("e1", "start", "out", "broken", "in")];
    bp
}

#[tokio::test]
async fn without_strategies_the_run_fails() {
    let engine = engine_in_mode(ExecutionMode::Standard);
    let result = engine
        .execute_blueprint(failing_blueprint(), None, HashMap::new())
        .await
        .unwrap();

    assert!(!result.success);
    assert_eq!(result.partial_success, None);
    assert!(result.recovery_attempts.is_none());
}

#[tokio::test]
async fn skip_strategy_downgrades_failure_to_partial() {
    let engine = engine_in_mode(ExecutionMode::Standard);
    engine.recovery().register(
        ErrorKind::Execution,
        codes::NODE_EXECUTION_FAILED,
        Arc::new(SkipNodeStrategy),
    );

    let result = engine
        .execute_blueprint(failing_blueprint(), None, HashMap::new())
        .await
        .unwrap();

    assert!(result.success);
    assert_eq!(result.partial_success, Some(true));
    assert_eq!(result.failed_nodes, vec!["broken".to_string()]);

    let attempts = result.recovery_attempts.expect("skip attempt recorded");
    assert!(attempts.iter().any(|a| a.strategy == "skip" && a.success));
}

#[tokio::test]
async fn default_values_synthesize_missing_required_inputs() {
    let mut bp = Blueprint::new("recovery-defaults", "Defaults");
    bp.nodes = vec![
        BlueprintNode::new("start", "test.start"),
        // No wire and no literal supplies `text`
        BlueprintNode::new("require", "test.require"),
    ];
    bp.connections = vec![exec("e1", "start", "out", "require", "in")];

    // Without the strategy the node fails on its missing input
    let engine = engine_in_mode(ExecutionMode::Standard);
    let result = engine
        .execute_blueprint(bp.clone(), None, HashMap::new())
        .await
        .unwrap();
    assert!(!result.success);
    assert_eq!(
        result.error.expect("error surfaced").code,
        codes::REQUIRED_INPUT_MISSING
    );

    // With it, the zero value of the declared pin type flows in
    let engine = engine_in_mode(ExecutionMode::Standard);
    engine.recovery().register_default_values();
    let result = engine
        .execute_blueprint(bp, None, HashMap::new())
        .await
        .unwrap();

    assert!(result.success);
    assert_eq!(result.output("require", "echo"), Some(&serde_json::json!("")));

    let attempts = result.recovery_attempts.expect("synthesis recorded");
    assert!(
        attempts
            .iter()
            .any(|a| a.strategy == "default-value" && a.success)
    );
}

#[tokio::test]
async fn default_values_work_under_the_actor_evaluator() {
    let mut bp = Blueprint::new("recovery-defaults-actor", "Defaults Actor");
    bp.nodes = vec![
        BlueprintNode::new("start", "test.start"),
        BlueprintNode::new("require", "test.require"),
    ];
    bp.connections = vec![exec("e1", "start", "out", "require", "in")];

    let engine = engine_in_mode(ExecutionMode::Actor);
    engine.recovery().register_default_values();

    let result = engine
        .execute_blueprint(bp, None, HashMap::new())
        .await
        .unwrap();
    assert!(result.success);
    assert_eq!(result.output("require", "echo"), Some(&serde_json::json!("")));
}
