//! End-to-end scenarios, run under both evaluators

mod common;

use std::collections::HashMap;
use std::sync::Arc;

use blueprint_engine::{
    AlternatePathStrategy, ErrorKind, EventKind, ExecutionMode, RunResult, codes,
};
use blueprint_types::{Blueprint, BlueprintNode, Connection, Value, Variable};

use common::{CountingListener, engine_in_mode, inputs};

fn exec(id: &str, sn: &str, sp: &str, tn: &str, tp: &str) -> Connection {
    Connection::execution(id, sn, sp, tn, tp)
}

fn data(id: &str, sn: &str, sp: &str, tn: &str, tp: &str) -> Connection {
    Connection::data(id, sn, sp, tn, tp)
}

async fn run_both(bp: Blueprint, initial: HashMap<String, Value>) -> (RunResult, RunResult) {
    let standard = engine_in_mode(ExecutionMode::Standard);
    let first = standard
        .execute_blueprint(bp.clone(), None, initial.clone())
        .await
        .unwrap();

    let actor = engine_in_mode(ExecutionMode::Actor);
    let second = actor.execute_blueprint(bp, None, initial).await.unwrap();
    (first, second)
}

// ─────────────────────────────────────────────────────────────────────────────
// Scenario 1: conditional branch
// ─────────────────────────────────────────────────────────────────────────────

fn conditional_blueprint() -> Blueprint {
    let mut bp = Blueprint::new("scenario-conditional", "Conditional Branch");
    bp.nodes = vec![
        BlueprintNode::new("start", "test.start"),
        BlueprintNode::new("if", "test.if"),
        BlueprintNode::new("processA", "test.process")
            .with_property("input_suffix", serde_json::json!("_processed_by_A")),
        BlueprintNode::new("processB", "test.process")
            .with_property("input_suffix", serde_json::json!("_processed_by_B")),
        BlueprintNode::new("setResult", "test.store")
            .with_property("input_name", serde_json::json!("result")),
    ];
    bp.connections = vec![
        exec("e1", "start", "out", "if", "in"),
        exec("e2", "if", "true", "processA", "in"),
        exec("e3", "if", "false", "processB", "in"),
        exec("e4", "processA", "out", "setResult", "in"),
        exec("e5", "processB", "out", "setResult", "in"),
        data("d1", "start", "condition", "if", "condition"),
        data("d2", "start", "value", "processA", "data"),
        data("d3", "start", "value", "processB", "data"),
        data("d4", "processA", "result", "setResult", "value"),
        data("d5", "processB", "result", "setResult", "value"),
    ];
    bp.variables = vec![Variable::new("result", "string", serde_json::json!(""))];
    bp
}

#[tokio::test]
async fn conditional_branch_takes_the_true_path() {
    let bp = conditional_blueprint();
    let initial = inputs(&[
        ("condition", serde_json::json!(true)),
        ("value", serde_json::json!("x")),
    ]);

    let engine = engine_in_mode(ExecutionMode::Standard);
    let listener = CountingListener::new();
    engine.add_listener(listener.clone());

    let result = engine
        .execute_blueprint(bp.clone(), None, initial.clone())
        .await
        .unwrap();

    assert!(result.success);
    assert_eq!(
        result.output("processA", "result"),
        Some(&serde_json::json!("x_processed_by_A"))
    );
    assert_eq!(
        result.output("setResult", "value"),
        Some(&serde_json::json!("x_processed_by_A"))
    );
    assert_eq!(listener.count(EventKind::NodeStarted, "processA"), 1);
    assert_eq!(listener.count(EventKind::NodeStarted, "processB"), 0);
    assert!(!result.node_results.contains_key("processB"));

    // Both evaluators agree on the final node results
    let (first, second) = run_both(bp, initial).await;
    assert_eq!(first.node_results, second.node_results);
}

#[tokio::test]
async fn conditional_branch_takes_the_false_path() {
    let bp = conditional_blueprint();
    let initial = inputs(&[
        ("condition", serde_json::json!(false)),
        ("value", serde_json::json!("x")),
    ]);

    let (first, second) = run_both(bp, initial).await;
    for result in [&first, &second] {
        assert!(result.success);
        assert_eq!(
            result.output("setResult", "value"),
            Some(&serde_json::json!("x_processed_by_B"))
        );
        assert!(!result.node_results.contains_key("processA"));
    }
    assert_eq!(first.node_results, second.node_results);
}

// ─────────────────────────────────────────────────────────────────────────────
// Scenario 2: parallel fan-out / fan-in
// ─────────────────────────────────────────────────────────────────────────────

fn fan_out_blueprint() -> Blueprint {
    let mut bp = Blueprint::new("scenario-fanout", "Fan Out Fan In");
    bp.nodes = vec![
        BlueprintNode::new("start", "test.start"),
        BlueprintNode::new("split", "test.split"),
        BlueprintNode::new("pathA", "test.process")
            .with_property("input_suffix", serde_json::json!("_processed_by_A")),
        BlueprintNode::new("pathB", "test.process")
            .with_property("input_suffix", serde_json::json!("_processed_by_B")),
        BlueprintNode::new("pathC", "test.process")
            .with_property("input_suffix", serde_json::json!("_processed_by_C")),
        BlueprintNode::new("merge", "test.merge"),
    ];
    bp.connections = vec![
        exec("e1", "start", "out", "split", "in"),
        exec("e2", "split", "out1", "pathA", "in"),
        exec("e3", "split", "out2", "pathB", "in"),
        exec("e4", "split", "out3", "pathC", "in"),
        exec("e5", "pathA", "out", "merge", "in"),
        exec("e6", "pathB", "out", "merge", "in"),
        exec("e7", "pathC", "out", "merge", "in"),
        data("d1", "start", "data", "split", "data"),
        data("d2", "split", "data", "pathA", "data"),
        data("d3", "split", "data", "pathB", "data"),
        data("d4", "split", "data", "pathC", "data"),
    ];
    bp
}

#[tokio::test]
async fn fan_out_runs_every_path_once() {
    let bp = fan_out_blueprint();
    let initial = inputs(&[("data", serde_json::json!("base"))]);

    for mode in [ExecutionMode::Standard, ExecutionMode::Actor] {
        let engine = engine_in_mode(mode);
        let listener = CountingListener::new();
        engine.add_listener(listener.clone());

        let result = engine
            .execute_blueprint(bp.clone(), None, initial.clone())
            .await
            .unwrap();

        assert!(result.success, "run failed in {mode} mode");
        assert_eq!(
            result.output("pathA", "result"),
            Some(&serde_json::json!("base_processed_by_A"))
        );
        assert_eq!(
            result.output("pathB", "result"),
            Some(&serde_json::json!("base_processed_by_B"))
        );
        assert_eq!(
            result.output("pathC", "result"),
            Some(&serde_json::json!("base_processed_by_C"))
        );
        for path in ["pathA", "pathB", "pathC"] {
            assert_eq!(listener.count(EventKind::NodeStarted, path), 1);
        }
    }

    let (first, second) = run_both(bp, initial).await;
    assert_eq!(first.node_results, second.node_results);
}

// ─────────────────────────────────────────────────────────────────────────────
// Scenario 3: error propagation
// ─────────────────────────────────────────────────────────────────────────────

fn error_blueprint() -> Blueprint {
    let mut bp = Blueprint::new("scenario-error", "Error Propagation");
    bp.nodes = vec![
        BlueprintNode::new("start", "test.start"),
        BlueprintNode::new("if", "test.if"),
        BlueprintNode::new("errorNode", "test.maybe_error")
            .with_property("input_shouldError", serde_json::json!(true))
            .with_property("input_message", serde_json::json!("intentional failure")),
    ];
    bp.connections = vec![
        exec("e1", "start", "out", "if", "in"),
        exec("e2", "if", "true", "errorNode", "in"),
        data("d1", "start", "shouldError", "if", "condition"),
    ];
    bp
}

#[tokio::test]
async fn error_fails_the_run() {
    let bp = error_blueprint();
    let initial = inputs(&[("shouldError", serde_json::json!(true))]);

    for mode in [ExecutionMode::Standard, ExecutionMode::Actor] {
        let engine = engine_in_mode(mode);
        let result = engine
            .execute_blueprint(bp.clone(), None, initial.clone())
            .await
            .unwrap();

        assert!(!result.success, "run should fail in {mode} mode");
        let error = result.error.expect("failed run carries its error");
        assert!(error.message.contains("intentional failure"));
        assert_eq!(error.code, codes::NODE_EXECUTION_FAILED);
        assert_eq!(result.failed_nodes, vec!["errorNode".to_string()]);
        let analysis = result.error_analysis.expect("analysis present");
        assert_eq!(analysis.total, 1);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Scenario 4: recovery by alternate path
// ─────────────────────────────────────────────────────────────────────────────

fn recovery_blueprint() -> Blueprint {
    let mut bp = Blueprint::new("scenario-recovery", "Alternate Path Recovery");
    bp.nodes = vec![
        BlueprintNode::new("start", "test.start"),
        BlueprintNode::new("tryError", "test.maybe_error")
            .with_property("input_shouldError", serde_json::json!(true))
            .with_property("input_message", serde_json::json!("boom")),
        BlueprintNode::new("setPath", "test.store")
            .with_property("input_name", serde_json::json!("path"))
            .with_property("input_value", serde_json::json!("recovery")),
        BlueprintNode::new("setResult", "test.store")
            .with_property("input_name", serde_json::json!("result"))
            .with_property("input_value", serde_json::json!("recovered")),
    ];
    bp.connections = vec![
        exec("e1", "start", "out", "tryError", "in"),
        exec("e2", "tryError", "fail", "setPath", "in"),
        exec("e3", "setPath", "out", "setResult", "in"),
    ];
    bp.variables = vec![
        Variable::new("path", "string", serde_json::json!("")),
        Variable::new("result", "string", serde_json::json!("")),
    ];
    bp
}

#[tokio::test]
async fn alternate_path_recovers_the_run() {
    let bp = recovery_blueprint();

    for mode in [ExecutionMode::Standard, ExecutionMode::Actor] {
        let engine = engine_in_mode(mode);
        engine.recovery().register(
            ErrorKind::Execution,
            codes::NODE_EXECUTION_FAILED,
            Arc::new(AlternatePathStrategy),
        );

        let result = engine
            .execute_blueprint(bp.clone(), None, HashMap::new())
            .await
            .unwrap();

        assert!(result.success, "recovered run counts as success in {mode} mode");
        assert_eq!(result.partial_success, Some(true));
        assert_eq!(
            result.output("setPath", "value"),
            Some(&serde_json::json!("recovery"))
        );
        assert_eq!(
            result.output("setResult", "value"),
            Some(&serde_json::json!("recovered"))
        );

        let attempts = result.recovery_attempts.expect("attempts recorded");
        assert!(attempts.iter().any(|a| a.strategy == "alternate-path" && a.success));
        assert_eq!(result.failed_nodes, vec!["tryError".to_string()]);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Scenario 5: data-transformation chain
// ─────────────────────────────────────────────────────────────────────────────

fn chain_blueprint() -> Blueprint {
    let mut bp = Blueprint::new("scenario-chain", "Transformation Chain");
    bp.nodes = vec![
        BlueprintNode::new("start", "test.start"),
        BlueprintNode::new("stepA", "test.process")
            .with_property("input_suffix", serde_json::json!("_processed_by_A")),
        BlueprintNode::new("stepB", "test.process")
            .with_property("input_suffix", serde_json::json!("_processed_by_B")),
        BlueprintNode::new("stepC", "test.process")
            .with_property("input_suffix", serde_json::json!("_processed_by_C")),
    ];
    bp.connections = vec![
        exec("e1", "start", "out", "stepA", "in"),
        exec("e2", "stepA", "out", "stepB", "in"),
        exec("e3", "stepB", "out", "stepC", "in"),
        data("d1", "start", "input", "stepA", "data"),
        data("d2", "stepA", "result", "stepB", "data"),
        data("d3", "stepB", "result", "stepC", "data"),
    ];
    bp
}

#[tokio::test]
async fn chain_accumulates_transformations() {
    let bp = chain_blueprint();
    let initial = inputs(&[("input", serde_json::json!("test"))]);

    let (first, second) = run_both(bp, initial).await;
    for result in [&first, &second] {
        assert!(result.success);
        assert_eq!(
            result.output("stepA", "result"),
            Some(&serde_json::json!("test_processed_by_A"))
        );
        assert_eq!(
            result.output("stepB", "result"),
            Some(&serde_json::json!("test_processed_by_A_processed_by_B"))
        );
        assert_eq!(
            result.output("stepC", "result"),
            Some(&serde_json::json!(
                "test_processed_by_A_processed_by_B_processed_by_C"
            ))
        );
    }
    assert_eq!(first.node_results, second.node_results);
}

// ─────────────────────────────────────────────────────────────────────────────
// Scenario 6: ordering through the actor evaluator
// ─────────────────────────────────────────────────────────────────────────────

fn sequence_blueprint() -> Blueprint {
    let mut bp = Blueprint::new("scenario-sequence", "Sequence Ordering");
    bp.nodes = vec![
        BlueprintNode::new("emitter", "test.emit_sequence")
            .with_property("input_items", serde_json::json!([1, 2, 3, 4, 5])),
        BlueprintNode::new("checker", "test.check_sequence"),
    ];
    bp.connections = vec![
        exec("e1", "emitter", "body", "checker", "in"),
        data("d1", "emitter", "item", "checker", "item"),
    ];
    bp.variables = vec![Variable::new("seen", "array", serde_json::json!([]))];
    bp
}

#[tokio::test]
async fn actor_mode_preserves_source_order() {
    let bp = sequence_blueprint();

    let engine = engine_in_mode(ExecutionMode::Actor);
    let result = engine
        .execute_blueprint(bp.clone(), None, HashMap::new())
        .await
        .unwrap();

    assert!(result.success);
    assert_eq!(
        result.output("checker", "seen"),
        Some(&serde_json::json!([1, 2, 3, 4, 5]))
    );

    // The sequential evaluator observes the same order
    let engine = engine_in_mode(ExecutionMode::Standard);
    let result = engine
        .execute_blueprint(bp, None, HashMap::new())
        .await
        .unwrap();
    assert_eq!(
        result.output("checker", "seen"),
        Some(&serde_json::json!([1, 2, 3, 4, 5]))
    );
}
