//! Shared fixtures for the scenario suites: a small library of test nodes
//! and an event-counting listener.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use blueprint_engine::{
    BlueprintError, Engine, EngineConfig, EventKind, ExecutionContext, ExecutionEvent,
    ExecutionListener, ExecutionMode, Node, NodeMetadata, NodeRegistry, codes,
};
use blueprint_types::{PinDef, PinType, Value};

// ─────────────────────────────────────────────────────────────────────────────
// Test Nodes
// ─────────────────────────────────────────────────────────────────────────────

/// Entry node: activates `out` and nothing else
pub struct StartNode;

#[async_trait]
impl Node for StartNode {
    fn metadata(&self) -> NodeMetadata {
        NodeMetadata::new("test.start", "Start").with_category("Flow")
    }

    fn input_pins(&self) -> Vec<PinDef> {
        vec![]
    }

    fn output_pins(&self) -> Vec<PinDef> {
        vec![PinDef::exec_out("out")]
    }

    async fn execute(&self, ctx: &dyn ExecutionContext) -> Result<(), BlueprintError> {
        ctx.activate_output_flow("out");
        Ok(())
    }
}

/// Appends its `suffix` input to its `data` input
pub struct ProcessNode;

#[async_trait]
impl Node for ProcessNode {
    fn metadata(&self) -> NodeMetadata {
        NodeMetadata::new("test.process", "Process").with_category("Data")
    }

    fn input_pins(&self) -> Vec<PinDef> {
        vec![
            PinDef::exec_in("in"),
            PinDef::data_in("data", PinType::Any),
            PinDef::data_in("suffix", PinType::String),
        ]
    }

    fn output_pins(&self) -> Vec<PinDef> {
        vec![
            PinDef::exec_out("out"),
            PinDef::data_out("result", PinType::String),
        ]
    }

    async fn execute(&self, ctx: &dyn ExecutionContext) -> Result<(), BlueprintError> {
        let data = ctx
            .get_input("data")
            .map(|v| v.as_string().unwrap_or_default())
            .unwrap_or_default();
        let suffix = ctx
            .get_input("suffix")
            .map(|v| v.as_string().unwrap_or_default())
            .unwrap_or_default();

        let result = format!("{data}{suffix}");
        ctx.record_debug("processed", serde_json::json!({"input": data, "output": result}));
        ctx.set_output("result", Value::string(result));
        ctx.activate_output_flow("out");
        Ok(())
    }
}

/// Routes flow to `true` or `false` based on its `condition` input
pub struct BranchNode;

#[async_trait]
impl Node for BranchNode {
    fn metadata(&self) -> NodeMetadata {
        NodeMetadata::new("test.if", "Branch").with_category("Flow")
    }

    fn input_pins(&self) -> Vec<PinDef> {
        vec![
            PinDef::exec_in("in"),
            PinDef::data_in("condition", PinType::Boolean),
        ]
    }

    fn output_pins(&self) -> Vec<PinDef> {
        vec![PinDef::exec_out("true"), PinDef::exec_out("false")]
    }

    async fn execute(&self, ctx: &dyn ExecutionContext) -> Result<(), BlueprintError> {
        let condition = ctx
            .get_input("condition")
            .map(|v| v.as_boolean().unwrap_or(false))
            .unwrap_or(false);
        ctx.activate_output_flow(if condition { "true" } else { "false" });
        Ok(())
    }
}

/// Fans out to three execution outputs, mirroring `data` through
pub struct SplitNode;

#[async_trait]
impl Node for SplitNode {
    fn metadata(&self) -> NodeMetadata {
        NodeMetadata::new("test.split", "Split").with_category("Flow")
    }

    fn input_pins(&self) -> Vec<PinDef> {
        vec![PinDef::exec_in("in"), PinDef::data_in("data", PinType::Any)]
    }

    fn output_pins(&self) -> Vec<PinDef> {
        vec![
            PinDef::exec_out("out1"),
            PinDef::exec_out("out2"),
            PinDef::exec_out("out3"),
            PinDef::data_out("data", PinType::Any),
        ]
    }

    async fn execute(&self, ctx: &dyn ExecutionContext) -> Result<(), BlueprintError> {
        if let Some(data) = ctx.get_input("data") {
            ctx.set_output("data", data);
        }
        ctx.activate_output_flow("out1");
        ctx.activate_output_flow("out2");
        ctx.activate_output_flow("out3");
        Ok(())
    }
}

/// Joins flow; fires once per incoming activation
pub struct MergeNode;

#[async_trait]
impl Node for MergeNode {
    fn metadata(&self) -> NodeMetadata {
        NodeMetadata::new("test.merge", "Merge").with_category("Flow")
    }

    fn input_pins(&self) -> Vec<PinDef> {
        vec![PinDef::exec_in("in")]
    }

    fn output_pins(&self) -> Vec<PinDef> {
        vec![PinDef::exec_out("out")]
    }

    async fn execute(&self, ctx: &dyn ExecutionContext) -> Result<(), BlueprintError> {
        ctx.activate_output_flow("out");
        Ok(())
    }
}

/// Fails with its `message` when `shouldError` is true, else continues.
/// Exposes a `fail` pin for alternate-path recovery.
pub struct MaybeErrorNode;

#[async_trait]
impl Node for MaybeErrorNode {
    fn metadata(&self) -> NodeMetadata {
        NodeMetadata::new("test.maybe_error", "Maybe Error").with_category("Flow")
    }

    fn input_pins(&self) -> Vec<PinDef> {
        vec![
            PinDef::exec_in("in"),
            PinDef::data_in("shouldError", PinType::Boolean),
            PinDef::data_in("message", PinType::String),
        ]
    }

    fn output_pins(&self) -> Vec<PinDef> {
        vec![PinDef::exec_out("out"), PinDef::exec_out("fail")]
    }

    async fn execute(&self, ctx: &dyn ExecutionContext) -> Result<(), BlueprintError> {
        let should_error = ctx
            .get_input("shouldError")
            .map(|v| v.as_boolean().unwrap_or(false))
            .unwrap_or(false);

        if should_error {
            let message = ctx
                .get_input("message")
                .map(|v| v.as_string().unwrap_or_default())
                .unwrap_or_else(|| "node failed".to_string());
            return Err(BlueprintError::execution(
                codes::NODE_EXECUTION_FAILED,
                message,
            ));
        }

        ctx.activate_output_flow("out");
        Ok(())
    }
}

/// Writes its `value` input to the variable named by its `name` input
pub struct StoreNode;

#[async_trait]
impl Node for StoreNode {
    fn metadata(&self) -> NodeMetadata {
        NodeMetadata::new("test.store", "Store").with_category("Data")
    }

    fn input_pins(&self) -> Vec<PinDef> {
        vec![
            PinDef::exec_in("in"),
            PinDef::data_in("name", PinType::String),
            PinDef::data_in("value", PinType::Any),
        ]
    }

    fn output_pins(&self) -> Vec<PinDef> {
        vec![
            PinDef::exec_out("out"),
            PinDef::data_out("value", PinType::Any),
        ]
    }

    async fn execute(&self, ctx: &dyn ExecutionContext) -> Result<(), BlueprintError> {
        let name = ctx
            .get_input("name")
            .map(|v| v.as_string().unwrap_or_default())
            .unwrap_or_default();
        let value = ctx.get_input("value").unwrap_or_else(|| Value::any(serde_json::Value::Null));

        if !name.is_empty() {
            ctx.set_variable(&name, value.clone());
        }
        ctx.set_output("value", value);
        ctx.activate_output_flow("out");
        Ok(())
    }
}

/// Emits each element of `items`, driving its `body` pin synchronously per
/// element, then activates `done`
pub struct SequenceEmitterNode;

#[async_trait]
impl Node for SequenceEmitterNode {
    fn metadata(&self) -> NodeMetadata {
        NodeMetadata::new("test.emit_sequence", "Emit Sequence").with_category("Flow")
    }

    fn input_pins(&self) -> Vec<PinDef> {
        vec![
            PinDef::exec_in("in"),
            PinDef::data_in("items", PinType::Array),
        ]
    }

    fn output_pins(&self) -> Vec<PinDef> {
        vec![
            PinDef::exec_out("body"),
            PinDef::exec_out("done"),
            PinDef::data_out("item", PinType::Any),
        ]
    }

    async fn execute(&self, ctx: &dyn ExecutionContext) -> Result<(), BlueprintError> {
        let items = ctx
            .get_input("items")
            .map(|v| v.as_array().map(|a| a.clone()).unwrap_or_default())
            .unwrap_or_default();

        for item in items {
            ctx.set_output("item", Value::any(item));
            ctx.execute_connected_nodes("body").await?;
        }
        ctx.activate_output_flow("done");
        Ok(())
    }
}

/// Appends its `item` input to the `seen` array variable and republishes it
pub struct SequenceCheckerNode;

#[async_trait]
impl Node for SequenceCheckerNode {
    fn metadata(&self) -> NodeMetadata {
        NodeMetadata::new("test.check_sequence", "Check Sequence").with_category("Data")
    }

    fn input_pins(&self) -> Vec<PinDef> {
        vec![PinDef::exec_in("in"), PinDef::data_in("item", PinType::Any)]
    }

    fn output_pins(&self) -> Vec<PinDef> {
        vec![
            PinDef::exec_out("out"),
            PinDef::data_out("seen", PinType::Array),
        ]
    }

    async fn execute(&self, ctx: &dyn ExecutionContext) -> Result<(), BlueprintError> {
        let mut seen = ctx
            .get_variable("seen")
            .map(|v| v.as_array().map(|a| a.clone()).unwrap_or_default())
            .unwrap_or_default();

        if let Some(item) = ctx.get_input("item") {
            seen.push(item.raw().clone());
        }

        let value = Value::array(seen);
        ctx.set_variable("seen", value.clone());
        ctx.set_output("seen", value);
        ctx.activate_output_flow("out");
        Ok(())
    }
}

/// Fails unless its `text` input resolves; echoes it otherwise
pub struct RequireNode;

#[async_trait]
impl Node for RequireNode {
    fn metadata(&self) -> NodeMetadata {
        NodeMetadata::new("test.require", "Require").with_category("Data")
    }

    fn input_pins(&self) -> Vec<PinDef> {
        vec![
            PinDef::exec_in("in"),
            PinDef::data_in("text", PinType::String),
        ]
    }

    fn output_pins(&self) -> Vec<PinDef> {
        vec![
            PinDef::exec_out("out"),
            PinDef::data_out("echo", PinType::String),
        ]
    }

    async fn execute(&self, ctx: &dyn ExecutionContext) -> Result<(), BlueprintError> {
        let text = ctx.get_input("text").ok_or_else(|| {
            BlueprintError::data_type(codes::REQUIRED_INPUT_MISSING, "input 'text' is required")
                .with_pin("text")
        })?;
        ctx.set_output("echo", Value::string(text.as_string().unwrap_or_default()));
        ctx.activate_output_flow("out");
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Fixtures
// ─────────────────────────────────────────────────────────────────────────────

/// Registry with every test node registered
pub fn test_registry() -> Arc<NodeRegistry> {
    let registry = NodeRegistry::new();
    registry.register("test.start", || Arc::new(StartNode));
    registry.register("test.process", || Arc::new(ProcessNode));
    registry.register("test.if", || Arc::new(BranchNode));
    registry.register("test.split", || Arc::new(SplitNode));
    registry.register("test.merge", || Arc::new(MergeNode));
    registry.register("test.maybe_error", || Arc::new(MaybeErrorNode));
    registry.register("test.store", || Arc::new(StoreNode));
    registry.register("test.emit_sequence", || Arc::new(SequenceEmitterNode));
    registry.register("test.check_sequence", || Arc::new(SequenceCheckerNode));
    registry.register("test.require", || Arc::new(RequireNode));
    Arc::new(registry)
}

/// Opt-in log output for debugging test runs: `RUST_LOG=debug cargo test`
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// Engine wired to the test registry in the given mode
pub fn engine_in_mode(mode: ExecutionMode) -> Engine {
    init_tracing();
    let config = EngineConfig {
        mode,
        ..EngineConfig::default()
    };
    Engine::with_config(test_registry(), config)
}

/// Initial-data helper
pub fn inputs(pairs: &[(&str, serde_json::Value)]) -> HashMap<String, Value> {
    pairs
        .iter()
        .map(|(name, value)| (name.to_string(), Value::infer(value.clone())))
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Counting Listener
// ─────────────────────────────────────────────────────────────────────────────

/// Collects lifecycle events for assertions
#[derive(Default)]
pub struct CountingListener {
    events: Mutex<Vec<ExecutionEvent>>,
}

impl CountingListener {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// How many events of a kind were observed for a node
    pub fn count(&self, kind: EventKind, node_id: &str) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|e| e.kind == kind && e.node_id.as_deref() == Some(node_id))
            .count()
    }

    /// How many events of a kind were observed in total
    pub fn count_kind(&self, kind: EventKind) -> usize {
        self.events.lock().iter().filter(|e| e.kind == kind).count()
    }

    pub fn events(&self) -> Vec<ExecutionEvent> {
        self.events.lock().clone()
    }
}

impl ExecutionListener for CountingListener {
    fn on_event(&self, event: &ExecutionEvent) {
        self.events.lock().push(event.clone());
    }
}
