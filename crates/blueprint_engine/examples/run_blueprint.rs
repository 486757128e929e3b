//! Load a blueprint from JSON and execute it under both evaluators.
//!
//! ```sh
//! cargo run --example run_blueprint
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use blueprint_engine::{
    BlueprintError, Engine, ExecutionContext, ExecutionMode, Node, NodeMetadata, NodeRegistry,
};
use blueprint_types::{Blueprint, PinDef, PinType, Value};

/// Uppercases its `text` input
struct UppercaseNode;

#[async_trait]
impl Node for UppercaseNode {
    fn metadata(&self) -> NodeMetadata {
        NodeMetadata::new("demo.uppercase", "Uppercase").with_category("Text")
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
            PinDef::data_out("text", PinType::String),
        ]
    }

    async fn execute(&self, ctx: &dyn ExecutionContext) -> Result<(), BlueprintError> {
        let text = ctx
            .get_input("text")
            .map(|v| v.as_string().unwrap_or_default())
            .unwrap_or_default();
        ctx.set_output("text", Value::string(text.to_uppercase()));
        ctx.activate_output_flow("out");
        Ok(())
    }
}

/// Logs its `message` input through tracing
struct LogNode;

#[async_trait]
impl Node for LogNode {
    fn metadata(&self) -> NodeMetadata {
        NodeMetadata::new("demo.log", "Log").with_category("Debug")
    }

    fn input_pins(&self) -> Vec<PinDef> {
        vec![
            PinDef::exec_in("in"),
            PinDef::data_in("message", PinType::Any),
        ]
    }

    fn output_pins(&self) -> Vec<PinDef> {
        vec![PinDef::exec_out("out")]
    }

    async fn execute(&self, ctx: &dyn ExecutionContext) -> Result<(), BlueprintError> {
        let message = ctx
            .get_input("message")
            .map(|v| v.raw().clone())
            .unwrap_or_default();
        tracing::info!(node_id = %ctx.node_id(), message = %message, "log node");
        ctx.activate_output_flow("out");
        Ok(())
    }
}

/// Entry node that just kicks off the flow
struct StartNode;

#[async_trait]
impl Node for StartNode {
    fn metadata(&self) -> NodeMetadata {
        NodeMetadata::new("demo.start", "Start").with_category("Flow")
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

const BLUEPRINT_JSON: &str = r#"{
    "id": "demo",
    "name": "Uppercase Demo",
    "version": "1.0.0",
    "nodes": [
        {"id": "start", "type": "demo.start"},
        {"id": "upper", "type": "demo.uppercase"},
        {"id": "log", "type": "demo.log"}
    ],
    "connections": [
        {"id": "e1", "sourceNodeId": "start", "sourcePinId": "out",
         "targetNodeId": "upper", "targetPinId": "in", "connectionType": "execution"},
        {"id": "e2", "sourceNodeId": "upper", "sourcePinId": "out",
         "targetNodeId": "log", "targetPinId": "in", "connectionType": "execution"},
        {"id": "d1", "sourceNodeId": "start", "sourcePinId": "greeting",
         "targetNodeId": "upper", "targetPinId": "text", "connectionType": "data"},
        {"id": "d2", "sourceNodeId": "upper", "sourcePinId": "text",
         "targetNodeId": "log", "targetPinId": "message", "connectionType": "data"}
    ],
    "variables": []
}"#;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let registry = Arc::new(NodeRegistry::new());
    registry.register("demo.start", || Arc::new(StartNode));
    registry.register("demo.uppercase", || Arc::new(UppercaseNode));
    registry.register("demo.log", || Arc::new(LogNode));

    let blueprint: Blueprint = serde_json::from_str(BLUEPRINT_JSON)?;
    let engine = Engine::new(registry);
    engine.load_blueprint(blueprint);

    let mut initial = HashMap::new();
    initial.insert("greeting".to_string(), Value::string("hello, blueprints"));

    for mode in [ExecutionMode::Standard, ExecutionMode::Actor] {
        engine.set_mode(mode);
        let result = engine.execute("demo", None, initial.clone()).await?;
        println!(
            "[{mode}] success={} upper.text={:?}",
            result.success,
            result.output("upper", "text")
        );
    }

    Ok(())
}
