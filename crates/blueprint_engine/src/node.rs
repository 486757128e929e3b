//! Node contract
//!
//! The trait every node implementation programs against. Nodes are trusted
//! in-process extensions: the engine resolves them through the registry,
//! hands them an execution context, and interprets their activated flows.

use async_trait::async_trait;
use blueprint_types::{PinDef, Property};

use crate::context::ExecutionContext;
use crate::error::BlueprintError;

// ─────────────────────────────────────────────────────────────────────────────
// Metadata
// ─────────────────────────────────────────────────────────────────────────────

/// Descriptive metadata for a node type
#[derive(Debug, Clone)]
pub struct NodeMetadata {
    /// Type id resolved through the registry
    pub type_id: String,
    /// Display name
    pub name: String,
    pub description: String,
    /// Category for palette organization
    pub category: String,
    pub version: String,
}

impl NodeMetadata {
    pub fn new(type_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            type_id: type_id.into(),
            name: name.into(),
            description: String::new(),
            category: "General".to_string(),
            version: "1.0.0".to_string(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Node Trait
// ─────────────────────────────────────────────────────────────────────────────

/// A unit of work inside a blueprint
///
/// `execute` reads inputs and publishes outputs through the context, and
/// marks execution output pins live with `activate_output_flow`. Returning
/// an error fails the firing; the engine handles status, hooks and recovery.
#[async_trait]
pub trait Node: Send + Sync {
    fn metadata(&self) -> NodeMetadata;

    fn input_pins(&self) -> Vec<PinDef>;

    fn output_pins(&self) -> Vec<PinDef>;

    /// Static properties this node type understands
    fn properties(&self) -> Vec<Property> {
        Vec::new()
    }

    async fn execute(&self, ctx: &dyn ExecutionContext) -> Result<(), BlueprintError>;
}

/// Side-effect-free constructor of independent node instances
pub type NodeFactory = std::sync::Arc<dyn Fn() -> std::sync::Arc<dyn Node> + Send + Sync>;
