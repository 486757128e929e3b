//! Blueprint execution engine
//!
//! Turns a loaded blueprint plus initial inputs into a completed run. Two
//! evaluators with identical observable semantics: a sequential depth-first
//! walker and an actor-per-node dispatcher. Nodes program against one
//! context contract; values flow through a per-run store; events invoke
//! bound handler nodes through the same firing path.

pub mod config;
pub mod context;
pub mod engine;
pub mod error;
mod evaluator;
pub mod events;
pub mod listener;
pub mod node;
pub mod recovery;
pub mod registry;
pub mod run;
pub mod store;
pub mod variables;

pub use config::{ConfigError, EngineConfig, ExecutionMode};
pub use context::{DebugRecord, EventContext, ExecutionContext, StandardContext};
pub use engine::Engine;
pub use error::{BlueprintError, ErrorAnalysis, ErrorKind, ErrorReport, Severity, codes};
pub use events::EventDispatcher;
pub use listener::{EventKind, ExecutionEvent, ExecutionListener, ListenerSet};
pub use node::{Node, NodeFactory, NodeMetadata};
pub use recovery::{
    AlternatePathStrategy, DefaultValueStrategy, FAIL_PIN, RecoveryAttempt, RecoveryManager,
    RecoveryOutcome, RecoveryStrategy, SkipNodeStrategy,
};
pub use registry::NodeRegistry;
pub use run::{NodeStatus, RunResult, RunStatus, ValidationIssue};
pub use store::{DebugStore, TimedValue};
pub use variables::{
    GET_VARIABLE_PREFIX, GetVariableNode, SET_VARIABLE_PREFIX, SetVariableNode, VariableTable,
    is_variable_node_type,
};
