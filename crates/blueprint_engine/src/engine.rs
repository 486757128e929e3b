//! Engine facade
//!
//! Owns the blueprint cache, listener list, value store, registry pointer
//! and execution mode. Loading a blueprint registers its variable-bound node
//! types and its events; executing one runs validation, the variable
//! pre-pass and the selected evaluator, applies recovery to collected
//! errors, and assembles the run result. Per-run state is destroyed once the
//! result is returned.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use parking_lot::RwLock;

use blueprint_types::{Blueprint, PinType, PinTypeRegistry, Value};

use crate::config::{EngineConfig, ExecutionMode};
use crate::context::EventContext;
use crate::error::{BlueprintError, ErrorAnalysis, codes};
use crate::evaluator::{actor, sequential};
use crate::events::EventDispatcher;
use crate::listener::{EventKind, ExecutionListener, ListenerSet};
use crate::recovery::RecoveryManager;
use crate::registry::NodeRegistry;
use crate::run::{NodeStatus, RunHost, RunResult, RunState, RunStatus, ValidationIssue};
use crate::store::DebugStore;
use crate::variables::{
    self, GET_VARIABLE_PREFIX, GetVariableNode, SET_VARIABLE_PREFIX, SetVariableNode,
    is_variable_node_type,
};

// ─────────────────────────────────────────────────────────────────────────────
// Engine
// ─────────────────────────────────────────────────────────────────────────────

/// The execution engine facade
pub struct Engine {
    config: EngineConfig,
    registry: Arc<NodeRegistry>,
    pin_types: Arc<PinTypeRegistry>,
    store: Arc<DebugStore>,
    listeners: Arc<ListenerSet>,
    dispatcher: Arc<EventDispatcher>,
    recovery: Arc<RecoveryManager>,
    blueprints: DashMap<String, Arc<Blueprint>>,
    runs: DashMap<String, Arc<RunHost>>,
    mode: RwLock<ExecutionMode>,
}

impl Engine {
    pub fn new(registry: Arc<NodeRegistry>) -> Self {
        Self::with_config(registry, EngineConfig::default())
    }

    pub fn with_config(registry: Arc<NodeRegistry>, config: EngineConfig) -> Self {
        let mode = config.mode;
        Self {
            config,
            registry,
            pin_types: Arc::new(PinTypeRegistry::new()),
            store: Arc::new(DebugStore::new()),
            listeners: Arc::new(ListenerSet::new()),
            dispatcher: Arc::new(EventDispatcher::new()),
            recovery: Arc::new(RecoveryManager::new()),
            blueprints: DashMap::new(),
            runs: DashMap::new(),
            mode: RwLock::new(mode),
        }
    }

    pub fn registry(&self) -> &Arc<NodeRegistry> {
        &self.registry
    }

    pub fn pin_types(&self) -> &Arc<PinTypeRegistry> {
        &self.pin_types
    }

    pub fn store(&self) -> &Arc<DebugStore> {
        &self.store
    }

    pub fn recovery(&self) -> &Arc<RecoveryManager> {
        &self.recovery
    }

    pub fn dispatcher(&self) -> &Arc<EventDispatcher> {
        &self.dispatcher
    }

    pub fn add_listener(&self, listener: Arc<dyn ExecutionListener>) {
        self.listeners.add(listener);
    }

    /// Select the evaluator for subsequent executes
    pub fn set_mode(&self, mode: ExecutionMode) {
        *self.mode.write() = mode;
    }

    pub fn mode(&self) -> ExecutionMode {
        *self.mode.read()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Blueprint lifecycle
    // ─────────────────────────────────────────────────────────────────────

    /// Load (or replace) a blueprint
    ///
    /// Registers `get-variable-*` / `set-variable-*` node types for its
    /// variables and (re-)registers its events and bindings. Nested
    /// function blueprints load under `<parent>/<function>` ids.
    pub fn load_blueprint(&self, blueprint: Blueprint) {
        for variable in &blueprint.variables {
            let pin_type = PinType::from_id(&variable.type_id);
            let name = variable.name.clone();
            let getter_type = pin_type.clone();
            self.registry
                .register_runtime(format!("{GET_VARIABLE_PREFIX}{name}"), move || {
                    Arc::new(GetVariableNode::new(name.clone(), getter_type.clone()))
                });
            let name = variable.name.clone();
            self.registry
                .register_runtime(format!("{SET_VARIABLE_PREFIX}{name}"), move || {
                    Arc::new(SetVariableNode::new(name.clone(), pin_type.clone()))
                });
        }

        for event in &blueprint.events {
            self.dispatcher.remove_event(&event.id);
            self.dispatcher.register_event(event.clone());
        }
        for binding in &blueprint.event_bindings {
            self.dispatcher.register_binding(binding.clone());
        }

        for function in &blueprint.functions {
            let mut nested = function.clone();
            nested.id = format!("{}/{}", blueprint.id, function.id);
            self.load_blueprint(nested);
        }

        tracing::info!(
            blueprint_id = %blueprint.id,
            nodes = blueprint.nodes.len(),
            connections = blueprint.connections.len(),
            "blueprint loaded"
        );
        self.blueprints
            .insert(blueprint.id.clone(), Arc::new(blueprint));
    }

    /// Unload a blueprint and its runtime-scoped registrations
    pub fn unload_blueprint(&self, blueprint_id: &str) {
        let Some((_, blueprint)) = self.blueprints.remove(blueprint_id) else {
            return;
        };
        for variable in &blueprint.variables {
            self.registry
                .unregister_runtime(&format!("{GET_VARIABLE_PREFIX}{}", variable.name));
            self.registry
                .unregister_runtime(&format!("{SET_VARIABLE_PREFIX}{}", variable.name));
        }
        for event in &blueprint.events {
            self.dispatcher.remove_event(&event.id);
        }
        for function in &blueprint.functions {
            self.unload_blueprint(&format!("{}/{}", blueprint.id, function.id));
        }
    }

    pub fn get_blueprint(&self, blueprint_id: &str) -> Option<Arc<Blueprint>> {
        self.blueprints
            .get(blueprint_id)
            .map(|entry| entry.value().clone())
    }

    pub fn blueprint_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.blueprints.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    /// Per-node status of an in-flight run
    pub fn node_status(&self, run_id: &str, node_id: &str) -> Option<NodeStatus> {
        self.runs
            .get(run_id)
            .map(|host| host.run.status_of(node_id))
    }

    /// Run ids currently executing
    pub fn active_runs(&self) -> Vec<String> {
        self.runs.iter().map(|e| e.key().clone()).collect()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Execution
    // ─────────────────────────────────────────────────────────────────────

    /// Load a blueprint and execute it in one call
    pub async fn execute_blueprint(
        &self,
        blueprint: Blueprint,
        run_id: Option<String>,
        initial_data: HashMap<String, Value>,
    ) -> Result<RunResult, BlueprintError> {
        let blueprint_id = blueprint.id.clone();
        self.load_blueprint(blueprint);
        self.execute(&blueprint_id, run_id, initial_data).await
    }

    /// Execute a loaded blueprint to completion
    pub async fn execute(
        &self,
        blueprint_id: &str,
        run_id: Option<String>,
        initial_data: HashMap<String, Value>,
    ) -> Result<RunResult, BlueprintError> {
        let blueprint = self.get_blueprint(blueprint_id).ok_or_else(|| {
            BlueprintError::validation(
                codes::BLUEPRINT_NOT_FOUND,
                format!("blueprint '{blueprint_id}' is not loaded"),
            )
        })?;

        let run_id = run_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let mode = self.mode();

        let run = Arc::new(RunState::new(&run_id, blueprint.clone()));
        let host = Arc::new(RunHost {
            config: self.config.clone(),
            registry: self.registry.clone(),
            pin_types: self.pin_types.clone(),
            store: self.store.clone(),
            listeners: self.listeners.clone(),
            recovery: self.recovery.clone(),
            run: run.clone(),
        });
        self.runs.insert(run_id.clone(), host.clone());

        tracing::info!(
            run_id = %run_id,
            blueprint_id = blueprint_id,
            mode = %mode,
            "starting run"
        );
        host.emit(
            EventKind::ExecutionStart,
            None,
            serde_json::json!({
                "runId": run_id,
                "blueprintId": blueprint_id,
                "mode": mode.to_string(),
            }),
        );
        self.store
            .record_execution(&run_id, "mode", serde_json::json!(mode.to_string()));

        // Static checks run before any node fires
        let issues = validate(&blueprint, &self.registry);
        if !issues.is_empty() {
            tracing::warn!(
                run_id = %run_id,
                issues = issues.len(),
                "validation failed; aborting before execution"
            );
            return Ok(self.finish_run(&host, RunStatus::Failed, Some(issues)));
        }

        // Seed the variable table: blueprint initial values, then overrides
        for variable in &blueprint.variables {
            let pin_type = PinType::from_id(&variable.type_id);
            let value = Value::new(pin_type, variable.value.clone())
                .unwrap_or_else(|_| Value::infer(variable.value.clone()));
            run.variables().set(&variable.name, value);
        }
        for (name, value) in &initial_data {
            run.variables().set(name, value.clone());
        }

        // Initial data is also exposed as entry-node outputs so wires from
        // an entry pin resolve against it.
        let entries = entry_points(&blueprint);
        for entry in &entries {
            for (key, value) in &initial_data {
                self.store
                    .store_output(&run_id, entry, key, value.raw().clone());
            }
        }

        let mut run_error = variables::run_prepass(&host).await.err();

        if run_error.is_none() {
            run_error = match mode {
                ExecutionMode::Standard => sequential::run_entries(&host, entries).await,
                ExecutionMode::Actor => actor::run_entries(&host, entries).await,
            }
            .err();
        }

        Ok(self.conclude_run(&host, run_error).await)
    }

    /// Apply recovery to everything the run collected, settle the final
    /// status, and assemble the result
    async fn conclude_run(
        &self,
        host: &Arc<RunHost>,
        run_error: Option<BlueprintError>,
    ) -> RunResult {
        if let Some(err) = &run_error {
            if !host.run.has_errors() {
                host.run.record_error(err.report());
            }
        }

        let reports = host.run.errors();
        let mut all_recovered = !reports.is_empty();
        for report in &reports {
            if !self.recovery.recover(report, host).await {
                all_recovered = false;
            }
        }

        let status = if reports.is_empty() && run_error.is_none() {
            RunStatus::Completed
        } else if all_recovered {
            RunStatus::Partial
        } else {
            RunStatus::Failed
        };

        self.finish_run(host, status, None)
    }

    /// Assemble the result, emit `execution.end`, and tear the run down
    fn finish_run(
        &self,
        host: &Arc<RunHost>,
        status: RunStatus,
        validation_results: Option<Vec<ValidationIssue>>,
    ) -> RunResult {
        let run = &host.run;
        let reports = run.errors();
        let attempts = run.recovery_attempts();
        let end_time = Utc::now();

        let result = RunResult {
            success: matches!(status, RunStatus::Completed | RunStatus::Partial),
            partial_success: matches!(status, RunStatus::Partial).then_some(true),
            run_id: run.run_id.clone(),
            start_time: run.started_at,
            end_time,
            error: match status {
                RunStatus::Failed => reports.last().cloned(),
                _ => None,
            },
            node_results: self.store.snapshot_run(&run.run_id),
            error_analysis: (!reports.is_empty()).then(|| ErrorAnalysis::analyze(&reports)),
            recovery_attempts: (!attempts.is_empty()).then_some(attempts),
            validation_results,
            failed_nodes: run.failed_nodes(),
            successful_nodes: run.successful_nodes(),
        };

        host.emit(
            EventKind::ExecutionEnd,
            None,
            serde_json::json!({
                "runId": run.run_id,
                "status": status,
                "firings": run.firings(),
            }),
        );
        tracing::info!(
            run_id = %run.run_id,
            status = ?status,
            firings = run.firings(),
            "run finished"
        );

        self.store.clear_run(&run.run_id);
        self.runs.remove(&run.run_id);
        result
    }

    // ─────────────────────────────────────────────────────────────────────
    // Events
    // ─────────────────────────────────────────────────────────────────────

    /// Fire a single node with an event context, re-entering the shared
    /// firing path and following its activated flows
    pub async fn trigger_node_execution(
        &self,
        blueprint_id: &str,
        node_id: &str,
        event_ctx: EventContext,
    ) -> Result<(), BlueprintError> {
        let host = self
            .runs
            .get(&event_ctx.run_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| {
                BlueprintError::execution(
                    codes::NODE_NOT_FOUND,
                    format!("no active run '{}'", event_ctx.run_id),
                )
            })?;
        if host.run.blueprint.id != blueprint_id {
            return Err(BlueprintError::validation(
                codes::BLUEPRINT_NOT_FOUND,
                format!(
                    "run '{}' does not belong to blueprint '{blueprint_id}'",
                    event_ctx.run_id
                ),
            ));
        }

        sequential::fire_node_with_inputs(&host, node_id, event_ctx.params).await
    }

    /// Raise an event outside any active run
    ///
    /// Creates a dedicated run, seeds variables, invokes every enabled
    /// bound handler with the validated parameters (highest priority
    /// first, sequentially), and returns the run's result.
    pub async fn raise(
        &self,
        blueprint_id: &str,
        event_id: &str,
        params: HashMap<String, Value>,
    ) -> Result<RunResult, BlueprintError> {
        let blueprint = self.get_blueprint(blueprint_id).ok_or_else(|| {
            BlueprintError::validation(
                codes::BLUEPRINT_NOT_FOUND,
                format!("blueprint '{blueprint_id}' is not loaded"),
            )
        })?;
        let merged = self.dispatcher.validate_params(event_id, &params)?;

        let run_id = uuid::Uuid::new_v4().to_string();
        let run = Arc::new(RunState::new(&run_id, blueprint.clone()));
        let host = Arc::new(RunHost {
            config: self.config.clone(),
            registry: self.registry.clone(),
            pin_types: self.pin_types.clone(),
            store: self.store.clone(),
            listeners: self.listeners.clone(),
            recovery: self.recovery.clone(),
            run: run.clone(),
        });
        self.runs.insert(run_id.clone(), host.clone());

        tracing::info!(
            run_id = %run_id,
            blueprint_id = blueprint_id,
            event_id = event_id,
            "raising event"
        );
        host.emit(
            EventKind::ExecutionStart,
            None,
            serde_json::json!({
                "runId": run_id,
                "blueprintId": blueprint_id,
                "eventId": event_id,
            }),
        );

        for variable in &blueprint.variables {
            let pin_type = PinType::from_id(&variable.type_id);
            let value = Value::new(pin_type, variable.value.clone())
                .unwrap_or_else(|_| Value::infer(variable.value.clone()));
            run.variables().set(&variable.name, value);
        }

        let mut run_error = variables::run_prepass(&host).await.err();

        if run_error.is_none() {
            for binding in self.dispatcher.bindings_for(event_id) {
                if let Err(err) =
                    sequential::fire_node_with_inputs(&host, &binding.handler_id, merged.clone())
                        .await
                {
                    // The handler's error is already recorded against the
                    // run; remaining handlers still get invoked.
                    run_error = Some(err);
                }
            }
        }

        Ok(self.conclude_run(&host, run_error).await)
    }

    /// Raise an event inside a run: validate parameters and invoke every
    /// enabled bound handler, highest priority first, sequentially
    pub async fn raise_event(
        &self,
        run_id: &str,
        event_id: &str,
        params: HashMap<String, Value>,
    ) -> Result<(), BlueprintError> {
        let host = self
            .runs
            .get(run_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| {
                BlueprintError::execution(
                    codes::NODE_NOT_FOUND,
                    format!("no active run '{run_id}'"),
                )
            })?;

        let merged = self.dispatcher.validate_params(event_id, &params)?;
        let blueprint_id = host.run.blueprint.id.clone();

        for binding in self.dispatcher.bindings_for(event_id) {
            let ctx = EventContext::new(run_id, event_id, merged.clone());
            self.trigger_node_execution(&blueprint_id, &binding.handler_id, ctx)
                .await?;
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Entry points: nodes with no incoming execution wires, excluding variable
/// pre-pass nodes and event-bound handlers
fn entry_points(blueprint: &Blueprint) -> Vec<String> {
    let handlers = blueprint.event_handler_ids();
    blueprint
        .nodes_without_incoming_execution()
        .into_iter()
        .filter(|n| !is_variable_node_type(&n.node_type))
        .filter(|n| !handlers.contains(&n.id.as_str()))
        .map(|n| n.id.clone())
        .collect()
}

/// Static checks: every node type resolves, every connection endpoint exists
fn validate(blueprint: &Blueprint, registry: &NodeRegistry) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    for node in &blueprint.nodes {
        if !registry.contains(&node.node_type) {
            issues.push(ValidationIssue {
                message: format!("unknown node type '{}'", node.node_type),
                node_id: Some(node.id.clone()),
                connection_id: None,
            });
        }
    }

    for connection in &blueprint.connections {
        for endpoint in [&connection.source_node_id, &connection.target_node_id] {
            if blueprint.get_node(endpoint).is_none() {
                issues.push(ValidationIssue {
                    message: format!("connection references missing node '{endpoint}'"),
                    node_id: None,
                    connection_id: Some(connection.id.clone()),
                });
            }
        }
    }

    issues
}
