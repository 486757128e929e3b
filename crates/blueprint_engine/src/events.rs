//! Event dispatch tables
//!
//! Holds event definitions and handler bindings registered from loaded
//! blueprints. Raising an event validates its parameters against the
//! definition and yields the enabled bindings in priority order; the facade
//! re-enters the single-node firing path for each handler.

use std::collections::HashMap;

use dashmap::DashMap;

use blueprint_types::{EventBinding, EventDefinition, Value};

use crate::error::{BlueprintError, codes};

/// Registry of event definitions and bindings
#[derive(Default)]
pub struct EventDispatcher {
    definitions: DashMap<String, EventDefinition>,
    /// event id → bindings in registration order
    bindings: DashMap<String, Vec<EventBinding>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace an event definition
    pub fn register_event(&self, definition: EventDefinition) {
        self.definitions.insert(definition.id.clone(), definition);
    }

    /// Remove an event and its bindings
    pub fn remove_event(&self, event_id: &str) {
        self.definitions.remove(event_id);
        self.bindings.remove(event_id);
    }

    /// Register a handler binding
    pub fn register_binding(&self, binding: EventBinding) {
        self.bindings
            .entry(binding.event_id.clone())
            .or_default()
            .push(binding);
    }

    pub fn get_event(&self, event_id: &str) -> Option<EventDefinition> {
        self.definitions.get(event_id).map(|d| d.clone())
    }

    pub fn contains_event(&self, event_id: &str) -> bool {
        self.definitions.contains_key(event_id)
    }

    /// Enabled bindings sorted by descending priority; ties keep
    /// registration order
    pub fn bindings_for(&self, event_id: &str) -> Vec<EventBinding> {
        let mut bindings: Vec<EventBinding> = self
            .bindings
            .get(event_id)
            .map(|entry| entry.iter().filter(|b| b.enabled).cloned().collect())
            .unwrap_or_default();
        bindings.sort_by(|a, b| b.priority.cmp(&a.priority));
        bindings
    }

    /// Validate raised parameters against the definition
    ///
    /// Missing optional parameters take their declared default; a missing
    /// non-optional parameter without a default fails the raise.
    pub fn validate_params(
        &self,
        event_id: &str,
        params: &HashMap<String, Value>,
    ) -> Result<HashMap<String, Value>, BlueprintError> {
        let definition = self.get_event(event_id).ok_or_else(|| {
            BlueprintError::validation(
                codes::EVENT_NOT_REGISTERED,
                format!("event '{event_id}' is not registered"),
            )
        })?;

        let mut merged = params.clone();
        for parameter in &definition.parameters {
            if merged.contains_key(&parameter.name) {
                continue;
            }
            if !parameter.default.is_null() {
                merged.insert(parameter.name.clone(), Value::infer(parameter.default.clone()));
            } else if !parameter.optional {
                return Err(BlueprintError::validation(
                    codes::EVENT_PARAM_MISSING,
                    format!(
                        "event '{event_id}' is missing required parameter '{}'",
                        parameter.name
                    ),
                )
                .with_pin(&parameter.name));
            }
        }
        Ok(merged)
    }
}
