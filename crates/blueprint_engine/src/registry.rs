// Node Registry - Maps node type ids to factories
//
// Holds the process-wide node types plus runtime-scoped registrations for
// variable-bound types, which are created just-in-time when a blueprint is
// loaded. Reads dominate; both tables are concurrent maps.

use std::sync::Arc;

use dashmap::DashMap;

use crate::node::{Node, NodeFactory};

/// Registry of node factories keyed by type id
#[derive(Default)]
pub struct NodeRegistry {
    global: DashMap<String, NodeFactory>,
    runtime: DashMap<String, NodeFactory>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a process-wide node type
    pub fn register<F>(&self, type_id: impl Into<String>, factory: F)
    where
        F: Fn() -> Arc<dyn Node> + Send + Sync + 'static,
    {
        self.global.insert(type_id.into(), Arc::new(factory));
    }

    /// Register a runtime-scoped node type (variable-bound types)
    pub fn register_runtime<F>(&self, type_id: impl Into<String>, factory: F)
    where
        F: Fn() -> Arc<dyn Node> + Send + Sync + 'static,
    {
        self.runtime.insert(type_id.into(), Arc::new(factory));
    }

    /// Remove a runtime-scoped registration
    pub fn unregister_runtime(&self, type_id: &str) {
        self.runtime.remove(type_id);
    }

    /// Create an independent instance of a node type
    ///
    /// Global registrations win over runtime-scoped ones.
    pub fn create(&self, type_id: &str) -> Option<Arc<dyn Node>> {
        let factory = self
            .global
            .get(type_id)
            .or_else(|| self.runtime.get(type_id))?;
        Some((factory.value())())
    }

    /// Check if a type id resolves
    pub fn contains(&self, type_id: &str) -> bool {
        self.global.contains_key(type_id) || self.runtime.contains_key(type_id)
    }

    /// All registered type ids, sorted
    pub fn type_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .global
            .iter()
            .map(|e| e.key().clone())
            .chain(self.runtime.iter().map(|e| e.key().clone()))
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }

    pub fn len(&self) -> usize {
        self.global.len() + self.runtime.len()
    }

    pub fn is_empty(&self) -> bool {
        self.global.is_empty() && self.runtime.is_empty()
    }
}
