//! Pin-type registry
//!
//! Shared registry of pin-type descriptors. The seven canonical types are
//! always present; domains extend the set by stable id. Descriptors also
//! supply the zero value synthesized by default-value recovery.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::value::PinType;

// ─────────────────────────────────────────────────────────────────────────────
// Descriptors
// ─────────────────────────────────────────────────────────────────────────────

/// Describes a pin type known to the system
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PinTypeDescriptor {
    /// Stable id (what blueprints reference)
    pub id: String,
    /// Display name
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Zero value for this type
    #[serde(default)]
    pub default: serde_json::Value,
}

impl PinTypeDescriptor {
    pub fn new(id: impl Into<String>, name: impl Into<String>, default: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            default,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Registry
// ─────────────────────────────────────────────────────────────────────────────

/// Registry of pin-type descriptors
pub struct PinTypeRegistry {
    types: DashMap<String, PinTypeDescriptor>,
}

impl Default for PinTypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PinTypeRegistry {
    /// Create a registry seeded with the canonical types
    pub fn new() -> Self {
        let registry = Self {
            types: DashMap::new(),
        };
        registry.register(PinTypeDescriptor::new("string", "String", serde_json::json!("")));
        registry.register(PinTypeDescriptor::new("number", "Number", serde_json::json!(0)));
        registry.register(PinTypeDescriptor::new("boolean", "Boolean", serde_json::json!(false)));
        registry.register(PinTypeDescriptor::new("array", "Array", serde_json::json!([])));
        registry.register(PinTypeDescriptor::new("object", "Object", serde_json::json!({})));
        registry.register(PinTypeDescriptor::new("any", "Any", serde_json::Value::Null));
        registry.register(PinTypeDescriptor::new(
            "execution",
            "Execution",
            serde_json::Value::Null,
        ));
        registry
    }

    /// Register or replace a descriptor
    pub fn register(&self, descriptor: PinTypeDescriptor) {
        self.types.insert(descriptor.id.clone(), descriptor);
    }

    /// Look up a descriptor by stable id
    pub fn get(&self, id: &str) -> Option<PinTypeDescriptor> {
        self.types.get(id).map(|d| d.clone())
    }

    /// Check if a type id is registered
    pub fn contains(&self, id: &str) -> bool {
        self.types.contains_key(id)
    }

    /// The zero value for a pin type (null for unregistered ids)
    pub fn default_value(&self, pin_type: &PinType) -> serde_json::Value {
        self.get(pin_type.id())
            .map(|d| d.default)
            .unwrap_or(serde_json::Value::Null)
    }

    /// All registered type ids, sorted
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<_> = self.types.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }
}
