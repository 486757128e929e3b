//! Pin-typed values that flow across data wires
//!
//! Every value carries an explicit pin-type tag alongside its raw payload.
//! Constructors enforce the tag; coercion helpers convert best-effort and
//! signal a type mismatch when the payload cannot be read as the requested
//! shape.

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Pin Types
// ─────────────────────────────────────────────────────────────────────────────

/// Data types that can flow through pins
///
/// Execution pins carry no value; they only sequence control flow. `Any` is
/// the dynamic fallback and always preserves the original raw payload.
/// Domain extensions are represented by their stable id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PinType {
    String,
    Number,
    Boolean,
    Array,
    Object,
    Any,
    Execution,
    /// User-defined type, identified by its stable id
    User(String),
}

impl PinType {
    /// Stable identifier used in blueprint JSON
    pub fn id(&self) -> &str {
        match self {
            PinType::String => "string",
            PinType::Number => "number",
            PinType::Boolean => "boolean",
            PinType::Array => "array",
            PinType::Object => "object",
            PinType::Any => "any",
            PinType::Execution => "execution",
            PinType::User(id) => id,
        }
    }

    /// Resolve a stable id back to a pin type (unknown ids become `User`)
    pub fn from_id(id: &str) -> Self {
        match id {
            "string" => PinType::String,
            "number" => PinType::Number,
            "boolean" => PinType::Boolean,
            "array" => PinType::Array,
            "object" => PinType::Object,
            "any" => PinType::Any,
            "execution" => PinType::Execution,
            other => PinType::User(other.to_string()),
        }
    }

    /// Check if this is an execution pin type
    pub fn is_execution(&self) -> bool {
        matches!(self, PinType::Execution)
    }

    /// Check if this is a data pin type
    pub fn is_data(&self) -> bool {
        !self.is_execution()
    }

    /// Check whether a raw payload is acceptable under this tag
    ///
    /// `Any` and user-defined types accept everything; a JSON null is
    /// acceptable under every tag (an absent value).
    pub fn accepts(&self, raw: &serde_json::Value) -> bool {
        if raw.is_null() {
            return true;
        }
        match self {
            PinType::String => raw.is_string(),
            PinType::Number => raw.is_number(),
            PinType::Boolean => raw.is_boolean(),
            PinType::Array => raw.is_array(),
            PinType::Object => raw.is_object(),
            PinType::Any | PinType::User(_) => true,
            PinType::Execution => false,
        }
    }

    /// Infer the closest tag for a raw payload
    pub fn infer(raw: &serde_json::Value) -> Self {
        match raw {
            serde_json::Value::String(_) => PinType::String,
            serde_json::Value::Number(_) => PinType::Number,
            serde_json::Value::Bool(_) => PinType::Boolean,
            serde_json::Value::Array(_) => PinType::Array,
            serde_json::Value::Object(_) => PinType::Object,
            serde_json::Value::Null => PinType::Any,
        }
    }
}

impl std::fmt::Display for PinType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

impl Serialize for PinType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.id())
    }
}

impl<'de> Deserialize<'de> for PinType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let id = String::deserialize(deserializer)?;
        Ok(PinType::from_id(&id))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Value Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Error raised when a value cannot be constructed or coerced
#[derive(Debug, Clone, thiserror::Error)]
pub enum ValueError {
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },
}

impl ValueError {
    pub fn mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        ValueError::TypeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Value
// ─────────────────────────────────────────────────────────────────────────────

/// A tagged value: pin type plus raw payload
///
/// The raw payload may be JSON null, meaning the value is present on the wire
/// but carries nothing ("nil").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Value {
    #[serde(rename = "type")]
    pin_type: PinType,
    #[serde(rename = "value")]
    raw: serde_json::Value,
}

impl Value {
    /// Create a value, enforcing that the payload matches the tag
    pub fn new(pin_type: PinType, raw: serde_json::Value) -> Result<Self, ValueError> {
        if !pin_type.accepts(&raw) {
            return Err(ValueError::mismatch(
                pin_type.id(),
                PinType::infer(&raw).id(),
            ));
        }
        Ok(Self { pin_type, raw })
    }

    /// Create a string value
    pub fn string(s: impl Into<String>) -> Self {
        Self {
            pin_type: PinType::String,
            raw: serde_json::Value::String(s.into()),
        }
    }

    /// Create a number value
    pub fn number(n: f64) -> Self {
        Self {
            pin_type: PinType::Number,
            raw: serde_json::Number::from_f64(n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
        }
    }

    /// Create an integer number value
    pub fn integer(n: i64) -> Self {
        Self {
            pin_type: PinType::Number,
            raw: serde_json::Value::Number(n.into()),
        }
    }

    /// Create a boolean value
    pub fn boolean(b: bool) -> Self {
        Self {
            pin_type: PinType::Boolean,
            raw: serde_json::Value::Bool(b),
        }
    }

    /// Create an array value
    pub fn array(items: Vec<serde_json::Value>) -> Self {
        Self {
            pin_type: PinType::Array,
            raw: serde_json::Value::Array(items),
        }
    }

    /// Create an object value
    pub fn object(fields: serde_json::Map<String, serde_json::Value>) -> Self {
        Self {
            pin_type: PinType::Object,
            raw: serde_json::Value::Object(fields),
        }
    }

    /// Wrap an arbitrary payload as `Any`, preserving the raw
    pub fn any(raw: serde_json::Value) -> Self {
        Self {
            pin_type: PinType::Any,
            raw,
        }
    }

    /// A nil value under the given tag
    pub fn nil(pin_type: PinType) -> Self {
        Self {
            pin_type,
            raw: serde_json::Value::Null,
        }
    }

    /// Wrap a raw payload under its inferred tag
    pub fn infer(raw: serde_json::Value) -> Self {
        Self {
            pin_type: PinType::infer(&raw),
            raw,
        }
    }

    /// The pin-type tag
    pub fn pin_type(&self) -> &PinType {
        &self.pin_type
    }

    /// The raw payload
    pub fn raw(&self) -> &serde_json::Value {
        &self.raw
    }

    /// Consume the value, returning the raw payload
    pub fn into_raw(self) -> serde_json::Value {
        self.raw
    }

    /// Check if the payload is absent
    pub fn is_nil(&self) -> bool {
        self.raw.is_null()
    }

    fn actual(&self) -> &'static str {
        match &self.raw {
            serde_json::Value::Null => "nil",
            serde_json::Value::Bool(_) => "boolean",
            serde_json::Value::Number(_) => "number",
            serde_json::Value::String(_) => "string",
            serde_json::Value::Array(_) => "array",
            serde_json::Value::Object(_) => "object",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Coercions
// ─────────────────────────────────────────────────────────────────────────────

impl Value {
    /// Coerce to a string (numbers and booleans are formatted)
    pub fn as_string(&self) -> Result<String, ValueError> {
        match &self.raw {
            serde_json::Value::String(s) => Ok(s.clone()),
            serde_json::Value::Number(n) => Ok(n.to_string()),
            serde_json::Value::Bool(b) => Ok(b.to_string()),
            _ => Err(ValueError::mismatch("string", self.actual())),
        }
    }

    /// Coerce to a number (strings are parsed)
    pub fn as_number(&self) -> Result<f64, ValueError> {
        match &self.raw {
            serde_json::Value::Number(n) => n
                .as_f64()
                .ok_or_else(|| ValueError::mismatch("number", "number")),
            serde_json::Value::String(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| ValueError::mismatch("number", "string")),
            _ => Err(ValueError::mismatch("number", self.actual())),
        }
    }

    /// Coerce to a boolean ("true"/"false" strings are parsed)
    pub fn as_boolean(&self) -> Result<bool, ValueError> {
        match &self.raw {
            serde_json::Value::Bool(b) => Ok(*b),
            serde_json::Value::String(s) => match s.trim() {
                "true" => Ok(true),
                "false" => Ok(false),
                _ => Err(ValueError::mismatch("boolean", "string")),
            },
            _ => Err(ValueError::mismatch("boolean", self.actual())),
        }
    }

    /// Read as an array (by reference; no element conversion)
    pub fn as_array(&self) -> Result<&Vec<serde_json::Value>, ValueError> {
        match &self.raw {
            serde_json::Value::Array(items) => Ok(items),
            _ => Err(ValueError::mismatch("array", self.actual())),
        }
    }

    /// Read as an object (by reference; no field conversion)
    pub fn as_object(&self) -> Result<&serde_json::Map<String, serde_json::Value>, ValueError> {
        match &self.raw {
            serde_json::Value::Object(fields) => Ok(fields),
            _ => Err(ValueError::mismatch("object", self.actual())),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// From Implementations
// ─────────────────────────────────────────────────────────────────────────────

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::string(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::string(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::number(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::integer(v as i64)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::boolean(v)
    }
}

impl From<serde_json::Value> for Value {
    fn from(raw: serde_json::Value) -> Self {
        Value::infer(raw)
    }
}

impl From<Value> for serde_json::Value {
    fn from(v: Value) -> Self {
        v.raw
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
