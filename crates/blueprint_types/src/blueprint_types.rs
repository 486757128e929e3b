//! Shared data model for the blueprint execution engine

pub mod type_registry;
pub mod types;
pub mod value;

pub use type_registry::{PinTypeDescriptor, PinTypeRegistry};
pub use types::*;
pub use value::{PinType, Value, ValueError};
