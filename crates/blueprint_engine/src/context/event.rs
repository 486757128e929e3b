//! Event-handler context data
//!
//! When an event is raised, each bound handler node fires with its event's
//! parameters merged into the inputs map; otherwise the handler behaves
//! exactly like a standard firing.

use std::collections::HashMap;

use blueprint_types::Value;

/// The event side of a handler invocation
#[derive(Debug, Clone)]
pub struct EventContext {
    /// The run the event was raised within
    pub run_id: String,
    /// Raised event id
    pub event_id: String,
    /// Validated parameters, defaults applied
    pub params: HashMap<String, Value>,
}

impl EventContext {
    pub fn new(
        run_id: impl Into<String>,
        event_id: impl Into<String>,
        params: HashMap<String, Value>,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            event_id: event_id.into(),
            params,
        }
    }
}
