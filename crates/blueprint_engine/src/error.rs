//! Error taxonomy for blueprint execution
//!
//! Every failure inside the engine is a [`BlueprintError`]: a kind from the
//! fixed taxonomy, a stable string code, severity, and optional run/node/pin
//! attribution. Errors collected during a run are snapshotted into
//! [`ErrorReport`]s for the run result, and summarized by [`ErrorAnalysis`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Taxonomy
// ─────────────────────────────────────────────────────────────────────────────

/// Category of a blueprint error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    Validation,
    Execution,
    Connection,
    DataType,
    Permission,
    Database,
    Network,
    Timeout,
    Unknown,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Execution => "execution",
            ErrorKind::Connection => "connection",
            ErrorKind::DataType => "datatype",
            ErrorKind::Permission => "permission",
            ErrorKind::Database => "database",
            ErrorKind::Network => "network",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Unknown => "unknown",
        };
        write!(f, "{name}")
    }
}

/// How serious an error is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        };
        write!(f, "{name}")
    }
}

/// Stable error codes
pub mod codes {
    pub const BLUEPRINT_NOT_FOUND: &str = "BlueprintNotFound";
    pub const NODE_NOT_FOUND: &str = "NodeNotFound";
    pub const NODE_TYPE_NOT_REGISTERED: &str = "NodeTypeNotRegistered";
    pub const NODE_EXECUTION_FAILED: &str = "NodeExecutionFailed";
    pub const REQUIRED_INPUT_MISSING: &str = "RequiredInputMissing";
    pub const TYPE_MISMATCH: &str = "TypeMismatch";
    pub const INVALID_CONNECTION: &str = "InvalidConnection";
    pub const EVENT_NOT_REGISTERED: &str = "EventNotRegistered";
    pub const EVENT_PARAM_MISSING: &str = "EventParamMissing";
    pub const FIRING_BUDGET_EXCEEDED: &str = "FiringBudgetExceeded";
    pub const MAILBOX_FULL: &str = "MailboxFull";
    pub const SEND_TIMEOUT: &str = "SendTimeout";
    pub const RESPONSE_TIMEOUT: &str = "ResponseTimeout";
    pub const RUN_TIMEOUT: &str = "RunTimeout";
    pub const ACTOR_STOPPED: &str = "ActorStopped";
    pub const UNKNOWN: &str = "Unknown";
}

// ─────────────────────────────────────────────────────────────────────────────
// BlueprintError
// ─────────────────────────────────────────────────────────────────────────────

/// A structured error raised during loading, validation or execution
#[derive(Debug, thiserror::Error)]
#[error("{kind}/{code}: {message}")]
pub struct BlueprintError {
    pub kind: ErrorKind,
    pub code: String,
    pub severity: Severity,
    pub message: String,
    pub run_id: Option<String>,
    pub node_id: Option<String>,
    pub pin_id: Option<String>,
    pub details: HashMap<String, serde_json::Value>,
    pub recoverable: bool,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl BlueprintError {
    /// Create an error with defaults (medium severity, recoverable)
    pub fn new(kind: ErrorKind, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: code.into(),
            severity: Severity::Medium,
            message: message.into(),
            run_id: None,
            node_id: None,
            pin_id: None,
            details: HashMap::new(),
            recoverable: true,
            source: None,
        }
    }

    /// Shorthand for an execution-kind error
    pub fn execution(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Execution, code, message)
    }

    /// Shorthand for a validation-kind error
    pub fn validation(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, code, message).with_severity(Severity::High)
    }

    /// Shorthand for a data-type error
    pub fn data_type(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DataType, code, message)
    }

    /// Shorthand for a timeout error
    pub fn timeout(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, code, message).with_severity(Severity::High)
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_run(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }

    pub fn with_node(mut self, node_id: impl Into<String>) -> Self {
        self.node_id = Some(node_id.into());
        self
    }

    pub fn with_pin(mut self, pin_id: impl Into<String>) -> Self {
        self.pin_id = Some(pin_id.into());
        self
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.details.insert(key.into(), value);
        self
    }

    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn unrecoverable(mut self) -> Self {
        self.recoverable = false;
        self
    }

    /// Fill in run and node attribution without clobbering existing values
    pub fn contextualize(mut self, run_id: &str, node_id: &str) -> Self {
        if self.run_id.is_none() {
            self.run_id = Some(run_id.to_string());
        }
        if self.node_id.is_none() {
            self.node_id = Some(node_id.to_string());
        }
        self
    }

    /// Snapshot for collection into run results
    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            kind: self.kind,
            code: self.code.clone(),
            severity: self.severity,
            message: self.message.clone(),
            run_id: self.run_id.clone(),
            node_id: self.node_id.clone(),
            pin_id: self.pin_id.clone(),
            details: self.details.clone(),
            recoverable: self.recoverable,
        }
    }
}

impl From<blueprint_types::ValueError> for BlueprintError {
    fn from(err: blueprint_types::ValueError) -> Self {
        BlueprintError::data_type(codes::TYPE_MISMATCH, err.to_string())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Reports & Analysis
// ─────────────────────────────────────────────────────────────────────────────

/// Serializable snapshot of a [`BlueprintError`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub code: String,
    pub severity: Severity,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pin_id: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub details: HashMap<String, serde_json::Value>,
    pub recoverable: bool,
}

impl ErrorReport {
    /// Rebuild a propagatable error from a snapshot
    pub fn to_error(&self) -> BlueprintError {
        BlueprintError {
            kind: self.kind,
            code: self.code.clone(),
            severity: self.severity,
            message: self.message.clone(),
            run_id: self.run_id.clone(),
            node_id: self.node_id.clone(),
            pin_id: self.pin_id.clone(),
            details: self.details.clone(),
            recoverable: self.recoverable,
            source: None,
        }
    }
}

/// Summary of the errors a run collected
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorAnalysis {
    pub total: usize,
    pub by_kind: HashMap<String, usize>,
    pub by_code: HashMap<String, usize>,
    pub by_severity: HashMap<String, usize>,
    pub recoverable: usize,
    pub unrecoverable: usize,
}

impl ErrorAnalysis {
    /// Summarize a set of error reports
    pub fn analyze(reports: &[ErrorReport]) -> Self {
        let mut analysis = Self {
            total: reports.len(),
            ..Self::default()
        };
        for report in reports {
            *analysis.by_kind.entry(report.kind.to_string()).or_default() += 1;
            *analysis.by_code.entry(report.code.clone()).or_default() += 1;
            *analysis
                .by_severity
                .entry(report.severity.to_string())
                .or_default() += 1;
            if report.recoverable {
                analysis.recoverable += 1;
            } else {
                analysis.unrecoverable += 1;
            }
        }
        analysis
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_and_display() {
        let err = BlueprintError::execution(codes::NODE_EXECUTION_FAILED, "boom")
            .with_node("n1")
            .with_pin("out")
            .with_severity(Severity::High);
        assert_eq!(err.to_string(), "execution/NodeExecutionFailed: boom");
        assert_eq!(err.node_id.as_deref(), Some("n1"));
        assert_eq!(err.pin_id.as_deref(), Some("out"));
    }

    #[test]
    fn contextualize_does_not_clobber() {
        let err = BlueprintError::execution(codes::NODE_EXECUTION_FAILED, "boom")
            .with_node("original")
            .contextualize("run-1", "other");
        assert_eq!(err.node_id.as_deref(), Some("original"));
        assert_eq!(err.run_id.as_deref(), Some("run-1"));
    }

    #[test]
    fn analysis_counts() {
        let reports = vec![
            BlueprintError::execution(codes::NODE_EXECUTION_FAILED, "a").report(),
            BlueprintError::execution(codes::NODE_EXECUTION_FAILED, "b").report(),
            BlueprintError::validation(codes::INVALID_CONNECTION, "c")
                .unrecoverable()
                .report(),
        ];
        let analysis = ErrorAnalysis::analyze(&reports);
        assert_eq!(analysis.total, 3);
        assert_eq!(analysis.by_kind.get("execution"), Some(&2));
        assert_eq!(analysis.by_code.get("NodeExecutionFailed"), Some(&2));
        assert_eq!(analysis.unrecoverable, 1);
    }
}
