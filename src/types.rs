use chrono::{DateTime, Local};
use serde::Serialize;
use serde_json::Value;

/// Outcome of one check, recorded exactly once per invocation.
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CheckResult {
    pub name: String,
    pub success: bool,
    pub message: String,
    pub timestamp: DateTime<Local>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fault: Option<FaultKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_payload: Option<Value>,
}

impl CheckResult {
    pub fn passed(name: &str, passed: Passed) -> Self {
        CheckResult {
            name: name.to_string(),
            success: true,
            message: passed.message,
            timestamp: Local::now(),
            fault: None,
            response_payload: passed.payload,
        }
    }

    pub fn failed(name: &str, fault: Fault) -> Self {
        CheckResult {
            name: name.to_string(),
            success: false,
            message: fault.to_string(),
            timestamp: Local::now(),
            fault: Some(fault.kind()),
            response_payload: fault.into_payload(),
        }
    }
}

/// Successful check outcome: a summary line and, optionally, the body that proved it.
#[derive(Debug, Clone, PartialEq)]
pub struct Passed {
    pub message: String,
    pub payload: Option<Value>,
}

impl Passed {
    pub fn new(message: impl Into<String>) -> Self {
        Passed {
            message: message.into(),
            payload: None,
        }
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    Precondition,
    Transport,
    Status,
    Shape,
    Internal,
}

impl std::fmt::Display for FaultKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FaultKind::Precondition => write!(f, "precondition"),
            FaultKind::Transport => write!(f, "transport"),
            FaultKind::Status => write!(f, "status"),
            FaultKind::Shape => write!(f, "shape"),
            FaultKind::Internal => write!(f, "internal"),
        }
    }
}

/// Why a check did not pass.
#[derive(Debug, thiserror::Error)]
pub enum Fault {
    /// State an earlier check should have produced is missing.
    #[error("{0}")]
    Precondition(String),

    /// Connection refused, timeout, DNS failure and the like.
    #[error("Request failed: {0}")]
    Transport(String),

    #[error("{request}: expected HTTP {expected}, got HTTP {actual}: {body}")]
    Status {
        request: String,
        expected: u16,
        actual: u16,
        body: String,
    },

    /// Body parsed (or failed to parse) into something other than what was expected.
    #[error("{detail}")]
    Shape { detail: String, payload: Value },

    #[error("Unexpected error: {0}")]
    Internal(String),
}

impl Fault {
    pub fn shape(detail: impl Into<String>, payload: &Value) -> Self {
        Fault::Shape {
            detail: detail.into(),
            payload: payload.clone(),
        }
    }

    pub fn kind(&self) -> FaultKind {
        match self {
            Fault::Precondition(_) => FaultKind::Precondition,
            Fault::Transport(_) => FaultKind::Transport,
            Fault::Status { .. } => FaultKind::Status,
            Fault::Shape { .. } => FaultKind::Shape,
            Fault::Internal(_) => FaultKind::Internal,
        }
    }

    /// Diagnostic payload kept on the recorded result.
    pub fn into_payload(self) -> Option<Value> {
        match self {
            Fault::Shape { payload, .. } => Some(payload),
            Fault::Status { body, .. } if !body.is_empty() => Some(
                serde_json::from_str(&body).unwrap_or(Value::String(body)),
            ),
            _ => None,
        }
    }
}
