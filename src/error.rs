use crate::wait::TerminalState;
use reqwest::StatusCode;
use serde_json::Value;
use std::fmt;

/// Errors raised while talking to the API.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("failed to build request: {0}")]
    Request(String),
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected response status: {0}")]
    Response(StatusCode),
    #[error("service error ({code}): {body}")]
    Service { code: StatusCode, body: Value },
    #[error("malformed payload: {0}")]
    Payload(String),
}

/// Which input of a reconciliation was inconsistent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordSet {
    Existing,
    Needed,
}

impl fmt::Display for RecordSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Existing => f.write_str("existing"),
            Self::Needed => f.write_str("needed"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EnsureError {
    #[error("{set} records obstruct each other: {existing} obstructs {new}")]
    InvariantViolation {
        set: RecordSet,
        existing: Value,
        new: Value,
    },
    #[error("{kind} {pending:?} never became {state}")]
    ReconciliationTimeout {
        kind: String,
        state: TerminalState,
        pending: Vec<String>,
    },
    #[error("backing store failure: {0}")]
    BackingStore(#[from] ClientError),
    #[error("{kind} record is missing its primary key '{key}'")]
    MissingKey { kind: String, key: String },
    #[error("record has no field '{0}'")]
    MissingField(String),
    #[error("no record matches the filter")]
    NotFound,
    #[error("{0} records match the filter, expected at most one")]
    Ambiguous(usize),
}

impl EnsureError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::ReconciliationTimeout { .. })
    }

    /// Keys still pending when a wait gave up.
    pub fn pending(&self) -> &[String] {
        match self {
            Self::ReconciliationTimeout { pending, .. } => pending,
            _ => &[],
        }
    }
}

pub type Result<T, E = EnsureError> = std::result::Result<T, E>;
