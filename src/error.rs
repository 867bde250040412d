//! Worker-plane error taxonomy.
//!
//! A hand-rolled enum with manual `Display`/`Error` impls, matched to the
//! style of the storage-layer errors this crate's error model is grounded
//! on, rather than introducing a derive-macro crate for it.

use std::fmt;

/// Result type alias used throughout the worker plane.
pub type WorkerResult<T> = Result<T, WorkerError>;

/// Sub-kinds of probe failure, recorded on the `MonitorCheck` row; these
/// never escalate past the check itself.
#[derive(Debug, Clone)]
pub enum ProbeError {
    Timeout,
    ConnectError(String),
    TlsError(String),
    HttpStatus(u16),
    KeywordMissing,
}

impl fmt::Display for ProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeError::Timeout => write!(f, "probe timed out"),
            ProbeError::ConnectError(msg) => write!(f, "connection failed: {}", msg),
            ProbeError::TlsError(msg) => write!(f, "TLS error: {}", msg),
            ProbeError::HttpStatus(code) => write!(f, "unexpected HTTP status {}", code),
            ProbeError::KeywordMissing => write!(f, "expected body keyword not found"),
        }
    }
}

impl std::error::Error for ProbeError {}

#[derive(Debug)]
pub enum WorkerError {
    /// Invalid target URL, threshold out of range, missing channel config.
    ValidationError(String),
    /// Entity absent.
    NotFound(String),
    /// Uniqueness or state-machine violation.
    Conflict(String),
    /// Transient storage error; the current tick aborts and the next retries.
    StorageUnavailable(String),
    /// Probe-level failure; callers record this on the check row.
    Probe(ProbeError),
    /// Channel delivery failed after exhausting retries; logged, does not
    /// block delivery to other channels.
    DeliveryError(String),
    /// Cooperative shutdown in progress.
    Cancelled,
}

impl fmt::Display for WorkerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerError::ValidationError(msg) => write!(f, "validation error: {}", msg),
            WorkerError::NotFound(what) => write!(f, "not found: {}", what),
            WorkerError::Conflict(msg) => write!(f, "conflict: {}", msg),
            WorkerError::StorageUnavailable(msg) => write!(f, "storage unavailable: {}", msg),
            WorkerError::Probe(e) => write!(f, "probe error: {}", e),
            WorkerError::DeliveryError(msg) => write!(f, "delivery error: {}", msg),
            WorkerError::Cancelled => write!(f, "operation cancelled"),
        }
    }
}

impl std::error::Error for WorkerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WorkerError::Probe(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ProbeError> for WorkerError {
    fn from(e: ProbeError) -> Self {
        WorkerError::Probe(e)
    }
}

impl From<rusqlite::Error> for WorkerError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::QueryReturnedNoRows => {
                WorkerError::NotFound("row not found".to_string())
            }
            rusqlite::Error::SqliteFailure(e, ref msg)
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                WorkerError::Conflict(msg.clone().unwrap_or_else(|| e.to_string()))
            }
            other => WorkerError::StorageUnavailable(other.to_string()),
        }
    }
}
