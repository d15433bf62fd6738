//! Store error types
//!
//! Every public facade operation returns [`StoreResult`]. Failures raised
//! while pulling records ([`CursorError`]) are re-wrapped here so that no
//! iteration failure reaches a caller unmarked.
//!
//! Error codes:
//! - FS_SCHEMA_NOT_FOUND (ERROR)
//! - FS_SCHEMA_EXISTS (ERROR)
//! - FS_BACKEND_UNAVAILABLE (FATAL)
//! - FS_MALFORMED_QUERY (ERROR)
//! - FS_CURSOR_FAILED (ERROR)
//! - FS_NOT_IMPLEMENTED (ERROR)
//! - FS_EXECUTION_LIMIT (ERROR)
//! - FS_CONFIG_INVALID (ERROR)
//! - FS_TRANSACTION_CONFLICT (ERROR)

use std::fmt;

use crate::cursor::CursorError;

/// Severity levels for store errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Operation failed but the store is healthy
    Error,
    /// The backing store can no longer be trusted
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Store error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorCode {
    /// Requested schema is not registered
    SchemaNotFound,
    /// Schema name already registered
    SchemaExists,
    /// Backend cannot serve the request
    BackendUnavailable,
    /// Query is structurally invalid for the target schema
    MalformedQuery,
    /// A cursor failed while records were being pulled
    CursorFailed,
    /// Requested feature is explicitly unsupported
    NotImplemented,
    /// A bounded resource was exceeded
    ExecutionLimit,
    /// Configuration rejected during load/validation
    ConfigInvalid,
    /// Transactional edit contradicts pending edits
    TransactionConflict,
}

impl StoreErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            StoreErrorCode::SchemaNotFound => "FS_SCHEMA_NOT_FOUND",
            StoreErrorCode::SchemaExists => "FS_SCHEMA_EXISTS",
            StoreErrorCode::BackendUnavailable => "FS_BACKEND_UNAVAILABLE",
            StoreErrorCode::MalformedQuery => "FS_MALFORMED_QUERY",
            StoreErrorCode::CursorFailed => "FS_CURSOR_FAILED",
            StoreErrorCode::NotImplemented => "FS_NOT_IMPLEMENTED",
            StoreErrorCode::ExecutionLimit => "FS_EXECUTION_LIMIT",
            StoreErrorCode::ConfigInvalid => "FS_CONFIG_INVALID",
            StoreErrorCode::TransactionConflict => "FS_TRANSACTION_CONFLICT",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            StoreErrorCode::BackendUnavailable => Severity::Fatal,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for StoreErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Checked failure surfaced at store boundaries
#[derive(Debug)]
pub struct StoreError {
    code: StoreErrorCode,
    message: String,
}

impl StoreError {
    fn new(code: StoreErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Schema lookup failed
    pub fn schema_not_found(name: &str) -> Self {
        Self::new(
            StoreErrorCode::SchemaNotFound,
            format!("Schema '{}' not found", name),
        )
    }

    /// Schema name is already taken
    pub fn schema_exists(name: &str) -> Self {
        Self::new(
            StoreErrorCode::SchemaExists,
            format!("Schema '{}' already exists", name),
        )
    }

    /// Backend cannot serve the request
    pub fn backend_unavailable(reason: impl Into<String>) -> Self {
        Self::new(StoreErrorCode::BackendUnavailable, reason)
    }

    /// Query rejected before execution
    pub fn malformed_query(reason: impl Into<String>) -> Self {
        Self::new(StoreErrorCode::MalformedQuery, reason)
    }

    /// Iteration failed underneath a boundary call
    pub fn cursor_failed(reason: impl Into<String>) -> Self {
        Self::new(StoreErrorCode::CursorFailed, reason)
    }

    /// Feature explicitly unsupported
    pub fn not_implemented(what: impl Into<String>) -> Self {
        Self::new(StoreErrorCode::NotImplemented, what)
    }

    /// Resource bound exceeded
    pub fn execution_limit(reason: impl Into<String>) -> Self {
        Self::new(StoreErrorCode::ExecutionLimit, reason)
    }

    /// Configuration rejected
    pub fn config_invalid(reason: impl Into<String>) -> Self {
        Self::new(StoreErrorCode::ConfigInvalid, reason)
    }

    /// Pending transactional edits conflict
    pub fn transaction_conflict(reason: impl Into<String>) -> Self {
        Self::new(StoreErrorCode::TransactionConflict, reason)
    }

    /// Returns the error code
    pub fn code(&self) -> StoreErrorCode {
        self.code
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns whether this is a fatal error
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.severity(),
            self.code.code(),
            self.message
        )
    }
}

impl std::error::Error for StoreError {}

impl From<CursorError> for StoreError {
    fn from(err: CursorError) -> Self {
        match err {
            CursorError::BufferLimit(limit) => StoreError::execution_limit(format!(
                "sort buffer exceeded {} records",
                limit
            )),
            other => StoreError::cursor_failed(other.to_string()),
        }
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;
