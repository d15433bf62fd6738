//! Typed log events emitted by the store

use std::fmt;

/// Observable events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Queries
    /// A query reached the facade
    QueryReceived,
    /// Residual clauses were wrapped around the native cursor
    PipelineBuilt,
    /// A sort buffered its whole input
    SortMaterialized,
    /// A record that failed to reproject was left out
    TransformSkipped,
    /// Count had no native answer and iterated
    CountFallback,
    /// Extent had no native answer, or pending removals forced iteration
    ExtentFallback,

    // Transactions
    TransactionBegin,
    TransactionCommit,
    TransactionRollback,
    /// Replaying a transaction into the backend failed midway
    TransactionFailed,

    // Structure
    SchemaCreated,
    SchemaUpdated,
    SchemaRemoved,

    // Notification
    /// A listener panicked while handling an event
    ListenerFailed,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::QueryReceived => "QUERY_RECEIVED",
            Event::PipelineBuilt => "PIPELINE_BUILT",
            Event::SortMaterialized => "SORT_MATERIALIZED",
            Event::TransformSkipped => "TRANSFORM_SKIPPED",
            Event::CountFallback => "COUNT_FALLBACK",
            Event::ExtentFallback => "EXTENT_FALLBACK",

            Event::TransactionBegin => "TRANSACTION_BEGIN",
            Event::TransactionCommit => "TRANSACTION_COMMIT",
            Event::TransactionRollback => "TRANSACTION_ROLLBACK",
            Event::TransactionFailed => "TRANSACTION_FAILED",

            Event::SchemaCreated => "SCHEMA_CREATED",
            Event::SchemaUpdated => "SCHEMA_UPDATED",
            Event::SchemaRemoved => "SCHEMA_REMOVED",

            Event::ListenerFailed => "LISTENER_FAILED",
        }
    }

    /// Events that mean committed state may be inconsistent
    pub fn is_fatal(&self) -> bool {
        matches!(self, Event::TransactionFailed)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
