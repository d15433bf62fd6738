//! Contracts a concrete store implements

use std::sync::Arc;

use crate::cursor::BoxCursor;
use crate::query::{AppliedClauses, Filter, Query};
use crate::record::{Extent, Record};
use crate::schema::Schema;

use super::errors::StoreResult;

/// A native cursor plus the clauses the store applied to it
pub struct NativeCursor {
    pub cursor: BoxCursor,
    pub applied: AppliedClauses,
}

impl NativeCursor {
    pub fn new(cursor: BoxCursor, applied: AppliedClauses) -> Self {
        Self { cursor, applied }
    }

    /// Raw stream: every clause is left to the pipeline
    pub fn raw(cursor: BoxCursor) -> Self {
        Self::new(cursor, AppliedClauses::none())
    }
}

/// Edits records of one schema.
///
/// In-place writers walk the records matching a predicate: `next` hands
/// out the current record, `write` replaces it, `remove` deletes it.
/// Append writers start at end of stream: `has_next` is false, `next`
/// hands out a blank record with a fresh identifier, and `write` appends.
pub trait RecordWriter: Send {
    fn schema(&self) -> &Arc<Schema>;

    fn has_next(&mut self) -> StoreResult<bool>;

    fn next(&mut self) -> StoreResult<Record>;

    fn write(&mut self, record: Record) -> StoreResult<()>;

    /// Deletes the record last returned by `next`
    fn remove(&mut self) -> StoreResult<()>;

    /// Idempotent
    fn close(&mut self);
}

/// Minimal backing store. Only `cursor` has to stream records; every
/// clause it does not apply is layered on by the pipeline, and the
/// aggregate fast paths default to "unavailable".
pub trait BackingStore: Send + Sync {
    fn names(&self) -> StoreResult<Vec<String>>;

    fn schema(&self, name: &str) -> StoreResult<Arc<Schema>>;

    fn create_schema(&self, schema: Schema) -> StoreResult<Arc<Schema>>;

    /// Replaces a schema and returns the previous one
    fn update_schema(&self, schema: Schema) -> StoreResult<Arc<Schema>>;

    /// Drops a schema and its records, returning the dropped schema
    fn remove_schema(&self, name: &str) -> StoreResult<Arc<Schema>>;

    fn cursor(&self, query: &Query) -> StoreResult<NativeCursor>;

    fn writer(&self, name: &str, filter: &Filter) -> StoreResult<Box<dyn RecordWriter>>;

    fn appender(&self, name: &str) -> StoreResult<Box<dyn RecordWriter>>;

    /// Committed count of records matching `query.filter`, when the store
    /// can compute it without iterating
    fn count(&self, _query: &Query) -> StoreResult<Option<u64>> {
        Ok(None)
    }

    /// Committed bounds of records matching `query.filter`, when the store
    /// can compute it without iterating. `None` also when nothing has
    /// bounds; callers then iterate.
    fn extent(&self, _query: &Query) -> StoreResult<Option<Extent>> {
        Ok(None)
    }
}

/// Anything that answers queries with cursors: the right side of a join
pub trait RecordSource: Send + Sync {
    fn schema(&self, name: &str) -> StoreResult<Arc<Schema>>;

    fn query(&self, query: &Query) -> StoreResult<BoxCursor>;
}
