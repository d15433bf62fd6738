//! Record cursors and cursor decorators
//!
//! A [`RecordCursor`] is a pull-based, forward-only, closeable sequence
//! of records sharing one schema. Every decorator wraps exactly one inner
//! cursor by ownership and implements the same trait, so query clauses
//! compose by wrapping.
//!
//! # Lifecycle
//!
//! 1. `has_next` reports whether a record is pending (may pull and buffer
//!    one record from the inner cursor).
//! 2. `next` hands the pending record over by move.
//! 3. `close` releases resources. It is idempotent and closes the inner
//!    cursor exactly once. Streaming decorators also close from `Drop`;
//!    a sort closes its inner cursor as soon as it has drained it.
//!
//! Cursors are `Send` but not `Sync`: one cursor must not be shared by
//! several threads.

mod errors;
mod filter;
mod memory;
mod project;
mod reproject;
mod resample;
mod sort;
mod window;

pub use errors::{CursorError, CursorResult};
pub use filter::FilterCursor;
pub use memory::{EmptyCursor, VecCursor};
pub use project::ProjectCursor;
pub use reproject::{ReprojectCursor, TransformFailurePolicy};
pub use resample::{decimate, ResampleCursor};
pub use sort::SortCursor;
pub use window::{LimitCursor, SkipCursor};

use std::sync::Arc;

use crate::record::Record;
use crate::schema::Schema;

/// Forward-only, single-pass sequence of records
pub trait RecordCursor: Send {
    /// Schema of every record this cursor yields
    fn schema(&self) -> &Arc<Schema>;

    /// Whether another record is pending. Fails with
    /// [`CursorError::Closed`] after `close`.
    fn has_next(&mut self) -> CursorResult<bool>;

    /// Hands over the pending record. Fails with
    /// [`CursorError::NoSuchRecord`] when nothing is pending.
    fn next(&mut self) -> CursorResult<Record>;

    /// Releases all resources. Idempotent.
    fn close(&mut self);
}

/// Owned, type-erased cursor
pub type BoxCursor = Box<dyn RecordCursor>;

impl RecordCursor for BoxCursor {
    fn schema(&self) -> &Arc<Schema> {
        (**self).schema()
    }

    fn has_next(&mut self) -> CursorResult<bool> {
        (**self).has_next()
    }

    fn next(&mut self) -> CursorResult<Record> {
        (**self).next()
    }

    fn close(&mut self) {
        (**self).close()
    }
}

/// Drains a cursor into a vector. The cursor is closed on every path.
pub fn collect(mut cursor: impl RecordCursor) -> CursorResult<Vec<Record>> {
    let mut out = Vec::new();
    let result = loop {
        match cursor.has_next() {
            Ok(true) => match cursor.next() {
                Ok(record) => out.push(record),
                Err(e) => break Err(e),
            },
            Ok(false) => break Ok(()),
            Err(e) => break Err(e),
        }
    };
    cursor.close();
    result.map(|_| out)
}

/// Counts the records of a cursor. The cursor is closed on every path.
pub fn count(mut cursor: impl RecordCursor) -> CursorResult<u64> {
    let mut n = 0u64;
    let result = loop {
        match cursor.has_next() {
            Ok(true) => match cursor.next() {
                Ok(_) => n += 1,
                Err(e) => break Err(e),
            },
            Ok(false) => break Ok(()),
            Err(e) => break Err(e),
        }
    };
    cursor.close();
    result.map(|_| n)
}

/// Adapts a cursor to `Iterator`. Iteration stops after the first error
/// and the cursor is closed once exhausted or failed.
pub struct CursorIter<C: RecordCursor> {
    cursor: C,
    done: bool,
}

impl<C: RecordCursor> CursorIter<C> {
    pub fn new(cursor: C) -> Self {
        Self {
            cursor,
            done: false,
        }
    }

    fn finish(&mut self) {
        self.done = true;
        self.cursor.close();
    }
}

impl<C: RecordCursor> Iterator for CursorIter<C> {
    type Item = CursorResult<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.cursor.has_next() {
            Ok(true) => {
                let item = self.cursor.next();
                if item.is_err() {
                    self.finish();
                }
                Some(item)
            }
            Ok(false) => {
                self.finish();
                None
            }
            Err(e) => {
                self.finish();
                Some(Err(e))
            }
        }
    }
}

impl<C: RecordCursor> Drop for CursorIter<C> {
    fn drop(&mut self) {
        if !self.done {
            self.cursor.close();
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::ProbeCursor;
    use super::*;
    use crate::record::Value;
    use crate::schema::AttributeDescriptor;

    fn records(n: i64) -> (Arc<Schema>, Vec<Record>) {
        let schema = Arc::new(Schema::new("t", vec![AttributeDescriptor::int("v")]));
        let recs = (0..n)
            .map(|i| Record::new(format!("r{}", i), Arc::clone(&schema), vec![Value::Int(i)]))
            .collect();
        (schema, recs)
    }

    #[test]
    fn test_collect_closes_cursor() {
        let (schema, recs) = records(3);
        let (probe, stats) = ProbeCursor::new(schema, recs);
        let out = collect(probe).unwrap();
        assert_eq!(out.len(), 3);
        assert_eq!(stats.close_calls(), 1);
    }

    #[test]
    fn test_count() {
        let (schema, recs) = records(4);
        assert_eq!(count(VecCursor::new(schema, recs)).unwrap(), 4);
    }

    #[test]
    fn test_iterator_adapter() {
        let (schema, recs) = records(2);
        let (probe, stats) = ProbeCursor::new(schema, recs);
        let ids: Vec<String> = CursorIter::new(probe)
            .map(|r| r.unwrap().id().to_string())
            .collect();
        assert_eq!(ids, vec!["r0", "r1"]);
        assert_eq!(stats.close_calls(), 1);
    }
}
