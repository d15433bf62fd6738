//! Result ordering decorator
//!
//! Unlike every other decorator, sorting is not constant-memory: the inner
//! cursor is fully materialized into a buffer when the cursor is built.
//! It is unsafe for unbounded inputs; set a buffer limit to fail such
//! reads instead of exhausting memory.

use std::cmp::Ordering;
use std::collections::VecDeque;
use std::sync::Arc;

use super::{BoxCursor, CursorError, CursorResult, RecordCursor};
use crate::observability::{Event, Logger};
use crate::query::{SortDirection, SortKey};
use crate::record::{Record, Value};
use crate::schema::Schema;

/// Serves records in sort-key order from a materialized buffer
pub struct SortCursor {
    schema: Arc<Schema>,
    buffer: VecDeque<Record>,
    closed: bool,
}

impl SortCursor {
    /// Drains and closes `inner`, then stable-sorts by `keys`. Ties keep
    /// their input order. Exceeding `max_buffered` fails with
    /// [`CursorError::BufferLimit`].
    pub fn new(
        mut inner: BoxCursor,
        keys: &[SortKey],
        max_buffered: Option<usize>,
    ) -> CursorResult<Self> {
        let schema = Arc::clone(inner.schema());
        let resolved: Vec<(Option<usize>, SortDirection)> = keys
            .iter()
            .map(|k| (schema.index_of(&k.attribute), k.direction))
            .collect();

        let drained = Self::drain(&mut inner, max_buffered);
        inner.close();
        let mut records = drained?;

        records.sort_by(|a, b| Self::compare(&resolved, a, b));

        let count = records.len().to_string();
        Logger::trace(
            Event::SortMaterialized.as_str(),
            &[("records", count.as_str()), ("schema", schema.name.as_str())],
        );

        Ok(Self {
            schema,
            buffer: records.into(),
            closed: false,
        })
    }

    fn drain(inner: &mut BoxCursor, max_buffered: Option<usize>) -> CursorResult<Vec<Record>> {
        let mut records = Vec::new();
        while inner.has_next()? {
            if let Some(limit) = max_buffered {
                if records.len() >= limit {
                    return Err(CursorError::BufferLimit(limit));
                }
            }
            records.push(inner.next()?);
        }
        Ok(records)
    }

    fn compare(keys: &[(Option<usize>, SortDirection)], a: &Record, b: &Record) -> Ordering {
        for (index, direction) in keys {
            let (av, bv) = match index {
                Some(i) => (a.get_at(*i), b.get_at(*i)),
                None => continue,
            };
            let ordering = av
                .unwrap_or(&Value::Null)
                .sort_cmp(bv.unwrap_or(&Value::Null));
            let ordering = match direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}

impl RecordCursor for SortCursor {
    fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    fn has_next(&mut self) -> CursorResult<bool> {
        if self.closed {
            return Err(CursorError::Closed);
        }
        Ok(!self.buffer.is_empty())
    }

    fn next(&mut self) -> CursorResult<Record> {
        if self.closed {
            return Err(CursorError::Closed);
        }
        self.buffer.pop_front().ok_or(CursorError::NoSuchRecord)
    }

    fn close(&mut self) {
        self.closed = true;
        self.buffer.clear();
    }
}
