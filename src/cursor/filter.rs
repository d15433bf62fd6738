//! Predicate filtering decorator

use std::sync::Arc;

use super::{BoxCursor, CursorError, CursorResult, RecordCursor};
use crate::query::Filter;
use crate::record::Record;
use crate::schema::Schema;

/// Yields only records satisfying a predicate.
///
/// With [`Filter::Exclude`] the cursor is empty from the start and never
/// pulls from the inner cursor.
pub struct FilterCursor {
    inner: BoxCursor,
    filter: Filter,
    pending: Option<Record>,
    exhausted: bool,
    closed: bool,
}

impl FilterCursor {
    pub fn new(inner: BoxCursor, filter: Filter) -> Self {
        let exhausted = filter.is_exclude();
        Self {
            inner,
            filter,
            pending: None,
            exhausted,
            closed: false,
        }
    }
}

impl RecordCursor for FilterCursor {
    fn schema(&self) -> &Arc<Schema> {
        self.inner.schema()
    }

    fn has_next(&mut self) -> CursorResult<bool> {
        if self.closed {
            return Err(CursorError::Closed);
        }
        if self.pending.is_some() {
            return Ok(true);
        }
        while !self.exhausted {
            if !self.inner.has_next()? {
                self.exhausted = true;
                break;
            }
            let record = self.inner.next()?;
            if self.filter.evaluate(&record) {
                self.pending = Some(record);
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn next(&mut self) -> CursorResult<Record> {
        if !self.has_next()? {
            return Err(CursorError::NoSuchRecord);
        }
        self.pending.take().ok_or(CursorError::NoSuchRecord)
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.pending = None;
            self.inner.close();
        }
    }
}

impl Drop for FilterCursor {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::testing::ProbeCursor;
    use crate::cursor::{collect, VecCursor};
    use crate::record::Value;
    use crate::schema::AttributeDescriptor;

    fn data() -> (Arc<Schema>, Vec<Record>) {
        let schema = Arc::new(Schema::new("t", vec![AttributeDescriptor::int("v")]));
        let recs = (1..=6)
            .map(|i| Record::new(format!("r{}", i), Arc::clone(&schema), vec![Value::Int(i)]))
            .collect();
        (schema, recs)
    }

    #[test]
    fn test_filters_records() {
        let (schema, recs) = data();
        let c = FilterCursor::new(Box::new(VecCursor::new(schema, recs)), Filter::gt("v", 3i64));
        let ids: Vec<String> = collect(c)
            .unwrap()
            .iter()
            .map(|r| r.id().to_string())
            .collect();
        assert_eq!(ids, vec!["r4", "r5", "r6"]);
    }

    #[test]
    fn test_exclude_never_touches_inner() {
        let (schema, recs) = data();
        let (probe, stats) = ProbeCursor::new(schema, recs);
        let mut c = FilterCursor::new(Box::new(probe), Filter::Exclude);
        assert!(!c.has_next().unwrap());
        assert!(matches!(c.next(), Err(CursorError::NoSuchRecord)));
        c.close();
        assert_eq!(stats.next_calls(), 0);
        assert_eq!(stats.has_next_calls(), 0);
        assert_eq!(stats.close_calls(), 1);
    }

    #[test]
    fn test_has_next_is_idempotent() {
        let (schema, recs) = data();
        let mut c = FilterCursor::new(Box::new(VecCursor::new(schema, recs)), Filter::eq("v", 2i64));
        assert!(c.has_next().unwrap());
        assert!(c.has_next().unwrap());
        assert_eq!(c.next().unwrap().id(), "r2");
        assert!(!c.has_next().unwrap());
    }

    #[test]
    fn test_drop_closes_inner_once() {
        let (schema, recs) = data();
        let (probe, stats) = ProbeCursor::new(schema, recs);
        {
            let mut c = FilterCursor::new(Box::new(probe), Filter::Include);
            c.next().unwrap();
            c.close();
        }
        assert_eq!(stats.close_calls(), 1);
    }
}
