//! Offset and row-limit decorators

use std::sync::Arc;

use super::{BoxCursor, CursorError, CursorResult, RecordCursor};
use crate::record::Record;
use crate::schema::Schema;

/// Discards the first `n` records, then passes through.
///
/// Skipping happens lazily on the first `has_next`.
pub struct SkipCursor {
    inner: BoxCursor,
    remaining_skip: usize,
    closed: bool,
}

impl SkipCursor {
    pub fn new(inner: BoxCursor, n: usize) -> Self {
        Self {
            inner,
            remaining_skip: n,
            closed: false,
        }
    }
}

impl RecordCursor for SkipCursor {
    fn schema(&self) -> &Arc<Schema> {
        self.inner.schema()
    }

    fn has_next(&mut self) -> CursorResult<bool> {
        if self.closed {
            return Err(CursorError::Closed);
        }
        while self.remaining_skip > 0 {
            if !self.inner.has_next()? {
                self.remaining_skip = 0;
                return Ok(false);
            }
            self.inner.next()?;
            self.remaining_skip -= 1;
        }
        self.inner.has_next()
    }

    fn next(&mut self) -> CursorResult<Record> {
        if !self.has_next()? {
            return Err(CursorError::NoSuchRecord);
        }
        self.inner.next()
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.inner.close();
        }
    }
}

impl Drop for SkipCursor {
    fn drop(&mut self) {
        self.close();
    }
}

/// Yields at most `n` records. Once the limit is reached the inner cursor
/// is closed eagerly; `n == 0` never pulls from it.
pub struct LimitCursor {
    inner: BoxCursor,
    remaining: usize,
    inner_closed: bool,
    closed: bool,
}

impl LimitCursor {
    pub fn new(inner: BoxCursor, n: usize) -> Self {
        Self {
            inner,
            remaining: n,
            inner_closed: false,
            closed: false,
        }
    }

    fn release_inner(&mut self) {
        if !self.inner_closed {
            self.inner_closed = true;
            self.inner.close();
        }
    }
}

impl RecordCursor for LimitCursor {
    fn schema(&self) -> &Arc<Schema> {
        self.inner.schema()
    }

    fn has_next(&mut self) -> CursorResult<bool> {
        if self.closed {
            return Err(CursorError::Closed);
        }
        if self.remaining == 0 {
            self.release_inner();
            return Ok(false);
        }
        self.inner.has_next()
    }

    fn next(&mut self) -> CursorResult<Record> {
        if !self.has_next()? {
            return Err(CursorError::NoSuchRecord);
        }
        let record = self.inner.next()?;
        self.remaining -= 1;
        if self.remaining == 0 {
            self.release_inner();
        }
        Ok(record)
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.release_inner();
        }
    }
}

impl Drop for LimitCursor {
    fn drop(&mut self) {
        self.close();
    }
}
