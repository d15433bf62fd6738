//! In-memory leaf cursors

use std::collections::VecDeque;
use std::sync::Arc;

use super::{CursorError, CursorResult, RecordCursor};
use crate::record::Record;
use crate::schema::Schema;

/// Cursor over records already held in memory
#[derive(Debug)]
pub struct VecCursor {
    schema: Arc<Schema>,
    records: VecDeque<Record>,
    closed: bool,
}

impl VecCursor {
    pub fn new(schema: Arc<Schema>, records: Vec<Record>) -> Self {
        Self {
            schema,
            records: records.into(),
            closed: false,
        }
    }

    /// Records not yet handed out
    pub fn remaining(&self) -> usize {
        self.records.len()
    }
}

impl RecordCursor for VecCursor {
    fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    fn has_next(&mut self) -> CursorResult<bool> {
        if self.closed {
            return Err(CursorError::Closed);
        }
        Ok(!self.records.is_empty())
    }

    fn next(&mut self) -> CursorResult<Record> {
        if self.closed {
            return Err(CursorError::Closed);
        }
        self.records.pop_front().ok_or(CursorError::NoSuchRecord)
    }

    fn close(&mut self) {
        self.closed = true;
        self.records.clear();
    }
}

/// Cursor that yields nothing
#[derive(Debug)]
pub struct EmptyCursor {
    schema: Arc<Schema>,
    closed: bool,
}

impl EmptyCursor {
    pub fn new(schema: Arc<Schema>) -> Self {
        Self {
            schema,
            closed: false,
        }
    }
}

impl RecordCursor for EmptyCursor {
    fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    fn has_next(&mut self) -> CursorResult<bool> {
        if self.closed {
            return Err(CursorError::Closed);
        }
        Ok(false)
    }

    fn next(&mut self) -> CursorResult<Record> {
        if self.closed {
            return Err(CursorError::Closed);
        }
        Err(CursorError::NoSuchRecord)
    }

    fn close(&mut self) {
        self.closed = true;
    }
}
