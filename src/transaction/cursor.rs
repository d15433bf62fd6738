//! Transactional view over a committed cursor

use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;

use super::diff::{Diff, ModifiedEntry};
use crate::cursor::{BoxCursor, CursorError, CursorResult, RecordCursor};
use crate::query::Filter;
use crate::record::Record;
use crate::schema::Schema;

/// Splices a snapshot of pending edits into a committed stream.
///
/// Yields, in order: committed records minus removed and tombstoned ones
/// with updated values substituted; updated records the committed stream
/// never produced; added records in insertion order. Every yielded record
/// satisfies `filter`.
pub struct DiffCursor {
    committed: BoxCursor,
    schema: Arc<Schema>,
    filter: Filter,
    diff: Diff,
    seen: BTreeSet<String>,
    tail: Option<VecDeque<Record>>,
    pending: Option<Record>,
    closed: bool,
}

impl DiffCursor {
    pub fn new(committed: BoxCursor, diff: Diff, filter: Filter) -> Self {
        let schema = Arc::clone(committed.schema());
        Self {
            committed,
            schema,
            filter,
            diff,
            seen: BTreeSet::new(),
            tail: None,
            pending: None,
            closed: false,
        }
    }

    fn bind(&self, record: Record) -> Record {
        if Arc::ptr_eq(record.schema(), &self.schema) {
            record
        } else {
            record.rebind(Arc::clone(&self.schema))
        }
    }

    /// Next spliced committed record, or `None` once committed is drained
    fn next_committed(&mut self) -> CursorResult<Option<Record>> {
        while self.committed.has_next()? {
            let record = self.committed.next()?;
            let id = record.id();
            if self.diff.removed().contains(id) {
                continue;
            }
            match self.diff.modified().get(id) {
                Some(ModifiedEntry::Tombstone(_)) => continue,
                Some(ModifiedEntry::Updated(updated)) => {
                    self.seen.insert(id.to_string());
                    if self.filter.evaluate(updated) {
                        return Ok(Some(updated.clone()));
                    }
                }
                None => {
                    if self.filter.evaluate(&record) {
                        return Ok(Some(record));
                    }
                }
            }
        }
        Ok(None)
    }

    fn build_tail(&self) -> VecDeque<Record> {
        let unseen = self.diff.modified().iter().filter_map(|(id, entry)| match entry {
            ModifiedEntry::Updated(r) if !self.seen.contains(id) => Some(r),
            _ => None,
        });
        unseen
            .chain(self.diff.added())
            .filter(|r| self.filter.evaluate(r))
            .cloned()
            .collect()
    }
}

impl RecordCursor for DiffCursor {
    fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    fn has_next(&mut self) -> CursorResult<bool> {
        if self.closed {
            return Err(CursorError::Closed);
        }
        if self.pending.is_some() {
            return Ok(true);
        }
        if self.tail.is_none() {
            if let Some(record) = self.next_committed()? {
                self.pending = Some(self.bind(record));
                return Ok(true);
            }
            self.tail = Some(self.build_tail());
        }
        let next = self.tail.as_mut().and_then(VecDeque::pop_front);
        self.pending = next.map(|r| self.bind(r));
        Ok(self.pending.is_some())
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
            self.tail = None;
            self.committed.close();
        }
    }
}

impl Drop for DiffCursor {
    fn drop(&mut self) {
        self.close();
    }
}
