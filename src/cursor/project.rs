//! Attribute projection and identifier hiding

use std::sync::Arc;

use super::{BoxCursor, CursorError, CursorResult, RecordCursor};
use crate::record::Record;
use crate::schema::Schema;
use crate::store::{StoreError, StoreResult};

/// Narrows each record to a fixed attribute subset and optionally drops
/// identifiers.
///
/// The retained positions and the narrowed schema are computed once at
/// construction. With identifiers hidden, records carry an empty
/// identifier and identifier-bearing attributes are removed.
pub struct ProjectCursor {
    inner: BoxCursor,
    schema: Arc<Schema>,
    indices: Vec<usize>,
    hide_identifier: bool,
    closed: bool,
}

impl ProjectCursor {
    /// Resolves `properties` (all attributes when `None`) against the inner
    /// schema.
    pub fn new(
        inner: BoxCursor,
        properties: Option<&[String]>,
        hide_identifier: bool,
    ) -> StoreResult<Self> {
        let source = Arc::clone(inner.schema());
        let mut indices = match properties {
            Some(names) => names
                .iter()
                .map(|name| {
                    source.index_of(name).ok_or_else(|| {
                        StoreError::malformed_query(format!(
                            "projection references unknown attribute '{}'",
                            name
                        ))
                    })
                })
                .collect::<StoreResult<Vec<usize>>>()?,
            None => (0..source.len()).collect(),
        };
        if hide_identifier {
            indices.retain(|&i| !source.attributes[i].identifier);
        }
        let schema = Arc::new(source.subset(&indices));
        Ok(Self {
            inner,
            schema,
            indices,
            hide_identifier,
            closed: false,
        })
    }

    fn narrow(&self, record: Record) -> Record {
        let id = if self.hide_identifier {
            String::new()
        } else {
            record.id().to_string()
        };
        let values = record.values();
        let projected = self.indices.iter().map(|&i| values[i].clone()).collect();
        Record::new(id, Arc::clone(&self.schema), projected)
    }
}

impl RecordCursor for ProjectCursor {
    fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    fn has_next(&mut self) -> CursorResult<bool> {
        if self.closed {
            return Err(CursorError::Closed);
        }
        self.inner.has_next()
    }

    fn next(&mut self) -> CursorResult<Record> {
        if self.closed {
            return Err(CursorError::Closed);
        }
        let record = self.inner.next()?;
        Ok(self.narrow(record))
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.inner.close();
        }
    }
}

impl Drop for ProjectCursor {
    fn drop(&mut self) {
        self.close();
    }
}
