//! Nested-loop inner join cursor

use std::sync::Arc;

use super::query::{merge_schemas, JoinQuery, JoinType};
use crate::cursor::{BoxCursor, CursorError, CursorResult, RecordCursor};
use crate::query::{Filter, Query};
use crate::record::{Record, Value};
use crate::schema::Schema;
use crate::store::{RecordSource, StoreError, StoreResult};

/// Left record currently matched against a right-side cursor
struct Probe {
    left: Record,
    right: BoxCursor,
}

/// Lazily joins left records with right records of equal key.
///
/// Output order is left-then-right encounter order. Identifiers are
/// `<left id><separator><right id>`. Left records with a null key match
/// nothing.
pub struct JoinCursor {
    left: BoxCursor,
    right_source: Arc<dyn RecordSource>,
    right_schema: Arc<Schema>,
    schema: Arc<Schema>,
    left_key: usize,
    right_key: String,
    filter: Filter,
    separator: String,
    probe: Option<Probe>,
    pending: Option<Record>,
    closed: bool,
}

impl JoinCursor {
    /// Fails with not-implemented for outer joins and with a malformed
    /// query for unknown key or filter attributes. `left` is closed on
    /// failure.
    pub fn new(
        mut left: BoxCursor,
        right_source: Arc<dyn RecordSource>,
        join: &JoinQuery,
        separator: impl Into<String>,
    ) -> StoreResult<Self> {
        match Self::prepare(&left, right_source.as_ref(), join) {
            Ok((left_key, right_schema, schema)) => Ok(Self {
                left,
                right_source,
                right_schema,
                schema,
                left_key,
                right_key: join.right_key.clone(),
                filter: join.filter.clone(),
                separator: separator.into(),
                probe: None,
                pending: None,
                closed: false,
            }),
            Err(e) => {
                left.close();
                Err(e)
            }
        }
    }

    fn prepare(
        left: &BoxCursor,
        right_source: &dyn RecordSource,
        join: &JoinQuery,
    ) -> StoreResult<(usize, Arc<Schema>, Arc<Schema>)> {
        if join.join_type != JoinType::Inner {
            return Err(StoreError::not_implemented(format!("{} join", join.join_type)));
        }
        let left_schema = left.schema();
        let left_key = left_schema.index_of(&join.left_key).ok_or_else(|| {
            StoreError::malformed_query(format!(
                "join key '{}' is not an attribute of '{}'",
                join.left_key, left_schema.name
            ))
        })?;
        let right_schema = right_source.schema(&join.right_schema)?;
        if right_schema.index_of(&join.right_key).is_none() {
            return Err(StoreError::malformed_query(format!(
                "join key '{}' is not an attribute of '{}'",
                join.right_key, right_schema.name
            )));
        }
        let schema = Arc::new(merge_schemas(left_schema, &right_schema));
        for name in join.filter.attributes() {
            if schema.index_of(name).is_none() {
                return Err(StoreError::malformed_query(format!(
                    "join filter references unknown attribute '{}'",
                    name
                )));
            }
        }
        Ok((left_key, right_schema, schema))
    }

    fn open_right(&self, key: &Value) -> CursorResult<BoxCursor> {
        let query = Query::all(self.right_schema.name.clone())
            .with_filter(Filter::eq(self.right_key.clone(), key.clone()));
        self.right_source
            .query(&query)
            .map_err(|e| CursorError::Source(e.to_string()))
    }

    fn merge(schema: &Arc<Schema>, separator: &str, left: &Record, right: Record) -> Record {
        let id = format!("{}{}{}", left.id(), separator, right.id());
        let mut values = left.values().to_vec();
        values.extend(right.into_values());
        Record::new(id, Arc::clone(schema), values)
    }

    fn advance(&mut self) -> CursorResult<Option<Record>> {
        loop {
            if let Some(probe) = self.probe.as_mut() {
                if probe.right.has_next()? {
                    let right = probe.right.next()?;
                    let merged = Self::merge(&self.schema, &self.separator, &probe.left, right);
                    if self.filter.evaluate(&merged) {
                        return Ok(Some(merged));
                    }
                    continue;
                }
                probe.right.close();
                self.probe = None;
            }

            if !self.left.has_next()? {
                return Ok(None);
            }
            let left = self.left.next()?;
            let key = left.get_at(self.left_key).cloned().unwrap_or(Value::Null);
            if key.is_null() {
                continue;
            }
            let right = self.open_right(&key)?;
            self.probe = Some(Probe { left, right });
        }
    }
}

impl RecordCursor for JoinCursor {
    fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    fn has_next(&mut self) -> CursorResult<bool> {
        if self.closed {
            return Err(CursorError::Closed);
        }
        if self.pending.is_none() {
            self.pending = self.advance()?;
        }
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
            if let Some(mut probe) = self.probe.take() {
                probe.right.close();
            }
            self.left.close();
        }
    }
}

impl Drop for JoinCursor {
    fn drop(&mut self) {
        self.close();
    }
}
