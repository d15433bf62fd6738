//! Coordinate reprojection decorator

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{BoxCursor, CursorError, CursorResult, RecordCursor};
use crate::crs::{transform_geometry, CoordinateTransform, Crs};
use crate::observability::{Event, Logger};
use crate::record::{Record, Value};
use crate::schema::Schema;

/// What a read does when one record fails to transform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransformFailurePolicy {
    /// The read fails on the first failing record
    #[default]
    Fail,
    /// The failing record is logged and left out
    Skip,
}

/// Transforms geometry-valued attributes from the inner schema's
/// reference to a target reference.
pub struct ReprojectCursor {
    inner: BoxCursor,
    schema: Arc<Schema>,
    transform: Arc<dyn CoordinateTransform>,
    geometry_indices: Vec<usize>,
    policy: TransformFailurePolicy,
    pending: Option<Record>,
    closed: bool,
}

impl ReprojectCursor {
    pub fn new(
        inner: BoxCursor,
        transform: Arc<dyn CoordinateTransform>,
        target: Crs,
        policy: TransformFailurePolicy,
    ) -> Self {
        let geometry_indices = inner.schema().geometry_indices();
        let schema = Arc::new(inner.schema().as_ref().clone().with_crs(target));
        Self {
            inner,
            schema,
            transform,
            geometry_indices,
            policy,
            pending: None,
            closed: false,
        }
    }

    fn reproject(&self, record: Record) -> CursorResult<Record> {
        let id = record.id().to_string();
        let mut values = record.into_values();
        for &i in &self.geometry_indices {
            if let Some(Value::Geometry(g)) = values.get(i) {
                let moved = transform_geometry(self.transform.as_ref(), g).map_err(|source| {
                    CursorError::Transform {
                        id: id.clone(),
                        source,
                    }
                })?;
                values[i] = Value::Geometry(moved);
            }
        }
        Ok(Record::new(id, Arc::clone(&self.schema), values))
    }
}

impl RecordCursor for ReprojectCursor {
    fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    fn has_next(&mut self) -> CursorResult<bool> {
        if self.closed {
            return Err(CursorError::Closed);
        }
        while self.pending.is_none() {
            if !self.inner.has_next()? {
                return Ok(false);
            }
            let record = self.inner.next()?;
            match self.reproject(record) {
                Ok(done) => self.pending = Some(done),
                Err(err) => match self.policy {
                    TransformFailurePolicy::Fail => return Err(err),
                    TransformFailurePolicy::Skip => {
                        let reason = err.to_string();
                        Logger::warn(Event::TransformSkipped.as_str(), &[("reason", reason.as_str())]);
                    }
                },
            }
        }
        Ok(true)
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

impl Drop for ReprojectCursor {
    fn drop(&mut self) {
        self.close();
    }
}
