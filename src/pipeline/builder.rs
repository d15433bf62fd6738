//! Pipeline construction

use std::fmt;
use std::sync::Arc;

use crate::crs::TransformRegistry;
use crate::cursor::{
    BoxCursor, EmptyCursor, FilterCursor, LimitCursor, ProjectCursor, ReprojectCursor,
    ResampleCursor, SkipCursor, SortCursor, TransformFailurePolicy,
};
use crate::query::Query;
use crate::store::{StoreError, StoreResult};

/// One decorator layer of a built pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Sort,
    Filter,
    Skip,
    Limit,
    Project,
    Resample,
    Reproject,
    /// The residual query can match nothing; the base cursor was replaced
    Empty,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Sort => "sort",
            Stage::Filter => "filter",
            Stage::Skip => "skip",
            Stage::Limit => "limit",
            Stage::Project => "project",
            Stage::Resample => "resample",
            Stage::Reproject => "reproject",
            Stage::Empty => "empty",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A decorated cursor together with the stages wrapped around it,
/// innermost first
pub struct Pipeline {
    cursor: BoxCursor,
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Comma-separated stage names, for logging
    pub fn describe(&self) -> String {
        self.stages
            .iter()
            .map(Stage::as_str)
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn into_cursor(self) -> BoxCursor {
        self.cursor
    }
}

/// Builds decorator chains for residual queries
pub struct PipelineBuilder<'a> {
    transforms: &'a TransformRegistry,
    failure_policy: TransformFailurePolicy,
    max_sort_buffer: Option<usize>,
}

impl<'a> PipelineBuilder<'a> {
    pub fn new(transforms: &'a TransformRegistry) -> Self {
        Self {
            transforms,
            failure_policy: TransformFailurePolicy::Fail,
            max_sort_buffer: None,
        }
    }

    pub fn with_failure_policy(mut self, policy: TransformFailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn with_max_sort_buffer(mut self, max: Option<usize>) -> Self {
        self.max_sort_buffer = max;
        self
    }

    /// Wraps `base` for every non-default clause of `residual`.
    ///
    /// A residual that can match nothing (an exclude-all filter or a zero
    /// max) closes `base` without pulling from it and yields an empty
    /// cursor of the final schema. Sorting materializes here, so a sort
    /// failure surfaces from `build`.
    pub fn build(&self, residual: &Query, base: BoxCursor) -> StoreResult<Pipeline> {
        // Resolve the transform before anything is pulled or wrapped
        let transform = match &residual.target_crs {
            Some(target) => {
                let source = &base.schema().crs;
                let t = self
                    .transforms
                    .lookup(source, target)
                    .map_err(|e| StoreError::malformed_query(e.to_string()))?;
                Some((t, target.clone()))
            }
            None => None,
        };

        let mut stages = Vec::new();
        let mut cursor = base;

        if residual.filter.is_exclude() || residual.max == Some(0) {
            cursor.close();
            cursor = Box::new(EmptyCursor::new(Arc::clone(cursor.schema())));
            stages.push(Stage::Empty);
        } else {
            if !residual.sort.is_empty() {
                cursor = Box::new(SortCursor::new(cursor, &residual.sort, self.max_sort_buffer)?);
                stages.push(Stage::Sort);
            }
            if !residual.filter.is_include() {
                cursor = Box::new(FilterCursor::new(cursor, residual.filter.clone()));
                stages.push(Stage::Filter);
            }
            if residual.offset > 0 {
                cursor = Box::new(SkipCursor::new(cursor, residual.offset));
                stages.push(Stage::Skip);
            }
            if let Some(max) = residual.max {
                cursor = Box::new(LimitCursor::new(cursor, max));
                stages.push(Stage::Limit);
            }
        }

        if residual.has_projection() {
            cursor = Box::new(ProjectCursor::new(
                cursor,
                residual.properties.as_deref(),
                residual.hide_identifier,
            )?);
            stages.push(Stage::Project);
        }
        if let Some(resolution) = residual.resample {
            cursor = Box::new(ResampleCursor::new(cursor, resolution));
            stages.push(Stage::Resample);
        }
        if let Some((transform, target)) = transform {
            cursor = Box::new(ReprojectCursor::new(cursor, transform, target, self.failure_policy));
            stages.push(Stage::Reproject);
        }

        Ok(Pipeline { cursor, stages })
    }
}
