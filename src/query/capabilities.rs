//! Capability descriptor returned with every native cursor

use super::ast::Query;
use super::filter::Filter;

/// Query clauses a backing store applied natively. Every clause left
/// `false` is applied by the pipeline on top of the native cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AppliedClauses {
    pub filter: bool,
    pub sort: bool,
    pub offset: bool,
    pub max: bool,
    pub projection: bool,
    pub resample: bool,
    pub reproject: bool,
}

impl AppliedClauses {
    /// Nothing applied: the store streams raw records
    pub fn none() -> Self {
        Self::default()
    }

    /// Everything applied
    pub fn all() -> Self {
        Self {
            filter: true,
            sort: true,
            offset: true,
            max: true,
            projection: true,
            resample: true,
            reproject: true,
        }
    }

    /// Filter only
    pub fn filter_only() -> Self {
        Self {
            filter: true,
            ..Self::none()
        }
    }

    /// Checks that the store did not narrow the stream ahead of a clause
    /// it left to the pipeline. Windowing before filtering or sorting
    /// selects the wrong rows; projecting before filtering or sorting can
    /// remove attributes they need.
    pub fn validate(&self, query: &Query) -> Result<(), String> {
        let filter_pending = !self.filter && !query.filter.is_include();
        let sort_pending = !self.sort && !query.sort.is_empty();

        let windowed = (self.offset && query.offset > 0) || (self.max && query.max.is_some());
        if windowed && (filter_pending || sort_pending) {
            return Err("store applied offset/max while filter or sort remain".into());
        }

        if self.projection && query.has_projection() && (filter_pending || sort_pending) {
            return Err("store applied projection while filter or sort remain".into());
        }

        if self.max && !self.offset && query.offset > 0 && query.max.is_some() {
            return Err("store applied max without applying offset".into());
        }

        Ok(())
    }

    /// The clauses of `query` the pipeline still has to apply
    pub fn residual(&self, query: &Query) -> Query {
        let mut residual = query.clone();
        if self.filter {
            residual.filter = Filter::Include;
        }
        if self.sort {
            residual.sort.clear();
        }
        if self.offset {
            residual.offset = 0;
        }
        if self.max {
            residual.max = None;
        }
        if self.projection {
            residual.properties = None;
            residual.hide_identifier = false;
        }
        if self.resample {
            residual.resample = None;
        }
        if self.reproject {
            residual.target_crs = None;
        }
        residual
    }
}
