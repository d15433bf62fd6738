//! Join request types

use std::fmt;

use crate::query::Filter;
use crate::schema::{AttributeDescriptor, Schema};

/// Join flavor. Only inner joins execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinType {
    #[default]
    Inner,
    LeftOuter,
    RightOuter,
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinType::Inner => write!(f, "INNER"),
            JoinType::LeftOuter => write!(f, "LEFT OUTER"),
            JoinType::RightOuter => write!(f, "RIGHT OUTER"),
        }
    }
}

/// Equality join of the left query's records with a right schema
#[derive(Debug, Clone, PartialEq)]
pub struct JoinQuery {
    /// Schema queried on the right source
    pub right_schema: String,
    /// Key attribute on the left records
    pub left_key: String,
    /// Key attribute on the right records
    pub right_key: String,
    pub join_type: JoinType,
    /// Predicate over merged records
    pub filter: Filter,
}

impl JoinQuery {
    pub fn inner(
        right_schema: impl Into<String>,
        left_key: impl Into<String>,
        right_key: impl Into<String>,
    ) -> Self {
        Self {
            right_schema: right_schema.into(),
            left_key: left_key.into(),
            right_key: right_key.into(),
            join_type: JoinType::Inner,
            filter: Filter::Include,
        }
    }

    pub fn with_type(mut self, join_type: JoinType) -> Self {
        self.join_type = join_type;
        self
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }
}

/// Left attributes then right attributes. Right names already taken on
/// the left are prefixed with `<right schema>.`. The default geometry is
/// the left one, else the right one.
pub(crate) fn merge_schemas(left: &Schema, right: &Schema) -> Schema {
    let mut attributes: Vec<AttributeDescriptor> = left.attributes.clone();
    let mut right_default = None;
    for attr in &right.attributes {
        let mut merged = attr.clone();
        if left.index_of(&attr.name).is_some() {
            merged.name = format!("{}.{}", right.name, attr.name);
        }
        if right.default_geometry.as_deref() == Some(attr.name.as_str()) {
            right_default = Some(merged.name.clone());
        }
        attributes.push(merged);
    }

    let mut schema = Schema::new(format!("{}+{}", left.name, right.name), attributes)
        .with_crs(left.crs.clone());
    schema.default_geometry = left.default_geometry.clone().or(right_default);
    schema
}
