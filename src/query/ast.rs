//! Query structures

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::filter::Filter;
use crate::crs::Crs;
use crate::schema::Schema;
use crate::store::{StoreError, StoreResult};

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// One sort key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    /// Attribute to sort by
    pub attribute: String,
    /// Sort direction
    pub direction: SortDirection,
}

impl SortKey {
    pub fn asc(attribute: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(attribute: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            direction: SortDirection::Desc,
        }
    }
}

/// Resampling tolerances, in the units of the geometry coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub x: f64,
    pub y: f64,
}

impl Resolution {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    fn is_valid(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.x >= 0.0 && self.y >= 0.0
    }
}

/// Immutable request against one schema
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// Target schema
    pub schema_name: String,
    /// Predicate (Include when unfiltered)
    pub filter: Filter,
    /// Ordered sort keys
    pub sort: Vec<SortKey>,
    /// Records skipped after filtering and sorting
    pub offset: usize,
    /// Maximum records returned after the offset
    pub max: Option<usize>,
    /// Projected attribute names, `None` for all
    pub properties: Option<Vec<String>>,
    /// Drop identifiers and identifier-bearing attributes
    pub hide_identifier: bool,
    /// Target coordinate reference for geometry attributes
    pub target_crs: Option<Crs>,
    /// Geometry resampling tolerances
    pub resample: Option<Resolution>,
    /// Free-form hints passed to the backing store
    pub hints: BTreeMap<String, serde_json::Value>,
}

impl Query {
    /// Query for every record of a schema
    pub fn all(schema_name: impl Into<String>) -> Self {
        Self {
            schema_name: schema_name.into(),
            filter: Filter::Include,
            sort: Vec::new(),
            offset: 0,
            max: None,
            properties: None,
            hide_identifier: false,
            target_crs: None,
            resample: None,
            hints: BTreeMap::new(),
        }
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_sort(mut self, key: SortKey) -> Self {
        self.sort.push(key);
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_max(mut self, max: usize) -> Self {
        self.max = Some(max);
        self
    }

    pub fn with_properties<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.properties = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn hiding_identifier(mut self) -> Self {
        self.hide_identifier = true;
        self
    }

    pub fn with_target_crs(mut self, crs: Crs) -> Self {
        self.target_crs = Some(crs);
        self
    }

    pub fn with_resample(mut self, resolution: Resolution) -> Self {
        self.resample = Some(resolution);
        self
    }

    pub fn with_hint(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.hints.insert(key.into(), value);
        self
    }

    /// True when offset or max narrow the stream
    pub fn has_window(&self) -> bool {
        self.offset > 0 || self.max.is_some()
    }

    /// True when the query narrows attributes or hides identifiers
    pub fn has_projection(&self) -> bool {
        self.properties.is_some() || self.hide_identifier
    }

    /// The same query reduced to its predicate: no ordering, window,
    /// projection or geometry transforms.
    pub fn filter_only(&self) -> Query {
        Query {
            filter: self.filter.clone(),
            hints: self.hints.clone(),
            ..Query::all(self.schema_name.clone())
        }
    }

    /// Checks every attribute the query names against the schema
    pub fn validate(&self, schema: &Schema) -> StoreResult<()> {
        if self.schema_name != schema.name {
            return Err(StoreError::malformed_query(format!(
                "query targets '{}' but schema is '{}'",
                self.schema_name, schema.name
            )));
        }

        for name in self.filter.attributes() {
            if schema.index_of(name).is_none() {
                return Err(StoreError::malformed_query(format!(
                    "filter references unknown attribute '{}'",
                    name
                )));
            }
        }

        for key in &self.sort {
            if schema.index_of(&key.attribute).is_none() {
                return Err(StoreError::malformed_query(format!(
                    "sort references unknown attribute '{}'",
                    key.attribute
                )));
            }
        }

        if let Some(props) = &self.properties {
            for name in props {
                if schema.index_of(name).is_none() {
                    return Err(StoreError::malformed_query(format!(
                        "projection references unknown attribute '{}'",
                        name
                    )));
                }
            }
        }

        if let Some(res) = &self.resample {
            if !res.is_valid() {
                return Err(StoreError::malformed_query(
                    "resample tolerances must be finite and non-negative",
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::AttributeDescriptor;

    fn schema() -> Schema {
        Schema::new(
            "parcels",
            vec![
                AttributeDescriptor::int("area"),
                AttributeDescriptor::geometry("shape"),
            ],
        )
    }

    #[test]
    fn test_builder_defaults() {
        let q = Query::all("parcels");
        assert!(q.filter.is_include());
        assert!(!q.has_window());
        assert!(!q.has_projection());
        assert!(q.validate(&schema()).is_ok());
    }

    #[test]
    fn test_window_and_projection_flags() {
        let q = Query::all("parcels").with_offset(2);
        assert!(q.has_window());
        let q = Query::all("parcels").with_max(0);
        assert!(q.has_window());
        let q = Query::all("parcels").hiding_identifier();
        assert!(q.has_projection());
    }

    #[test]
    fn test_filter_only_keeps_predicate() {
        let q = Query::all("parcels")
            .with_filter(Filter::gt("area", 10i64))
            .with_sort(SortKey::desc("area"))
            .with_offset(1)
            .with_max(3)
            .with_properties(["area"]);
        let reduced = q.filter_only();
        assert_eq!(reduced.filter, q.filter);
        assert!(reduced.sort.is_empty());
        assert!(!reduced.has_window());
        assert!(!reduced.has_projection());
    }

    #[test]
    fn test_validate_rejects_unknown_names() {
        let s = schema();
        assert!(Query::all("parcels")
            .with_filter(Filter::eq("owner", "x"))
            .validate(&s)
            .is_err());
        assert!(Query::all("parcels")
            .with_sort(SortKey::asc("owner"))
            .validate(&s)
            .is_err());
        assert!(Query::all("parcels")
            .with_properties(["owner"])
            .validate(&s)
            .is_err());
        assert!(Query::all("roads").validate(&s).is_err());
    }

    #[test]
    fn test_validate_rejects_negative_resolution() {
        let q = Query::all("parcels").with_resample(Resolution::new(-1.0, 0.0));
        assert!(q.validate(&schema()).is_err());
    }
}
