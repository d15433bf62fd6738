//! Predicates evaluated against records
//!
//! Comparison semantics follow the record values strictly: a missing or
//! null attribute never matches a comparison, ints and floats compare
//! numerically, and no other coercion takes place.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::record::{Extent, Record, Value};

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl CompareOp {
    /// Returns the operation name for log output
    pub fn op_name(&self) -> &'static str {
        match self {
            CompareOp::Eq => "eq",
            CompareOp::Ne => "ne",
            CompareOp::Gt => "gt",
            CompareOp::Gte => "gte",
            CompareOp::Lt => "lt",
            CompareOp::Lte => "lte",
        }
    }

    fn accepts(&self, ordering: Ordering) -> bool {
        match self {
            CompareOp::Eq => ordering == Ordering::Equal,
            CompareOp::Ne => ordering != Ordering::Equal,
            CompareOp::Gt => ordering == Ordering::Greater,
            CompareOp::Gte => ordering != Ordering::Less,
            CompareOp::Lt => ordering == Ordering::Less,
            CompareOp::Lte => ordering != Ordering::Greater,
        }
    }
}

/// Boolean-valued expression over a record
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Matches every record
    Include,
    /// Matches no record
    Exclude,
    /// Attribute compared against a literal
    Compare {
        attribute: String,
        op: CompareOp,
        value: Value,
    },
    /// Attribute is null or absent
    IsNull(String),
    /// Record identifier is one of the set
    IdIn(BTreeSet<String>),
    /// Bounds of a geometry attribute (default geometry when `None`)
    /// intersect the extent
    BBox {
        attribute: Option<String>,
        extent: Extent,
    },
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
}

impl Default for Filter {
    fn default() -> Self {
        Filter::Include
    }
}

impl Filter {
    fn compare(attribute: impl Into<String>, op: CompareOp, value: impl Into<Value>) -> Self {
        Filter::Compare {
            attribute: attribute.into(),
            op,
            value: value.into(),
        }
    }

    pub fn eq(attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(attribute, CompareOp::Eq, value)
    }

    pub fn ne(attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(attribute, CompareOp::Ne, value)
    }

    pub fn gt(attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(attribute, CompareOp::Gt, value)
    }

    pub fn gte(attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(attribute, CompareOp::Gte, value)
    }

    pub fn lt(attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(attribute, CompareOp::Lt, value)
    }

    pub fn lte(attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(attribute, CompareOp::Lte, value)
    }

    /// Identifier membership
    pub fn ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Filter::IdIn(ids.into_iter().map(Into::into).collect())
    }

    /// Bounding-box intersection on the default geometry
    pub fn bbox(extent: Extent) -> Self {
        Filter::BBox {
            attribute: None,
            extent,
        }
    }

    /// Conjunction; `Include` operands are dropped and any `Exclude`
    /// collapses the whole expression.
    pub fn and(self, other: Filter) -> Filter {
        match (self, other) {
            (Filter::Include, f) | (f, Filter::Include) => f,
            (Filter::Exclude, _) | (_, Filter::Exclude) => Filter::Exclude,
            (Filter::And(mut a), Filter::And(b)) => {
                a.extend(b);
                Filter::And(a)
            }
            (Filter::And(mut a), f) => {
                a.push(f);
                Filter::And(a)
            }
            (a, b) => Filter::And(vec![a, b]),
        }
    }

    /// Disjunction; `Exclude` operands are dropped and any `Include`
    /// collapses the whole expression.
    pub fn or(self, other: Filter) -> Filter {
        match (self, other) {
            (Filter::Exclude, f) | (f, Filter::Exclude) => f,
            (Filter::Include, _) | (_, Filter::Include) => Filter::Include,
            (Filter::Or(mut a), f) => {
                a.push(f);
                Filter::Or(a)
            }
            (a, b) => Filter::Or(vec![a, b]),
        }
    }

    /// Negation
    pub fn negate(self) -> Filter {
        match self {
            Filter::Include => Filter::Exclude,
            Filter::Exclude => Filter::Include,
            Filter::Not(inner) => *inner,
            other => Filter::Not(Box::new(other)),
        }
    }

    pub fn is_include(&self) -> bool {
        matches!(self, Filter::Include)
    }

    pub fn is_exclude(&self) -> bool {
        matches!(self, Filter::Exclude)
    }

    /// Evaluates the predicate against a record
    pub fn evaluate(&self, record: &Record) -> bool {
        match self {
            Filter::Include => true,
            Filter::Exclude => false,
            Filter::Compare {
                attribute,
                op,
                value,
            } => match record.get(attribute) {
                None | Some(Value::Null) => false,
                Some(actual) => actual
                    .partial_compare(value)
                    .map(|ord| op.accepts(ord))
                    .unwrap_or(false),
            },
            Filter::IsNull(attribute) => {
                matches!(record.get(attribute), None | Some(Value::Null))
            }
            Filter::IdIn(ids) => ids.contains(record.id()),
            Filter::BBox { attribute, extent } => {
                let geometry = match attribute {
                    Some(name) => record.get(name),
                    None => record.default_geometry(),
                };
                geometry
                    .and_then(Value::as_geometry)
                    .and_then(Extent::of_geometry)
                    .map(|b| {
                        b.min_x <= extent.max_x
                            && b.max_x >= extent.min_x
                            && b.min_y <= extent.max_y
                            && b.max_y >= extent.min_y
                    })
                    .unwrap_or(false)
            }
            Filter::And(parts) => parts.iter().all(|f| f.evaluate(record)),
            Filter::Or(parts) => parts.iter().any(|f| f.evaluate(record)),
            Filter::Not(inner) => !inner.evaluate(record),
        }
    }

    /// Attribute names referenced by the predicate
    pub fn attributes(&self) -> BTreeSet<&str> {
        let mut out = BTreeSet::new();
        self.collect_attributes(&mut out);
        out
    }

    fn collect_attributes<'a>(&'a self, out: &mut BTreeSet<&'a str>) {
        match self {
            Filter::Compare { attribute, .. } | Filter::IsNull(attribute) => {
                out.insert(attribute);
            }
            Filter::BBox {
                attribute: Some(attribute),
                ..
            } => {
                out.insert(attribute);
            }
            Filter::And(parts) | Filter::Or(parts) => {
                for part in parts {
                    part.collect_attributes(out);
                }
            }
            Filter::Not(inner) => inner.collect_attributes(out),
            Filter::Include | Filter::Exclude | Filter::IdIn(_) | Filter::BBox { .. } => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AttributeDescriptor, Schema};
    use geo_types::point;
    use std::sync::Arc;

    fn record(id: &str, v: Value, name: Value) -> Record {
        let schema = Arc::new(Schema::new(
            "t",
            vec![
                AttributeDescriptor::int("v"),
                AttributeDescriptor::string("name"),
                AttributeDescriptor::geometry("geom"),
            ],
        ));
        Record::new(
            id,
            schema,
            vec![v, name, Value::Geometry(point!(x: 1.0, y: 1.0).into())],
        )
    }

    #[test]
    fn test_comparisons() {
        let r = record("a", Value::Int(5), Value::from("x"));
        assert!(Filter::gt("v", 1i64).evaluate(&r));
        assert!(Filter::gte("v", 5i64).evaluate(&r));
        assert!(!Filter::lt("v", 5i64).evaluate(&r));
        assert!(Filter::lte("v", 5.5).evaluate(&r));
        assert!(Filter::ne("v", 4i64).evaluate(&r));
        assert!(Filter::eq("name", "x").evaluate(&r));
    }

    #[test]
    fn test_no_type_coercion() {
        let r = record("a", Value::Int(123), Value::from("x"));
        assert!(!Filter::eq("v", "123").evaluate(&r));
        assert!(!Filter::ne("v", "123").evaluate(&r));
    }

    #[test]
    fn test_null_and_missing_never_compare() {
        let r = record("a", Value::Null, Value::from("x"));
        assert!(!Filter::eq("v", 1i64).evaluate(&r));
        assert!(!Filter::ne("v", 1i64).evaluate(&r));
        assert!(!Filter::eq("missing", 1i64).evaluate(&r));
        assert!(Filter::IsNull("v".into()).evaluate(&r));
        assert!(Filter::IsNull("missing".into()).evaluate(&r));
    }

    #[test]
    fn test_boolean_composition_simplifies() {
        let f = Filter::Include.and(Filter::gt("v", 1i64));
        assert_eq!(f, Filter::gt("v", 1i64));
        assert!(Filter::gt("v", 1i64).and(Filter::Exclude).is_exclude());
        assert!(Filter::gt("v", 1i64).or(Filter::Include).is_include());
        assert!(Filter::Include.negate().is_exclude());
    }

    #[test]
    fn test_id_and_bbox() {
        let r = record("a", Value::Int(1), Value::Null);
        assert!(Filter::ids(["a", "b"]).evaluate(&r));
        assert!(!Filter::ids(["c"]).evaluate(&r));
        assert!(Filter::bbox(Extent::new(0.0, 0.0, 2.0, 2.0)).evaluate(&r));
        assert!(!Filter::bbox(Extent::new(5.0, 5.0, 6.0, 6.0)).evaluate(&r));
    }

    #[test]
    fn test_referenced_attributes() {
        let f = Filter::gt("v", 1i64)
            .and(Filter::eq("name", "x").or(Filter::IsNull("geom".into())).negate());
        let attrs: Vec<&str> = f.attributes().into_iter().collect();
        assert_eq!(attrs, vec!["geom", "name", "v"]);
    }
}
