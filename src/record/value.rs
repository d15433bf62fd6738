//! Attribute values

use std::cmp::Ordering;
use std::str::FromStr;

use geo_types::Geometry;
use serde_json::Value as JsonValue;
use wkt::ToWkt;

use crate::schema::AttributeType;

/// A single attribute value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Geometry(Geometry<f64>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_geometry(&self) -> Option<&Geometry<f64>> {
        match self {
            Value::Geometry(g) => Some(g),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric view used for comparisons across int/float
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Returns true if the value may be stored in an attribute of `ty`
    pub fn conforms_to(&self, ty: AttributeType) -> bool {
        matches!(
            (self, ty),
            (Value::Null, _)
                | (Value::Bool(_), AttributeType::Bool)
                | (Value::Int(_), AttributeType::Int)
                | (Value::Int(_), AttributeType::Float)
                | (Value::Float(_), AttributeType::Float)
                | (Value::String(_), AttributeType::String)
                | (Value::Geometry(_), AttributeType::Geometry)
        )
    }

    /// Compares two values of compatible kind. Ints and floats compare
    /// numerically; other cross-kind comparisons are undefined.
    pub fn partial_compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x.partial_cmp(&y),
                _ => None,
            },
        }
    }

    /// Total ordering used for sorting.
    ///
    /// Ordering rules:
    /// - null < bool < number < string < geometry
    /// - For same kinds, natural ordering; geometries compare equal
    pub fn sort_cmp(&self, other: &Value) -> Ordering {
        fn rank(v: &Value) -> u8 {
            match v {
                Value::Null => 0,
                Value::Bool(_) => 1,
                Value::Int(_) | Value::Float(_) => 2,
                Value::String(_) => 3,
                Value::Geometry(_) => 4,
            }
        }

        let by_rank = rank(self).cmp(&rank(other));
        if by_rank != Ordering::Equal {
            return by_rank;
        }
        self.partial_compare(other).unwrap_or(Ordering::Equal)
    }

    /// Converts a JSON value into an attribute of the given type.
    /// Geometries are read from WKT text.
    pub fn from_json(json: &JsonValue, ty: AttributeType) -> Result<Value, String> {
        match (json, ty) {
            (JsonValue::Null, _) => Ok(Value::Null),
            (JsonValue::Bool(b), AttributeType::Bool) => Ok(Value::Bool(*b)),
            (JsonValue::Number(n), AttributeType::Int) => n
                .as_i64()
                .map(Value::Int)
                .ok_or_else(|| format!("{} is not a 64-bit integer", n)),
            (JsonValue::Number(n), AttributeType::Float) => n
                .as_f64()
                .map(Value::Float)
                .ok_or_else(|| format!("{} is not a float", n)),
            (JsonValue::String(s), AttributeType::String) => Ok(Value::String(s.clone())),
            (JsonValue::String(s), AttributeType::Geometry) => parse_wkt(s).map(Value::Geometry),
            (other, ty) => Err(format!(
                "expected {}, found {}",
                ty.type_name(),
                json_kind(other)
            )),
        }
    }

    /// Converts the value to JSON. Geometries are written as WKT text.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Null => JsonValue::Null,
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::Int(i) => JsonValue::from(*i),
            Value::Float(f) => JsonValue::from(*f),
            Value::String(s) => JsonValue::String(s.clone()),
            Value::Geometry(g) => JsonValue::String(g.wkt_string()),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Geometry<f64>> for Value {
    fn from(v: Geometry<f64>) -> Self {
        Value::Geometry(v)
    }
}

fn json_kind(json: &JsonValue) -> &'static str {
    match json {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "bool",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

fn parse_wkt(text: &str) -> Result<Geometry<f64>, String> {
    wkt::Wkt::<f64>::from_str(text)
        .map_err(|e| format!("invalid WKT: {}", e))
        .and_then(|w| {
            w.try_into()
                .map_err(|e: wkt::conversion::Error| format!("unsupported WKT: {:?}", e))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::point;
    use serde_json::json;

    #[test]
    fn test_numeric_comparison_across_kinds() {
        assert_eq!(
            Value::Int(2).partial_compare(&Value::Float(1.5)),
            Some(Ordering::Greater)
        );
        assert_eq!(Value::Int(2).partial_compare(&Value::from("2")), None);
    }

    #[test]
    fn test_sort_cmp_ranks_kinds() {
        assert_eq!(Value::Null.sort_cmp(&Value::Bool(false)), Ordering::Less);
        assert_eq!(Value::Int(100).sort_cmp(&Value::from("a")), Ordering::Less);
        assert_eq!(Value::from("b").sort_cmp(&Value::from("a")), Ordering::Greater);
    }

    #[test]
    fn test_from_json_checks_type() {
        assert_eq!(
            Value::from_json(&json!(3), AttributeType::Int).unwrap(),
            Value::Int(3)
        );
        assert_eq!(
            Value::from_json(&json!(3), AttributeType::Float).unwrap(),
            Value::Float(3.0)
        );
        assert!(Value::from_json(&json!("3"), AttributeType::Int).is_err());
        assert!(Value::from_json(&json!(1.5), AttributeType::Int).is_err());
    }

    #[test]
    fn test_geometry_json_is_wkt() {
        let v = Value::from_json(&json!("POINT(1 2)"), AttributeType::Geometry).unwrap();
        assert_eq!(v, Value::Geometry(point!(x: 1.0, y: 2.0).into()));

        let text = v.to_json();
        let back = Value::from_json(&text, AttributeType::Geometry).unwrap();
        assert_eq!(back, v);

        assert!(Value::from_json(&json!("POINT(1"), AttributeType::Geometry).is_err());
    }

    #[test]
    fn test_conforms_to() {
        assert!(Value::Null.conforms_to(AttributeType::Geometry));
        assert!(Value::Int(1).conforms_to(AttributeType::Float));
        assert!(!Value::Float(1.0).conforms_to(AttributeType::Int));
    }
}
