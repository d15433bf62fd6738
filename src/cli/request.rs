//! Query requests in JSON
//!
//! ```json
//! {
//!   "schema": "roads",
//!   "filter": {"op": "and", "filters": [
//!     {"op": "gt", "attribute": "lanes", "value": 2},
//!     {"op": "bbox", "extent": [0, 0, 10, 10]}
//!   ]},
//!   "sort": [{"attribute": "lanes", "direction": "desc"}],
//!   "offset": 0,
//!   "max": 10,
//!   "properties": ["name", "geom"],
//!   "target_crs": "EPSG:3857"
//! }
//! ```
//!
//! Literal values are typed by the attribute they are compared with, so
//! a geometry literal is WKT text.

use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;
use serde_json::Value as JsonValue;

use super::errors::{CliError, CliResult};
use crate::crs::Crs;
use crate::query::{CompareOp, Filter, Query, Resolution, SortKey};
use crate::record::{Extent, Value};
use crate::schema::Schema;

/// A request before its filter is typed against the schema
#[derive(Debug, Deserialize)]
pub struct Request {
    pub schema: String,
    #[serde(default)]
    filter: Option<JsonValue>,
    #[serde(default)]
    sort: Vec<SortKey>,
    #[serde(default)]
    offset: usize,
    #[serde(default)]
    max: Option<usize>,
    #[serde(default)]
    properties: Option<Vec<String>>,
    #[serde(default)]
    hide_identifier: bool,
    #[serde(default)]
    target_crs: Option<Crs>,
    #[serde(default)]
    resample: Option<Resolution>,
    #[serde(default)]
    hints: BTreeMap<String, JsonValue>,
}

impl Request {
    pub fn from_json(json: &JsonValue) -> CliResult<Self> {
        serde_json::from_value(json.clone())
            .map_err(|e| CliError::request_invalid(format!("Invalid request: {}", e)))
    }

    /// Builds the query, typing filter literals with `schema`
    pub fn into_query(self, schema: &Schema) -> CliResult<Query> {
        let filter = match &self.filter {
            Some(json) => parse_filter(json, schema)?,
            None => Filter::Include,
        };
        Ok(Query {
            schema_name: self.schema,
            filter,
            sort: self.sort,
            offset: self.offset,
            max: self.max,
            properties: self.properties,
            hide_identifier: self.hide_identifier,
            target_crs: self.target_crs,
            resample: self.resample,
            hints: self.hints,
        })
    }
}

fn field<'a>(json: &'a JsonValue, name: &str) -> CliResult<&'a JsonValue> {
    json.get(name)
        .ok_or_else(|| CliError::request_invalid(format!("filter is missing '{}'", name)))
}

fn attribute_name(json: &JsonValue) -> CliResult<String> {
    field(json, "attribute")?
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| CliError::request_invalid("filter 'attribute' must be a string"))
}

fn literal(json: &JsonValue, attribute: &str, schema: &Schema) -> CliResult<Value> {
    let ty = schema
        .attribute(attribute)
        .map(|a| a.attr_type)
        .ok_or_else(|| {
            CliError::request_invalid(format!(
                "'{}' is not an attribute of '{}'",
                attribute, schema.name
            ))
        })?;
    Value::from_json(field(json, "value")?, ty)
        .map_err(|e| CliError::request_invalid(format!("'{}': {}", attribute, e)))
}

fn children(json: &JsonValue, schema: &Schema) -> CliResult<Vec<Filter>> {
    field(json, "filters")?
        .as_array()
        .ok_or_else(|| CliError::request_invalid("'filters' must be an array"))?
        .iter()
        .map(|child| parse_filter(child, schema))
        .collect()
}

fn extent(json: &JsonValue) -> CliResult<Extent> {
    let coords: Vec<f64> = field(json, "extent")?
        .as_array()
        .map(|items| items.iter().filter_map(JsonValue::as_f64).collect())
        .unwrap_or_default();
    match coords.as_slice() {
        [min_x, min_y, max_x, max_y] => Ok(Extent::new(*min_x, *min_y, *max_x, *max_y)),
        _ => Err(CliError::request_invalid(
            "'extent' must be [min_x, min_y, max_x, max_y]",
        )),
    }
}

/// Parses one filter node
pub fn parse_filter(json: &JsonValue, schema: &Schema) -> CliResult<Filter> {
    let op = field(json, "op")?
        .as_str()
        .ok_or_else(|| CliError::request_invalid("filter 'op' must be a string"))?;

    let compare = |op: CompareOp| -> CliResult<Filter> {
        let attribute = attribute_name(json)?;
        let value = literal(json, &attribute, schema)?;
        Ok(Filter::Compare {
            attribute,
            op,
            value,
        })
    };

    match op {
        "include" => Ok(Filter::Include),
        "exclude" => Ok(Filter::Exclude),
        "eq" => compare(CompareOp::Eq),
        "ne" => compare(CompareOp::Ne),
        "gt" => compare(CompareOp::Gt),
        "gte" => compare(CompareOp::Gte),
        "lt" => compare(CompareOp::Lt),
        "lte" => compare(CompareOp::Lte),
        "is_null" => Ok(Filter::IsNull(attribute_name(json)?)),
        "ids" => {
            let ids: BTreeSet<String> = field(json, "ids")?
                .as_array()
                .ok_or_else(|| CliError::request_invalid("'ids' must be an array"))?
                .iter()
                .map(|id| {
                    id.as_str()
                        .map(str::to_string)
                        .ok_or_else(|| CliError::request_invalid("'ids' must hold strings"))
                })
                .collect::<CliResult<_>>()?;
            Ok(Filter::IdIn(ids))
        }
        "bbox" => Ok(Filter::BBox {
            attribute: json
                .get("attribute")
                .and_then(JsonValue::as_str)
                .map(str::to_string),
            extent: extent(json)?,
        }),
        "and" => Ok(Filter::And(children(json, schema)?)),
        "or" => Ok(Filter::Or(children(json, schema)?)),
        "not" => Ok(parse_filter(field(json, "filter")?, schema)?.negate()),
        other => Err(CliError::request_invalid(format!(
            "unknown filter op '{}'",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::errors::CliErrorCode;
    use crate::query::SortDirection;
    use crate::schema::AttributeDescriptor;
    use serde_json::json;

    fn schema() -> Schema {
        Schema::new(
            "roads",
            vec![
                AttributeDescriptor::string("name"),
                AttributeDescriptor::int("lanes"),
                AttributeDescriptor::geometry("geom"),
            ],
        )
    }

    #[test]
    fn test_full_request() {
        let json = json!({
            "schema": "roads",
            "filter": {"op": "and", "filters": [
                {"op": "gt", "attribute": "lanes", "value": 2},
                {"op": "bbox", "extent": [0, 0, 10, 10]}
            ]},
            "sort": [{"attribute": "lanes", "direction": "desc"}],
            "offset": 1,
            "max": 5,
            "properties": ["name"],
            "target_crs": "EPSG:3857"
        });
        let query = Request::from_json(&json)
            .unwrap()
            .into_query(&schema())
            .unwrap();

        assert_eq!(query.schema_name, "roads");
        assert_eq!(query.offset, 1);
        assert_eq!(query.max, Some(5));
        assert_eq!(query.sort[0].direction, SortDirection::Desc);
        assert_eq!(query.target_crs, Some(Crs::web_mercator()));
        match &query.filter {
            Filter::And(parts) => {
                assert_eq!(parts[0], Filter::gt("lanes", 2i64));
                assert!(matches!(parts[1], Filter::BBox { attribute: None, .. }));
            }
            other => panic!("unexpected filter {:?}", other),
        }
    }

    #[test]
    fn test_minimal_request_selects_everything() {
        let query = Request::from_json(&json!({"schema": "roads"}))
            .unwrap()
            .into_query(&schema())
            .unwrap();
        assert_eq!(query, Query::all("roads"));
    }

    #[test]
    fn test_literals_typed_by_attribute() {
        let f = parse_filter(
            &json!({"op": "eq", "attribute": "geom", "value": "POINT(1 2)"}),
            &schema(),
        )
        .unwrap();
        match f {
            Filter::Compare { value, .. } => assert!(value.as_geometry().is_some()),
            other => panic!("unexpected filter {:?}", other),
        }

        let err = parse_filter(
            &json!({"op": "eq", "attribute": "lanes", "value": "two"}),
            &schema(),
        )
        .unwrap_err();
        assert_eq!(err.code(), &CliErrorCode::RequestInvalid);
    }

    #[test]
    fn test_not_ids_and_unknown_op() {
        let f = parse_filter(
            &json!({"op": "not", "filter": {"op": "ids", "ids": ["a", "b"]}}),
            &schema(),
        )
        .unwrap();
        assert_eq!(f, Filter::ids(["a", "b"]).negate());

        let err = parse_filter(&json!({"op": "like"}), &schema()).unwrap_err();
        assert_eq!(err.code(), &CliErrorCode::RequestInvalid);
    }
}
