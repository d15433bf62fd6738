//! Record and record builder

use std::sync::Arc;

use serde_json::{Map, Value as JsonValue};

use super::extent::Extent;
use super::value::Value;
use crate::schema::Schema;
use crate::store::{StoreError, StoreResult};

/// One row of attribute values plus an identifier, conforming to a schema
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    id: String,
    schema: Arc<Schema>,
    values: Vec<Value>,
}

impl Record {
    /// Creates a record from values in schema order. Missing trailing
    /// values are filled with null, extra values are dropped.
    pub fn new(id: impl Into<String>, schema: Arc<Schema>, mut values: Vec<Value>) -> Self {
        values.resize(schema.len(), Value::Null);
        Self {
            id: id.into(),
            schema,
            values,
        }
    }

    /// Starts a builder for a record of `schema`
    pub fn builder(schema: Arc<Schema>) -> RecordBuilder {
        RecordBuilder::new(schema)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    /// Value of the named attribute
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.schema.index_of(name).and_then(|i| self.values.get(i))
    }

    /// Value at an attribute position
    pub fn get_at(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Replaces the named attribute in place; returns false if the schema
    /// has no such attribute.
    pub fn set(&mut self, name: &str, value: Value) -> bool {
        match self.schema.index_of(name) {
            Some(i) => {
                self.values[i] = value;
                true
            }
            None => false,
        }
    }

    /// Replaces the value at a position in place
    pub fn set_at(&mut self, index: usize, value: Value) {
        if let Some(slot) = self.values.get_mut(index) {
            *slot = value;
        }
    }

    /// Replaces the identifier in place
    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = id.into();
    }

    /// Value of the default geometry attribute
    pub fn default_geometry(&self) -> Option<&Value> {
        self.schema
            .default_geometry_index()
            .and_then(|i| self.values.get(i))
    }

    /// Re-expresses the record in `schema`, carrying values over by
    /// attribute name. Attributes missing from the old schema, or whose
    /// value no longer fits the new type, become null.
    pub fn rebind(self, schema: Arc<Schema>) -> Record {
        let values = schema
            .attributes
            .iter()
            .map(|attr| {
                self.get(&attr.name)
                    .filter(|v| v.conforms_to(attr.attr_type))
                    .cloned()
                    .unwrap_or(Value::Null)
            })
            .collect();
        Record {
            id: self.id,
            schema,
            values,
        }
    }

    /// Checks every value against its declared type and rebinds the record
    /// to `schema`. The identifier must be non-empty.
    pub fn conform(self, schema: &Arc<Schema>) -> StoreResult<Record> {
        for (attr, value) in self.schema.attributes.iter().zip(&self.values) {
            if !value.conforms_to(attr.attr_type) {
                return Err(StoreError::malformed_query(format!(
                    "record '{}': attribute '{}' expects {}",
                    self.id,
                    attr.name,
                    attr.attr_type.type_name()
                )));
            }
        }
        if self.id.is_empty() {
            return Err(StoreError::malformed_query("record identifier is required"));
        }
        if Arc::ptr_eq(&self.schema, schema) {
            Ok(self)
        } else {
            Ok(self.rebind(Arc::clone(schema)))
        }
    }

    /// Bounds of the default geometry, if present and non-empty
    pub fn bounds(&self) -> Option<Extent> {
        self.default_geometry()
            .and_then(Value::as_geometry)
            .and_then(Extent::of_geometry)
    }

    /// Converts the record to `{"id": .., "attributes": {..}}`
    pub fn to_json(&self) -> JsonValue {
        let mut attributes = Map::new();
        for (attr, value) in self.schema.attributes.iter().zip(&self.values) {
            attributes.insert(attr.name.clone(), value.to_json());
        }
        let mut out = Map::new();
        out.insert("id".into(), JsonValue::String(self.id.clone()));
        out.insert("attributes".into(), JsonValue::Object(attributes));
        JsonValue::Object(out)
    }

    /// Reads a record from `{"id": .., "attributes": {..}}`. Absent
    /// attributes become null; unknown attributes are rejected.
    pub fn from_json(schema: Arc<Schema>, json: &JsonValue) -> StoreResult<Record> {
        let id = json
            .get("id")
            .and_then(JsonValue::as_str)
            .ok_or_else(|| StoreError::malformed_query("record is missing a string 'id'"))?;

        let mut builder = Record::builder(schema).id(id);
        if let Some(attrs) = json.get("attributes") {
            let attrs = attrs.as_object().ok_or_else(|| {
                StoreError::malformed_query(format!("record '{}': attributes must be an object", id))
            })?;
            for (name, raw) in attrs {
                let ty = builder
                    .schema
                    .attribute(name)
                    .map(|a| a.attr_type)
                    .ok_or_else(|| {
                        StoreError::malformed_query(format!(
                            "record '{}': unknown attribute '{}'",
                            id, name
                        ))
                    })?;
                let value = Value::from_json(raw, ty).map_err(|e| {
                    StoreError::malformed_query(format!("record '{}', '{}': {}", id, name, e))
                })?;
                builder = builder.set(name, value)?;
            }
        }
        builder.build()
    }
}

/// Mutable builder that assembles a record attribute by attribute
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    schema: Arc<Schema>,
    id: Option<String>,
    values: Vec<Value>,
}

impl RecordBuilder {
    pub fn new(schema: Arc<Schema>) -> Self {
        let values = vec![Value::Null; schema.len()];
        Self {
            schema,
            id: None,
            values,
        }
    }

    /// Sets the identifier
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets a named attribute after checking its type
    pub fn set(mut self, name: &str, value: impl Into<Value>) -> StoreResult<Self> {
        let value = value.into();
        let index = self.schema.index_of(name).ok_or_else(|| {
            StoreError::malformed_query(format!(
                "schema '{}' has no attribute '{}'",
                self.schema.name, name
            ))
        })?;
        let ty = self.schema.attributes[index].attr_type;
        if !value.conforms_to(ty) {
            return Err(StoreError::malformed_query(format!(
                "attribute '{}' expects {}",
                name,
                ty.type_name()
            )));
        }
        self.values[index] = value;
        Ok(self)
    }

    /// Finishes the record; an identifier is required
    pub fn build(self) -> StoreResult<Record> {
        let id = self
            .id
            .ok_or_else(|| StoreError::malformed_query("record identifier is required"))?;
        Ok(Record {
            id,
            schema: self.schema,
            values: self.values,
        })
    }
}
