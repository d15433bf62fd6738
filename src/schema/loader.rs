//! Loads schema definitions from JSON
//!
//! A schema file holds either one schema object or an array of them.
//! Every loaded schema is structurally validated; duplicate names across
//! files are rejected.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde_json::Value as JsonValue;

use super::types::Schema;
use crate::store::{StoreError, StoreResult};

/// Registry of schemas read from disk or from inline JSON
#[derive(Debug, Default)]
pub struct SchemaLoader {
    schemas: BTreeMap<String, Schema>,
}

impl SchemaLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads every `*.json` file of `dir`, in file name order
    pub fn load_dir(&mut self, dir: &Path) -> StoreResult<()> {
        let entries = fs::read_dir(dir).map_err(|e| {
            StoreError::config_invalid(format!("cannot read schema directory {}: {}", dir.display(), e))
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                StoreError::config_invalid(format!("cannot read entry in {}: {}", dir.display(), e))
            })?;
            let path = entry.path();
            if path.extension().map_or(false, |ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        for path in paths {
            self.load_file(&path)?;
        }
        Ok(())
    }

    pub fn load_file(&mut self, path: &Path) -> StoreResult<()> {
        let content = fs::read_to_string(path).map_err(|e| {
            StoreError::config_invalid(format!("cannot read {}: {}", path.display(), e))
        })?;
        let json: JsonValue = serde_json::from_str(&content).map_err(|e| {
            StoreError::config_invalid(format!("invalid JSON in {}: {}", path.display(), e))
        })?;
        self.load_value(&json)
            .map_err(|e| StoreError::config_invalid(format!("{}: {}", path.display(), e.message())))
    }

    /// Loads one schema object or an array of schema objects
    pub fn load_value(&mut self, json: &JsonValue) -> StoreResult<()> {
        match json {
            JsonValue::Array(items) => {
                for item in items {
                    self.load_one(item)?;
                }
                Ok(())
            }
            other => self.load_one(other),
        }
    }

    fn load_one(&mut self, json: &JsonValue) -> StoreResult<()> {
        let mut schema: Schema = serde_json::from_value(json.clone())
            .map_err(|e| StoreError::config_invalid(format!("invalid schema: {}", e)))?;
        if schema.default_geometry.is_none() {
            schema.default_geometry = schema
                .attributes
                .iter()
                .find(|a| a.attr_type.is_geometry())
                .map(|a| a.name.clone());
        }
        self.register(schema)
    }

    /// Adds a schema after validating it
    pub fn register(&mut self, schema: Schema) -> StoreResult<()> {
        schema
            .validate_structure()
            .map_err(|e| StoreError::config_invalid(format!("schema '{}': {}", schema.name, e)))?;
        if self.schemas.contains_key(&schema.name) {
            return Err(StoreError::schema_exists(&schema.name));
        }
        self.schemas.insert(schema.name.clone(), schema);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Schema> {
        self.schemas.get(name)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Hands the loaded schemas over in name order
    pub fn into_schemas(self) -> Vec<Schema> {
        self.schemas.into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreErrorCode;
    use serde_json::json;
    use tempfile::TempDir;

    fn roads() -> JsonValue {
        json!({
            "name": "roads",
            "attributes": [
                {"name": "name", "type": "string"},
                {"name": "lanes", "type": "int"},
                {"name": "geom", "type": "geometry"}
            ],
            "default_geometry": "geom"
        })
    }

    #[test]
    fn test_load_single_and_array() {
        let mut loader = SchemaLoader::new();
        loader.load_value(&roads()).unwrap();
        loader
            .load_value(&json!([{"name": "a", "attributes": []}, {"name": "b", "attributes": []}]))
            .unwrap();
        assert_eq!(loader.len(), 3);
        assert_eq!(loader.get("roads").unwrap().len(), 3);
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut loader = SchemaLoader::new();
        loader.load_value(&roads()).unwrap();
        let err = loader.load_value(&roads()).unwrap_err();
        assert_eq!(err.code(), StoreErrorCode::SchemaExists);
    }

    #[test]
    fn test_invalid_structure_rejected() {
        let mut loader = SchemaLoader::new();
        let bad = json!({
            "name": "dup",
            "attributes": [{"name": "x", "type": "int"}, {"name": "x", "type": "int"}]
        });
        let err = loader.load_value(&bad).unwrap_err();
        assert_eq!(err.code(), StoreErrorCode::ConfigInvalid);
    }

    #[test]
    fn test_load_dir_skips_non_json() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("roads.json"), roads().to_string()).unwrap();
        fs::write(dir.path().join("notes.txt"), "not a schema").unwrap();

        let mut loader = SchemaLoader::new();
        loader.load_dir(dir.path()).unwrap();
        let names: Vec<String> = loader.into_schemas().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["roads"]);
    }

    #[test]
    fn test_missing_dir_is_config_error() {
        let mut loader = SchemaLoader::new();
        let err = loader.load_dir(Path::new("/nonexistent/schemas")).unwrap_err();
        assert_eq!(err.code(), StoreErrorCode::ConfigInvalid);
    }
}
