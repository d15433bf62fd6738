//! CLI command implementations
//!
//! Every command loads the dataset into a [`MemoryStore`], wraps it in a
//! [`DataStore`] configured from `--config`, runs one request and prints
//! one JSON response.

use std::path::Path;
use std::sync::Arc;

use serde_json::{json, Value};

use crate::cursor::{self, RecordCursor};
use crate::observability::Logger;
use crate::store::{DataStore, MemoryStore, StoreConfig};

use super::args::{Command, Source};
use super::errors::{CliError, CliResult};
use super::io::{read_request, write_error, write_response};
use super::request::Request;

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run a command and print its response
pub fn run_command(cmd: Command) -> CliResult<()> {
    match execute(cmd) {
        Ok(data) => write_response(data),
        Err(e) => {
            write_error(e.code_str(), e.message())?;
            Err(e)
        }
    }
}

/// Run a command and return the response payload
pub fn execute(cmd: Command) -> CliResult<Value> {
    match cmd {
        Command::Query { source, request } => query(&source, request.as_deref()),
        Command::Count { source, request } => count(&source, request.as_deref()),
        Command::Extent { source, request } => extent(&source, request.as_deref()),
        Command::Schemas { source } => schemas(&source),
    }
}

/// Load configuration, falling back to defaults without `--config`
fn load_config(path: Option<&Path>) -> CliResult<StoreConfig> {
    match path {
        Some(path) => {
            StoreConfig::load(path).map_err(|e| CliError::config_error(e.message().to_string()))
        }
        None => Ok(StoreConfig::default()),
    }
}

fn open(source: &Source) -> CliResult<DataStore> {
    let config = load_config(source.config.as_deref())?;
    let severity = config
        .severity()
        .map_err(|e| CliError::config_error(e.message().to_string()))?;
    Logger::set_min_severity(severity);

    let backend = MemoryStore::load_dataset(&source.data)
        .map_err(|e| CliError::config_error(e.message().to_string()))?;
    Ok(DataStore::with_config(Arc::new(backend), config)?)
}

fn read_query(store: &DataStore, path: Option<&Path>) -> CliResult<crate::query::Query> {
    let request = Request::from_json(&read_request(path)?)?;
    let schema = store.schema(&request.schema)?;
    request.into_query(&schema)
}

/// Print the selected records
pub fn query(source: &Source, request: Option<&Path>) -> CliResult<Value> {
    let store = open(source)?;
    let query = read_query(&store, request)?;
    let cursor = store.query(&query)?;
    let schema = Arc::clone(cursor.schema());
    let records = cursor::collect(cursor).map_err(crate::store::StoreError::from)?;

    let attributes: Vec<&str> = schema.attributes.iter().map(|a| a.name.as_str()).collect();
    let rows: Vec<Value> = records.iter().map(|r| r.to_json()).collect();
    Ok(json!({
        "schema": schema.name,
        "crs": schema.crs.code(),
        "attributes": attributes,
        "records": rows,
    }))
}

/// Print the number of selected records
pub fn count(source: &Source, request: Option<&Path>) -> CliResult<Value> {
    let store = open(source)?;
    let query = read_query(&store, request)?;
    let n = store.count(&query)?;
    Ok(json!({ "count": n }))
}

/// Print the bounds of the selected records, `null` when none has any
pub fn extent(source: &Source, request: Option<&Path>) -> CliResult<Value> {
    let store = open(source)?;
    let query = read_query(&store, request)?;
    let extent = store.extent(&query)?;
    Ok(json!({ "extent": extent }))
}

/// Print every schema with its attributes
pub fn schemas(source: &Source) -> CliResult<Value> {
    let store = open(source)?;
    let mut out = Vec::new();
    for name in store.names()? {
        let schema = store.schema(&name)?;
        out.push(serde_json::to_value(schema.as_ref())?);
    }
    Ok(json!({ "schemas": out }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::errors::CliErrorCode;
    use std::fs;
    use tempfile::TempDir;

    fn dataset() -> Value {
        json!({
            "schemas": [{
                "name": "roads",
                "attributes": [
                    {"name": "name", "type": "string"},
                    {"name": "lanes", "type": "int"},
                    {"name": "geom", "type": "geometry"}
                ]
            }],
            "records": {
                "roads": [
                    {"id": "r1", "attributes": {"name": "A1", "lanes": 4, "geom": "POINT(0 0)"}},
                    {"id": "r2", "attributes": {"name": "B2", "lanes": 2, "geom": "POINT(5 5)"}},
                    {"id": "r3", "attributes": {"name": "C3", "lanes": 3, "geom": "POINT(9 1)"}}
                ]
            }
        })
    }

    fn setup(request: Value) -> (TempDir, Source, std::path::PathBuf) {
        let dir = TempDir::new().unwrap();
        let data = dir.path().join("data.json");
        fs::write(&data, dataset().to_string()).unwrap();
        let req = dir.path().join("request.json");
        fs::write(&req, request.to_string()).unwrap();
        let source = Source { data, config: None };
        (dir, source, req)
    }

    #[test]
    fn test_query_command() {
        let (_dir, source, req) = setup(json!({
            "schema": "roads",
            "filter": {"op": "gte", "attribute": "lanes", "value": 3},
            "sort": [{"attribute": "lanes", "direction": "asc"}],
            "properties": ["name"]
        }));
        let out = execute(Command::Query {
            source,
            request: Some(req),
        })
        .unwrap();
        assert_eq!(out["attributes"], json!(["name"]));
        let ids: Vec<&str> = out["records"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["r3", "r1"]);
    }

    #[test]
    fn test_count_and_extent_commands() {
        let request = json!({
            "schema": "roads",
            "filter": {"op": "bbox", "extent": [1, 0, 10, 10]}
        });
        let (_dir, source, req) = setup(request);
        let out = execute(Command::Count {
            source: source.clone(),
            request: Some(req.clone()),
        })
        .unwrap();
        assert_eq!(out["count"], json!(2));

        let out = execute(Command::Extent {
            source,
            request: Some(req),
        })
        .unwrap();
        assert_eq!(out["extent"]["min_x"], json!(5.0));
        assert_eq!(out["extent"]["max_x"], json!(9.0));
    }

    #[test]
    fn test_unknown_schema_is_store_failure() {
        let (_dir, source, req) = setup(json!({"schema": "rivers"}));
        let err = execute(Command::Count {
            source,
            request: Some(req),
        })
        .unwrap_err();
        assert_eq!(err.code(), &CliErrorCode::StoreFailed);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let (dir, mut source, req) = setup(json!({"schema": "roads"}));
        let config = dir.path().join("store.json");
        fs::write(&config, r#"{"join_id_separator": ""}"#).unwrap();
        source.config = Some(config);
        let err = execute(Command::Query {
            source,
            request: Some(req),
        })
        .unwrap_err();
        assert_eq!(err.code(), &CliErrorCode::ConfigError);
    }

    #[test]
    fn test_schemas_command() {
        let (_dir, source, _) = setup(json!({}));
        let out = execute(Command::Schemas { source }).unwrap();
        assert_eq!(out["schemas"][0]["name"], json!("roads"));
    }
}
