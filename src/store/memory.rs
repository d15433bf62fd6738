//! In-memory reference backend
//!
//! Records live in insertion order per schema. The default store pushes
//! filters down and answers count/extent natively; a streaming store
//! applies nothing so every clause goes through the pipeline.

use std::collections::{BTreeMap, VecDeque};
use std::fs;
use std::path::Path;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::Value as JsonValue;
use uuid::Uuid;

use super::backend::{BackingStore, NativeCursor, RecordWriter};
use super::errors::{StoreError, StoreResult};
use crate::cursor::{EmptyCursor, VecCursor};
use crate::query::{AppliedClauses, Filter, Query};
use crate::record::{Extent, Record};
use crate::schema::{Schema, SchemaLoader};

#[derive(Debug)]
struct Table {
    schema: Arc<Schema>,
    records: Vec<Record>,
}

type Tables = Arc<RwLock<BTreeMap<String, Table>>>;

fn read(tables: &Tables) -> StoreResult<RwLockReadGuard<'_, BTreeMap<String, Table>>> {
    tables
        .read()
        .map_err(|_| StoreError::backend_unavailable("memory store lock poisoned"))
}

fn write(tables: &Tables) -> StoreResult<RwLockWriteGuard<'_, BTreeMap<String, Table>>> {
    tables
        .write()
        .map_err(|_| StoreError::backend_unavailable("memory store lock poisoned"))
}

/// Thread-safe in-memory store
#[derive(Debug, Clone)]
pub struct MemoryStore {
    tables: Tables,
    native: bool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Store with filter push-down and native count/extent
    pub fn new() -> Self {
        Self {
            tables: Arc::new(RwLock::new(BTreeMap::new())),
            native: true,
        }
    }

    /// Store that only streams raw records
    pub fn streaming() -> Self {
        Self {
            native: false,
            ..Self::new()
        }
    }

    /// Builds a store from `{"schemas": [..], "records": {"name": [..]}}`
    pub fn from_dataset(json: &JsonValue) -> StoreResult<Self> {
        let store = Self::new();
        let mut loader = SchemaLoader::new();
        if let Some(schemas) = json.get("schemas") {
            loader.load_value(schemas)?;
        }
        for schema in loader.into_schemas() {
            store.create_schema(schema)?;
        }

        if let Some(records) = json.get("records") {
            let records = records
                .as_object()
                .ok_or_else(|| StoreError::config_invalid("'records' must be an object"))?;
            for (name, rows) in records {
                let schema = store.schema(name)?;
                let rows = rows.as_array().ok_or_else(|| {
                    StoreError::config_invalid(format!("records of '{}' must be an array", name))
                })?;
                let parsed = rows
                    .iter()
                    .map(|row| Record::from_json(Arc::clone(&schema), row))
                    .collect::<StoreResult<Vec<_>>>()?;
                store.insert(name, parsed)?;
            }
        }
        Ok(store)
    }

    pub fn load_dataset(path: &Path) -> StoreResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            StoreError::config_invalid(format!("cannot read {}: {}", path.display(), e))
        })?;
        let json: JsonValue = serde_json::from_str(&content).map_err(|e| {
            StoreError::config_invalid(format!("invalid JSON in {}: {}", path.display(), e))
        })?;
        Self::from_dataset(&json)
    }

    /// Bulk load without going through writers; duplicate ids are rejected
    pub fn insert(&self, name: &str, records: Vec<Record>) -> StoreResult<()> {
        let mut tables = write(&self.tables)?;
        let table = tables
            .get_mut(name)
            .ok_or_else(|| StoreError::schema_not_found(name))?;
        for record in records {
            let record = record.conform(&table.schema)?;
            if table.records.iter().any(|r| r.id() == record.id()) {
                return Err(StoreError::transaction_conflict(format!(
                    "record '{}' already exists in '{}'",
                    record.id(),
                    name
                )));
            }
            table.records.push(record);
        }
        Ok(())
    }

    /// Number of committed records of a schema
    pub fn len(&self, name: &str) -> StoreResult<usize> {
        let tables = read(&self.tables)?;
        tables
            .get(name)
            .map(|t| t.records.len())
            .ok_or_else(|| StoreError::schema_not_found(name))
    }

    fn matching(&self, name: &str, filter: &Filter) -> StoreResult<(Arc<Schema>, Vec<Record>)> {
        let tables = read(&self.tables)?;
        let table = tables
            .get(name)
            .ok_or_else(|| StoreError::schema_not_found(name))?;
        let records = table
            .records
            .iter()
            .filter(|r| filter.evaluate(r))
            .cloned()
            .collect();
        Ok((Arc::clone(&table.schema), records))
    }
}

impl BackingStore for MemoryStore {
    fn names(&self) -> StoreResult<Vec<String>> {
        Ok(read(&self.tables)?.keys().cloned().collect())
    }

    fn schema(&self, name: &str) -> StoreResult<Arc<Schema>> {
        read(&self.tables)?
            .get(name)
            .map(|t| Arc::clone(&t.schema))
            .ok_or_else(|| StoreError::schema_not_found(name))
    }

    fn create_schema(&self, schema: Schema) -> StoreResult<Arc<Schema>> {
        schema
            .validate_structure()
            .map_err(StoreError::malformed_query)?;
        let mut tables = write(&self.tables)?;
        if tables.contains_key(&schema.name) {
            return Err(StoreError::schema_exists(&schema.name));
        }
        let schema = Arc::new(schema);
        tables.insert(
            schema.name.clone(),
            Table {
                schema: Arc::clone(&schema),
                records: Vec::new(),
            },
        );
        Ok(schema)
    }

    fn update_schema(&self, schema: Schema) -> StoreResult<Arc<Schema>> {
        schema
            .validate_structure()
            .map_err(StoreError::malformed_query)?;
        let mut tables = write(&self.tables)?;
        let table = tables
            .get_mut(&schema.name)
            .ok_or_else(|| StoreError::schema_not_found(&schema.name))?;
        let schema = Arc::new(schema);
        let old = std::mem::replace(&mut table.schema, Arc::clone(&schema));
        let records = std::mem::take(&mut table.records);
        table.records = records
            .into_iter()
            .map(|r| r.rebind(Arc::clone(&schema)))
            .collect();
        Ok(old)
    }

    fn remove_schema(&self, name: &str) -> StoreResult<Arc<Schema>> {
        write(&self.tables)?
            .remove(name)
            .map(|t| t.schema)
            .ok_or_else(|| StoreError::schema_not_found(name))
    }

    fn cursor(&self, query: &Query) -> StoreResult<NativeCursor> {
        if !self.native {
            let (schema, records) = self.matching(&query.schema_name, &Filter::Include)?;
            return Ok(NativeCursor::raw(Box::new(VecCursor::new(schema, records))));
        }
        if query.filter.is_exclude() {
            let schema = self.schema(&query.schema_name)?;
            return Ok(NativeCursor::new(
                Box::new(EmptyCursor::new(schema)),
                AppliedClauses::filter_only(),
            ));
        }
        let (schema, records) = self.matching(&query.schema_name, &query.filter)?;
        Ok(NativeCursor::new(
            Box::new(VecCursor::new(schema, records)),
            AppliedClauses::filter_only(),
        ))
    }

    fn writer(&self, name: &str, filter: &Filter) -> StoreResult<Box<dyn RecordWriter>> {
        let (schema, records) = self.matching(name, filter)?;
        let ids = records.into_iter().map(|r| r.id().to_string()).collect();
        Ok(Box::new(MemoryWriter {
            tables: Arc::clone(&self.tables),
            name: name.to_string(),
            schema,
            mode: WriteMode::InPlace {
                pending: ids,
                current: None,
            },
            closed: false,
        }))
    }

    fn appender(&self, name: &str) -> StoreResult<Box<dyn RecordWriter>> {
        let schema = self.schema(name)?;
        Ok(Box::new(MemoryWriter {
            tables: Arc::clone(&self.tables),
            name: name.to_string(),
            schema,
            mode: WriteMode::Append,
            closed: false,
        }))
    }

    fn count(&self, query: &Query) -> StoreResult<Option<u64>> {
        if !self.native {
            return Ok(None);
        }
        let tables = read(&self.tables)?;
        let table = tables
            .get(&query.schema_name)
            .ok_or_else(|| StoreError::schema_not_found(&query.schema_name))?;
        let n = table.records.iter().filter(|r| query.filter.evaluate(r)).count();
        Ok(Some(n as u64))
    }

    fn extent(&self, query: &Query) -> StoreResult<Option<Extent>> {
        if !self.native {
            return Ok(None);
        }
        let tables = read(&self.tables)?;
        let table = tables
            .get(&query.schema_name)
            .ok_or_else(|| StoreError::schema_not_found(&query.schema_name))?;
        Ok(table
            .records
            .iter()
            .filter(|r| query.filter.evaluate(r))
            .fold(None, |acc, r| Extent::merge(acc, r.bounds())))
    }
}

enum WriteMode {
    InPlace {
        pending: VecDeque<String>,
        current: Option<String>,
    },
    Append,
}

struct MemoryWriter {
    tables: Tables,
    name: String,
    schema: Arc<Schema>,
    mode: WriteMode,
    closed: bool,
}

impl MemoryWriter {
    fn check_open(&self) -> StoreResult<()> {
        if self.closed {
            return Err(StoreError::cursor_failed("writer is closed"));
        }
        Ok(())
    }
}

impl RecordWriter for MemoryWriter {
    fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    fn has_next(&mut self) -> StoreResult<bool> {
        self.check_open()?;
        match &self.mode {
            WriteMode::InPlace { pending, .. } => Ok(!pending.is_empty()),
            WriteMode::Append => Ok(false),
        }
    }

    fn next(&mut self) -> StoreResult<Record> {
        self.check_open()?;
        match &mut self.mode {
            WriteMode::InPlace { pending, current } => {
                let tables = read(&self.tables)?;
                let table = tables
                    .get(&self.name)
                    .ok_or_else(|| StoreError::schema_not_found(&self.name))?;
                // Records removed since the writer opened are passed over
                while let Some(id) = pending.pop_front() {
                    if let Some(record) = table.records.iter().find(|r| r.id() == id) {
                        *current = Some(id);
                        return Ok(record.clone());
                    }
                }
                Err(StoreError::cursor_failed("no record pending"))
            }
            WriteMode::Append => Ok(Record::new(
                Uuid::new_v4().to_string(),
                Arc::clone(&self.schema),
                Vec::new(),
            )),
        }
    }

    fn write(&mut self, record: Record) -> StoreResult<()> {
        self.check_open()?;
        let mut tables = write(&self.tables)?;
        let table = tables
            .get_mut(&self.name)
            .ok_or_else(|| StoreError::schema_not_found(&self.name))?;
        let record = record.conform(&table.schema)?;
        match &self.mode {
            WriteMode::InPlace { current, .. } => {
                let id = current
                    .as_deref()
                    .ok_or_else(|| StoreError::cursor_failed("write without a current record"))?;
                if record.id() != id {
                    return Err(StoreError::malformed_query(format!(
                        "writer is positioned on '{}' but got '{}'",
                        id,
                        record.id()
                    )));
                }
                let slot = table
                    .records
                    .iter_mut()
                    .find(|r| r.id() == id)
                    .ok_or_else(|| StoreError::cursor_failed(format!("record '{}' vanished", id)))?;
                *slot = record;
            }
            WriteMode::Append => {
                if table.records.iter().any(|r| r.id() == record.id()) {
                    return Err(StoreError::transaction_conflict(format!(
                        "record '{}' already exists in '{}'",
                        record.id(),
                        self.name
                    )));
                }
                table.records.push(record);
            }
        }
        Ok(())
    }

    fn remove(&mut self) -> StoreResult<()> {
        self.check_open()?;
        let id = match &mut self.mode {
            WriteMode::InPlace { current, .. } => current
                .take()
                .ok_or_else(|| StoreError::cursor_failed("remove without a current record"))?,
            WriteMode::Append => {
                return Err(StoreError::cursor_failed("append writers cannot remove"))
            }
        };
        let mut tables = write(&self.tables)?;
        if let Some(table) = tables.get_mut(&self.name) {
            table.records.retain(|r| r.id() != id);
        }
        Ok(())
    }

    fn close(&mut self) {
        self.closed = true;
        if let WriteMode::InPlace { pending, current } = &mut self.mode {
            pending.clear();
            *current = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::collect;
    use crate::record::Value;
    use crate::schema::AttributeDescriptor;
    use crate::store::StoreErrorCode;
    use geo_types::point;
    use serde_json::json;

    fn store() -> (MemoryStore, Arc<Schema>) {
        let store = MemoryStore::new();
        let schema = store
            .create_schema(Schema::new(
                "pts",
                vec![AttributeDescriptor::int("v"), AttributeDescriptor::geometry("g")],
            ))
            .unwrap();
        let recs = (1..=3)
            .map(|i| {
                Record::new(
                    format!("p{}", i),
                    Arc::clone(&schema),
                    vec![
                        Value::Int(i),
                        Value::Geometry(point!(x: i as f64, y: -(i as f64)).into()),
                    ],
                )
            })
            .collect();
        store.insert("pts", recs).unwrap();
        (store, schema)
    }

    fn ids(native: NativeCursor) -> Vec<String> {
        collect(native.cursor)
            .unwrap()
            .iter()
            .map(|r| r.id().to_string())
            .collect()
    }

    #[test]
    fn test_native_store_pushes_filter_down() {
        let (store, _) = store();
        let q = Query::all("pts").with_filter(Filter::gt("v", 1i64));
        let native = store.cursor(&q).unwrap();
        assert_eq!(native.applied, AppliedClauses::filter_only());
        assert_eq!(ids(native), vec!["p2", "p3"]);
        assert_eq!(store.count(&q).unwrap(), Some(2));
        assert_eq!(store.extent(&q).unwrap(), Some(Extent::new(2.0, -3.0, 3.0, -2.0)));
    }

    #[test]
    fn test_streaming_store_applies_nothing() {
        let store = MemoryStore::streaming();
        let schema = store
            .create_schema(Schema::new("t", vec![AttributeDescriptor::int("v")]))
            .unwrap();
        store
            .insert("t", vec![Record::new("a", schema, vec![Value::Int(1)])])
            .unwrap();
        let q = Query::all("t").with_filter(Filter::Exclude);
        let native = store.cursor(&q).unwrap();
        assert_eq!(native.applied, AppliedClauses::none());
        assert_eq!(ids(native), vec!["a"]);
        assert_eq!(store.count(&q).unwrap(), None);
        assert_eq!(store.extent(&q).unwrap(), None);
    }

    #[test]
    fn test_in_place_writer_updates_and_removes() {
        let (store, _) = store();
        let mut w = store.writer("pts", &Filter::gte("v", 2i64)).unwrap();
        let mut r = w.next().unwrap();
        assert_eq!(r.id(), "p2");
        r.set("v", Value::Int(20));
        w.write(r).unwrap();
        assert!(w.has_next().unwrap());
        w.next().unwrap();
        w.remove().unwrap();
        assert!(!w.has_next().unwrap());
        w.close();
        assert!(w.has_next().is_err());

        let all = collect(store.cursor(&Query::all("pts")).unwrap().cursor).unwrap();
        let values: Vec<(String, Value)> = all
            .iter()
            .map(|r| (r.id().to_string(), r.get("v").cloned().unwrap()))
            .collect();
        assert_eq!(
            values,
            vec![("p1".to_string(), Value::Int(1)), ("p2".to_string(), Value::Int(20))]
        );
    }

    #[test]
    fn test_in_place_write_must_match_position() {
        let (store, schema) = store();
        let mut w = store.writer("pts", &Filter::Include).unwrap();
        assert!(w.write(Record::new("p1", Arc::clone(&schema), vec![])).is_err());
        w.next().unwrap();
        let err = w.write(Record::new("p9", schema, vec![])).unwrap_err();
        assert_eq!(err.code(), StoreErrorCode::MalformedQuery);
    }

    #[test]
    fn test_append_writer_generates_ids() {
        let (store, _) = store();
        let mut w = store.appender("pts").unwrap();
        assert!(!w.has_next().unwrap());
        let mut fresh = w.next().unwrap();
        assert!(Uuid::parse_str(fresh.id()).is_ok());
        fresh.set("v", Value::Int(9));
        let id = fresh.id().to_string();
        w.write(fresh.clone()).unwrap();
        let err = w.write(fresh).unwrap_err();
        assert_eq!(err.code(), StoreErrorCode::TransactionConflict);
        assert!(w.remove().is_err());
        w.close();

        assert_eq!(store.len("pts").unwrap(), 4);
        let q = Query::all("pts").with_filter(Filter::ids([id]));
        assert_eq!(store.count(&q).unwrap(), Some(1));
    }

    #[test]
    fn test_write_rejects_nonconforming_value() {
        let (store, schema) = store();
        let mut w = store.appender("pts").unwrap();
        let bad = Record::new("x", schema, vec![Value::from("nope")]);
        assert!(w.write(bad).is_err());
    }

    #[test]
    fn test_schema_lifecycle() {
        let (store, _) = store();
        assert_eq!(store.names().unwrap(), vec!["pts"]);
        assert_eq!(
            store.create_schema(Schema::new("pts", vec![])).unwrap_err().code(),
            StoreErrorCode::SchemaExists
        );

        let old = store
            .update_schema(Schema::new(
                "pts",
                vec![AttributeDescriptor::int("v"), AttributeDescriptor::string("label")],
            ))
            .unwrap();
        assert_eq!(old.len(), 2);
        let recs = collect(store.cursor(&Query::all("pts")).unwrap().cursor).unwrap();
        assert_eq!(recs[0].values(), &[Value::Int(1), Value::Null]);

        store.remove_schema("pts").unwrap();
        assert_eq!(
            store.schema("pts").unwrap_err().code(),
            StoreErrorCode::SchemaNotFound
        );
    }

    #[test]
    fn test_from_dataset() {
        let data = json!({
            "schemas": [{
                "name": "cities",
                "attributes": [
                    {"name": "name", "type": "string"},
                    {"name": "loc", "type": "geometry"}
                ]
            }],
            "records": {
                "cities": [
                    {"id": "c1", "attributes": {"name": "Oslo", "loc": "POINT(10.7 59.9)"}},
                    {"id": "c2", "attributes": {"name": "Bergen", "loc": "POINT(5.3 60.4)"}}
                ]
            }
        });
        let store = MemoryStore::from_dataset(&data).unwrap();
        assert_eq!(store.len("cities").unwrap(), 2);
        let schema = store.schema("cities").unwrap();
        assert_eq!(schema.default_geometry.as_deref(), Some("loc"));
        let extent = store.extent(&Query::all("cities")).unwrap().unwrap();
        assert_eq!(extent, Extent::new(5.3, 59.9, 10.7, 60.4));
    }

    #[test]
    fn test_from_dataset_unknown_schema() {
        let data = json!({"records": {"ghost": []}});
        let err = MemoryStore::from_dataset(&data).unwrap_err();
        assert_eq!(err.code(), StoreErrorCode::SchemaNotFound);
    }
}
