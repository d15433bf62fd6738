//! Store facade
//!
//! Reads go through three layers: the backing store's native cursor, the
//! pending transaction's [`DiffCursor`] when one touches the schema, and
//! the decorator pipeline for whatever is left of the query. Aggregates
//! take the store's fast path when it offers one and iterate otherwise.
//!
//! Writes either go straight to the backing store (and are announced to
//! listeners afterwards) or, inside a transaction, are recorded into the
//! schema's [`Diff`] until commit.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};

use uuid::Uuid;

use super::backend::{BackingStore, NativeCursor, RecordSource, RecordWriter};
use super::config::StoreConfig;
use super::errors::{StoreError, StoreResult};
use crate::crs::TransformRegistry;
use crate::cursor::{self, BoxCursor, CursorIter, FilterCursor, RecordCursor};
use crate::events::{EventKind, ListenerId, ListenerRegistry, StorageEvent, StorageListener};
use crate::join::{JoinCursor, JoinQuery};
use crate::observability::{log_event, Event, Logger};
use crate::pipeline::PipelineBuilder;
use crate::query::{Filter, Query};
use crate::record::{Extent, Record, Value};
use crate::schema::Schema;
use crate::transaction::{Diff, DiffCursor, ModifiedEntry, Transaction};

/// Entry point for queries, aggregates, edits and transactions
pub struct DataStore {
    backend: Arc<dyn BackingStore>,
    config: StoreConfig,
    transforms: TransformRegistry,
    listeners: ListenerRegistry,
    transaction: Mutex<Option<Transaction>>,
}

impl DataStore {
    /// Facade with the default configuration and built-in transforms
    pub fn new(backend: Arc<dyn BackingStore>) -> Self {
        Self {
            backend,
            config: StoreConfig::default(),
            transforms: TransformRegistry::new(),
            listeners: ListenerRegistry::new(),
            transaction: Mutex::new(None),
        }
    }

    pub fn with_config(backend: Arc<dyn BackingStore>, config: StoreConfig) -> StoreResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::new(backend)
        })
    }

    /// Replaces the coordinate transforms available to reprojection
    pub fn with_transforms(mut self, transforms: TransformRegistry) -> Self {
        self.transforms = transforms;
        self
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn names(&self) -> StoreResult<Vec<String>> {
        self.backend.names()
    }

    pub fn schema(&self, name: &str) -> StoreResult<Arc<Schema>> {
        self.backend.schema(name)
    }

    // ==================== Listeners ====================

    pub fn add_listener(&self, listener: Arc<dyn StorageListener>) -> ListenerId {
        self.listeners.register(listener)
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners.unregister(id)
    }

    fn notify(&self, event: StorageEvent) {
        self.listeners.broadcast(&event);
    }

    // ==================== Schemas ====================

    pub fn create_schema(&self, schema: Schema) -> StoreResult<Arc<Schema>> {
        let created = self.backend.create_schema(schema)?;
        log_event(Event::SchemaCreated, &[("schema", created.name.as_str())]);
        self.notify(StorageEvent::structure_added(Arc::clone(&created)));
        Ok(created)
    }

    pub fn update_schema(&self, schema: Schema) -> StoreResult<Arc<Schema>> {
        let name = schema.name.clone();
        let old = self.backend.update_schema(schema)?;
        let new = self.backend.schema(&name)?;
        log_event(Event::SchemaUpdated, &[("schema", name.as_str())]);
        self.notify(StorageEvent::structure_updated(old, Arc::clone(&new)));
        Ok(new)
    }

    /// Drops a schema, its records and any edits pending against it
    pub fn remove_schema(&self, name: &str) -> StoreResult<Arc<Schema>> {
        let old = self.backend.remove_schema(name)?;
        if let Some(tx) = self.lock_transaction()?.as_mut() {
            tx.forget(name);
        }
        log_event(Event::SchemaRemoved, &[("schema", name)]);
        self.notify(StorageEvent::structure_removed(Arc::clone(&old)));
        Ok(old)
    }

    // ==================== Reads ====================

    /// Opens a cursor over the records `query` selects, as seen by the
    /// current transaction.
    pub fn query(&self, query: &Query) -> StoreResult<BoxCursor> {
        let schema = self.backend.schema(&query.schema_name)?;
        query.validate(&schema)?;

        if self.config.log_queries {
            let filter = format!("{:?}", query.filter);
            log_event(
                Event::QueryReceived,
                &[
                    ("filter", filter.as_str()),
                    ("schema", query.schema_name.as_str()),
                ],
            );
        }

        let (base, residual) = self.base_cursor(query)?;
        let pipeline = PipelineBuilder::new(&self.transforms)
            .with_failure_policy(self.config.transform_failure_policy)
            .with_max_sort_buffer(self.config.max_sort_buffer)
            .build(&residual, base)?;

        if self.config.log_queries {
            let stages = pipeline.describe();
            log_event(
                Event::PipelineBuilt,
                &[
                    ("schema", query.schema_name.as_str()),
                    ("stages", stages.as_str()),
                ],
            );
        }
        Ok(pipeline.into_cursor())
    }

    /// Native cursor plus the clauses still to apply. With edits pending
    /// only the filter is pushed down and the diff is spliced in.
    fn base_cursor(&self, query: &Query) -> StoreResult<(BoxCursor, Query)> {
        let diff = self
            .lock_transaction()?
            .as_ref()
            .and_then(|tx| tx.diff(&query.schema_name))
            .cloned();

        match diff {
            Some(diff) => {
                let filter_query = query.filter_only();
                let committed = self.committed_stream(self.backend.cursor(&filter_query)?, &filter_query)?;
                let cursor = DiffCursor::new(committed, diff, query.filter.clone());
                let residual = Query {
                    filter: Filter::Include,
                    ..query.clone()
                };
                Ok((Box::new(cursor), residual))
            }
            None => {
                let mut native = self.backend.cursor(query)?;
                if let Err(reason) = native.applied.validate(query) {
                    native.cursor.close();
                    return Err(StoreError::backend_unavailable(reason));
                }
                let residual = native.applied.residual(query);
                Ok((native.cursor, residual))
            }
        }
    }

    /// Committed records matching `filter_query`, filtered here when the
    /// store did not push the filter down
    fn committed_stream(&self, native: NativeCursor, filter_query: &Query) -> StoreResult<BoxCursor> {
        let NativeCursor { mut cursor, applied } = native;
        if let Err(reason) = applied.validate(filter_query) {
            cursor.close();
            return Err(StoreError::backend_unavailable(reason));
        }
        if applied.filter || filter_query.filter.is_include() {
            Ok(cursor)
        } else {
            Ok(Box::new(FilterCursor::new(cursor, filter_query.filter.clone())))
        }
    }

    /// Number of records `query` would return, honoring offset and max.
    ///
    /// Inside a transaction the committed count is adjusted by the pending
    /// additions and tombstones matching the filter; removals are only
    /// reflected once committed.
    pub fn count(&self, query: &Query) -> StoreResult<u64> {
        let schema = self.backend.schema(&query.schema_name)?;
        query.validate(&schema)?;
        if query.filter.is_exclude() || query.max == Some(0) {
            return Ok(0);
        }

        // Held across the committed read so edits cannot land in between
        let guard = self.lock_transaction()?;
        let committed = self.committed_count(query)?;
        let delta = guard
            .as_ref()
            .and_then(|tx| tx.diff(&query.schema_name))
            .map_or(0, |diff| diff.count_delta(&query.filter));
        drop(guard);

        let total = (committed as i64).saturating_add(delta).max(0) as u64;
        let remaining = total.saturating_sub(query.offset as u64);
        Ok(match query.max {
            Some(max) => remaining.min(max as u64),
            None => remaining,
        })
    }

    fn committed_count(&self, query: &Query) -> StoreResult<u64> {
        let filter_query = query.filter_only();
        if let Some(n) = self.backend.count(&filter_query)? {
            return Ok(n);
        }
        Logger::trace(
            Event::CountFallback.as_str(),
            &[("schema", query.schema_name.as_str())],
        );
        let stream = self.committed_stream(self.backend.cursor(&filter_query)?, &filter_query)?;
        Ok(cursor::count(stream)?)
    }

    /// Bounds of the default geometry over the records `query` selects
    pub fn extent(&self, query: &Query) -> StoreResult<Option<Extent>> {
        let schema = self.backend.schema(&query.schema_name)?;
        query.validate(&schema)?;
        if query.filter.is_exclude() || query.max == Some(0) {
            return Ok(None);
        }

        let reshaped = query.has_window()
            || query.resample.is_some()
            || query.target_crs.as_ref().map_or(false, |crs| *crs != schema.crs);
        if !reshaped {
            let guard = self.lock_transaction()?;
            let diff = guard.as_ref().and_then(|tx| tx.diff(&query.schema_name));
            if !diff.map_or(false, Diff::shrinks_extent) {
                let committed = self.committed_extent(query)?;
                return Ok(match diff {
                    Some(diff) => diff.widen_extent(committed, &query.filter),
                    None => committed,
                });
            }
        }

        Logger::trace(
            Event::ExtentFallback.as_str(),
            &[("schema", query.schema_name.as_str())],
        );
        let full = Query {
            properties: None,
            hide_identifier: false,
            ..query.clone()
        };
        bounds_of(self.query(&full)?)
    }

    fn committed_extent(&self, query: &Query) -> StoreResult<Option<Extent>> {
        let filter_query = query.filter_only();
        if let Some(extent) = self.backend.extent(&filter_query)? {
            return Ok(Some(extent));
        }
        Logger::trace(
            Event::ExtentFallback.as_str(),
            &[("schema", query.schema_name.as_str())],
        );
        bounds_of(self.committed_stream(self.backend.cursor(&filter_query)?, &filter_query)?)
    }

    /// Inner equality join of the records `left` selects with records of
    /// `right`, one right-side query per left record
    pub fn join(
        &self,
        left: &Query,
        join: &JoinQuery,
        right: Arc<dyn RecordSource>,
    ) -> StoreResult<BoxCursor> {
        let left = self.query(left)?;
        let cursor = JoinCursor::new(left, right, join, self.config.join_id_separator.clone())?;
        Ok(Box::new(cursor))
    }

    // ==================== Writes ====================

    /// Adds records, generating identifiers for those without one.
    /// Returns the identifiers in input order.
    pub fn add_records(&self, name: &str, records: Vec<Record>) -> StoreResult<Vec<String>> {
        let schema = self.backend.schema(name)?;
        let records = records
            .into_iter()
            .map(|mut record| {
                if record.id().is_empty() {
                    record.set_id(Uuid::new_v4().to_string());
                }
                record.conform(&schema)
            })
            .collect::<StoreResult<Vec<_>>>()?;
        let ids: Vec<String> = records.iter().map(|r| r.id().to_string()).collect();

        if self.in_transaction() {
            let existing = self.committed_ids(name, &ids)?;
            self.edit_diff(name, |diff| {
                for record in records {
                    if existing.contains(record.id()) && !diff.removed().contains(record.id()) {
                        return Err(StoreError::transaction_conflict(format!(
                            "record '{}' already exists in '{}'",
                            record.id(),
                            name
                        )));
                    }
                    diff.add(record)?;
                }
                Ok(())
            })?;
            return Ok(ids);
        }

        let mut writer = self.backend.appender(name)?;
        let result = records.into_iter().try_for_each(|record| writer.write(record));
        writer.close();
        result?;
        self.notify(StorageEvent::content(EventKind::ContentAdded, name, ids.clone()));
        Ok(ids)
    }

    /// Assigns `values` to every record matching `filter`. Returns the
    /// number of records changed.
    pub fn modify_records(
        &self,
        name: &str,
        filter: &Filter,
        values: &[(String, Value)],
    ) -> StoreResult<usize> {
        let schema = self.backend.schema(name)?;
        for (attr, value) in values {
            let descriptor = schema.attribute(attr).ok_or_else(|| {
                StoreError::malformed_query(format!("unknown attribute '{}' in '{}'", attr, name))
            })?;
            if !value.conforms_to(descriptor.attr_type) {
                return Err(StoreError::malformed_query(format!(
                    "attribute '{}' expects {}",
                    attr,
                    descriptor.attr_type.type_name()
                )));
            }
        }
        let assign = |record: &mut Record| {
            for (attr, value) in values {
                record.set(attr, value.clone());
            }
        };

        if self.in_transaction() {
            let matches = self.pending_view(name, filter)?;
            let n = matches.len();
            self.edit_diff(name, |diff| {
                for mut record in matches {
                    assign(&mut record);
                    diff.modify(record)?;
                }
                Ok(())
            })?;
            return Ok(n);
        }

        let ids = self.walk_writer(name, filter, |writer, mut record| {
            assign(&mut record);
            writer.write(record)
        })?;
        if !ids.is_empty() {
            self.notify(StorageEvent::content(EventKind::ContentUpdated, name, ids.iter()));
        }
        Ok(ids.len())
    }

    /// Deletes every record matching `filter`
    pub fn remove_records(&self, name: &str, filter: &Filter) -> StoreResult<usize> {
        self.backend.schema(name)?;
        if self.in_transaction() {
            let matches = self.pending_view(name, filter)?;
            let n = matches.len();
            self.edit_diff(name, |diff| {
                for record in &matches {
                    diff.remove(record.id());
                }
                Ok(())
            })?;
            return Ok(n);
        }
        self.delete_committed(name, filter)
    }

    /// Logically deletes every record matching `filter`. Inside a
    /// transaction the record keeps its value until commit; outside one
    /// this is a plain removal.
    pub fn tombstone_records(&self, name: &str, filter: &Filter) -> StoreResult<usize> {
        self.backend.schema(name)?;
        if self.in_transaction() {
            let matches = self.pending_view(name, filter)?;
            let n = matches.len();
            self.edit_diff(name, |diff| {
                for record in matches {
                    diff.tombstone(record)?;
                }
                Ok(())
            })?;
            return Ok(n);
        }
        self.delete_committed(name, filter)
    }

    fn delete_committed(&self, name: &str, filter: &Filter) -> StoreResult<usize> {
        let ids = self.walk_writer(name, filter, |writer, _| writer.remove())?;
        if !ids.is_empty() {
            self.notify(StorageEvent::content(EventKind::ContentRemoved, name, ids.iter()));
        }
        Ok(ids.len())
    }

    /// Runs `edit` on every record an in-place writer hands out, closing
    /// the writer on every path. Returns the visited identifiers.
    fn walk_writer<F>(&self, name: &str, filter: &Filter, edit: F) -> StoreResult<Vec<String>>
    where
        F: FnMut(&mut dyn RecordWriter, Record) -> StoreResult<()>,
    {
        let mut writer = self.backend.writer(name, filter)?;
        let result = walk(writer.as_mut(), edit);
        writer.close();
        result
    }

    /// Records matching `filter` as the current transaction sees them
    fn pending_view(&self, name: &str, filter: &Filter) -> StoreResult<Vec<Record>> {
        let query = Query::all(name).with_filter(filter.clone());
        Ok(cursor::collect(self.query(&query)?)?)
    }

    fn committed_ids(&self, name: &str, ids: &[String]) -> StoreResult<BTreeSet<String>> {
        let query = Query::all(name).with_filter(Filter::ids(ids.iter().cloned()));
        let stream = self.committed_stream(self.backend.cursor(&query)?, &query)?;
        Ok(cursor::collect(stream)?
            .into_iter()
            .map(|r| r.id().to_string())
            .collect())
    }

    /// Applies `edit` to a copy of the schema's diff and keeps the copy
    /// only if every step succeeded
    fn edit_diff<F>(&self, name: &str, edit: F) -> StoreResult<()>
    where
        F: FnOnce(&mut Diff) -> StoreResult<()>,
    {
        let mut guard = self.lock_transaction()?;
        let tx = guard
            .as_mut()
            .ok_or_else(|| StoreError::transaction_conflict("transaction ended during the edit"))?;
        let mut diff = tx.diff(name).cloned().unwrap_or_default();
        edit(&mut diff)?;
        *tx.diff_mut(name) = diff;
        Ok(())
    }

    // ==================== Transactions ====================

    pub fn in_transaction(&self) -> bool {
        self.transaction
            .lock()
            .map(|guard| guard.is_some())
            .unwrap_or(false)
    }

    /// Starts collecting edits instead of applying them
    pub fn begin(&self) -> StoreResult<Uuid> {
        let mut guard = self.lock_transaction()?;
        if let Some(active) = guard.as_ref() {
            return Err(StoreError::transaction_conflict(format!(
                "transaction {} is already active",
                active.id()
            )));
        }
        let tx = Transaction::new();
        let id = tx.id();
        *guard = Some(tx);
        let id_str = id.to_string();
        log_event(Event::TransactionBegin, &[("transaction", id_str.as_str())]);
        Ok(id)
    }

    /// Replays pending edits into the backing store: deletions, then
    /// updates, then additions, schema by schema. One content event per
    /// kind per schema is broadcast for everything that was applied, even
    /// when a later step fails.
    pub fn commit(&self) -> StoreResult<()> {
        let tx = self
            .lock_transaction()?
            .take()
            .ok_or_else(|| StoreError::transaction_conflict("no active transaction"))?;
        let id = tx.id().to_string();

        let mut events = Vec::new();
        let mut schemas = 0usize;
        let mut result = Ok(());
        for (name, diff) in tx.into_diffs() {
            schemas += 1;
            result = self.replay(&name, &diff, &mut events);
            if result.is_err() {
                break;
            }
        }

        match &result {
            Ok(()) => {
                let schemas = schemas.to_string();
                log_event(
                    Event::TransactionCommit,
                    &[("schemas", schemas.as_str()), ("transaction", id.as_str())],
                );
            }
            Err(err) => {
                let reason = err.to_string();
                log_event(
                    Event::TransactionFailed,
                    &[("reason", reason.as_str()), ("transaction", id.as_str())],
                );
            }
        }

        for event in events {
            self.notify(event);
        }
        result
    }

    fn replay(&self, name: &str, diff: &Diff, events: &mut Vec<StorageEvent>) -> StoreResult<()> {
        let deleted = diff.deleted_ids();
        if !deleted.is_empty() {
            let ids = self.walk_writer(name, &Filter::ids(deleted.iter().cloned()), |writer, _| {
                writer.remove()
            })?;
            if !ids.is_empty() {
                events.push(StorageEvent::content(EventKind::ContentRemoved, name, ids));
            }
        }

        let updated: BTreeMap<&str, &Record> = diff
            .modified()
            .iter()
            .filter_map(|(id, entry)| match entry {
                ModifiedEntry::Updated(record) => Some((id.as_str(), record)),
                ModifiedEntry::Tombstone(_) => None,
            })
            .collect();
        if !updated.is_empty() {
            let filter = Filter::ids(updated.keys().copied());
            let ids = self.walk_writer(name, &filter, |writer, current| {
                match updated.get(current.id()) {
                    Some(record) => writer.write((*record).clone()),
                    None => Ok(()),
                }
            })?;
            if !ids.is_empty() {
                events.push(StorageEvent::content(EventKind::ContentUpdated, name, ids));
            }
        }

        let added: Vec<Record> = diff.added().cloned().collect();
        if !added.is_empty() {
            let ids: Vec<String> = added.iter().map(|r| r.id().to_string()).collect();
            let mut writer = self.backend.appender(name)?;
            let result = added.into_iter().try_for_each(|record| writer.write(record));
            writer.close();
            result?;
            events.push(StorageEvent::content(EventKind::ContentAdded, name, ids));
        }
        Ok(())
    }

    /// Discards every pending edit
    pub fn rollback(&self) -> StoreResult<()> {
        let tx = self
            .lock_transaction()?
            .take()
            .ok_or_else(|| StoreError::transaction_conflict("no active transaction"))?;
        let id = tx.id().to_string();
        log_event(Event::TransactionRollback, &[("transaction", id.as_str())]);
        Ok(())
    }

    fn lock_transaction(&self) -> StoreResult<MutexGuard<'_, Option<Transaction>>> {
        self.transaction
            .lock()
            .map_err(|_| StoreError::backend_unavailable("transaction lock poisoned"))
    }
}

impl RecordSource for DataStore {
    fn schema(&self, name: &str) -> StoreResult<Arc<Schema>> {
        DataStore::schema(self, name)
    }

    fn query(&self, query: &Query) -> StoreResult<BoxCursor> {
        DataStore::query(self, query)
    }
}

fn walk<F>(writer: &mut dyn RecordWriter, mut edit: F) -> StoreResult<Vec<String>>
where
    F: FnMut(&mut dyn RecordWriter, Record) -> StoreResult<()>,
{
    let mut ids = Vec::new();
    while writer.has_next()? {
        let record = writer.next()?;
        ids.push(record.id().to_string());
        edit(writer, record)?;
    }
    Ok(ids)
}

fn bounds_of(cursor: BoxCursor) -> StoreResult<Option<Extent>> {
    let mut extent = None;
    for record in CursorIter::new(cursor) {
        extent = Extent::merge(extent, record?.bounds());
    }
    Ok(extent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crs::Crs;
    use crate::query::SortKey;
    use crate::schema::AttributeDescriptor;
    use crate::store::{MemoryStore, StoreErrorCode};
    use geo_types::point;
    use std::sync::Mutex as StdMutex;

    fn store_with(backend: MemoryStore) -> (DataStore, Arc<Schema>) {
        let store = DataStore::new(Arc::new(backend));
        let schema = store
            .create_schema(Schema::new(
                "pts",
                vec![AttributeDescriptor::int("v"), AttributeDescriptor::geometry("g")],
            ))
            .unwrap();
        let recs = [("a", 1, 0.0), ("b", 2, 10.0)]
            .iter()
            .map(|(id, v, x)| {
                Record::new(
                    *id,
                    Arc::clone(&schema),
                    vec![Value::Int(*v), Value::Geometry(point!(x: *x, y: *x).into())],
                )
            })
            .collect();
        store.add_records("pts", recs).unwrap();
        (store, schema)
    }

    fn rec(schema: &Arc<Schema>, id: &str, v: i64, x: f64) -> Record {
        Record::new(
            id,
            Arc::clone(schema),
            vec![Value::Int(v), Value::Geometry(point!(x: x, y: x).into())],
        )
    }

    fn ids(store: &DataStore, query: &Query) -> Vec<String> {
        cursor::collect(store.query(query).unwrap())
            .unwrap()
            .iter()
            .map(|r| r.id().to_string())
            .collect()
    }

    fn v_gt_1() -> Query {
        Query::all("pts").with_filter(Filter::gt("v", 1i64))
    }

    #[test]
    fn test_query_applies_residual_clauses() {
        for backend in [MemoryStore::new(), MemoryStore::streaming()] {
            let (store, _) = store_with(backend);
            let q = Query::all("pts")
                .with_sort(SortKey::desc("v"))
                .with_max(1);
            assert_eq!(ids(&store, &q), vec!["b"]);
        }
    }

    #[test]
    fn test_query_rejects_unknown_attribute() {
        let (store, _) = store_with(MemoryStore::new());
        let err = store
            .query(&Query::all("pts").with_filter(Filter::eq("missing", 1i64)))
            .err()
            .unwrap();
        assert_eq!(err.code(), StoreErrorCode::MalformedQuery);
        let err = store.query(&Query::all("nope")).err().unwrap();
        assert_eq!(err.code(), StoreErrorCode::SchemaNotFound);
    }

    #[test]
    fn test_count_native_and_fallback_agree() {
        for backend in [MemoryStore::new(), MemoryStore::streaming()] {
            let (store, _) = store_with(backend);
            assert_eq!(store.count(&v_gt_1()).unwrap(), 1);
            assert_eq!(store.count(&Query::all("pts")).unwrap(), 2);
            assert_eq!(store.count(&Query::all("pts").with_offset(1)).unwrap(), 1);
            assert_eq!(store.count(&Query::all("pts").with_offset(5)).unwrap(), 0);
            assert_eq!(store.count(&Query::all("pts").with_max(1)).unwrap(), 1);
        }
    }

    #[test]
    fn test_count_reconciles_transaction() {
        let (store, schema) = store_with(MemoryStore::new());
        store.begin().unwrap();
        store
            .add_records("pts", vec![rec(&schema, "c", 5, 1.0)])
            .unwrap();
        assert_eq!(store.count(&v_gt_1()).unwrap(), 2);
        store
            .tombstone_records("pts", &Filter::ids(["b"]))
            .unwrap();
        assert_eq!(store.count(&v_gt_1()).unwrap(), 1);
        assert_eq!(ids(&store, &v_gt_1()), vec!["c"]);
    }

    #[test]
    fn test_transactional_view_and_commit() {
        let (store, schema) = store_with(MemoryStore::new());
        store.begin().unwrap();
        store
            .add_records("pts", vec![rec(&schema, "c", 3, 1.0)])
            .unwrap();
        store
            .modify_records("pts", &Filter::ids(["a"]), &[("v".to_string(), Value::Int(9))])
            .unwrap();
        store.remove_records("pts", &Filter::ids(["b"])).unwrap();

        let q = Query::all("pts").with_sort(SortKey::asc("v"));
        assert_eq!(ids(&store, &q), vec!["c", "a"]);

        store.commit().unwrap();
        assert!(!store.in_transaction());
        assert_eq!(ids(&store, &q), vec!["c", "a"]);
        assert_eq!(store.count(&Query::all("pts")).unwrap(), 2);
    }

    #[test]
    fn test_rollback_discards_edits() {
        let (store, schema) = store_with(MemoryStore::new());
        store.begin().unwrap();
        store
            .add_records("pts", vec![rec(&schema, "c", 3, 1.0)])
            .unwrap();
        store.rollback().unwrap();
        assert_eq!(ids(&store, &Query::all("pts")), vec!["a", "b"]);
        assert_eq!(
            store.rollback().unwrap_err().code(),
            StoreErrorCode::TransactionConflict
        );
    }

    #[test]
    fn test_begin_twice_conflicts() {
        let (store, _) = store_with(MemoryStore::new());
        store.begin().unwrap();
        assert_eq!(store.begin().unwrap_err().code(), StoreErrorCode::TransactionConflict);
    }

    #[test]
    fn test_add_existing_id_in_transaction_conflicts() {
        let (store, schema) = store_with(MemoryStore::new());
        store.begin().unwrap();
        let err = store
            .add_records("pts", vec![rec(&schema, "c", 3, 1.0), rec(&schema, "a", 1, 0.0)])
            .unwrap_err();
        assert_eq!(err.code(), StoreErrorCode::TransactionConflict);
        // nothing of the failed batch is kept
        assert_eq!(store.count(&Query::all("pts")).unwrap(), 2);
    }

    #[test]
    fn test_add_generates_missing_ids() {
        let (store, schema) = store_with(MemoryStore::new());
        let ids = store
            .add_records("pts", vec![rec(&schema, "", 7, 2.0)])
            .unwrap();
        assert_eq!(ids.len(), 1);
        assert!(Uuid::parse_str(&ids[0]).is_ok());
    }

    #[test]
    fn test_extent_fast_path_and_reconciliation() {
        let (store, schema) = store_with(MemoryStore::new());
        assert_eq!(
            store.extent(&Query::all("pts")).unwrap(),
            Some(Extent::new(0.0, 0.0, 10.0, 10.0))
        );

        store.begin().unwrap();
        store
            .add_records("pts", vec![rec(&schema, "c", 3, 20.0)])
            .unwrap();
        assert_eq!(
            store.extent(&Query::all("pts")).unwrap(),
            Some(Extent::new(0.0, 0.0, 20.0, 20.0))
        );

        store.remove_records("pts", &Filter::ids(["b", "c"])).unwrap();
        assert_eq!(
            store.extent(&Query::all("pts")).unwrap(),
            Some(Extent::new(0.0, 0.0, 0.0, 0.0))
        );
    }

    #[test]
    fn test_extent_honors_window() {
        let (store, _) = store_with(MemoryStore::streaming());
        let q = Query::all("pts").with_sort(SortKey::desc("v")).with_max(1);
        assert_eq!(
            store.extent(&q).unwrap(),
            Some(Extent::new(10.0, 10.0, 10.0, 10.0))
        );
    }

    #[test]
    fn test_listeners_see_committed_changes() {
        let (store, schema) = store_with(MemoryStore::new());
        let seen: Arc<StdMutex<Vec<(EventKind, Vec<String>)>>> = Arc::default();
        let sink = Arc::clone(&seen);
        store.add_listener(Arc::new(move |event: &StorageEvent| {
            sink.lock()
                .unwrap()
                .push((event.kind, event.ids.iter().cloned().collect()));
        }));

        store.begin().unwrap();
        store
            .add_records("pts", vec![rec(&schema, "c", 3, 1.0)])
            .unwrap();
        assert!(seen.lock().unwrap().is_empty());
        store.commit().unwrap();

        store.remove_records("pts", &Filter::ids(["a"])).unwrap();
        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                (EventKind::ContentAdded, vec!["c".to_string()]),
                (EventKind::ContentRemoved, vec!["a".to_string()]),
            ]
        );
    }

    #[test]
    fn test_remove_schema_forgets_pending_edits() {
        let (store, schema) = store_with(MemoryStore::new());
        store.begin().unwrap();
        store
            .add_records("pts", vec![rec(&schema, "c", 3, 1.0)])
            .unwrap();
        store.remove_schema("pts").unwrap();
        store.commit().unwrap();
        assert_eq!(store.names().unwrap(), Vec::<String>::new());
    }

    #[test]
    fn test_unsupported_reprojection_is_malformed() {
        let (store, _) = store_with(MemoryStore::new());
        let q = Query::all("pts").with_target_crs(Crs::new("LOCAL:7"));
        let err = store.query(&q).err().unwrap();
        assert_eq!(err.code(), StoreErrorCode::MalformedQuery);
    }

    #[test]
    fn test_sort_buffer_limit_surfaces_as_execution_limit() {
        let config = StoreConfig {
            max_sort_buffer: Some(1),
            ..StoreConfig::default()
        };
        let store = DataStore::with_config(Arc::new(MemoryStore::new()), config).unwrap();
        let schema = store
            .create_schema(Schema::new("pts", vec![AttributeDescriptor::int("v")]))
            .unwrap();
        let recs = (0..3)
            .map(|i| Record::new(format!("r{}", i), Arc::clone(&schema), vec![Value::Int(i)]))
            .collect();
        store.add_records("pts", recs).unwrap();
        let err = store
            .query(&Query::all("pts").with_sort(SortKey::asc("v")))
            .err()
            .unwrap();
        assert_eq!(err.code(), StoreErrorCode::ExecutionLimit);
    }
}
