//! Pending edits of one schema within one transaction

use std::collections::{BTreeMap, BTreeSet};

use crate::query::Filter;
use crate::record::{Extent, Record};
use crate::store::{StoreError, StoreResult};

/// Pending value of a committed record
#[derive(Debug, Clone, PartialEq)]
pub enum ModifiedEntry {
    /// Replaces the committed record
    Updated(Record),
    /// Logically deleted; carries the value it was deleted with
    Tombstone(Record),
}

impl ModifiedEntry {
    pub fn record(&self) -> &Record {
        match self {
            ModifiedEntry::Updated(r) | ModifiedEntry::Tombstone(r) => r,
        }
    }

    pub fn is_tombstone(&self) -> bool {
        matches!(self, ModifiedEntry::Tombstone(_))
    }
}

/// Added, modified and removed records not yet committed.
///
/// An identifier lives in at most one of the three sets. Removing an
/// added record forgets it; adding a removed identifier turns into a
/// modification.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diff {
    added: BTreeMap<String, Record>,
    added_order: Vec<String>,
    modified: BTreeMap<String, ModifiedEntry>,
    removed: BTreeSet<String>,
}

impl Diff {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.removed.is_empty()
    }

    /// Records a new record. `record` must not exist in committed state
    /// unless it was removed in this transaction.
    pub fn add(&mut self, record: Record) -> StoreResult<()> {
        let id = record.id().to_string();
        if self.added.contains_key(&id) || self.modified.contains_key(&id) {
            return Err(StoreError::transaction_conflict(format!(
                "record '{}' already exists",
                id
            )));
        }
        if self.removed.remove(&id) {
            self.modified.insert(id, ModifiedEntry::Updated(record));
            return Ok(());
        }
        self.added_order.push(id.clone());
        self.added.insert(id, record);
        Ok(())
    }

    /// Records a new value for an existing record
    pub fn modify(&mut self, record: Record) -> StoreResult<()> {
        let id = record.id().to_string();
        if self.removed.contains(&id) {
            return Err(StoreError::transaction_conflict(format!(
                "record '{}' was removed in this transaction",
                id
            )));
        }
        if let Some(slot) = self.added.get_mut(&id) {
            *slot = record;
            return Ok(());
        }
        if let Some(ModifiedEntry::Tombstone(_)) = self.modified.get(&id) {
            return Err(StoreError::transaction_conflict(format!(
                "record '{}' was deleted in this transaction",
                id
            )));
        }
        self.modified.insert(id, ModifiedEntry::Updated(record));
        Ok(())
    }

    /// Records the removal of `id`
    pub fn remove(&mut self, id: &str) {
        if self.added.remove(id).is_some() {
            self.added_order.retain(|a| a != id);
            return;
        }
        self.modified.remove(id);
        self.removed.insert(id.to_string());
    }

    /// Marks a record logically deleted, keeping the value it had
    pub fn tombstone(&mut self, record: Record) -> StoreResult<()> {
        let id = record.id().to_string();
        if self.removed.contains(&id) {
            return Err(StoreError::transaction_conflict(format!(
                "record '{}' was removed in this transaction",
                id
            )));
        }
        if self.added.remove(&id).is_some() {
            self.added_order.retain(|a| *a != id);
            return Ok(());
        }
        self.modified.insert(id, ModifiedEntry::Tombstone(record));
        Ok(())
    }

    /// Added records in insertion order
    pub fn added(&self) -> impl Iterator<Item = &Record> {
        self.added_order.iter().filter_map(|id| self.added.get(id))
    }

    pub fn modified(&self) -> &BTreeMap<String, ModifiedEntry> {
        &self.modified
    }

    pub fn removed(&self) -> &BTreeSet<String> {
        &self.removed
    }

    pub fn contains_added(&self, id: &str) -> bool {
        self.added.contains_key(id)
    }

    /// Identifiers hidden from committed state: removed and tombstoned
    pub fn deleted_ids(&self) -> BTreeSet<String> {
        self.modified
            .iter()
            .filter(|(_, e)| e.is_tombstone())
            .map(|(id, _)| id.clone())
            .chain(self.removed.iter().cloned())
            .collect()
    }

    /// Adjustment to a committed count for `filter`.
    ///
    /// +1 per matching added record, -1 per tombstone whose carried value
    /// matches. Updates and removals are not counted.
    pub fn count_delta(&self, filter: &Filter) -> i64 {
        let mut delta = 0i64;
        for record in self.added() {
            if filter.evaluate(record) {
                delta += 1;
            }
        }
        for entry in self.modified.values() {
            if let ModifiedEntry::Tombstone(record) = entry {
                if filter.evaluate(record) {
                    delta -= 1;
                }
            }
        }
        delta
    }

    /// True when a committed extent can no longer be widened into the
    /// transactional one. Removals, tombstones and updates can all take a
    /// committed record's old bounds out of the selection.
    pub fn shrinks_extent(&self) -> bool {
        !self.removed.is_empty() || !self.modified.is_empty()
    }

    /// Widens a committed extent with the bounds of matching added records.
    /// Only meaningful when [`Diff::shrinks_extent`] is false.
    pub fn widen_extent(&self, committed: Option<Extent>, filter: &Filter) -> Option<Extent> {
        self.added()
            .filter(|r| filter.evaluate(r))
            .fold(committed, |acc, r| Extent::merge(acc, r.bounds()))
    }
}
