//! Transaction overlay
//!
//! A transaction collects one [`Diff`] per schema. Nothing reaches the
//! backing store until commit; reads inside the transaction see the
//! committed stream with the pending edits spliced in by [`DiffCursor`],
//! and aggregates are reconciled from the committed answer.

mod cursor;
mod diff;

pub use cursor::DiffCursor;
pub use diff::{Diff, ModifiedEntry};

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Pending edits across schemas
#[derive(Debug, Clone)]
pub struct Transaction {
    id: Uuid,
    started_at: DateTime<Utc>,
    diffs: BTreeMap<String, Diff>,
}

impl Default for Transaction {
    fn default() -> Self {
        Self::new()
    }
}

impl Transaction {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            diffs: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Diff of a schema, if it has pending edits
    pub fn diff(&self, schema_name: &str) -> Option<&Diff> {
        self.diffs.get(schema_name).filter(|d| !d.is_empty())
    }

    pub fn diff_mut(&mut self, schema_name: &str) -> &mut Diff {
        self.diffs.entry(schema_name.to_string()).or_default()
    }

    /// Drops pending edits of a schema that no longer exists
    pub fn forget(&mut self, schema_name: &str) {
        self.diffs.remove(schema_name);
    }

    pub fn is_empty(&self) -> bool {
        self.diffs.values().all(Diff::is_empty)
    }

    /// Hands the non-empty diffs over in schema name order
    pub fn into_diffs(self) -> impl Iterator<Item = (String, Diff)> {
        self.diffs.into_iter().filter(|(_, d)| !d.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_diffs_are_invisible() {
        let mut tx = Transaction::new();
        assert!(tx.is_empty());
        tx.diff_mut("roads");
        assert!(tx.diff("roads").is_none());
        assert!(tx.is_empty());

        tx.diff_mut("roads").remove("r1");
        assert!(tx.diff("roads").is_some());
        assert_eq!(tx.into_diffs().count(), 1);
    }

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(Transaction::new().id(), Transaction::new().id());
    }
}
