//! Change event types

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::schema::Schema;

/// What changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    StructureAdded,
    StructureUpdated,
    StructureRemoved,
    ContentAdded,
    ContentUpdated,
    ContentRemoved,
}

impl EventKind {
    pub fn is_structure(&self) -> bool {
        matches!(
            self,
            EventKind::StructureAdded | EventKind::StructureUpdated | EventKind::StructureRemoved
        )
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::StructureAdded => write!(f, "STRUCTURE_ADDED"),
            EventKind::StructureUpdated => write!(f, "STRUCTURE_UPDATED"),
            EventKind::StructureRemoved => write!(f, "STRUCTURE_REMOVED"),
            EventKind::ContentAdded => write!(f, "CONTENT_ADDED"),
            EventKind::ContentUpdated => write!(f, "CONTENT_UPDATED"),
            EventKind::ContentRemoved => write!(f, "CONTENT_REMOVED"),
        }
    }
}

/// One change to a schema or its records. Never persisted.
#[derive(Debug, Clone)]
pub struct StorageEvent {
    pub kind: EventKind,
    pub schema_name: String,
    /// Affected record identifiers (content events only)
    pub ids: BTreeSet<String>,
    /// Schema before the change (structure updated/removed)
    pub old_schema: Option<Arc<Schema>>,
    /// Schema after the change (structure added/updated)
    pub new_schema: Option<Arc<Schema>>,
    pub timestamp: DateTime<Utc>,
}

impl StorageEvent {
    fn base(kind: EventKind, schema_name: impl Into<String>) -> Self {
        Self {
            kind,
            schema_name: schema_name.into(),
            ids: BTreeSet::new(),
            old_schema: None,
            new_schema: None,
            timestamp: Utc::now(),
        }
    }

    pub fn structure_added(schema: Arc<Schema>) -> Self {
        let mut event = Self::base(EventKind::StructureAdded, schema.name.clone());
        event.new_schema = Some(schema);
        event
    }

    pub fn structure_updated(old: Arc<Schema>, new: Arc<Schema>) -> Self {
        let mut event = Self::base(EventKind::StructureUpdated, new.name.clone());
        event.old_schema = Some(old);
        event.new_schema = Some(new);
        event
    }

    pub fn structure_removed(old: Arc<Schema>) -> Self {
        let mut event = Self::base(EventKind::StructureRemoved, old.name.clone());
        event.old_schema = Some(old);
        event
    }

    /// Content event for `ids`. `kind` must be a content kind.
    pub fn content<I, S>(kind: EventKind, schema_name: impl Into<String>, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        debug_assert!(!kind.is_structure());
        let mut event = Self::base(kind, schema_name);
        event.ids = ids.into_iter().map(Into::into).collect();
        event
    }
}
