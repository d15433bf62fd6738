//! Store subsystem
//!
//! The [`DataStore`] facade is the only surface consumers talk to: it
//! validates queries, asks the [`BackingStore`] for a native cursor,
//! layers the residual clauses on top through the pipeline, overlays the
//! pending transaction and broadcasts storage events after every change.

mod backend;
mod config;
mod errors;
mod facade;
mod memory;

pub use backend::{BackingStore, NativeCursor, RecordSource, RecordWriter};
pub use config::StoreConfig;
pub use errors::{Severity, StoreError, StoreErrorCode, StoreResult};
pub use facade::DataStore;
pub use memory::MemoryStore;
