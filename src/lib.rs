//! featurestore - pull-based query pipeline over pluggable feature stores
//!
//! A [`store::DataStore`] turns a [`query::Query`] into a chain of record
//! cursors: the backing store's native cursor, the pending transaction
//! overlay, then one decorator per clause the store left undone.

pub mod cli;
pub mod crs;
pub mod cursor;
pub mod events;
pub mod join;
pub mod observability;
pub mod pipeline;
pub mod query;
pub mod record;
pub mod schema;
pub mod store;
pub mod transaction;
