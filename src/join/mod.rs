//! Equality joins across two record sources
//!
//! Nested loop: each left record issues a fresh query against the right
//! source filtered to its key value. No key index is assumed, so cost is
//! |left| right-side queries.

mod cursor;
mod query;

pub use cursor::JoinCursor;
pub use query::{JoinQuery, JoinType};
