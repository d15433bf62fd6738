//! Query model
//!
//! A [`Query`] is an immutable request against one schema. Offset and max
//! compose as "skip offset, then take max" over the filtered, sorted
//! stream. [`AppliedClauses`] is the capability descriptor a backing store
//! returns to say which clauses it already satisfied.

mod ast;
mod capabilities;
mod filter;

pub use ast::{Query, Resolution, SortDirection, SortKey};
pub use capabilities::AppliedClauses;
pub use filter::{CompareOp, Filter};
