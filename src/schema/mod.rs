//! Schemas for feature records
//!
//! A schema is an ordered list of typed attribute descriptors. At most one
//! geometry attribute is the default geometry; the record identifier is
//! implicit and not part of the attribute list.

mod loader;
mod types;

pub use loader::SchemaLoader;
pub use types::{AttributeDescriptor, AttributeType, Schema};
