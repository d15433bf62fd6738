//! Records, attribute values and bounding extents
//!
//! Records are owned values. A cursor hands each record to the caller by
//! move; decorators that narrow or transform a record build a new one, so
//! mutating a record after it was yielded never affects the store or any
//! other cursor.

mod extent;
mod record;
mod value;

pub use extent::Extent;
pub use record::{Record, RecordBuilder};
pub use value::Value;
