//! Residual query pipeline
//!
//! Wraps a store's native cursor in decorators for every clause the store
//! did not apply itself. The stage order is fixed:
//!
//! 1. Sort
//! 2. Filter
//! 3. Skip
//! 4. Limit
//! 5. Project / hide identifier
//! 6. Resample
//! 7. Reproject
//!
//! Filtering always precedes windowing and projection, so offset and max
//! count over the matching rows and the predicate sees every attribute.
//! Reprojection runs last, over the smallest row set.

mod builder;

pub use builder::{Pipeline, PipelineBuilder, Stage};
