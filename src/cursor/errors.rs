//! Cursor failures
//!
//! Raised while records are pulled. Boundary APIs convert these into
//! `StoreError` before returning to callers.

use thiserror::Error;

use crate::crs::TransformError;

/// Result type for cursor operations
pub type CursorResult<T> = Result<T, CursorError>;

/// Failure raised during cursor iteration
#[derive(Debug, Clone, Error)]
pub enum CursorError {
    /// Cursor used after close
    #[error("cursor is closed")]
    Closed,

    /// `next` called with no pending record
    #[error("no pending record")]
    NoSuchRecord,

    /// Geometry of a record could not be transformed
    #[error("record '{id}' could not be transformed: {source}")]
    Transform {
        id: String,
        #[source]
        source: TransformError,
    },

    /// Underlying resource failed mid-stream
    #[error("resource failure: {0}")]
    Resource(String),

    /// A nested query issued by the cursor failed
    #[error("nested query failed: {0}")]
    Source(String),

    /// Sorting would buffer more records than allowed
    #[error("sort buffer limit of {0} records exceeded")]
    BufferLimit(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform_error_message_carries_record() {
        let err = CursorError::Transform {
            id: "r7".into(),
            source: TransformError::NonFinite {
                x: f64::NAN,
                y: 0.0,
            },
        };
        let text = err.to_string();
        assert!(text.contains("r7"));
        assert!(text.contains("non-finite"));
    }
}
