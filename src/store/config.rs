//! Store configuration
//!
//! Loaded from a JSON file. Every field is optional:
//!
//! ```json
//! {
//!   "transform_failure_policy": "fail",
//!   "max_sort_buffer": 100000,
//!   "join_id_separator": ".",
//!   "log_queries": false,
//!   "log_level": "info"
//! }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::errors::{StoreError, StoreResult};
use crate::cursor::TransformFailurePolicy;
use crate::observability::Severity;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// What a read does when a record fails to reproject
    #[serde(default)]
    pub transform_failure_policy: TransformFailurePolicy,

    /// Cap on records a sort may buffer; unbounded when absent
    #[serde(default)]
    pub max_sort_buffer: Option<usize>,

    /// Placed between left and right identifiers of joined records
    #[serde(default = "default_join_id_separator")]
    pub join_id_separator: String,

    /// Log every query and the pipeline built for it
    #[serde(default)]
    pub log_queries: bool,

    /// Minimum severity written by the logger
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_join_id_separator() -> String {
    ".".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            transform_failure_policy: TransformFailurePolicy::default(),
            max_sort_buffer: None,
            join_id_separator: default_join_id_separator(),
            log_queries: false,
            log_level: default_log_level(),
        }
    }
}

impl StoreConfig {
    pub fn load(path: &Path) -> StoreResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| StoreError::config_invalid(format!("Failed to read config: {}", e)))?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> StoreResult<Self> {
        let config: StoreConfig = serde_json::from_str(content)
            .map_err(|e| StoreError::config_invalid(format!("Invalid config JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> StoreResult<()> {
        if self.join_id_separator.is_empty() {
            return Err(StoreError::config_invalid("join_id_separator must not be empty"));
        }
        if self.max_sort_buffer == Some(0) {
            return Err(StoreError::config_invalid("max_sort_buffer must be > 0"));
        }
        self.severity()?;
        Ok(())
    }

    /// Parsed `log_level`
    pub fn severity(&self) -> StoreResult<Severity> {
        self.log_level
            .parse()
            .map_err(|e: String| StoreError::config_invalid(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreErrorCode;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_object_uses_defaults() {
        let config = StoreConfig::from_json("{}").unwrap();
        assert_eq!(config, StoreConfig::default());
        assert_eq!(config.join_id_separator, ".");
        assert_eq!(config.transform_failure_policy, TransformFailurePolicy::Fail);
        assert_eq!(config.severity().unwrap(), Severity::Info);
    }

    #[test]
    fn test_load_from_file() {
        let file = NamedTempFile::new().unwrap();
        fs::write(
            file.path(),
            r#"{"transform_failure_policy":"skip","max_sort_buffer":10,"join_id_separator":"::","log_level":"trace"}"#,
        )
        .unwrap();
        let config = StoreConfig::load(file.path()).unwrap();
        assert_eq!(config.transform_failure_policy, TransformFailurePolicy::Skip);
        assert_eq!(config.max_sort_buffer, Some(10));
        assert_eq!(config.join_id_separator, "::");
        assert_eq!(config.severity().unwrap(), Severity::Trace);
    }

    #[test]
    fn test_rejects_empty_separator() {
        let err = StoreConfig::from_json(r#"{"join_id_separator":""}"#).unwrap_err();
        assert_eq!(err.code(), StoreErrorCode::ConfigInvalid);
    }

    #[test]
    fn test_rejects_zero_sort_buffer() {
        assert!(StoreConfig::from_json(r#"{"max_sort_buffer":0}"#).is_err());
    }

    #[test]
    fn test_rejects_unknown_policy_and_level() {
        assert!(StoreConfig::from_json(r#"{"transform_failure_policy":"ignore"}"#).is_err());
        assert!(StoreConfig::from_json(r#"{"log_level":"loud"}"#).is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = StoreConfig::load(Path::new("/nonexistent/store.json")).unwrap_err();
        assert_eq!(err.code(), StoreErrorCode::ConfigInvalid);
    }
}
