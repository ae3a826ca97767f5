//! Error types for lti-resolver
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

use crate::domain::ValidationErrors;

/// All error types that can occur in lti-resolver
#[derive(Debug, Error)]
pub enum Error {
    /// A record failed field-level validation and was not persisted
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    /// The requester may not perform the operation
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// A referenced record does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// A value could not be interpreted (unknown placement, bad context, ...)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Storage/persistence error
    #[error("Storage error: {0}")]
    Storage(String),

    /// SQLite error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML fixture or config error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type alias for lti-resolver operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forbidden_error() {
        let err = Error::Forbidden("cannot view notifications".to_string());
        assert_eq!(err.to_string(), "Forbidden: cannot view notifications");
    }

    #[test]
    fn test_not_found_error() {
        let err = Error::NotFound("message handler 7".to_string());
        assert_eq!(err.to_string(), "Not found: message handler 7");
    }

    #[test]
    fn test_validation_error_lists_fields() {
        let mut errors = ValidationErrors::default();
        errors.add("launch_path", "can't be blank");
        let err = Error::Validation(errors);
        assert_eq!(err.to_string(), "Validation failed: launch_path can't be blank");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_yaml_error_conversion() {
        let yaml_err = serde_yaml::from_str::<Vec<i64>>("{ not: a list").unwrap_err();
        let err: Error = yaml_err.into();
        assert!(matches!(err, Error::Yaml(_)));
    }
}
