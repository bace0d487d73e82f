//! Error types for packtrace-core with categorization:
//!
//! - **Not found**: referenced run, unit, container, product or customer is missing (exit code 3)
//! - **Validation**: malformed input, rejected manual aggregation selections (exit code 1)
//! - **Invalid state / conflict**: lifecycle guards and storage uniqueness backstops (exit code 4)
//! - **Storage / system**: database, IO (exit code 2)
//!
//! Simulated device failures are not errors. They are reported as
//! [`crate::sim::DeviceOutcome`] values inside successful results.

use thiserror::Error;

use crate::domain::UnitStatus;

/// Kind tag for an [`Error`], so a boundary layer can map errors to
/// caller-visible status without inspecting message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    InvalidState,
    Validation,
    Conflict,
    Storage,
    Config,
}

/// Core error type for packtrace operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
    /// Referenced entity does not exist
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Input rejected before any mutation
    #[error("Validation error: {0}")]
    Validation(String),

    /// Operation attempted from a lifecycle state that does not permit it
    #[error("Invalid state for unit {unit_id}: {current} cannot {action}")]
    InvalidState {
        unit_id: String,
        current: UnitStatus,
        action: &'static str,
    },

    /// Storage-level uniqueness or concurrency guard failed
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Database errors
    #[error("Database error: {0}")]
    Database(String),

    /// Configuration could not be loaded or failed validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Result type alias for packtrace-core operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Returns the kind tag for this error.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Validation(_) => ErrorKind::Validation,
            Self::InvalidState { .. } => ErrorKind::InvalidState,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Database(_) | Self::Io(_) => ErrorKind::Storage,
            Self::InvalidConfig(_) | Self::Parse(_) => ErrorKind::Config,
        }
    }

    /// Returns the appropriate exit code for this error type.
    ///
    /// Exit code scheme:
    /// - 1: User error (validation, invalid input, bad configuration)
    /// - 2: System error (database, IO)
    /// - 3: Not found
    /// - 4: Invalid state or conflict
    pub const fn exit_code(&self) -> i32 {
        match self.kind() {
            ErrorKind::Validation | ErrorKind::Config => 1,
            ErrorKind::Storage => 2,
            ErrorKind::NotFound => 3,
            ErrorKind::InvalidState | ErrorKind::Conflict => 4,
        }
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                Self::Conflict(format!("uniqueness violated: {}", db.message()))
            }
            _ => Self::Database(err.to_string()),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::Parse(format!("Failed to parse config: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = Error::not_found("run", "abc");
        assert_eq!(err.to_string(), "run not found: abc");
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn test_validation_exit_code() {
        let err = Error::validation("units already assigned: u1");
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().contains("u1"));
    }

    #[test]
    fn test_invalid_state_carries_current_status() {
        let err = Error::InvalidState {
            unit_id: "u1".to_string(),
            current: UnitStatus::Printed,
            action: "print",
        };
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert!(err.to_string().contains("printed"));
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn test_storage_kinds() {
        assert_eq!(Error::Database("x".into()).kind(), ErrorKind::Storage);
        assert_eq!(Error::Io("x".into()).kind(), ErrorKind::Storage);
        assert_eq!(Error::Io("x".into()).exit_code(), 2);
    }

    #[test]
    fn test_conflict_kind() {
        assert_eq!(Error::conflict("dup").kind(), ErrorKind::Conflict);
    }

    #[test]
    fn test_toml_error_is_parse() {
        let parsed: std::result::Result<toml::Value, _> = toml::from_str("a = ");
        let err: Error = match parsed {
            Ok(_) => return,
            Err(e) => e.into(),
        };
        assert_eq!(err.kind(), ErrorKind::Config);
    }
}
