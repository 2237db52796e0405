//! Error types for the DigitalBank test-data toolkit

use thiserror::Error;

/// Result type alias using the toolkit Error
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Unknown environment: {0} (expected one of dev, int, uat, preprod)")]
    UnknownEnvironment(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid fixture {key}: {reason}")]
    InvalidFixture { key: String, reason: String },

    #[error("Database for environment '{0}' has been closed")]
    SessionClosed(String),
}

impl Error {
    /// True when SQLite rejected a row because of a UNIQUE, FOREIGN KEY or CHECK constraint
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            Error::Database(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation
        )
    }
}
