//! Error types for snapshot generation.

use thiserror::Error;

/// Errors that abort a backup run.
///
/// None of these are retried. The caller reports the failure and stops.
#[derive(Error, Debug)]
pub enum BackupError {
    /// Could not establish or authenticate the database connection.
    #[error("Connection error: {0}")]
    Connection(String),

    /// A catalog or row query failed.
    #[error("Catalog query failed ({statement}): {message}")]
    Catalog { statement: String, message: String },

    /// The consistency read lock could not be taken.
    #[error("Failed to lock {objects} object(s) for reading: {message}")]
    Lock { objects: usize, message: String },

    /// The output destination could not be opened or written.
    #[error("Output error: {0}")]
    Output(#[from] std::io::Error),

    /// The job configuration is unusable.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl BackupError {
    /// Build a [`BackupError::Catalog`] for the given statement.
    pub fn catalog(statement: impl Into<String>, message: impl ToString) -> Self {
        BackupError::Catalog {
            statement: statement.into(),
            message: message.to_string(),
        }
    }
}

pub type Result<T, E = BackupError> = std::result::Result<T, E>;
