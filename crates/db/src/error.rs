//! Error types for the migration system
//!
//! Every failure a migration command can hit maps onto one of the variants
//! below. "Nothing to do" is not an error; see [`crate::MigrateOutcome`].

use thiserror::Error;

/// Result type alias for migration operations
pub type MigrateResult<T> = Result<T, MigrateError>;

/// Error types for migration operations
#[derive(Debug, Error)]
pub enum MigrateError {
    /// Unreadable or invalid migrations directory, malformed file names,
    /// duplicate versions or invalid configuration values
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// The target database could not be opened or reached
    #[error("Connection error: {message}")]
    Connect { message: String },

    /// The ledger reports a dirty version; manual reconciliation is required
    #[error("Dirty database version {version}. Fix and force version.")]
    DirtyState { version: i64 },

    /// Rollback requested for a version that has no down file
    #[error("No down migration found for version {version}")]
    MissingDownFile { version: i64 },

    /// The migration SQL failed; `message` is the database's own text
    #[error("Migration {version} failed: {message}")]
    Execution { version: i64, message: String },

    /// Ledger reads or writes failed outside a migration body
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Semantic kind of a [`MigrateError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    Connect,
    DirtyState,
    MissingDownFile,
    Execution,
    Database,
    Io,
}

impl MigrateError {
    /// Create a new configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new connection error
    pub fn connect(message: impl Into<String>) -> Self {
        Self::Connect {
            message: message.into(),
        }
    }

    /// Create an execution error, keeping the database message verbatim
    pub fn execution(version: i64, err: sqlx::Error) -> Self {
        let message = match &err {
            sqlx::Error::Database(db_err) => db_err.message().to_string(),
            other => other.to_string(),
        };
        Self::Execution { version, message }
    }

    /// Get the semantic kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            MigrateError::Config { .. } => ErrorKind::Config,
            MigrateError::Connect { .. } => ErrorKind::Connect,
            MigrateError::DirtyState { .. } => ErrorKind::DirtyState,
            MigrateError::MissingDownFile { .. } => ErrorKind::MissingDownFile,
            MigrateError::Execution { .. } => ErrorKind::Execution,
            MigrateError::Database(_) => ErrorKind::Database,
            MigrateError::Io(_) => ErrorKind::Io,
        }
    }
}
