//! Core Migration Driver Trait
//!
//! The capability set every dialect exposes to the migrator: run raw SQL,
//! and read, write or clear the version ledger. The dialect is fixed when
//! the driver is built.

use async_trait::async_trait;
use std::fmt;

use crate::error::{MigrateError, MigrateResult};
use crate::migrations::{LedgerState, MigrationStep};

/// Database dialect the runner talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    Postgres,
    Sqlite,
}

impl Dialect {
    /// Positional bind placeholder for parameter `index` (1-based)
    pub fn placeholder(&self, index: usize) -> String {
        match self {
            Dialect::Postgres => format!("${}", index),
            Dialect::Sqlite => format!("?{}", index),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialect::Postgres => write!(f, "postgres"),
            Dialect::Sqlite => write!(f, "sqlite"),
        }
    }
}

impl std::str::FromStr for Dialect {
    type Err = MigrateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgresql" | "postgres" => Ok(Dialect::Postgres),
            "sqlite" | "sqlite3" => Ok(Dialect::Sqlite),
            _ => Err(MigrateError::config(format!(
                "Unsupported database dialect: {}",
                s
            ))),
        }
    }
}

/// Dialect-specific executor for migration steps and the ledger
#[async_trait]
pub trait MigrationDriver: Send + Sync {
    fn dialect(&self) -> Dialect;

    /// Create the ledger table if it does not exist
    async fn ensure_ledger(&self) -> MigrateResult<()>;

    /// Read the ledger row
    async fn read_ledger(&self) -> MigrateResult<LedgerState>;

    /// Replace the ledger row atomically
    async fn write_ledger(&self, version: i64, dirty: bool) -> MigrateResult<()>;

    /// Remove the ledger row
    async fn clear_ledger(&self) -> MigrateResult<()>;

    /// Execute a raw, possibly multi-statement SQL string
    async fn execute_sql(&self, sql: &str) -> Result<(), sqlx::Error>;

    /// Release the underlying database handle
    async fn close(&self) -> MigrateResult<()>;

    /// Run one migration step.
    ///
    /// Marks the ledger dirty at `step.version`, executes the SQL, then writes
    /// the resulting version clean (or clears the ledger). A failure leaves the
    /// ledger dirty at `step.version`.
    async fn run_step(&self, step: &MigrationStep) -> MigrateResult<()> {
        self.write_ledger(step.version, true).await?;

        if let Err(e) = self.execute_sql(&step.sql).await {
            tracing::error!("Migration {} ({}) failed: {}", step.version, step.direction, e);
            return Err(MigrateError::execution(step.version, e));
        }

        match step.resulting_version {
            Some(version) => self.write_ledger(version, false).await,
            None => self.clear_ledger().await,
        }
    }
}
