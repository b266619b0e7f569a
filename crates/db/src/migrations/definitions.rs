//! Migration Definitions - Core types and structures for migrations
//!
//! Defines the fundamental types used throughout the migration system including
//! MigrationFile, MigrationStep, the runner's MigrationConfig and the command
//! outcomes.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{MigrateError, MigrateResult};

/// Default name of the ledger table
pub const DEFAULT_MIGRATIONS_TABLE: &str = "migrations";

/// Migration direction for execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MigrationDirection {
    /// Apply the migration (run the `.up.sql` file)
    Up,
    /// Rollback the migration (run the `.down.sql` file)
    Down,
}

impl MigrationDirection {
    /// File name suffix for this direction
    pub fn suffix(&self) -> &'static str {
        match self {
            MigrationDirection::Up => ".up.sql",
            MigrationDirection::Down => ".down.sql",
        }
    }
}

impl fmt::Display for MigrationDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrationDirection::Up => write!(f, "up"),
            MigrationDirection::Down => write!(f, "down"),
        }
    }
}

impl std::str::FromStr for MigrationDirection {
    type Err = MigrateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(MigrationDirection::Up),
            "down" => Ok(MigrationDirection::Down),
            _ => Err(MigrateError::config(format!(
                "Unknown migration direction: {}",
                s
            ))),
        }
    }
}

/// A versioned migration file found in the migrations directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationFile {
    /// Numeric version parsed from the file name prefix
    pub version: i64,
    /// Identifier between the version and the direction
    pub description: String,
    pub direction: MigrationDirection,
    /// Absolute path of the file
    pub path: PathBuf,
}

impl MigrationFile {
    /// File name without the directory
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Read the SQL body of this file
    pub fn read_sql(&self) -> MigrateResult<String> {
        Ok(std::fs::read_to_string(&self.path)?)
    }
}

/// One unit of work handed to a migration driver
#[derive(Debug, Clone)]
pub struct MigrationStep {
    /// Version being applied or reverted; the ledger is dirty at this
    /// version while the step runs
    pub version: i64,
    pub direction: MigrationDirection,
    pub sql: String,
    /// Ledger version once the step succeeds; `None` clears the ledger
    pub resulting_version: Option<i64>,
}

impl MigrationStep {
    /// Step applying `version`
    pub fn up(version: i64, sql: String) -> Self {
        Self {
            version,
            direction: MigrationDirection::Up,
            sql,
            resulting_version: Some(version),
        }
    }

    /// Step reverting `version` back to `predecessor`
    pub fn down(version: i64, sql: String, predecessor: Option<i64>) -> Self {
        Self {
            version,
            direction: MigrationDirection::Down,
            sql,
            resulting_version: predecessor,
        }
    }
}

/// Where a runner finds its files and which table holds its ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationConfig {
    pub migrations_dir: PathBuf,
    pub migrations_table: String,
}

impl MigrationConfig {
    pub fn new(migrations_dir: impl Into<PathBuf>) -> Self {
        Self {
            migrations_dir: migrations_dir.into(),
            migrations_table: DEFAULT_MIGRATIONS_TABLE.to_string(),
        }
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.migrations_table = table.into();
        self
    }
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self::new("migrations")
    }
}

/// Result of a migration command that completed without error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrateOutcome {
    /// Nothing to do; reported to users as success
    NoChange,
    /// Up files applied, in ascending order
    Applied {
        versions: Vec<i64>,
        duration: Duration,
    },
    /// Versions rolled back, newest first
    RolledBack {
        versions: Vec<i64>,
        /// Ledger version after the rollback
        current: Option<i64>,
        duration: Duration,
    },
}

impl MigrateOutcome {
    pub fn is_no_change(&self) -> bool {
        matches!(self, MigrateOutcome::NoChange)
    }
}

/// Snapshot returned by the status command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationStatus {
    pub current_version: Option<i64>,
    pub dirty: bool,
    /// Number of `.up.sql` files in the migrations directory
    pub total_up_files: usize,
    /// Up files with a version above the current one
    pub pending: usize,
}

impl fmt::Display for MigrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.current_version {
            Some(version) => write!(
                f,
                "current_version: {}, dirty: {}, total_migrations: {}",
                version, self.dirty, self.total_up_files
            ),
            None => write!(
                f,
                "current_version: none, dirty: {}, total_migrations: {}",
                self.dirty, self.total_up_files
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_line_without_version() {
        let status = MigrationStatus {
            current_version: None,
            dirty: false,
            total_up_files: 3,
            pending: 3,
        };
        assert_eq!(
            status.to_string(),
            "current_version: none, dirty: false, total_migrations: 3"
        );
    }

    #[test]
    fn test_status_line_with_version() {
        let status = MigrationStatus {
            current_version: Some(2),
            dirty: true,
            total_up_files: 2,
            pending: 0,
        };
        assert_eq!(
            status.to_string(),
            "current_version: 2, dirty: true, total_migrations: 2"
        );
    }

    #[test]
    fn test_direction_parsing() {
        assert_eq!("up".parse::<MigrationDirection>().unwrap(), MigrationDirection::Up);
        assert_eq!("down".parse::<MigrationDirection>().unwrap(), MigrationDirection::Down);
        assert!("sideways".parse::<MigrationDirection>().is_err());
    }

    #[test]
    fn test_down_step_to_nothing_clears() {
        let step = MigrationStep::down(1, "DROP TABLE users;".to_string(), None);
        assert_eq!(step.resulting_version, None);
        assert_eq!(step.direction, MigrationDirection::Down);
    }
}
