//! Version Ledger - Single-row table recording the schema version
//!
//! The ledger holds at most one `(version, dirty)` row. No row means no
//! migration has ever been applied.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

use super::definitions::DEFAULT_MIGRATIONS_TABLE;
use crate::backends::Dialect;
use crate::error::{MigrateError, MigrateResult};

static TABLE_NAME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("table name pattern is a valid regex")
});

/// Current contents of the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LedgerState {
    /// `None` when the table has no row
    pub version: Option<i64>,
    pub dirty: bool,
}

impl LedgerState {
    pub fn clean(version: i64) -> Self {
        Self {
            version: Some(version),
            dirty: false,
        }
    }

    pub fn dirty(version: i64) -> Self {
        Self {
            version: Some(version),
            dirty: true,
        }
    }

    /// The clean version, or `DirtyState` when the last transition did not finish
    pub fn require_clean(&self) -> MigrateResult<Option<i64>> {
        match (self.version, self.dirty) {
            (Some(version), true) => Err(MigrateError::DirtyState { version }),
            (version, _) => Ok(version),
        }
    }
}

impl fmt::Display for LedgerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.version {
            Some(version) => write!(f, "version {} (dirty: {})", version, self.dirty),
            None => write!(f, "no version (dirty: {})", self.dirty),
        }
    }
}

/// SQL for the ledger table, rendered per dialect
#[derive(Debug, Clone)]
pub struct Ledger {
    table: String,
}

impl Ledger {
    /// Ledger stored in `table`; the name must be a plain identifier
    pub fn new(table: impl Into<String>) -> MigrateResult<Self> {
        let table = table.into();
        if !TABLE_NAME_PATTERN.is_match(&table) {
            return Err(MigrateError::config(format!(
                "Invalid migrations table name: {}",
                table
            )));
        }
        Ok(Self { table })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// SQL to create the ledger table if absent
    pub fn create_table_sql(&self) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {} (version BIGINT PRIMARY KEY NOT NULL, dirty BOOLEAN NOT NULL)",
            self.table
        )
    }

    /// SQL to read the single row
    pub fn select_sql(&self) -> String {
        format!("SELECT version, dirty FROM {} LIMIT 1", self.table)
    }

    /// SQL to remove every row
    pub fn clear_sql(&self) -> String {
        format!("DELETE FROM {}", self.table)
    }

    /// SQL to insert the row, binding version then dirty
    pub fn insert_sql(&self, dialect: Dialect) -> String {
        format!(
            "INSERT INTO {} (version, dirty) VALUES ({}, {})",
            self.table,
            dialect.placeholder(1),
            dialect.placeholder(2)
        )
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self {
            table: DEFAULT_MIGRATIONS_TABLE.to_string(),
        }
    }
}
