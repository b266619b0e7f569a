//! Migrator - Applies migrations and tracks the ledger state
//!
//! Pairs a [`MigrationSource`] with a [`MigrationDriver`]. The ledger is
//! either clean at some version (or none) or dirty at a version; a dirty
//! ledger blocks every command until it is forced back to a clean state.

use std::time::Instant;

use super::definitions::{MigrateOutcome, MigrationStep};
use super::ledger::LedgerState;
use super::source::MigrationSource;
use crate::backends::MigrationDriver;
use crate::error::{MigrateError, MigrateResult};

/// Migration state machine over one database
pub struct Migrator {
    source: MigrationSource,
    driver: Box<dyn MigrationDriver>,
}

impl Migrator {
    /// Create a new migrator
    pub fn new(source: MigrationSource, driver: Box<dyn MigrationDriver>) -> Self {
        Self { source, driver }
    }

    pub fn source(&self) -> &MigrationSource {
        &self.source
    }

    pub(crate) fn source_mut(&mut self) -> &mut MigrationSource {
        &mut self.source
    }

    pub fn driver(&self) -> &dyn MigrationDriver {
        self.driver.as_ref()
    }

    /// Current ledger state, unmodified
    pub async fn version(&self) -> MigrateResult<LedgerState> {
        self.driver.read_ledger().await
    }

    /// Clean ledger version; fails with `DirtyState` otherwise
    pub(crate) async fn clean_version(&self) -> MigrateResult<Option<i64>> {
        let state = self.driver.read_ledger().await?;
        state.require_clean().map_err(|e| {
            tracing::warn!("Refusing to migrate: ledger is at {}", state);
            e
        })
    }

    /// Apply every up file above the current version, in ascending order
    pub async fn up(&self) -> MigrateResult<MigrateOutcome> {
        let start_time = Instant::now();
        let current = self.clean_version().await?;

        let pending = self.source.pending(current);
        if pending.is_empty() {
            tracing::debug!("No pending migrations");
            return Ok(MigrateOutcome::NoChange);
        }

        let mut applied = Vec::with_capacity(pending.len());
        for file in pending {
            let sql = file.read_sql()?;
            tracing::info!("Applying migration {} ({})", file.version, file.description);

            self.driver.run_step(&MigrationStep::up(file.version, sql)).await?;
            applied.push(file.version);
        }

        Ok(MigrateOutcome::Applied {
            versions: applied,
            duration: start_time.elapsed(),
        })
    }

    /// Overwrite the ledger without running SQL: a clean `version`, or no
    /// row at all for `None`. Used to reconcile a dirty ledger by hand.
    pub async fn force(&self, version: Option<i64>) -> MigrateResult<()> {
        if let Some(version) = version {
            if version < 0 {
                return Err(MigrateError::config(format!(
                    "Cannot force negative version {}",
                    version
                )));
            }
        }

        let previous = self.driver.read_ledger().await?;
        match version {
            Some(version) => self.driver.write_ledger(version, false).await?,
            None => self.driver.clear_ledger().await?,
        }

        tracing::info!(
            "Ledger forced from {} to {}",
            previous,
            LedgerState {
                version,
                dirty: false
            }
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::DatabaseHandle;
    use crate::error::ErrorKind;
    use crate::migrations::Ledger;
    use std::fs;
    use tempfile::TempDir;

    async fn migrator(dir: &TempDir) -> Migrator {
        let handle = DatabaseHandle::sqlite_in_memory().await.unwrap();
        let driver = handle.into_driver(Ledger::default(), true);
        driver.ensure_ledger().await.unwrap();
        Migrator::new(MigrationSource::open(dir.path()).unwrap(), driver)
    }

    #[tokio::test]
    async fn test_up_applies_in_numeric_order() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("10_c.up.sql"), "INSERT INTO log VALUES (10);").unwrap();
        fs::write(dir.path().join("2_b.up.sql"), "INSERT INTO log VALUES (2);").unwrap();
        fs::write(dir.path().join("1_a.up.sql"), "CREATE TABLE log (v INTEGER);").unwrap();

        let migrator = migrator(&dir).await;
        match migrator.up().await.unwrap() {
            MigrateOutcome::Applied { versions, .. } => assert_eq!(versions, vec![1, 2, 10]),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(migrator.version().await.unwrap(), LedgerState::clean(10));
    }

    #[tokio::test]
    async fn test_second_up_is_no_change() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("000001_a.up.sql"), "CREATE TABLE a (id INTEGER);").unwrap();

        let migrator = migrator(&dir).await;
        assert!(!migrator.up().await.unwrap().is_no_change());
        assert!(migrator.up().await.unwrap().is_no_change());
        assert_eq!(migrator.version().await.unwrap(), LedgerState::clean(1));
    }

    #[tokio::test]
    async fn test_dirty_ledger_blocks_up() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("000001_a.up.sql"), "CREATE TABLE a (id INTEGER);").unwrap();

        let migrator = migrator(&dir).await;
        migrator.driver().write_ledger(1, true).await.unwrap();

        let err = migrator.up().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DirtyState);
    }

    #[tokio::test]
    async fn test_force_reconciles_dirty_ledger() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("000001_a.up.sql"), "CREATE TABLE a (id INTEGER);").unwrap();
        fs::write(dir.path().join("000002_b.up.sql"), "CREATE TABLE b (id INTEGER);").unwrap();

        let migrator = migrator(&dir).await;
        migrator.driver().write_ledger(2, true).await.unwrap();

        migrator.force(Some(1)).await.unwrap();
        assert_eq!(migrator.version().await.unwrap(), LedgerState::clean(1));

        match migrator.up().await.unwrap() {
            MigrateOutcome::Applied { versions, .. } => assert_eq!(versions, vec![2]),
            other => panic!("unexpected outcome: {other:?}"),
        }

        migrator.force(None).await.unwrap();
        assert_eq!(migrator.version().await.unwrap(), LedgerState::default());
        assert!(migrator.force(Some(-3)).await.is_err());
    }
}
