//! Migration Rollback - Reverts applied migrations one version at a time
//!
//! Each step runs the current version's down file and moves the ledger to
//! the next-lower version present in the source, or clears it.

use std::time::Instant;

use super::definitions::{MigrateOutcome, MigrationStep};
use super::runner::Migrator;
use crate::error::{MigrateError, MigrateResult};

/// Extension trait for Migrator to add rollback functionality
#[allow(async_fn_in_trait)]
pub trait MigrationRollback {
    /// Roll back up to `steps` versions, newest first
    async fn down(&self, steps: usize) -> MigrateResult<MigrateOutcome>;

    /// Roll back exactly the current version
    async fn rollback_last(&self) -> MigrateResult<MigrateOutcome> {
        self.down(1).await
    }
}

impl MigrationRollback for Migrator {
    async fn down(&self, steps: usize) -> MigrateResult<MigrateOutcome> {
        let start_time = Instant::now();
        let mut current = self.clean_version().await?;

        if steps == 0 || current.is_none() {
            return Ok(MigrateOutcome::NoChange);
        }

        let mut rolled_back = Vec::new();
        for _ in 0..steps {
            let Some(version) = current else {
                break;
            };

            let file = self
                .source()
                .down(version)
                .ok_or(MigrateError::MissingDownFile { version })?;
            let sql = file.read_sql()?;
            let predecessor = self.source().predecessor(version);

            tracing::info!("Rolling back migration {} ({})", version, file.description);
            self.driver()
                .run_step(&MigrationStep::down(version, sql, predecessor))
                .await?;

            rolled_back.push(version);
            current = predecessor;
        }

        Ok(MigrateOutcome::RolledBack {
            versions: rolled_back,
            current,
            duration: start_time.elapsed(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::DatabaseHandle;
    use crate::error::ErrorKind;
    use crate::migrations::{Ledger, LedgerState, MigrationSource};
    use std::fs;
    use tempfile::TempDir;

    fn write_pair(dir: &TempDir, version: &str, table: &str) {
        fs::write(
            dir.path().join(format!("{}_{}.up.sql", version, table)),
            format!("CREATE TABLE {} (id INTEGER);", table),
        )
        .unwrap();
        fs::write(
            dir.path().join(format!("{}_{}.down.sql", version, table)),
            format!("DROP TABLE {};", table),
        )
        .unwrap();
    }

    async fn migrator(dir: &TempDir) -> Migrator {
        let handle = DatabaseHandle::sqlite_in_memory().await.unwrap();
        let driver = handle.into_driver(Ledger::default(), true);
        driver.ensure_ledger().await.unwrap();
        Migrator::new(MigrationSource::open(dir.path()).unwrap(), driver)
    }

    #[tokio::test]
    async fn test_down_on_empty_ledger_is_no_change() {
        let dir = TempDir::new().unwrap();
        write_pair(&dir, "000001", "users");

        let migrator = migrator(&dir).await;
        assert!(migrator.rollback_last().await.unwrap().is_no_change());
    }

    #[tokio::test]
    async fn test_down_moves_to_predecessor_across_gaps() {
        let dir = TempDir::new().unwrap();
        write_pair(&dir, "1", "boards");
        write_pair(&dir, "2", "tasks");
        write_pair(&dir, "10", "labels");

        let migrator = migrator(&dir).await;
        migrator.up().await.unwrap();

        migrator.rollback_last().await.unwrap();
        assert_eq!(migrator.version().await.unwrap(), LedgerState::clean(2));

        match migrator.down(5).await.unwrap() {
            MigrateOutcome::RolledBack {
                versions, current, ..
            } => {
                assert_eq!(versions, vec![2, 1]);
                assert_eq!(current, None);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(migrator.version().await.unwrap(), LedgerState::default());
    }

    #[tokio::test]
    async fn test_missing_down_file_leaves_ledger_untouched() {
        let dir = TempDir::new().unwrap();
        write_pair(&dir, "000001", "users");
        fs::write(dir.path().join("000002_boards.up.sql"), "CREATE TABLE boards (id INTEGER);")
            .unwrap();

        let migrator = migrator(&dir).await;
        migrator.up().await.unwrap();

        let err = migrator.rollback_last().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingDownFile);
        assert_eq!(migrator.version().await.unwrap(), LedgerState::clean(2));
    }

    #[tokio::test]
    async fn test_zero_steps_is_no_change() {
        let dir = TempDir::new().unwrap();
        write_pair(&dir, "000001", "users");

        let migrator = migrator(&dir).await;
        migrator.up().await.unwrap();
        assert!(migrator.down(0).await.unwrap().is_no_change());
        assert_eq!(migrator.version().await.unwrap(), LedgerState::clean(1));
    }
}
