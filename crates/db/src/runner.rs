//! Migration Runner - Entry point for the `up`, `down` and `status` commands
//!
//! Owns the resolved migrations path, the migrator and (when it opened it)
//! the database pool. Not meant to be shared between tasks: every command
//! takes `&mut self`.

use std::path::{Path, PathBuf};

use crate::backends::Dialect;
use crate::config::DatabaseConfig;
use crate::database::DatabaseHandle;
use crate::error::{MigrateError, MigrateResult};
use crate::migrations::{
    Ledger, LedgerState, MigrateOutcome, MigrationConfig, MigrationRollback, MigrationSource,
    MigrationStatus, Migrator,
};

/// Facade over the migrator for one migrations directory and one database
pub struct MigrationRunner {
    migrations_path: PathBuf,
    dialect: Dialect,
    migrator: Migrator,
    closed: bool,
}

impl MigrationRunner {
    /// Build a runner from `DB_*` environment variables: PostgreSQL when
    /// all four are set, the SQLite dev database otherwise
    pub async fn from_env(migrations_path: impl AsRef<Path>) -> MigrateResult<Self> {
        let config = DatabaseConfig::from_env()?;
        Self::from_config(&config, migrations_path).await
    }

    /// Build a runner that opens (and later closes) its own pool
    pub async fn from_config(
        config: &DatabaseConfig,
        migrations_path: impl AsRef<Path>,
    ) -> MigrateResult<Self> {
        Self::connect(config, &MigrationConfig::new(migrations_path.as_ref())).await
    }

    /// Like [`from_config`](Self::from_config) with explicit directory and
    /// ledger table settings
    pub async fn connect(
        config: &DatabaseConfig,
        migration_config: &MigrationConfig,
    ) -> MigrateResult<Self> {
        // Validate the directory and table before opening anything that needs releasing
        let ledger = Ledger::new(migration_config.migrations_table.as_str())?;
        let (path, source) = load_source(&migration_config.migrations_dir)?;
        let handle = DatabaseHandle::connect(config).await?;
        Self::build(handle, path, source, ledger, true).await
    }

    /// Build a runner over a caller-owned handle; `close` leaves it open
    pub async fn from_handle(
        handle: DatabaseHandle,
        migrations_path: impl AsRef<Path>,
    ) -> MigrateResult<Self> {
        Self::from_handle_with_config(handle, &MigrationConfig::new(migrations_path.as_ref())).await
    }

    /// Like [`from_handle`](Self::from_handle) with explicit directory and
    /// ledger table settings
    pub async fn from_handle_with_config(
        handle: DatabaseHandle,
        migration_config: &MigrationConfig,
    ) -> MigrateResult<Self> {
        let ledger = Ledger::new(migration_config.migrations_table.as_str())?;
        let (path, source) = load_source(&migration_config.migrations_dir)?;
        Self::build(handle, path, source, ledger, false).await
    }

    async fn build(
        handle: DatabaseHandle,
        migrations_path: PathBuf,
        source: MigrationSource,
        ledger: Ledger,
        owns_handle: bool,
    ) -> MigrateResult<Self> {
        let dialect = handle.dialect();
        let driver = handle.into_driver(ledger, owns_handle);

        if let Err(e) = driver.ensure_ledger().await {
            // Partial construction must not leak a pool we opened
            if let Err(close_err) = driver.close().await {
                tracing::warn!("Failed to close database after setup error: {}", close_err);
            }
            return Err(e);
        }

        tracing::debug!(
            "Migration runner ready: {} migrations in {} ({})",
            source.up_files().len(),
            migrations_path.display(),
            dialect
        );

        Ok(Self {
            migrations_path,
            dialect,
            migrator: Migrator::new(source, driver),
            closed: false,
        })
    }

    pub fn migrations_path(&self) -> &Path {
        &self.migrations_path
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn migrator(&self) -> &Migrator {
        &self.migrator
    }

    /// Apply all pending migrations
    pub async fn up(&mut self) -> MigrateResult<MigrateOutcome> {
        self.ensure_open()?;
        self.migrator.up().await
    }

    /// Roll back the most recent migration
    pub async fn down(&mut self) -> MigrateResult<MigrateOutcome> {
        self.down_steps(1).await
    }

    /// Roll back up to `steps` migrations
    pub async fn down_steps(&mut self, steps: usize) -> MigrateResult<MigrateOutcome> {
        self.ensure_open()?;
        self.migrator.down(steps).await
    }

    /// Current ledger state
    pub async fn version(&self) -> MigrateResult<LedgerState> {
        self.ensure_open()?;
        self.migrator.version().await
    }

    /// Snapshot of the ledger and the file set
    pub async fn status(&self) -> MigrateResult<MigrationStatus> {
        self.ensure_open()?;
        let state = self.migrator.version().await?;
        let source = self.migrator.source();

        Ok(MigrationStatus {
            current_version: state.version,
            dirty: state.dirty,
            total_up_files: source.up_files().len(),
            pending: source.pending(state.version).len(),
        })
    }

    /// Set the ledger to a clean `version` (or clear it) without running SQL
    pub async fn force(&mut self, version: Option<i64>) -> MigrateResult<()> {
        self.ensure_open()?;
        self.migrator.force(version).await
    }

    /// Release the source and, if this runner opened it, the database pool.
    /// Both are always attempted; the first error wins. Idempotent.
    pub async fn close(&mut self) -> MigrateResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let source_result = self.migrator.source_mut().close();
        let db_result = self.migrator.driver().close().await;
        source_result.and(db_result)
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn ensure_open(&self) -> MigrateResult<()> {
        if self.closed {
            return Err(MigrateError::config("Migration runner is closed"));
        }
        Ok(())
    }
}

fn load_source(migrations_path: &Path) -> MigrateResult<(PathBuf, MigrationSource)> {
    let path = std::fs::canonicalize(migrations_path).map_err(|e| {
        MigrateError::config(format!(
            "Migrations directory {} is not accessible: {}",
            migrations_path.display(),
            e
        ))
    })?;
    if !path.is_dir() {
        return Err(MigrateError::config(format!(
            "Migrations path {} is not a directory",
            path.display()
        )));
    }

    let source = MigrationSource::open(&path)?;
    Ok((path, source))
}
