//! Database Integration - Pool construction for the supported dialects
//!
//! A [`DatabaseHandle`] is an open sqlx pool tagged with its dialect. The
//! runner either opens one itself from a [`DatabaseConfig`] or is given one
//! by the caller.

use std::str::FromStr;
use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{PgPool, SqlitePool};

use crate::backends::{Dialect, MigrationDriver, PostgresDriver, SqliteDriver};
use crate::config::{DatabaseConfig, PostgresConfig, SqliteConfig};
use crate::error::{MigrateError, MigrateResult};
use crate::migrations::Ledger;

/// Connection pool configuration
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub acquire_timeout: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            // One migration process at a time; a small pool is plenty
            max_connections: 2,
            acquire_timeout: 30,
        }
    }
}

/// Open database pool for one of the supported dialects
#[derive(Debug, Clone)]
pub enum DatabaseHandle {
    Postgres(PgPool),
    Sqlite(SqlitePool),
}

impl DatabaseHandle {
    /// Open a pool described by `config`
    pub async fn connect(config: &DatabaseConfig) -> MigrateResult<Self> {
        Self::connect_with_pool_config(config, &PoolConfig::default()).await
    }

    /// Open a pool described by `config` with custom pool settings
    pub async fn connect_with_pool_config(
        config: &DatabaseConfig,
        pool_config: &PoolConfig,
    ) -> MigrateResult<Self> {
        match config {
            DatabaseConfig::Postgres(pg) => connect_postgres(pg, pool_config).await,
            DatabaseConfig::Sqlite(sqlite) => connect_sqlite(sqlite, pool_config).await,
        }
    }

    /// Private in-memory SQLite database on a single long-lived connection
    pub async fn sqlite_in_memory() -> MigrateResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| MigrateError::connect(format!("Invalid SQLite options: {}", e)))?;

        // Every new connection would see its own empty database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| {
                MigrateError::connect(format!("Failed to open in-memory SQLite database: {}", e))
            })?;

        Ok(DatabaseHandle::Sqlite(pool))
    }

    pub fn dialect(&self) -> Dialect {
        match self {
            DatabaseHandle::Postgres(_) => Dialect::Postgres,
            DatabaseHandle::Sqlite(_) => Dialect::Sqlite,
        }
    }

    /// Close the pool; outstanding connections are waited for
    pub async fn close(&self) {
        match self {
            DatabaseHandle::Postgres(pool) => pool.close().await,
            DatabaseHandle::Sqlite(pool) => pool.close().await,
        }
    }

    /// Build the migration driver matching this handle's dialect
    pub fn into_driver(self, ledger: Ledger, owns_pool: bool) -> Box<dyn MigrationDriver> {
        match self {
            DatabaseHandle::Postgres(pool) => Box::new(PostgresDriver::new(pool, ledger, owns_pool)),
            DatabaseHandle::Sqlite(pool) => Box::new(SqliteDriver::new(pool, ledger, owns_pool)),
        }
    }
}

impl From<PgPool> for DatabaseHandle {
    fn from(pool: PgPool) -> Self {
        DatabaseHandle::Postgres(pool)
    }
}

impl From<SqlitePool> for DatabaseHandle {
    fn from(pool: SqlitePool) -> Self {
        DatabaseHandle::Sqlite(pool)
    }
}

async fn connect_postgres(
    config: &PostgresConfig,
    pool_config: &PoolConfig,
) -> MigrateResult<DatabaseHandle> {
    let mut options = PgConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.user)
        .database(&config.database);

    if let Some(password) = &config.password {
        options = options.password(password);
    }
    if let Some(ssl_mode) = config.pg_ssl_mode()? {
        options = options.ssl_mode(ssl_mode);
    }

    let pool = PgPoolOptions::new()
        .max_connections(pool_config.max_connections)
        .acquire_timeout(Duration::from_secs(pool_config.acquire_timeout))
        .connect_with(options)
        .await
        .map_err(|e| {
            MigrateError::connect(format!(
                "Failed to connect to PostgreSQL at {}:{}/{}: {}",
                config.host, config.port, config.database, e
            ))
        })?;

    tracing::info!(
        "Connected to PostgreSQL at {}:{}/{}",
        config.host,
        config.port,
        config.database
    );
    Ok(DatabaseHandle::Postgres(pool))
}

async fn connect_sqlite(
    config: &SqliteConfig,
    pool_config: &PoolConfig,
) -> MigrateResult<DatabaseHandle> {
    let options = SqliteConnectOptions::new()
        .filename(&config.filename)
        .create_if_missing(true)
        .shared_cache(config.shared_cache);

    let pool = SqlitePoolOptions::new()
        .max_connections(pool_config.max_connections)
        .acquire_timeout(Duration::from_secs(pool_config.acquire_timeout))
        .connect_with(options)
        .await
        .map_err(|e| {
            MigrateError::connect(format!(
                "Failed to open SQLite database {}: {}",
                config.filename.display(),
                e
            ))
        })?;

    tracing::info!("Opened SQLite database {}", config.filename.display());
    Ok(DatabaseHandle::Sqlite(pool))
}
