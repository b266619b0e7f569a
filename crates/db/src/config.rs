//! Database configuration derived from the environment
//!
//! `DB_HOST`, `DB_PORT`, `DB_USER` and `DB_NAME` all set selects PostgreSQL;
//! anything less falls back to the file-backed SQLite dev database.

use std::path::PathBuf;

use sqlx::postgres::PgSslMode;

use crate::backends::Dialect;
use crate::error::{MigrateError, MigrateResult};

/// File used by the SQLite fallback (`file:migrations_dev.db?cache=shared`)
pub const DEV_SQLITE_PATH: &str = "migrations_dev.db";

/// Environment variables that together select PostgreSQL
pub const POSTGRES_ENV_VARS: [&str; 4] = ["DB_HOST", "DB_PORT", "DB_USER", "DB_NAME"];

/// PostgreSQL connection settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostgresConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Option<String>,
    pub database: String,
    pub ssl_mode: Option<String>,
}

impl PostgresConfig {
    /// Parsed `ssl_mode`, if one was given
    pub fn pg_ssl_mode(&self) -> MigrateResult<Option<PgSslMode>> {
        self.ssl_mode
            .as_deref()
            .map(|mode| {
                mode.parse::<PgSslMode>().map_err(|e| {
                    MigrateError::config(format!("Invalid DB_SSLMODE '{}': {}", mode, e))
                })
            })
            .transpose()
    }
}

/// SQLite connection settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqliteConfig {
    pub filename: PathBuf,
    pub shared_cache: bool,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            filename: PathBuf::from(DEV_SQLITE_PATH),
            shared_cache: true,
        }
    }
}

/// Where the runner should connect
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseConfig {
    Postgres(PostgresConfig),
    Sqlite(SqliteConfig),
}

impl DatabaseConfig {
    /// Load configuration from process environment variables
    pub fn from_env() -> MigrateResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup`; empty values count as unset
    pub fn from_lookup<F>(lookup: F) -> MigrateResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.is_empty());

        let (Some(host), Some(port), Some(user), Some(database)) = (
            get("DB_HOST"),
            get("DB_PORT"),
            get("DB_USER"),
            get("DB_NAME"),
        ) else {
            tracing::debug!(
                "{} not fully set, using SQLite at {}",
                POSTGRES_ENV_VARS.join("/"),
                DEV_SQLITE_PATH
            );
            return Ok(DatabaseConfig::Sqlite(SqliteConfig::default()));
        };

        let port = port.parse::<u16>().map_err(|e| {
            MigrateError::config(format!("Invalid DB_PORT '{}': {}", port, e))
        })?;

        let config = PostgresConfig {
            host,
            port,
            user,
            password: get("DB_PASSWORD"),
            database,
            ssl_mode: get("DB_SSLMODE"),
        };
        config.pg_ssl_mode()?;

        Ok(DatabaseConfig::Postgres(config))
    }

    pub fn dialect(&self) -> Dialect {
        match self {
            DatabaseConfig::Postgres(_) => Dialect::Postgres,
            DatabaseConfig::Sqlite(_) => Dialect::Sqlite,
        }
    }
}
