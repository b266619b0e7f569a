//! SQLite Migration Driver
//!
//! Migration bodies run outside a transaction; the dirty flag is the only
//! recovery marker when a step stops halfway.

use async_trait::async_trait;
use sqlx::{Executor, Row, SqlitePool};

use super::core::{Dialect, MigrationDriver};
use crate::error::MigrateResult;
use crate::migrations::{Ledger, LedgerState};

/// SQLite driver over a sqlx pool
pub struct SqliteDriver {
    pool: SqlitePool,
    ledger: Ledger,
    owns_pool: bool,
}

impl SqliteDriver {
    pub fn new(pool: SqlitePool, ledger: Ledger, owns_pool: bool) -> Self {
        Self {
            pool,
            ledger,
            owns_pool,
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl MigrationDriver for SqliteDriver {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    async fn ensure_ledger(&self) -> MigrateResult<()> {
        sqlx::query(&self.ledger.create_table_sql())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn read_ledger(&self) -> MigrateResult<LedgerState> {
        let row = sqlx::query(&self.ledger.select_sql())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(LedgerState {
                version: Some(row.try_get::<i64, _>("version")?),
                dirty: row.try_get::<bool, _>("dirty")?,
            }),
            None => Ok(LedgerState::default()),
        }
    }

    async fn write_ledger(&self, version: i64, dirty: bool) -> MigrateResult<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(&self.ledger.clear_sql())
            .execute(&mut *tx)
            .await?;
        sqlx::query(&self.ledger.insert_sql(Dialect::Sqlite))
            .bind(version)
            .bind(dirty)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::debug!("Ledger set to version {} (dirty: {})", version, dirty);
        Ok(())
    }

    async fn clear_ledger(&self) -> MigrateResult<()> {
        sqlx::query(&self.ledger.clear_sql())
            .execute(&self.pool)
            .await?;
        tracing::debug!("Ledger cleared");
        Ok(())
    }

    async fn execute_sql(&self, sql: &str) -> Result<(), sqlx::Error> {
        self.pool.execute(sql).await?;
        Ok(())
    }

    async fn close(&self) -> MigrateResult<()> {
        if self.owns_pool {
            self.pool.close().await;
        }
        Ok(())
    }
}
