//! PostgreSQL Migration Driver
//!
//! PostgreSQL runs DDL inside transactions, so the migration body and the
//! clean ledger write commit together. The dirty marker is committed first
//! on its own so a failed body still leaves `dirty = true` behind.

use async_trait::async_trait;
use sqlx::{Executor, PgPool, Row};

use super::core::{Dialect, MigrationDriver};
use crate::error::{MigrateError, MigrateResult};
use crate::migrations::{Ledger, LedgerState, MigrationStep};

/// PostgreSQL driver over a sqlx pool
pub struct PostgresDriver {
    pool: PgPool,
    ledger: Ledger,
    owns_pool: bool,
}

impl PostgresDriver {
    pub fn new(pool: PgPool, ledger: Ledger, owns_pool: bool) -> Self {
        Self {
            pool,
            ledger,
            owns_pool,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl MigrationDriver for PostgresDriver {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
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
        sqlx::query(&self.ledger.insert_sql(Dialect::Postgres))
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

    async fn run_step(&self, step: &MigrationStep) -> MigrateResult<()> {
        self.write_ledger(step.version, true).await?;

        let mut tx = self.pool.begin().await?;

        // Dropping the transaction on error rolls the body back
        if let Err(e) = (&mut *tx).execute(step.sql.as_str()).await {
            tracing::error!("Migration {} ({}) failed: {}", step.version, step.direction, e);
            return Err(MigrateError::execution(step.version, e));
        }

        sqlx::query(&self.ledger.clear_sql())
            .execute(&mut *tx)
            .await?;
        if let Some(version) = step.resulting_version {
            sqlx::query(&self.ledger.insert_sql(Dialect::Postgres))
                .bind(version)
                .bind(false)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
