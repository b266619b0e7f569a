//! Migration System
//!
//! Versioned SQL files on disk, a single-row version ledger in the database,
//! and the migrator that moves the schema between the two.

pub mod definitions;
pub mod generator;
pub mod ledger;
pub mod rollback;
pub mod runner;
pub mod source;

pub use definitions::*;
pub use generator::{create_migration, CreatedMigration};
pub use ledger::{Ledger, LedgerState};
pub use rollback::MigrationRollback;
pub use runner::Migrator;
pub use source::{parse_migration_file_name, MigrationSource};
