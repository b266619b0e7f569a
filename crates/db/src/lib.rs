//! # kanban-db: schema migrations for the kanban backend
//!
//! Discovers versioned `NNNNNN_name.up.sql` / `.down.sql` files, records the
//! applied version and a dirty flag in a single-row `migrations` table, and
//! moves the schema up or down against PostgreSQL or SQLite.
//!
//! ```ignore
//! use kanban_db::MigrationRunner;
//!
//! let mut runner = MigrationRunner::from_env("migrations").await?;
//! runner.up().await?;
//! println!("{}", runner.status().await?);
//! runner.close().await?;
//! ```

pub mod backends;
pub mod config;
pub mod database;
pub mod error;
pub mod migrations;
pub mod runner;

// Re-export core traits and types
pub use backends::{Dialect, MigrationDriver};
pub use config::*;
pub use database::*;
pub use error::*;
pub use migrations::*;
pub use runner::MigrationRunner;
