//! Database Backend Drivers
//!
//! One migration driver per supported dialect, behind the common
//! [`MigrationDriver`] trait.

pub mod core;
pub mod postgres;
pub mod sqlite;

// Re-export core traits and types
pub use self::core::*;
pub use postgres::PostgresDriver;
pub use sqlite::SqliteDriver;
