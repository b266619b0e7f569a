//! Migration Generator - Scaffolds new up/down file pairs
//!
//! New files take the next version after the highest one on disk,
//! zero-padded to six digits.

use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};

use super::definitions::MigrationDirection;
use super::source::{parse_migration_file_name, MigrationSource};
use crate::error::{MigrateError, MigrateResult};

/// Paths of a freshly created migration pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedMigration {
    pub version: i64,
    pub up_path: PathBuf,
    pub down_path: PathBuf,
}

/// Create `<next>_<name>.up.sql` and `<next>_<name>.down.sql` in `dir`
pub fn create_migration(dir: impl AsRef<Path>, name: &str) -> MigrateResult<CreatedMigration> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir).map_err(|e| {
        MigrateError::config(format!(
            "Failed to create migrations directory {}: {}",
            dir.display(),
            e
        ))
    })?;

    let name = normalize_name(name);
    let version = match MigrationSource::open(dir)?.latest_version() {
        None => 1,
        Some(latest) => latest.checked_add(1).ok_or_else(|| {
            MigrateError::config(format!("No version left after {} in {}", latest, dir.display()))
        })?,
    };
    let stem = format!("{:06}_{}", version, name);

    // Reject names the loader would not accept back
    parse_migration_file_name(&format!("{}{}", stem, MigrationDirection::Up.suffix()))?;

    let up_path = dir.join(format!("{}{}", stem, MigrationDirection::Up.suffix()));
    let down_path = dir.join(format!("{}{}", stem, MigrationDirection::Down.suffix()));

    fs::write(&up_path, template(&name, version, MigrationDirection::Up))?;
    fs::write(&down_path, template(&name, version, MigrationDirection::Down))?;

    tracing::info!("Created migration {} ({})", version, name);
    Ok(CreatedMigration {
        version,
        up_path,
        down_path,
    })
}

fn normalize_name(name: &str) -> String {
    name.trim().replace(' ', "_").to_lowercase()
}

fn template(name: &str, version: i64, direction: MigrationDirection) -> String {
    format!(
        "-- Migration: {}\n\
         -- Version: {}\n\
         -- Direction: {}\n\
         -- Created: {}\n\n",
        name,
        version,
        direction,
        Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use tempfile::TempDir;

    #[test]
    fn test_first_migration_is_version_one() {
        let dir = TempDir::new().unwrap();
        let created = create_migration(dir.path(), "Create Users").unwrap();

        assert_eq!(created.version, 1);
        assert!(created.up_path.ends_with("000001_create_users.up.sql"));
        assert!(created.down_path.ends_with("000001_create_users.down.sql"));

        let content = fs::read_to_string(&created.up_path).unwrap();
        assert!(content.contains("-- Migration: create_users"));
        assert!(content.contains("-- Direction: up"));
    }

    #[test]
    fn test_next_version_follows_highest() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("000009_boards.up.sql"), "").unwrap();
        fs::write(dir.path().join("000002_tasks.up.sql"), "").unwrap();

        let created = create_migration(dir.path(), "add_labels").unwrap();
        assert_eq!(created.version, 10);
        assert!(created.up_path.ends_with("000010_add_labels.up.sql"));

        let source = MigrationSource::open(dir.path()).unwrap();
        assert_eq!(source.latest_version(), Some(10));
        assert!(source.down(10).is_some());
    }

    #[test]
    fn test_creates_missing_directory() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("db").join("migrations");
        create_migration(&nested, "init").unwrap();
        assert!(nested.join("000001_init.up.sql").exists());
    }

    #[test]
    fn test_rejects_invalid_name() {
        let dir = TempDir::new().unwrap();
        let err = create_migration(dir.path(), "drop users;").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_version_overflow_is_config_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(format!("{}_last.up.sql", i64::MAX)), "").unwrap();

        let err = create_migration(dir.path(), "one_more").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
