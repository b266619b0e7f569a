//! Migration Source - Discovers versioned SQL files on disk
//!
//! Lists a migrations directory, recognises `<version>_<name>.<up|down>.sql`
//! files and orders them by numeric version. Files that do not end in
//! `.up.sql` / `.down.sql` are ignored; files that do but do not parse are
//! rejected.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

use super::definitions::{MigrationDirection, MigrationFile};
use crate::error::{MigrateError, MigrateResult};

static MIGRATION_FILE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([0-9]+)_([A-Za-z0-9_\-]+)\.(up|down)\.sql$")
        .expect("migration file pattern is a valid regex")
});

/// Parse a migration file name into version, description and direction
pub fn parse_migration_file_name(
    file_name: &str,
) -> MigrateResult<(i64, String, MigrationDirection)> {
    let captures = MIGRATION_FILE_PATTERN.captures(file_name).ok_or_else(|| {
        MigrateError::config(format!("Invalid migration file name: {}", file_name))
    })?;

    let version = captures[1].parse::<i64>().map_err(|e| {
        MigrateError::config(format!(
            "Invalid version in migration file name {}: {}",
            file_name, e
        ))
    })?;
    let direction = captures[3].parse::<MigrationDirection>()?;

    Ok((version, captures[2].to_string(), direction))
}

fn is_migration_candidate(file_name: &str) -> bool {
    file_name.ends_with(MigrationDirection::Up.suffix())
        || file_name.ends_with(MigrationDirection::Down.suffix())
}

/// Ordered set of migration files loaded from one directory
#[derive(Debug, Clone)]
pub struct MigrationSource {
    path: PathBuf,
    /// Ascending by version
    up_files: Vec<MigrationFile>,
    /// Descending by version
    down_files: Vec<MigrationFile>,
    closed: bool,
}

impl MigrationSource {
    /// Load the migration set from `path`
    pub fn open(path: impl AsRef<Path>) -> MigrateResult<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = fs::read_dir(&path).map_err(|e| {
            MigrateError::config(format!(
                "Failed to read migrations directory {}: {}",
                path.display(),
                e
            ))
        })?;

        let mut up_files = Vec::new();
        let mut down_files = Vec::new();

        for entry in entries {
            let entry = entry.map_err(|e| {
                MigrateError::config(format!("Failed to read directory entry: {}", e))
            })?;

            let file_type = entry.file_type().map_err(|e| {
                MigrateError::config(format!("Failed to stat {}: {}", entry.path().display(), e))
            })?;
            if file_type.is_dir() {
                continue;
            }

            let file_name = entry.file_name().to_string_lossy().into_owned();
            if !is_migration_candidate(&file_name) {
                continue;
            }

            let (version, description, direction) = parse_migration_file_name(&file_name)?;
            let file = MigrationFile {
                version,
                description,
                direction,
                path: entry.path(),
            };

            match direction {
                MigrationDirection::Up => up_files.push(file),
                MigrationDirection::Down => down_files.push(file),
            }
        }

        // Name as tie-breaker keeps the order independent of read_dir order
        up_files.sort_by(|a, b| a.version.cmp(&b.version).then_with(|| a.path.cmp(&b.path)));
        down_files.sort_by(|a, b| b.version.cmp(&a.version).then_with(|| a.path.cmp(&b.path)));

        reject_duplicates(&up_files)?;
        reject_duplicates(&down_files)?;

        for down in &down_files {
            if up_files.binary_search_by_key(&down.version, |f| f.version).is_err() {
                return Err(MigrateError::config(format!(
                    "Down migration {} has no matching up migration",
                    down.file_name()
                )));
            }
        }

        tracing::debug!(
            "Loaded {} up and {} down migrations from {}",
            up_files.len(),
            down_files.len(),
            path.display()
        );

        Ok(Self {
            path,
            up_files,
            down_files,
            closed: false,
        })
    }

    /// Directory the set was loaded from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Up files in ascending version order
    pub fn up_files(&self) -> &[MigrationFile] {
        &self.up_files
    }

    /// Down files in descending version order
    pub fn down_files(&self) -> &[MigrationFile] {
        &self.down_files
    }

    pub fn up(&self, version: i64) -> Option<&MigrationFile> {
        self.up_files.iter().find(|f| f.version == version)
    }

    pub fn down(&self, version: i64) -> Option<&MigrationFile> {
        self.down_files.iter().find(|f| f.version == version)
    }

    /// Up files strictly above `current`, ascending
    pub fn pending(&self, current: Option<i64>) -> Vec<&MigrationFile> {
        self.up_files
            .iter()
            .filter(|f| current.map_or(true, |v| f.version > v))
            .collect()
    }

    /// Next-lower version present in the up set
    pub fn predecessor(&self, version: i64) -> Option<i64> {
        self.up_files
            .iter()
            .rev()
            .map(|f| f.version)
            .find(|v| *v < version)
    }

    /// Highest up version, if any
    pub fn latest_version(&self) -> Option<i64> {
        self.up_files.last().map(|f| f.version)
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Release the loaded set. Idempotent.
    pub fn close(&mut self) -> MigrateResult<()> {
        self.up_files.clear();
        self.down_files.clear();
        self.closed = true;
        Ok(())
    }
}

fn reject_duplicates(files: &[MigrationFile]) -> MigrateResult<()> {
    for pair in files.windows(2) {
        if pair[0].version == pair[1].version {
            return Err(MigrateError::config(format!(
                "Duplicate migration version {}: {} and {}",
                pair[0].version,
                pair[0].file_name(),
                pair[1].file_name()
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use tempfile::TempDir;

    fn touch(dir: &TempDir, name: &str) {
        fs::write(dir.path().join(name), "SELECT 1;").unwrap();
    }

    #[test]
    fn test_parse_file_name() {
        let (version, description, direction) =
            parse_migration_file_name("000012_add-board_columns.down.sql").unwrap();
        assert_eq!(version, 12);
        assert_eq!(description, "add-board_columns");
        assert_eq!(direction, MigrationDirection::Down);
    }

    #[test]
    fn test_parse_rejects_missing_prefix() {
        let err = parse_migration_file_name("create_users.up.sql").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_numeric_ordering_without_padding() {
        let dir = TempDir::new().unwrap();
        touch(&dir, "10_c.up.sql");
        touch(&dir, "2_b.up.sql");
        touch(&dir, "1_a.up.sql");
        touch(&dir, "1_a.down.sql");
        touch(&dir, "10_c.down.sql");

        let source = MigrationSource::open(dir.path()).unwrap();
        let ups: Vec<i64> = source.up_files().iter().map(|f| f.version).collect();
        let downs: Vec<i64> = source.down_files().iter().map(|f| f.version).collect();
        assert_eq!(ups, vec![1, 2, 10]);
        assert_eq!(downs, vec![10, 1]);
        assert_eq!(source.predecessor(10), Some(2));
        assert_eq!(source.predecessor(1), None);
        assert_eq!(source.latest_version(), Some(10));
    }

    #[test]
    fn test_ignores_non_migration_files() {
        let dir = TempDir::new().unwrap();
        touch(&dir, "README.md");
        touch(&dir, "notes.sql");
        touch(&dir, "000001_init.up.sql");
        fs::create_dir(dir.path().join("000002_dir.up.sql")).unwrap();

        let source = MigrationSource::open(dir.path()).unwrap();
        assert_eq!(source.up_files().len(), 1);
        assert!(source.down_files().is_empty());
    }

    #[test]
    fn test_rejects_unparsable_sql_file() {
        let dir = TempDir::new().unwrap();
        touch(&dir, "init.up.sql");

        let err = MigrationSource::open(dir.path()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_rejects_duplicate_versions() {
        let dir = TempDir::new().unwrap();
        touch(&dir, "000003_a.up.sql");
        touch(&dir, "000003_b.up.sql");

        let err = MigrationSource::open(dir.path()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
        assert!(err.to_string().contains("Duplicate migration version 3"));
    }

    #[test]
    fn test_rejects_orphan_down_file() {
        let dir = TempDir::new().unwrap();
        touch(&dir, "000001_a.up.sql");
        touch(&dir, "000002_b.down.sql");

        let err = MigrationSource::open(dir.path()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_missing_directory_is_config_error() {
        let dir = TempDir::new().unwrap();
        let err = MigrationSource::open(dir.path().join("absent")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_pending_after_version_with_gaps() {
        let dir = TempDir::new().unwrap();
        touch(&dir, "000001_a.up.sql");
        touch(&dir, "000005_b.up.sql");
        touch(&dir, "000009_c.up.sql");

        let source = MigrationSource::open(dir.path()).unwrap();
        let pending: Vec<i64> = source.pending(Some(1)).iter().map(|f| f.version).collect();
        assert_eq!(pending, vec![5, 9]);
        assert_eq!(source.pending(None).len(), 3);
        assert!(source.pending(Some(9)).is_empty());
    }

    #[test]
    fn test_close_releases_files() {
        let dir = TempDir::new().unwrap();
        touch(&dir, "000001_a.up.sql");

        let mut source = MigrationSource::open(dir.path()).unwrap();
        source.close().unwrap();
        source.close().unwrap();
        assert!(source.is_closed());
        assert!(source.up_files().is_empty());
    }
}
