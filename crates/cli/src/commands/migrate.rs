use std::path::Path;

use anyhow::{bail, Context, Result};
use kanban_db::{create_migration, MigrateOutcome, MigrateResult, MigrationRunner};

async fn open_runner(path: &Path) -> Result<MigrationRunner> {
    MigrationRunner::from_env(path)
        .await
        .with_context(|| format!("failed to initialise migrations from {}", path.display()))
}

/// Close the runner whatever the command returned; the command error wins
async fn finish<T>(mut runner: MigrationRunner, result: MigrateResult<T>) -> Result<T> {
    let closed = runner.close().await;
    let value = result?;
    closed.context("failed to close migration runner")?;
    Ok(value)
}

fn log_outcome(outcome: &MigrateOutcome) {
    match outcome {
        MigrateOutcome::NoChange => tracing::info!("No change"),
        MigrateOutcome::Applied { versions, duration } => {
            tracing::info!("Applied {} migration(s) {:?} in {:?}", versions.len(), versions, duration)
        }
        MigrateOutcome::RolledBack {
            versions,
            current,
            duration,
        } => match current {
            Some(version) => tracing::info!(
                "Rolled back {:?} in {:?}; now at version {}",
                versions,
                duration,
                version
            ),
            None => tracing::info!("Rolled back {:?} in {:?}; no version applied", versions, duration),
        },
    }
}

pub async fn up(path: &Path) -> Result<()> {
    let mut runner = open_runner(path).await?;
    let result = runner.up().await;
    let outcome = finish(runner, result).await?;

    log_outcome(&outcome);
    println!("migrations applied");
    Ok(())
}

pub async fn down(path: &Path) -> Result<()> {
    let mut runner = open_runner(path).await?;
    let result = runner.down().await;
    let outcome = finish(runner, result).await?;

    log_outcome(&outcome);
    println!("last migration rolled back");
    Ok(())
}

pub async fn status(path: &Path) -> Result<()> {
    let runner = open_runner(path).await?;
    let result = runner.status().await;
    let status = finish(runner, result).await?;

    println!("{}", status);
    Ok(())
}

pub async fn force(path: &Path, version: &str) -> Result<()> {
    let target = parse_force_version(version)?;

    let mut runner = open_runner(path).await?;
    let result = runner.force(target).await;
    finish(runner, result).await?;

    match target {
        Some(version) => println!("version forced to {}", version),
        None => println!("version forced to none"),
    }
    Ok(())
}

pub fn create(path: &Path, name: &str) -> Result<()> {
    let created = create_migration(path, name)
        .with_context(|| format!("failed to create migration '{}'", name))?;

    println!("created {}", created.up_path.display());
    println!("created {}", created.down_path.display());
    Ok(())
}

/// `none` or `-1` clears the ledger; anything else must be a non-negative integer
pub fn parse_force_version(version: &str) -> Result<Option<i64>> {
    let version = version.trim();
    if version.eq_ignore_ascii_case("none") || version == "-1" {
        return Ok(None);
    }

    let parsed = version
        .parse::<i64>()
        .with_context(|| format!("invalid version '{}'", version))?;
    if parsed < 0 {
        bail!("invalid version '{}': must be -1, none or a non-negative integer", version);
    }
    Ok(Some(parsed))
}
