mod commands;
mod logging;

use std::path::PathBuf;
use std::process;

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser, Subcommand};
use commands::*;
use logging::LoggingConfig;

#[derive(Parser, Debug)]
#[command(name = "kanban-migrate")]
#[command(about = "Apply, roll back and inspect kanban database migrations")]
#[command(version)]
struct Cli {
    /// Directory holding NNNNNN_name.up.sql / .down.sql files
    #[arg(long, global = true, env = "MIGRATIONS_PATH", default_value = "migrations")]
    path: PathBuf,

    /// Debug-level logging
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Log as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Apply all pending migrations
    Up,

    /// Roll back the last migration
    Down,

    /// Show the current version, dirty flag and migration count
    Status,

    /// Set the ledger to VERSION without running SQL (-1 or none clears it)
    Force {
        #[arg(allow_hyphen_values = true)]
        version: String,
    },

    /// Create a new up/down migration pair
    Create {
        /// Migration name
        name: String,
    },
}

fn print_usage_and_exit() -> ! {
    println!("{}", Cli::command().render_help());
    process::exit(1);
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = e.print();
            process::exit(0);
        }
        Err(_) => print_usage_and_exit(),
    };

    let Some(command) = cli.command else {
        print_usage_and_exit();
    };

    let logging = if cli.verbose {
        LoggingConfig::verbose()
    } else {
        LoggingConfig::default()
    };
    if let Err(e) = logging::init_logging(&logging.with_json(cli.json_logs)) {
        eprintln!("failed to initialise logging: {}", e);
    }

    let result = match command {
        Commands::Up => migrate::up(&cli.path).await,
        Commands::Down => migrate::down(&cli.path).await,
        Commands::Status => migrate::status(&cli.path).await,
        Commands::Force { version } => migrate::force(&cli.path, &version).await,
        Commands::Create { name } => migrate::create(&cli.path, &name),
    };

    if let Err(e) = result {
        tracing::error!("{:#}", e);
        // Still reaches stderr when logging is off or failed to initialise
        eprintln!("{}", failure_message(&e));
        process::exit(1);
    }
}

fn failure_message(err: &anyhow::Error) -> String {
    format!("error: {:#}", err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_subcommands() {
        let cli = Cli::try_parse_from(["kanban-migrate", "status"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Status)));
        assert_eq!(cli.path, PathBuf::from("migrations"));

        let cli = Cli::try_parse_from(["kanban-migrate", "up", "--path", "db/migrations"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Up)));
        assert_eq!(cli.path, PathBuf::from("db/migrations"));
    }

    #[test]
    fn test_missing_subcommand_parses_to_none() {
        let cli = Cli::try_parse_from(["kanban-migrate"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_unknown_subcommand_is_error() {
        let err = Cli::try_parse_from(["kanban-migrate", "sideways"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
    }

    #[test]
    fn test_failure_message_includes_cause_chain() {
        let err = anyhow::anyhow!("Dirty database version 2. Fix and force version.")
            .context("failed to initialise migrations from migrations");
        let message = failure_message(&err);

        assert!(message.starts_with("error: failed to initialise migrations"));
        assert!(message.contains("Dirty database version 2"));
    }

    #[test]
    fn test_force_accepts_negative_one() {
        let cli = Cli::try_parse_from(["kanban-migrate", "force", "-1"]).unwrap();
        match cli.command {
            Some(Commands::Force { version }) => assert_eq!(version, "-1"),
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
