//! Command-line interface for mysql-backup
//!
//! # Usage Examples
//!
//! ```bash
//! # Full backup into the temporary directory
//! mysql-backup dump --host localhost --database acme --user root --password secret
//!
//! # Settings from a YAML file, folder overridden on the command line
//! mysql-backup dump --config backup.yaml --folder /var/backups
//!
//! # Which tables and views would be dumped
//! mysql-backup tables --database acme --tables '*,logs_*'
//! ```

use anyhow::Context;
use backup_core::snapshot::format_elapsed;
use backup_core::Selection;
use clap::{Parser, Subcommand};
use mysql_backup::job::{resolve_connection, resolve_filter};
use mysql_backup::{BackupArgs, BackupJob, BackupSetup, ConnectionArgs};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "mysql-backup")]
#[command(about = "Writes a consistent, replayable SQL backup of a MySQL database")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Dump the database to a SQL script
    #[command(alias = "backup")]
    Dump {
        #[command(flatten)]
        connection: ConnectionArgs,

        #[command(flatten)]
        backup: BackupArgs,
    },

    /// List the tables and views a filter selects
    Tables {
        #[command(flatten)]
        connection: ConnectionArgs,

        /// Table filter, same syntax as `dump --tables`
        #[arg(long)]
        tables: Option<String>,

        /// YAML setup file
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,
    },
}

fn load_setup(path: Option<&PathBuf>) -> anyhow::Result<BackupSetup> {
    match path {
        Some(path) => BackupSetup::from_file(path)
            .with_context(|| format!("Failed to load setup file {}", path.display())),
        None => Ok(BackupSetup::default()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    // Logs go to stderr so `dump --stdout` output stays a clean script
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Dump { connection, backup } => {
            let setup = load_setup(backup.config.as_ref())?;
            let job = BackupJob::resolve(&connection, &backup, setup)?;
            let report = job.run().await?;

            let summary = &report.summary;
            info!(
                "Backed up {} table(s), {} view(s), {} procedure(s), {} function(s), {} trigger(s), {} row(s) in {}",
                summary.tables,
                summary.views,
                summary.procedures,
                summary.functions,
                summary.triggers,
                summary.rows,
                format_elapsed(summary.elapsed)
            );
            if let Some(path) = report.path {
                println!("{}", path.display());
            }
        }
        Commands::Tables {
            connection,
            tables,
            config,
        } => {
            let setup = load_setup(config.as_ref())?;
            let opts = resolve_connection(&connection, &setup);
            let filter = resolve_filter(tables.as_deref(), &setup);

            let mut catalog = backup_mysql_source::connect(&opts)
                .await
                .context("Failed to open MySQL session")?;
            let selection = Selection::resolve(&mut catalog, &filter).await;
            catalog.disconnect().await?;
            let selection = selection?;

            for table in &selection.tables {
                println!("table\t{table}");
            }
            for view in &selection.views {
                println!("view\t{view}");
            }
        }
    }

    Ok(())
}
