//! mysql-backup
//!
//! Writes a consistent, replayable SQL script of one MySQL database:
//! database header, table DDL with foreign keys applied last, views,
//! stored programs, triggers and paginated row data.
//!
//! # Crates
//!
//! - `backup_core` - the snapshot engine, table filter and output sink
//! - `backup_mysql_source` - the `mysql_async` catalog adapter
//!
//! # CLI Usage
//!
//! ```bash
//! # Everything in `acme`, written to $TMPDIR/acme_<timestamp>.sql
//! mysql-backup dump --database acme --user root --password secret
//!
//! # Only wp_* tables, schema and data, gzipped into ../backups
//! mysql-backup dump --database acme --tables 'wp_*' --show tables,data \
//!   --folder ../backups --compress
//!
//! # Everything except logs_* tables, straight to stdout
//! mysql-backup dump --database acme --tables '*,logs_*' --stdout
//!
//! # Preview which tables and views a filter selects
//! mysql-backup tables --database acme --tables 'wp_*'
//! ```

use clap::Parser;
use std::path::PathBuf;

pub mod config;
pub mod job;

pub use config::{BackupSetup, ConfigError};
pub use job::{BackupJob, BackupReport, Destination};

/// MySQL connection flags; unset flags fall back to the setup file
#[derive(Parser, Clone, Debug, Default)]
pub struct ConnectionArgs {
    /// MySQL host
    #[arg(long, env = "MYSQL_HOST")]
    pub host: Option<String>,

    /// MySQL port
    #[arg(long, env = "MYSQL_PORT")]
    pub port: Option<u16>,

    /// Database to back up
    #[arg(long, env = "MYSQL_DATABASE")]
    pub database: Option<String>,

    /// MySQL user
    #[arg(long, env = "MYSQL_USER")]
    pub user: Option<String>,

    /// MySQL password
    #[arg(long, env = "MYSQL_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

#[derive(Parser, Clone, Debug, Default)]
pub struct BackupArgs {
    /// Tables to include, comma separated; `prefix*` matches a prefix and a
    /// leading `*` turns the rest of the list into exclusions
    #[arg(long)]
    pub tables: Option<String>,

    /// Sections to emit: DATABASE, TABLES, VIEWS, PROGRAMS, TRIGGERS, DATA
    #[arg(long)]
    pub show: Option<String>,

    /// Output file name prefix (default: the database name)
    #[arg(long)]
    pub name: Option<String>,

    /// Output folder (default: the temporary directory)
    #[arg(long, value_name = "DIR")]
    pub folder: Option<PathBuf>,

    /// Rows fetched per SELECT
    #[arg(long)]
    pub page_size: Option<u64>,

    /// Rows per INSERT statement
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Gzip the finished script
    #[arg(long)]
    pub compress: bool,

    /// Write the script to stdout instead of a file
    #[arg(long, conflicts_with = "compress")]
    pub stdout: bool,

    /// YAML setup file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}
