//! One backup run: resolved settings plus the connect / snapshot / close
//! sequence around them.

use anyhow::Context;
use backup_core::{
    compress, BackupError, OutputSink, ShowFlags, Snapshot, SnapshotOptions, SnapshotSummary,
    TableFilter, DEFAULT_BATCH_SIZE, DEFAULT_PAGE_SIZE,
};
use backup_mysql_source::ConnectionOpts;
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::config::BackupSetup;
use crate::{BackupArgs, ConnectionArgs};

const FILE_EXTENSION: &str = "sql";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    /// `<folder>/<name>_<timestamp>.sql`
    File,
    Stdout,
}

#[derive(Debug, Clone)]
pub struct BackupJob {
    pub connection: ConnectionOpts,
    pub filter: TableFilter,
    pub show: ShowFlags,
    pub name: String,
    pub folder: PathBuf,
    pub page_size: u64,
    pub batch_size: usize,
    pub compress: bool,
    pub destination: Destination,
}

#[derive(Debug)]
pub struct BackupReport {
    /// Final file, `None` when written to stdout
    pub path: Option<PathBuf>,
    pub summary: SnapshotSummary,
}

/// Merge CLI connection flags over the setup file over the defaults.
pub fn resolve_connection(args: &ConnectionArgs, setup: &BackupSetup) -> ConnectionOpts {
    let defaults = ConnectionOpts::default();
    let file = &setup.connection;
    ConnectionOpts {
        host: args
            .host
            .clone()
            .or_else(|| file.host.clone())
            .unwrap_or(defaults.host),
        port: args.port.or(file.port).unwrap_or(defaults.port),
        database: args
            .database
            .clone()
            .or_else(|| file.database.clone())
            .unwrap_or(defaults.database),
        user: args
            .user
            .clone()
            .or_else(|| file.user.clone())
            .unwrap_or(defaults.user),
        password: args
            .password
            .clone()
            .or_else(|| file.password.clone())
            .unwrap_or(defaults.password),
    }
}

/// Table filter from `--tables`, else the setup file, else everything.
pub fn resolve_filter(tables: Option<&str>, setup: &BackupSetup) -> TableFilter {
    match (tables, &setup.tables) {
        (Some(list), _) => TableFilter::parse(list),
        (None, Some(list)) => TableFilter::from_entries(list.entries()),
        (None, None) => TableFilter::All,
    }
}

impl BackupJob {
    pub fn resolve(
        connection: &ConnectionArgs,
        args: &BackupArgs,
        setup: BackupSetup,
    ) -> Result<Self, BackupError> {
        let connection_opts = resolve_connection(connection, &setup);
        if connection_opts.database.is_empty() {
            return Err(BackupError::Config(
                "No database given (--database, MYSQL_DATABASE or connection.database)"
                    .to_string(),
            ));
        }

        let show = match (&args.show, &setup.show) {
            (Some(list), _) => ShowFlags::parse(list)?,
            (None, Some(list)) => ShowFlags::from_entries(list.entries())?,
            (None, None) => ShowFlags::all(),
        };

        let name = args
            .name
            .clone()
            .or(setup.name.clone())
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| connection_opts.database.clone());

        Ok(Self {
            filter: resolve_filter(args.tables.as_deref(), &setup),
            show,
            name,
            folder: args
                .folder
                .clone()
                .or(setup.folder)
                .unwrap_or_else(std::env::temp_dir),
            page_size: args
                .page_size
                .or(setup.page_size)
                .unwrap_or(DEFAULT_PAGE_SIZE),
            batch_size: args
                .batch_size
                .or(setup.batch_size)
                .unwrap_or(DEFAULT_BATCH_SIZE),
            compress: args.compress || setup.compress.unwrap_or(false),
            destination: if args.stdout {
                Destination::Stdout
            } else {
                Destination::File
            },
            connection: connection_opts,
        })
    }

    /// `<folder>/<name>_<YYYY-MM-DD_HH-MM-SS>.sql`
    pub fn output_path(&self, now: DateTime<Local>) -> PathBuf {
        self.folder.join(format!(
            "{}_{}.{FILE_EXTENSION}",
            self.name,
            now.format("%Y-%m-%d_%H-%M-%S")
        ))
    }

    fn snapshot_options(&self) -> SnapshotOptions {
        SnapshotOptions {
            filter: self.filter.clone(),
            show: self.show.clone(),
            page_size: self.page_size,
            batch_size: self.batch_size,
            origin_host: origin_host(),
        }
    }

    fn open_sink(&self) -> anyhow::Result<OutputSink> {
        match self.destination {
            Destination::Stdout => Ok(OutputSink::stdout()),
            Destination::File => {
                std::fs::create_dir_all(&self.folder).with_context(|| {
                    format!("Failed to create output folder {}", self.folder.display())
                })?;
                let path = self.output_path(Local::now());
                Ok(OutputSink::open(&path)?)
            }
        }
    }

    pub async fn run(&self) -> anyhow::Result<BackupReport> {
        let snapshot = Snapshot::new(self.snapshot_options())?;
        let mut catalog = backup_mysql_source::connect(&self.connection)
            .await
            .context("Failed to open MySQL session")?;

        let mut sink = match self.open_sink() {
            Ok(sink) => sink,
            Err(e) => {
                if let Err(e) = catalog.disconnect().await {
                    warn!("{e}");
                }
                return Err(e);
            }
        };
        if let Some(path) = sink.path() {
            info!("Writing backup of '{}' to {}", self.connection.database, path.display());
        }

        let outcome = snapshot.run(&mut catalog, &mut sink).await;
        let closed = sink.close();
        if let Err(e) = catalog.disconnect().await {
            warn!("{e}");
        }

        let summary = outcome.context("Backup failed")?;
        let path = closed.context("Failed to finish output")?;
        let path = match path {
            Some(path) if self.compress => Some(gzip(&path)?),
            other => other,
        };

        Ok(BackupReport { path, summary })
    }
}

fn gzip(path: &Path) -> anyhow::Result<PathBuf> {
    let packed = compress::gzip_file(path)
        .with_context(|| format!("Failed to compress {}", path.display()))?;
    info!("Compressed to {}", packed.display());
    Ok(packed)
}

fn origin_host() -> String {
    hostname::get()
        .ok()
        .and_then(|name| name.into_string().ok())
        .unwrap_or_else(|| "localhost".to_string())
}
