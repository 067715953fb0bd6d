//! Snapshot generation engine for mysql-backup.
//!
//! This crate turns a database catalog into a replayable SQL script. It
//! knows nothing about MySQL connections: the database is reached through
//! the [`Catalog`] trait, implemented by the `mysql-source` crate for a
//! live server and by [`testing::MemoryCatalog`] for tests.
//!
//! # Structure
//!
//! - `filter`: table/view selection with prefix patterns and exclusion mode
//! - `lock`: the `LOCK TABLES ... READ` window around the dump
//! - `ddl`: `CREATE TABLE` rewrites, foreign key extraction, routine blocks
//! - `value`: SQL literal rendering of row values
//! - `sink`: buffered file or passthrough output
//! - `snapshot`: the engine that orders all of the above into a script
//! - `compress`: gzip packaging of a finished file
//!
//! # Example
//!
//! ```rust,ignore
//! use backup_core::{OutputSink, Snapshot, SnapshotOptions, TableFilter};
//!
//! let options = SnapshotOptions {
//!     filter: TableFilter::parse("wp_*"),
//!     ..Default::default()
//! };
//! let mut sink = OutputSink::open("/tmp/acme.sql")?;
//! let summary = Snapshot::new(options)?.run(&mut catalog, &mut sink).await?;
//! sink.close()?;
//! ```

pub mod catalog;
pub mod compress;
pub mod ddl;
pub mod error;
pub mod filter;
pub mod lock;
pub mod show;
pub mod sink;
pub mod snapshot;
pub mod testing;
pub mod value;

pub use catalog::{Catalog, CatalogObject, ObjectKind, RoutineKind, RowPage, TriggerDefinition};
pub use error::{BackupError, Result};
pub use filter::{NamePattern, TableFilter};
pub use show::{Section, ShowFlags};
pub use sink::OutputSink;
pub use snapshot::{
    Selection, Snapshot, SnapshotOptions, SnapshotSummary, DEFAULT_BATCH_SIZE, DEFAULT_PAGE_SIZE,
};
pub use value::SqlValue;
