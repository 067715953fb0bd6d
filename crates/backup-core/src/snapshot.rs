//! The snapshot engine: turns a catalog into a replayable SQL script.
//!
//! Order of the script:
//!
//! ```text
//! header
//! DATABASE      CREATE DATABASE / USE
//! TABLES        all DROPs, then all CREATEs (foreign keys stripped), then ALTERs
//! VIEWS         CREATE OR REPLACE VIEW
//! PROGRAMS      procedures, then functions
//! TRIGGERS
//! DATA          all TRUNCATEs, then paginated INSERT batches per table
//! footer
//! ```
//!
//! Everything between the header and the footer runs inside one
//! [`ReadLock`] window.

use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::catalog::{Catalog, CatalogObject, ObjectKind, RoutineKind, RowPage};
use crate::ddl::{self, quote_ident, ForeignKeys};
use crate::error::{BackupError, Result};
use crate::filter::TableFilter;
use crate::lock::{self, ReadLock};
use crate::show::{Section, ShowFlags};
use crate::sink::OutputSink;

/// Rows fetched per `SELECT ... LIMIT`.
pub const DEFAULT_PAGE_SIZE: u64 = 10_000;
/// Rows per `INSERT` statement.
pub const DEFAULT_BATCH_SIZE: usize = 1_000;

const SEPARATOR_WIDTH: usize = 50;

#[derive(Debug, Clone)]
pub struct SnapshotOptions {
    pub filter: TableFilter,
    pub show: ShowFlags,
    pub page_size: u64,
    pub batch_size: usize,
    /// Host name written to the header comment.
    pub origin_host: String,
}

impl Default for SnapshotOptions {
    fn default() -> Self {
        Self {
            filter: TableFilter::All,
            show: ShowFlags::all(),
            page_size: DEFAULT_PAGE_SIZE,
            batch_size: DEFAULT_BATCH_SIZE,
            origin_host: "localhost".to_string(),
        }
    }
}

impl SnapshotOptions {
    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(BackupError::Config("page size must be at least 1".into()));
        }
        if self.batch_size == 0 {
            return Err(BackupError::Config("batch size must be at least 1".into()));
        }
        Ok(())
    }
}

/// Tables and views a run processes, in catalog order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub tables: Vec<String>,
    pub views: Vec<String>,
}

impl Selection {
    pub async fn resolve<C>(catalog: &mut C, filter: &TableFilter) -> Result<Self>
    where
        C: Catalog + ?Sized,
    {
        let tables = catalog.list_objects(ObjectKind::Table).await?;
        let views = catalog.list_objects(ObjectKind::View).await?;
        let names = |objects: Vec<CatalogObject>| -> Vec<String> {
            objects.into_iter().map(|o| o.name).collect()
        };

        let selection = Self {
            tables: filter.select(&names(tables)),
            views: filter.select(&names(views)),
        };
        info!(
            "Selected {} table(s) and {} view(s) with filter '{}'",
            selection.tables.len(),
            selection.views.len(),
            filter
        );
        Ok(selection)
    }

    /// Every selected table and view, tables first.
    pub fn objects(&self) -> Vec<String> {
        self.tables.iter().chain(&self.views).cloned().collect()
    }
}

/// Counters reported after a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapshotSummary {
    pub tables: usize,
    pub views: usize,
    pub foreign_keys: usize,
    pub procedures: usize,
    pub functions: usize,
    pub triggers: usize,
    pub rows: u64,
    pub elapsed: Duration,
}

pub struct Snapshot {
    options: SnapshotOptions,
}

impl Snapshot {
    pub fn new(options: SnapshotOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self { options })
    }

    pub fn options(&self) -> &SnapshotOptions {
        &self.options
    }

    /// Select objects, lock them, write the whole script, unlock.
    ///
    /// The lock is released exactly once whether or not writing succeeds.
    pub async fn run<C>(&self, catalog: &mut C, sink: &mut OutputSink) -> Result<SnapshotSummary>
    where
        C: Catalog + ?Sized,
    {
        let selection = Selection::resolve(catalog, &self.options.filter).await?;
        let lock = ReadLock::acquire(catalog, &selection.objects()).await?;
        let outcome = self.write_script(catalog, sink, &selection).await;
        let released = lock.release(catalog).await;
        let summary = lock::settle(outcome, released)?;

        info!(
            "Snapshot of '{}' finished in {:?}: {} table(s), {} view(s), {} row(s)",
            catalog.database(),
            summary.elapsed,
            summary.tables,
            summary.views,
            summary.rows
        );
        Ok(summary)
    }

    async fn write_script<C>(
        &self,
        catalog: &mut C,
        sink: &mut OutputSink,
        selection: &Selection,
    ) -> Result<SnapshotSummary>
    where
        C: Catalog + ?Sized,
    {
        let started = Instant::now();
        let show = &self.options.show;
        let mut summary = SnapshotSummary::default();

        self.write_header(catalog.database(), sink)?;

        if show.shows(Section::Database) {
            write_comment(sink, "DATABASE")?;
            write_create_database(catalog.database(), sink)?;
        }

        if show.shows(Section::Tables) {
            summary.foreign_keys = self.write_tables(catalog, sink, &selection.tables).await?;
            summary.tables = selection.tables.len();
        }

        if show.shows(Section::Views) {
            write_comment(sink, "VIEWS")?;
            for view in &selection.views {
                let create = catalog.show_create_table(view).await?;
                sink.append(&format!("{};\n\n", ddl::create_or_replace_view(&create)))?;
            }
            summary.views = selection.views.len();
        }

        if show.shows(Section::Programs) {
            write_comment(sink, "PROCEDURES")?;
            summary.procedures = write_routines(catalog, sink, RoutineKind::Procedure).await?;
            write_comment(sink, "FUNCTIONS")?;
            summary.functions = write_routines(catalog, sink, RoutineKind::Function).await?;
        }

        if show.shows(Section::Triggers) {
            write_comment(sink, "TRIGGERS")?;
            let triggers = catalog.list_triggers().await?;
            for trigger in &triggers {
                sink.append(&ddl::trigger_block(trigger))?;
            }
            summary.triggers = triggers.len();
        }

        if show.shows(Section::Data) {
            write_comment(sink, "TRUNCATE DATA")?;
            for table in &selection.tables {
                sink.append(&format!("TRUNCATE {};\n", quote_ident(table)))?;
            }
            sink.append("\n")?;

            write_comment(sink, "DUMP DATA")?;
            for table in &selection.tables {
                info!("Dumping rows of {}", table);
                let rows = self.dump_table(catalog, sink, table).await?;
                info!("Dumped {} row(s) from {}", rows, table);
                summary.rows += rows;
            }
        }

        summary.elapsed = started.elapsed();
        write_comment(sink, &format!("ELAPSED {}", format_elapsed(summary.elapsed)))?;
        sink.append("SET FOREIGN_KEY_CHECKS = TRUE;\n")?;
        sink.flush()?;
        Ok(summary)
    }

    fn write_header(&self, database: &str, sink: &mut OutputSink) -> Result<()> {
        let generated = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
        sink.append(&format!(
            "-- BACKUP {database}@{} {generated}\n\n\
             SET NAMES utf8;\n\
             SET SQL_MODE = 'NO_AUTO_VALUE_ON_ZERO';\n\
             SET FOREIGN_KEY_CHECKS = FALSE;\n\n",
            self.options.origin_host
        ))
    }

    /// Drops, creates and the foreign key pass. Returns the number of
    /// foreign keys moved into `ALTER TABLE` statements.
    async fn write_tables<C>(
        &self,
        catalog: &mut C,
        sink: &mut OutputSink,
        tables: &[String],
    ) -> Result<usize>
    where
        C: Catalog + ?Sized,
    {
        write_comment(sink, "DROP TABLES")?;
        for table in tables {
            sink.append(&format!("DROP TABLE IF EXISTS {};\n", quote_ident(table)))?;
        }
        sink.append("\n")?;

        write_comment(sink, "CREATE TABLES")?;
        let mut foreign_keys = ForeignKeys::new();
        let mut moved = 0;
        for table in tables {
            let create = catalog.show_create_table(table).await?;
            let (body, fragments) = ddl::extract_foreign_keys(&ddl::add_if_not_exists(&create));
            if !fragments.is_empty() {
                debug!("Deferred {} foreign key(s) of {}", fragments.len(), table);
            }
            moved += fragments.len();
            foreign_keys.record(table, fragments);
            sink.append(&format!("{body};\n\n"))?;
        }

        write_comment(sink, "FOREIGN KEYS")?;
        for table in tables {
            if let Some(alter) = foreign_keys.alter_statement(table) {
                sink.append(&alter)?;
            }
        }
        Ok(moved)
    }

    /// Page through `table` and write its rows. Returns the row count.
    async fn dump_table<C>(
        &self,
        catalog: &mut C,
        sink: &mut OutputSink,
        table: &str,
    ) -> Result<u64>
    where
        C: Catalog + ?Sized,
    {
        let limit = self.options.page_size;
        let mut total = 0;
        let mut offset = 0;
        loop {
            let page = catalog.fetch_page(table, offset, limit).await?;
            if page.is_empty() {
                return Ok(total);
            }
            debug!("Fetched {} row(s) of {} at offset {}", page.len(), table, offset);
            total += self.write_page(sink, table, &page)?;
            offset += limit;
        }
    }

    /// Write one page as `INSERT` batches, flushing after each batch.
    fn write_page(&self, sink: &mut OutputSink, table: &str, page: &RowPage) -> Result<u64> {
        sink.flush()?;
        let columns = page
            .columns
            .iter()
            .map(|c| quote_ident(c))
            .collect::<Vec<_>>()
            .join(",");

        for batch in page.rows.chunks(self.options.batch_size) {
            let mut text = format!("INSERT INTO {}({columns}) VALUES\n", quote_ident(table));
            for (i, row) in batch.iter().enumerate() {
                if i > 0 {
                    text.push_str(",\n");
                }
                text.push_str(" (");
                for (j, value) in row.iter().enumerate() {
                    if j > 0 {
                        text.push(',');
                    }
                    value.write_literal(&mut text);
                }
                text.push(')');
            }
            text.push_str(";\n\n");
            sink.append(&text)?;
            sink.flush()?;
        }
        Ok(page.len() as u64)
    }
}

async fn write_routines<C>(
    catalog: &mut C,
    sink: &mut OutputSink,
    kind: RoutineKind,
) -> Result<usize>
where
    C: Catalog + ?Sized,
{
    let names = catalog.list_routines(kind).await?;
    for name in &names {
        let create = catalog.show_create_routine(kind, name).await?;
        sink.append(&ddl::routine_block(kind, name, &create))?;
    }
    Ok(names.len())
}

fn write_create_database(database: &str, sink: &mut OutputSink) -> Result<()> {
    let database = quote_ident(database);
    sink.append(&format!(
        "CREATE DATABASE IF NOT EXISTS {database}\n\
         \tCHARACTER SET utf8\n\
         \tCOLLATE utf8_general_ci;\n\n\
         USE {database};\n\n"
    ))
}

fn write_comment(sink: &mut OutputSink, text: &str) -> Result<()> {
    sink.append(&section_comment(text))
}

/// `-- TEXT ------...` padded with dashes to a fixed width of characters.
pub fn section_comment(text: &str) -> String {
    let comment = format!("-- {text} ");
    let dashes = SEPARATOR_WIDTH.saturating_sub(comment.chars().count());
    format!("{comment}{}\n\n", "-".repeat(dashes))
}

/// `HH:MM:SS.mmm`
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!(
        "{:02}:{:02}:{:02}.{:03}",
        secs / 3600,
        (secs % 3600) / 60,
        secs % 60,
        elapsed.subsec_millis()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemoryCatalog, SharedBuffer};
    use crate::value::SqlValue;

    fn rows(count: usize) -> Vec<Vec<SqlValue>> {
        (0..count)
            .map(|i| vec![SqlValue::Text(i.to_string()), SqlValue::Null])
            .collect()
    }

    async fn render(catalog: &mut MemoryCatalog, options: SnapshotOptions) -> String {
        let out = SharedBuffer::new();
        let mut sink = OutputSink::passthrough(out.clone());
        Snapshot::new(options)
            .unwrap()
            .run(catalog, &mut sink)
            .await
            .unwrap();
        out.contents()
    }

    #[test]
    fn test_section_comment_width() {
        let comment = section_comment("VIEWS");
        assert_eq!(comment.trim_end().chars().count(), SEPARATOR_WIDTH);
        assert!(comment.starts_with("-- VIEWS ---"));
        assert!(comment.ends_with("-\n\n"));
    }

    #[test]
    fn test_section_comment_counts_characters() {
        let comment = section_comment("AÑO ÇÃO");
        assert_eq!(comment.trim_end().chars().count(), SEPARATOR_WIDTH);
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::from_millis(3_723_042)), "01:02:03.042");
        assert_eq!(format_elapsed(Duration::ZERO), "00:00:00.000");
    }

    #[test]
    fn test_zero_batch_size_is_rejected() {
        let options = SnapshotOptions {
            batch_size: 0,
            ..Default::default()
        };
        assert!(matches!(Snapshot::new(options), Err(BackupError::Config(_))));
    }

    #[tokio::test]
    async fn test_batches_split_at_batch_size() {
        let mut catalog = MemoryCatalog::new("shop")
            .with_table("items", "CREATE TABLE `items` (\n  `id` int\n) ENGINE=InnoDB")
            .with_rows("items", &["id", "note"], rows(2500));
        let options = SnapshotOptions {
            show: ShowFlags::from_sections([Section::Data]),
            ..Default::default()
        };

        let script = render(&mut catalog, options).await;
        let inserts: Vec<&str> = script
            .split("INSERT INTO `items`(`id`,`note`) VALUES\n")
            .skip(1)
            .collect();

        assert_eq!(inserts.len(), 3);
        let counts: Vec<usize> = inserts
            .iter()
            .map(|batch| batch.split(";\n\n").next().unwrap().lines().count())
            .collect();
        assert_eq!(counts, vec![1000, 1000, 500]);
        assert!(script.contains(" ('0',NULL),\n ('1',NULL)"));
        assert!(script.contains(" ('2499',NULL);\n\n"));
    }

    #[tokio::test]
    async fn test_pages_until_empty_page() {
        let mut catalog = MemoryCatalog::new("shop")
            .with_table("items", "CREATE TABLE `items` (\n  `id` int\n) ENGINE=InnoDB")
            .with_rows("items", &["id", "note"], rows(25));
        let options = SnapshotOptions {
            show: ShowFlags::from_sections([Section::Data]),
            page_size: 10,
            batch_size: 4,
            ..Default::default()
        };

        let script = render(&mut catalog, options).await;

        assert_eq!(
            catalog.page_requests(),
            &[
                ("items".to_string(), 0, 10),
                ("items".to_string(), 10, 10),
                ("items".to_string(), 20, 10),
                ("items".to_string(), 30, 10),
            ]
        );
        // Pages of 10, 10 and 5 rows, each split into batches of at most 4.
        assert_eq!(script.matches("INSERT INTO").count(), 3 + 3 + 2);
        assert_eq!(script.matches(" ('").count(), 25);
    }

    #[tokio::test]
    async fn test_buffered_sink_is_flushed_at_every_batch() {
        let mut catalog = MemoryCatalog::new("shop")
            .with_table("items", "CREATE TABLE `items` (\n  `id` int\n) ENGINE=InnoDB")
            .with_rows("items", &["id", "note"], rows(50));
        let options = SnapshotOptions {
            show: ShowFlags::from_sections([Section::Data]),
            page_size: 20,
            batch_size: 5,
            ..Default::default()
        };
        let out = SharedBuffer::new();
        let mut sink = OutputSink::buffered(out.clone());

        Snapshot::new(options)
            .unwrap()
            .run(&mut catalog, &mut sink)
            .await
            .unwrap();

        let script = out.contents();
        let marks = out.flush_marks();
        let starts: Vec<usize> = script.match_indices("INSERT INTO").map(|(i, _)| i).collect();
        assert_eq!(starts.len(), 10);
        for start in starts {
            let end = start + script[start..].find(";\n\n").unwrap() + 3;
            assert!(marks.contains(&start), "no flush before batch at {start}");
            assert!(marks.contains(&end), "no flush after batch ending at {end}");
        }
    }

    #[tokio::test]
    async fn test_empty_table_has_no_insert() {
        let mut catalog = MemoryCatalog::new("shop")
            .with_table("empty", "CREATE TABLE `empty` (\n  `id` int\n) ENGINE=InnoDB");
        let script = render(&mut catalog, SnapshotOptions::default()).await;

        assert!(script.contains("TRUNCATE `empty`;\n"));
        assert!(!script.contains("INSERT INTO"));
    }

    #[tokio::test]
    async fn test_drops_precede_creates_and_keys_follow() {
        let mut catalog = MemoryCatalog::new("shop")
            .with_table(
                "orders",
                "CREATE TABLE `orders` (\n  `id` int,\n  `user_id` int,\n  PRIMARY KEY (`id`),\n  CONSTRAINT `fk_user` FOREIGN KEY (`user_id`) REFERENCES `users` (`id`)\n) ENGINE=InnoDB",
            )
            .with_table(
                "users",
                "CREATE TABLE `users` (\n  `id` int,\n  PRIMARY KEY (`id`)\n) ENGINE=InnoDB",
            );
        let options = SnapshotOptions {
            show: ShowFlags::from_sections([Section::Tables]),
            ..Default::default()
        };

        let script = render(&mut catalog, options).await;
        let last_drop = script.rfind("DROP TABLE IF EXISTS").unwrap();
        let first_create = script.find("CREATE TABLE IF NOT EXISTS").unwrap();
        let last_create = script.rfind("CREATE TABLE IF NOT EXISTS").unwrap();
        let alter = script.find("ALTER TABLE `orders`").unwrap();

        assert!(last_drop < first_create);
        assert!(last_create < alter);
        assert!(script.contains("  PRIMARY KEY (`id`)\n) ENGINE=InnoDB;\n\n"));
        assert!(script.contains(
            "ALTER TABLE `orders`\n ADD CONSTRAINT `fk_user` FOREIGN KEY (`user_id`) REFERENCES `users` (`id`);\n\n"
        ));
        assert!(!script.contains("ALTER TABLE `users`"));
        assert!(!script.contains("TRUNCATE"));
    }

    #[tokio::test]
    async fn test_header_and_footer() {
        let mut catalog = MemoryCatalog::new("shop");
        let options = SnapshotOptions {
            origin_host: "db01".to_string(),
            ..Default::default()
        };
        let script = render(&mut catalog, options).await;

        assert!(script.starts_with("-- BACKUP shop@db01 "));
        assert!(script.contains(
            "SET NAMES utf8;\nSET SQL_MODE = 'NO_AUTO_VALUE_ON_ZERO';\nSET FOREIGN_KEY_CHECKS = FALSE;\n"
        ));
        assert!(script.contains("CREATE DATABASE IF NOT EXISTS `shop`"));
        assert!(script.contains("USE `shop`;"));
        assert!(script.contains("-- ELAPSED 00:00:"));
        assert!(script.ends_with("SET FOREIGN_KEY_CHECKS = TRUE;\n"));
    }
}
