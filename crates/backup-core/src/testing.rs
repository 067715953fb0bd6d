//! In-memory catalog and output capture for tests.
//!
//! `MemoryCatalog` answers catalog queries from fixtures and records the
//! lock and page calls made against it, so the engine can be exercised
//! without a MySQL server.

use std::collections::HashMap;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::catalog::{Catalog, CatalogObject, ObjectKind, RoutineKind, RowPage, TriggerDefinition};
use crate::error::{BackupError, Result};
use crate::value::SqlValue;

#[derive(Debug, Default)]
pub struct MemoryCatalog {
    database: String,
    objects: Vec<CatalogObject>,
    creates: HashMap<String, String>,
    routines: Vec<(RoutineKind, String, String)>,
    triggers: Vec<TriggerDefinition>,
    data: HashMap<String, (Vec<String>, Vec<Vec<SqlValue>>)>,
    locked: Option<Vec<String>>,
    lock_calls: usize,
    unlock_calls: usize,
    page_requests: Vec<(String, u64, u64)>,
    fail_lock: bool,
    fail_fetch: Option<String>,
}

impl MemoryCatalog {
    pub fn new(database: &str) -> Self {
        Self {
            database: database.to_string(),
            ..Default::default()
        }
    }

    pub fn with_table(mut self, name: &str, create: &str) -> Self {
        self.objects.push(CatalogObject::table(name));
        self.creates.insert(name.to_string(), create.to_string());
        self
    }

    pub fn with_view(mut self, name: &str, create: &str) -> Self {
        self.objects.push(CatalogObject::view(name));
        self.creates.insert(name.to_string(), create.to_string());
        self
    }

    pub fn with_rows(mut self, table: &str, columns: &[&str], rows: Vec<Vec<SqlValue>>) -> Self {
        let columns = columns.iter().map(|c| c.to_string()).collect();
        self.data.insert(table.to_string(), (columns, rows));
        self
    }

    pub fn with_routine(mut self, kind: RoutineKind, name: &str, create: &str) -> Self {
        self.routines
            .push((kind, name.to_string(), create.to_string()));
        self
    }

    pub fn with_trigger(mut self, trigger: TriggerDefinition) -> Self {
        self.triggers.push(trigger);
        self
    }

    /// Make `lock_tables` fail.
    pub fn fail_lock(&mut self) {
        self.fail_lock = true;
    }

    /// Make `fetch_page` fail for `table`.
    pub fn fail_fetch(&mut self, table: &str) {
        self.fail_fetch = Some(table.to_string());
    }

    /// Objects currently locked, if any.
    pub fn locked(&self) -> Option<&[String]> {
        self.locked.as_deref()
    }

    pub fn lock_calls(&self) -> usize {
        self.lock_calls
    }

    pub fn unlock_calls(&self) -> usize {
        self.unlock_calls
    }

    /// Every `(table, offset, limit)` passed to `fetch_page`.
    pub fn page_requests(&self) -> &[(String, u64, u64)] {
        &self.page_requests
    }
}

#[async_trait]
impl Catalog for MemoryCatalog {
    fn database(&self) -> &str {
        &self.database
    }

    async fn list_objects(&mut self, kind: ObjectKind) -> Result<Vec<CatalogObject>> {
        Ok(self
            .objects
            .iter()
            .filter(|o| o.kind == kind)
            .cloned()
            .collect())
    }

    async fn show_create_table(&mut self, name: &str) -> Result<String> {
        self.creates.get(name).cloned().ok_or_else(|| {
            BackupError::catalog(
                format!("SHOW CREATE TABLE `{name}`"),
                format!("Table '{}.{name}' doesn't exist", self.database),
            )
        })
    }

    async fn list_routines(&mut self, kind: RoutineKind) -> Result<Vec<String>> {
        Ok(self
            .routines
            .iter()
            .filter(|(k, _, _)| *k == kind)
            .map(|(_, name, _)| name.clone())
            .collect())
    }

    async fn show_create_routine(&mut self, kind: RoutineKind, name: &str) -> Result<String> {
        self.routines
            .iter()
            .find(|(k, n, _)| *k == kind && n == name)
            .map(|(_, _, create)| create.clone())
            .ok_or_else(|| {
                BackupError::catalog(
                    format!("SHOW CREATE {kind} `{name}`"),
                    format!("{kind} {name} does not exist"),
                )
            })
    }

    async fn list_triggers(&mut self) -> Result<Vec<TriggerDefinition>> {
        Ok(self.triggers.clone())
    }

    async fn fetch_page(&mut self, table: &str, offset: u64, limit: u64) -> Result<RowPage> {
        self.page_requests.push((table.to_string(), offset, limit));
        if self.fail_fetch.as_deref() == Some(table) {
            return Err(BackupError::catalog(
                format!("SELECT * FROM `{table}`"),
                "Lost connection to MySQL server during query",
            ));
        }

        let Some((columns, rows)) = self.data.get(table) else {
            return Ok(RowPage::default());
        };
        let rows: Vec<Vec<SqlValue>> = rows
            .iter()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect();
        Ok(RowPage {
            columns: if rows.is_empty() { Vec::new() } else { columns.clone() },
            rows,
        })
    }

    async fn lock_tables(&mut self, names: &[String]) -> Result<()> {
        self.lock_calls += 1;
        if self.fail_lock {
            return Err(BackupError::catalog(
                "LOCK TABLES",
                "Access denied; you need the LOCK TABLES privilege",
            ));
        }
        self.locked = Some(names.to_vec());
        Ok(())
    }

    async fn unlock_tables(&mut self) -> Result<()> {
        self.unlock_calls += 1;
        self.locked = None;
        Ok(())
    }
}

/// A cloneable `Write` target whose contents can be read back.
///
/// Every `flush` records the number of bytes received so far.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    inner: Arc<Mutex<Vec<u8>>>,
    flushes: Arc<Mutex<Vec<usize>>>,
}

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        let bytes = self.inner.lock().map(|b| b.clone()).unwrap_or_default();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// Byte offsets at which the writer was flushed, in call order.
    pub fn flush_marks(&self) -> Vec<usize> {
        self.flushes.lock().map(|f| f.clone()).unwrap_or_default()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner
            .lock()
            .map_err(|_| io::Error::other("buffer lock poisoned"))?
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let len = self
            .inner
            .lock()
            .map_err(|_| io::Error::other("buffer lock poisoned"))?
            .len();
        self.flushes
            .lock()
            .map_err(|_| io::Error::other("buffer lock poisoned"))?
            .push(len);
        Ok(())
    }
}
