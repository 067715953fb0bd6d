//! The database boundary used by the snapshot engine.
//!
//! [`Catalog`] is implemented by the MySQL adapter and by the in-memory
//! [`crate::testing::MemoryCatalog`]. Every query shape decodes into a
//! typed record here instead of a generic row.

use async_trait::async_trait;
use std::fmt;

use crate::error::Result;
use crate::value::SqlValue;

/// Kind of a named relation in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Table,
    View,
}

impl ObjectKind {
    /// The fragment matched against `TABLE_TYPE` in `SHOW FULL TABLES`.
    pub fn table_type_pattern(&self) -> &'static str {
        match self {
            ObjectKind::Table => "TABLE",
            ObjectKind::View => "VIEW",
        }
    }
}

/// A table or view as listed by the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogObject {
    pub name: String,
    pub kind: ObjectKind,
}

impl CatalogObject {
    pub fn table(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ObjectKind::Table,
        }
    }

    pub fn view(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ObjectKind::View,
        }
    }
}

/// Stored program kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoutineKind {
    Procedure,
    Function,
}

impl RoutineKind {
    pub fn keyword(&self) -> &'static str {
        match self {
            RoutineKind::Procedure => "PROCEDURE",
            RoutineKind::Function => "FUNCTION",
        }
    }
}

impl fmt::Display for RoutineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// One row of `SHOW TRIGGERS`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerDefinition {
    pub name: String,
    /// `BEFORE` or `AFTER`.
    pub timing: String,
    /// `INSERT`, `UPDATE` or `DELETE`.
    pub event: String,
    pub table: String,
    /// Trigger body, usually a `BEGIN ... END` block.
    pub statement: String,
}

/// One `LIMIT offset, count` window of a table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowPage {
    /// Column names in select order.
    pub columns: Vec<String>,
    pub rows: Vec<Vec<SqlValue>>,
}

impl RowPage {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

/// Read access to one database plus the table lock used for consistency.
///
/// Calls are issued strictly one after another on a single session.
#[async_trait]
pub trait Catalog: Send {
    /// Name of the database being dumped.
    fn database(&self) -> &str;

    /// Tables or views of the database, in catalog order.
    async fn list_objects(&mut self, kind: ObjectKind) -> Result<Vec<CatalogObject>>;

    /// The `SHOW CREATE TABLE` text for a table or view.
    async fn show_create_table(&mut self, name: &str) -> Result<String>;

    /// Names of the stored programs of `kind` owned by the database.
    async fn list_routines(&mut self, kind: RoutineKind) -> Result<Vec<String>>;

    /// The `SHOW CREATE PROCEDURE|FUNCTION` text.
    async fn show_create_routine(&mut self, kind: RoutineKind, name: &str) -> Result<String>;

    async fn list_triggers(&mut self) -> Result<Vec<TriggerDefinition>>;

    /// Rows `offset..offset + limit` of `table`.
    async fn fetch_page(&mut self, table: &str, offset: u64, limit: u64) -> Result<RowPage>;

    /// Take a read lock on every named object. Never called with an empty list.
    async fn lock_tables(&mut self, names: &[String]) -> Result<()>;

    /// Release every table lock held by the session.
    async fn unlock_tables(&mut self) -> Result<()>;
}
