//! `Catalog` implementation backed by one MySQL session.

use async_trait::async_trait;
use backup_core::ddl::quote_ident;
use backup_core::{
    BackupError, Catalog, CatalogObject, ObjectKind, Result, RoutineKind, RowPage, SqlValue,
    TriggerDefinition,
};
use mysql_async::prelude::*;
use mysql_async::{Conn, Row, Value};
use tracing::debug;

#[derive(Debug)]
pub struct MySqlCatalog {
    conn: Conn,
    database: String,
}

impl MySqlCatalog {
    pub(crate) fn new(conn: Conn, database: String) -> Self {
        Self { conn, database }
    }

    /// Close the session.
    pub async fn disconnect(self) -> Result<()> {
        self.conn
            .disconnect()
            .await
            .map_err(|e| BackupError::Connection(format!("Failed to disconnect: {e}")))
    }

    async fn query_rows(&mut self, sql: &str) -> Result<Vec<Row>> {
        debug!("Executing: {}", sql);
        self.conn
            .query(sql)
            .await
            .map_err(|e| BackupError::catalog(sql, e))
    }
}

/// Read a named string column, failing with the statement as context.
fn text_column(row: &Row, column: &str, sql: &str) -> Result<String> {
    match row.get_opt::<Option<String>, _>(column) {
        Some(Ok(Some(value))) => Ok(value),
        Some(Ok(None)) => Err(BackupError::catalog(
            sql,
            format!("column '{column}' is NULL (missing privileges?)"),
        )),
        Some(Err(e)) => Err(BackupError::catalog(
            sql,
            format!("column '{column}': {e}"),
        )),
        None => Err(BackupError::catalog(sql, format!("missing column '{column}'"))),
    }
}

fn trigger_from_row(row: &Row, sql: &str) -> Result<TriggerDefinition> {
    Ok(TriggerDefinition {
        name: text_column(row, "Trigger", sql)?,
        timing: text_column(row, "Timing", sql)?,
        event: text_column(row, "Event", sql)?,
        table: text_column(row, "Table", sql)?,
        statement: text_column(row, "Statement", sql)?,
    })
}

/// Render a driver value as a cell.
///
/// The text protocol returns everything as bytes; the typed variants only
/// show up for binary protocol results and are formatted the way MySQL
/// prints them.
pub(crate) fn cell_from_value(value: &Value) -> SqlValue {
    match value {
        Value::NULL => SqlValue::Null,
        Value::Bytes(bytes) => SqlValue::from_bytes(bytes.clone()),
        Value::Int(i) => SqlValue::Text(i.to_string()),
        Value::UInt(u) => SqlValue::Text(u.to_string()),
        Value::Float(f) => SqlValue::Text(f.to_string()),
        Value::Double(d) => SqlValue::Text(d.to_string()),
        Value::Date(year, month, day, hour, minute, second, micros) => {
            let mut text = format!("{year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02}");
            if *micros > 0 {
                text.push_str(&format!(".{micros:06}"));
            }
            SqlValue::Text(text)
        }
        Value::Time(negative, days, hours, minutes, seconds, micros) => {
            let sign = if *negative { "-" } else { "" };
            let hours = *days * 24 + u32::from(*hours);
            let mut text = format!("{sign}{hours:02}:{minutes:02}:{seconds:02}");
            if *micros > 0 {
                text.push_str(&format!(".{micros:06}"));
            }
            SqlValue::Text(text)
        }
    }
}

#[async_trait]
impl Catalog for MySqlCatalog {
    fn database(&self) -> &str {
        &self.database
    }

    async fn list_objects(&mut self, kind: ObjectKind) -> Result<Vec<CatalogObject>> {
        let sql = format!(
            "SHOW FULL TABLES IN {} WHERE TABLE_TYPE LIKE '%{}%'",
            quote_ident(&self.database),
            kind.table_type_pattern()
        );
        let rows = self.query_rows(&sql).await?;
        rows.iter()
            .map(|row| match row.get_opt::<String, _>(0) {
                Some(Ok(name)) => Ok(CatalogObject { name, kind }),
                _ => Err(BackupError::catalog(&sql, "unreadable object name")),
            })
            .collect()
    }

    async fn show_create_table(&mut self, name: &str) -> Result<String> {
        let sql = format!("SHOW CREATE TABLE {}", quote_ident(name));
        let rows = self.query_rows(&sql).await?;
        // Table|View, Create Table|Create View, ...
        rows.first()
            .and_then(|row| row.get_opt::<String, _>(1))
            .and_then(|value| value.ok())
            .ok_or_else(|| BackupError::catalog(&sql, "no CREATE statement returned"))
    }

    async fn list_routines(&mut self, kind: RoutineKind) -> Result<Vec<String>> {
        let sql = "SELECT ROUTINE_NAME
            FROM information_schema.ROUTINES
            WHERE ROUTINE_SCHEMA = ? AND ROUTINE_TYPE = ?
            ORDER BY ROUTINE_NAME";
        let names: Vec<String> = self
            .conn
            .exec(sql, (self.database.as_str(), kind.keyword()))
            .await
            .map_err(|e| BackupError::catalog(sql, e))?;
        debug!("Found {} {}(s)", names.len(), kind);
        Ok(names)
    }

    async fn show_create_routine(&mut self, kind: RoutineKind, name: &str) -> Result<String> {
        let sql = format!(
            "SHOW CREATE {kind} {}.{}",
            quote_ident(&self.database),
            quote_ident(name)
        );
        let rows = self.query_rows(&sql).await?;
        let row = rows
            .first()
            .ok_or_else(|| BackupError::catalog(&sql, "no CREATE statement returned"))?;
        // Column is "Create Procedure" or "Create Function".
        let column = match kind {
            RoutineKind::Procedure => "Create Procedure",
            RoutineKind::Function => "Create Function",
        };
        text_column(row, column, &sql)
    }

    async fn list_triggers(&mut self) -> Result<Vec<TriggerDefinition>> {
        let sql = format!("SHOW TRIGGERS FROM {}", quote_ident(&self.database));
        let rows = self.query_rows(&sql).await?;
        rows.iter().map(|row| trigger_from_row(row, &sql)).collect()
    }

    async fn fetch_page(&mut self, table: &str, offset: u64, limit: u64) -> Result<RowPage> {
        let sql = format!("SELECT * FROM {} LIMIT {offset}, {limit}", quote_ident(table));
        let rows = self.query_rows(&sql).await?;

        let Some(first) = rows.first() else {
            return Ok(RowPage::default());
        };
        let columns = first
            .columns_ref()
            .iter()
            .map(|c| c.name_str().into_owned())
            .collect();
        let rows = rows
            .iter()
            .map(|row| {
                (0..row.len())
                    .map(|i| row.as_ref(i).map(cell_from_value).unwrap_or(SqlValue::Null))
                    .collect()
            })
            .collect();
        Ok(RowPage { columns, rows })
    }

    async fn lock_tables(&mut self, names: &[String]) -> Result<()> {
        let targets = names
            .iter()
            .map(|name| format!("{} READ", quote_ident(name)))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("LOCK TABLES {targets}");
        debug!("Executing: {}", sql);
        self.conn
            .query_drop(sql.as_str())
            .await
            .map_err(|e| BackupError::catalog(&sql, e))
    }

    async fn unlock_tables(&mut self) -> Result<()> {
        let sql = "UNLOCK TABLES";
        self.conn
            .query_drop(sql)
            .await
            .map_err(|e| BackupError::catalog(sql, e))
    }
}
