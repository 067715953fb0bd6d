//! Text rewrites applied to catalog DDL and the statement blocks built
//! from it.

use std::collections::HashMap;

use crate::catalog::{RoutineKind, TriggerDefinition};

/// Delimiter used around stored program bodies.
pub const ROUTINE_DELIMITER: &str = "$$";

const CREATE_TABLE: &str = "CREATE TABLE";
const FOREIGN_KEY: &str = "FOREIGN KEY";

/// Quote an identifier with backticks.
pub fn quote_ident(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// `CREATE TABLE x` -> `CREATE TABLE IF NOT EXISTS x`.
///
/// Statements that do not start with `CREATE TABLE` or already carry the
/// qualifier are returned unchanged.
pub fn add_if_not_exists(create: &str) -> String {
    match create.strip_prefix(CREATE_TABLE) {
        Some(rest) if !rest.trim_start().starts_with("IF NOT EXISTS") => {
            format!("{CREATE_TABLE} IF NOT EXISTS {}", rest.trim_start())
        }
        _ => create.to_string(),
    }
}

/// Remove every foreign key line from a `CREATE TABLE` statement.
///
/// Returns the rewritten statement and the removed constraints as
/// `ADD CONSTRAINT ...` fragments, in statement order. The last body line
/// before the closing `) ENGINE=...` line loses its trailing comma.
pub fn extract_foreign_keys(create: &str) -> (String, Vec<String>) {
    let mut body: Vec<&str> = Vec::new();
    let mut constraints = Vec::new();

    for line in create.lines() {
        if line.contains(FOREIGN_KEY) {
            constraints.push(format!("ADD {}", line.trim().trim_end_matches(',')));
        } else {
            body.push(line);
        }
    }

    if constraints.is_empty() {
        return (create.to_string(), constraints);
    }

    let mut lines: Vec<String> = body.into_iter().map(str::to_string).collect();
    if lines.len() >= 2 {
        let last_body = lines.len() - 2;
        let trimmed = lines[last_body].trim_end().trim_end_matches(',').to_string();
        lines[last_body] = trimmed;
    }
    (lines.join("\n"), constraints)
}

/// Foreign key fragments collected during one schema pass.
///
/// Keyed by owning table; fragments keep their statement order.
#[derive(Debug, Default)]
pub struct ForeignKeys {
    by_table: HashMap<String, Vec<String>>,
}

impl ForeignKeys {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, table: &str, fragments: Vec<String>) {
        if fragments.is_empty() {
            return;
        }
        self.by_table
            .entry(table.to_string())
            .or_default()
            .extend(fragments);
    }

    pub fn get(&self, table: &str) -> Option<&[String]> {
        self.by_table.get(table).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.by_table.is_empty()
    }

    /// The `ALTER TABLE` statement for `table`, if it owns any keys.
    pub fn alter_statement(&self, table: &str) -> Option<String> {
        let fragments = self.get(table)?;
        Some(format!(
            "ALTER TABLE {}\n {};\n\n",
            quote_ident(table),
            fragments.join(",\n ")
        ))
    }
}

/// Replace everything before the `VIEW` keyword with `CREATE OR REPLACE `.
///
/// Drops the `ALGORITHM`, `DEFINER` and `SQL SECURITY` clauses MySQL puts
/// in front of the keyword.
pub fn create_or_replace_view(create: &str) -> String {
    match create.find("VIEW") {
        Some(pos) => format!("CREATE OR REPLACE {}", &create[pos..]),
        None => create.to_string(),
    }
}

/// Drop-and-create block for a procedure or function.
pub fn routine_block(kind: RoutineKind, name: &str, create: &str) -> String {
    let d = ROUTINE_DELIMITER;
    [
        format!("DELIMITER {d}"),
        format!("DROP {kind} IF EXISTS {}{d}", quote_ident(name)),
        format!("{create}{d}"),
        "DELIMITER ;".to_string(),
    ]
    .join("\n")
        + "\n\n"
}

/// Drop-and-create block for a trigger.
pub fn trigger_block(trigger: &TriggerDefinition) -> String {
    let d = ROUTINE_DELIMITER;
    let name = quote_ident(&trigger.name);
    [
        format!("DELIMITER {d}"),
        format!("DROP TRIGGER IF EXISTS {name}{d}"),
        format!(
            "CREATE TRIGGER {name} {} {} ON {} FOR EACH ROW",
            trigger.timing,
            trigger.event,
            quote_ident(&trigger.table)
        ),
        format!("{}{d}", trigger.statement),
        "DELIMITER ;".to_string(),
    ]
    .join("\n")
        + "\n\n"
}
