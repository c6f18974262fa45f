//! Table identifier extraction from ALTER TABLE statements.

use crate::error::{Result, SchemaGuardError};
use derive_more::Display;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

const ALTER_TABLE: &str = "ALTER TABLE";

/// Matches `` `db`.`table` ``, `db.table`, `` `table` `` and `table`, including
/// mixed quoting such as `` `db`.table ``.
static TABLE_IDENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:`([^`]+)`|([^\s`.,;(]+))(?:\.(?:`([^`]+)`|([^\s`.,;(]+)))?")
        .expect("Invalid table identifier regex pattern")
});

/// A table name as written in the statement. The schema qualifier is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableName {
    pub database: Option<String>,
    pub table: String,
}

/// A table name whose schema has been resolved against the connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Display)]
#[display("{}.{}", database, table)]
pub struct QualifiedTable {
    pub database: String,
    pub table: String,
}

impl TableName {
    pub fn new(database: Option<&str>, table: &str) -> Self {
        Self {
            database: database.map(str::to_string),
            table: table.to_string(),
        }
    }

    /// Parse `db.table` or `table`, ignoring backticks.
    pub fn parse(name: &str) -> Result<Self> {
        let cleaned = name.trim().replace('`', "");
        let (database, table) = match cleaned.split_once('.') {
            Some((db, table)) => (Some(db), table),
            None => (None, cleaned.as_str()),
        };

        if table.is_empty() || database.is_some_and(str::is_empty) {
            return Err(SchemaGuardError::parse_error(format!(
                "invalid table name '{}'",
                name
            )));
        }

        Ok(Self::new(database, table))
    }

    /// Fill in the schema qualifier, calling `current_database` only when the
    /// statement did not name one.
    pub fn resolve<F>(&self, current_database: F) -> Result<QualifiedTable>
    where
        F: FnOnce() -> Result<Option<String>>,
    {
        let database = match &self.database {
            Some(db) => db.clone(),
            None => current_database()?.ok_or_else(|| {
                SchemaGuardError::metadata_error(format!(
                    "no database selected and table '{}' is not qualified",
                    self.table
                ))
            })?,
        };

        Ok(QualifiedTable {
            database,
            table: self.table.clone(),
        })
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.database {
            Some(db) => write!(f, "{}.{}", db, self.table),
            None => f.write_str(&self.table),
        }
    }
}

/// Extract the table name from an ALTER TABLE statement.
pub fn extract_table_name(ddl: &str) -> Result<TableName> {
    let ddl = ddl.trim();

    let rest = strip_alter_table(ddl).ok_or_else(|| {
        SchemaGuardError::parse_error("statement is not an ALTER TABLE statement")
    })?;

    if let Some(caps) = TABLE_IDENT.captures(rest) {
        let first = caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str());
        let second = caps.get(3).or_else(|| caps.get(4)).map(|m| m.as_str());

        match (first, second) {
            (Some(db), Some(table)) => return Ok(TableName::new(Some(db), table)),
            (Some(table), None) => return Ok(TableName::new(None, table)),
            _ => {}
        }
    }

    // Fallback: first whitespace-delimited token
    rest.split_whitespace()
        .next()
        .map(TableName::parse)
        .transpose()?
        .ok_or_else(|| {
            SchemaGuardError::parse_error("could not extract table name from DDL statement")
        })
}

/// Return the text following the leading `ALTER TABLE`, if present.
/// Only the prefix is checked, so `ALTER TABLEx` counts.
pub(crate) fn strip_alter_table(ddl: &str) -> Option<&str> {
    let head = ddl.get(..ALTER_TABLE.len())?;
    if !head.eq_ignore_ascii_case(ALTER_TABLE) {
        return None;
    }

    Some(ddl[ALTER_TABLE.len()..].trim_start())
}
