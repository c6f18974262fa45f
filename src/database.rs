//! Database access used by the validator and executor.
//!
//! Everything the core needs from the server goes through the [`Database`]
//! trait, so validation and execution can run against a substitute
//! connection in tests. [`MySqlDatabase`] is the production implementation.

use crate::dsn::Dsn;
use crate::error::{Result, SchemaGuardError};
use crate::parser::QualifiedTable;
use log::debug;
use mysql::prelude::Queryable;
use mysql::Conn;

/// `DATA_LENGTH` and `INDEX_LENGTH` of a table, in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableFootprint {
    pub data_length: u64,
    pub index_length: u64,
}

impl TableFootprint {
    pub fn total_bytes(&self) -> u64 {
        self.data_length.saturating_add(self.index_length)
    }
}

pub trait Database {
    /// `SELECT VERSION()`
    fn version(&mut self) -> Result<String>;

    /// `SELECT @@<name>`; `None` when the value is NULL.
    fn system_variable(&mut self, name: &str) -> Result<Option<String>>;

    /// `SHOW VARIABLES LIKE '<name>'`; `None` when the variable does not exist.
    fn show_variable(&mut self, name: &str) -> Result<Option<String>>;

    /// `SELECT DATABASE()`
    fn current_database(&mut self) -> Result<Option<String>>;

    /// Storage engine from `information_schema.TABLES`; `None` if the table does not exist.
    fn storage_engine(&mut self, table: &QualifiedTable) -> Result<Option<String>>;

    /// Row estimate from `information_schema.TABLES`.
    fn table_rows(&mut self, table: &QualifiedTable) -> Result<u64>;

    fn table_footprint(&mut self, table: &QualifiedTable) -> Result<TableFootprint>;

    /// Sum of `DATA_LENGTH + INDEX_LENGTH` over every table in the schema.
    fn schema_footprint(&mut self, database: &str) -> Result<u64>;

    fn has_primary_key(&mut self, table: &QualifiedTable) -> Result<bool>;

    /// True when a UNIQUE constraint exists whose every column is NOT NULL.
    fn has_unique_not_null_key(&mut self, table: &QualifiedTable) -> Result<bool>;

    fn has_foreign_keys(&mut self, table: &QualifiedTable) -> Result<bool>;

    fn has_triggers(&mut self, table: &QualifiedTable) -> Result<bool>;

    /// Run a DDL statement.
    fn execute(&mut self, sql: &str) -> Result<()>;
}

const SQL_STORAGE_ENGINE: &str = "
    SELECT ENGINE
    FROM information_schema.TABLES
    WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?";

const SQL_TABLE_ROWS: &str = "
    SELECT TABLE_ROWS
    FROM information_schema.TABLES
    WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?";

const SQL_TABLE_FOOTPRINT: &str = "
    SELECT DATA_LENGTH, INDEX_LENGTH
    FROM information_schema.TABLES
    WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?";

const SQL_SCHEMA_FOOTPRINT: &str = "
    SELECT CAST(COALESCE(SUM(DATA_LENGTH + INDEX_LENGTH), 0) AS UNSIGNED)
    FROM information_schema.TABLES
    WHERE TABLE_SCHEMA = ?";

const SQL_PRIMARY_KEY: &str = "
    SELECT COUNT(*)
    FROM information_schema.TABLE_CONSTRAINTS
    WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?
      AND CONSTRAINT_TYPE = 'PRIMARY KEY'";

/// Counts UNIQUE constraints with no nullable member column.
const SQL_UNIQUE_NOT_NULL: &str = "
    SELECT COUNT(*) FROM (
        SELECT tc.CONSTRAINT_NAME
        FROM information_schema.TABLE_CONSTRAINTS tc
        JOIN information_schema.KEY_COLUMN_USAGE kcu
          ON kcu.CONSTRAINT_SCHEMA = tc.CONSTRAINT_SCHEMA
         AND kcu.CONSTRAINT_NAME = tc.CONSTRAINT_NAME
         AND kcu.TABLE_NAME = tc.TABLE_NAME
        JOIN information_schema.COLUMNS c
          ON c.TABLE_SCHEMA = kcu.TABLE_SCHEMA
         AND c.TABLE_NAME = kcu.TABLE_NAME
         AND c.COLUMN_NAME = kcu.COLUMN_NAME
        WHERE tc.TABLE_SCHEMA = ? AND tc.TABLE_NAME = ?
          AND tc.CONSTRAINT_TYPE = 'UNIQUE'
        GROUP BY tc.CONSTRAINT_NAME
        HAVING SUM(c.IS_NULLABLE = 'YES') = 0
    ) unique_keys";

/// Foreign keys declared on the table or pointing at it.
const SQL_FOREIGN_KEYS: &str = "
    SELECT COUNT(*)
    FROM information_schema.KEY_COLUMN_USAGE
    WHERE REFERENCED_TABLE_NAME IS NOT NULL
      AND ((TABLE_SCHEMA = ? AND TABLE_NAME = ?)
        OR (REFERENCED_TABLE_SCHEMA = ? AND REFERENCED_TABLE_NAME = ?))";

const SQL_TRIGGERS: &str = "
    SELECT COUNT(*)
    FROM information_schema.TRIGGERS
    WHERE TRIGGER_SCHEMA = ? AND EVENT_OBJECT_TABLE = ?";

/// A single blocking connection to a MySQL or MariaDB server.
///
/// The connection is closed when the value is dropped.
pub struct MySqlDatabase {
    conn: Conn,
}

impl MySqlDatabase {
    pub fn connect(dsn: &Dsn) -> Result<Self> {
        debug!("Connecting to {}", dsn);
        let conn = Conn::new(dsn.to_opts()).map_err(|e| SchemaGuardError::ConnectionError {
            msg: e.to_string(),
        })?;
        Ok(Self { conn })
    }

    fn count(&mut self, query: &str, params: Vec<&str>) -> Result<u64> {
        let count: Option<u64> = self.conn.exec_first(query, params)?;
        Ok(count.unwrap_or(0))
    }
}

/// Variable names are interpolated, so only plain identifiers are accepted.
fn checked_variable_name(name: &str) -> Result<&str> {
    if !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(name)
    } else {
        Err(SchemaGuardError::metadata_error(format!(
            "invalid variable name '{}'",
            name
        )))
    }
}

impl Database for MySqlDatabase {
    fn version(&mut self) -> Result<String> {
        let version: Option<String> = self.conn.query_first("SELECT VERSION()")?;
        version.ok_or_else(|| SchemaGuardError::metadata_error("VERSION() returned no rows"))
    }

    fn system_variable(&mut self, name: &str) -> Result<Option<String>> {
        let name = checked_variable_name(name)?;
        let value: Option<Option<String>> =
            self.conn.query_first(format!("SELECT @@{}", name))?;
        Ok(value.flatten())
    }

    fn show_variable(&mut self, name: &str) -> Result<Option<String>> {
        let name = checked_variable_name(name)?;
        let row: Option<(String, Option<String>)> = self
            .conn
            .query_first(format!("SHOW VARIABLES LIKE '{}'", name))?;
        Ok(row.and_then(|(_, value)| value))
    }

    fn current_database(&mut self) -> Result<Option<String>> {
        let db: Option<Option<String>> = self.conn.query_first("SELECT DATABASE()")?;
        Ok(db.flatten())
    }

    fn storage_engine(&mut self, table: &QualifiedTable) -> Result<Option<String>> {
        let engine: Option<Option<String>> = self.conn.exec_first(
            SQL_STORAGE_ENGINE,
            (table.database.as_str(), table.table.as_str()),
        )?;
        // Views have a NULL engine but do exist
        Ok(engine.map(Option::unwrap_or_default))
    }

    fn table_rows(&mut self, table: &QualifiedTable) -> Result<u64> {
        let rows: Option<Option<u64>> = self.conn.exec_first(
            SQL_TABLE_ROWS,
            (table.database.as_str(), table.table.as_str()),
        )?;
        rows.map(Option::unwrap_or_default).ok_or_else(|| {
            SchemaGuardError::metadata_error(format!("table {} not found", table))
        })
    }

    fn table_footprint(&mut self, table: &QualifiedTable) -> Result<TableFootprint> {
        let row: Option<(Option<u64>, Option<u64>)> = self.conn.exec_first(
            SQL_TABLE_FOOTPRINT,
            (table.database.as_str(), table.table.as_str()),
        )?;
        let (data_length, index_length) = row.ok_or_else(|| {
            SchemaGuardError::metadata_error(format!("table {} not found", table))
        })?;

        Ok(TableFootprint {
            data_length: data_length.unwrap_or(0),
            index_length: index_length.unwrap_or(0),
        })
    }

    fn schema_footprint(&mut self, database: &str) -> Result<u64> {
        self.count(SQL_SCHEMA_FOOTPRINT, vec![database])
    }

    fn has_primary_key(&mut self, table: &QualifiedTable) -> Result<bool> {
        Ok(self.count(SQL_PRIMARY_KEY, vec![table.database.as_str(), table.table.as_str()])? > 0)
    }

    fn has_unique_not_null_key(&mut self, table: &QualifiedTable) -> Result<bool> {
        Ok(self.count(SQL_UNIQUE_NOT_NULL, vec![table.database.as_str(), table.table.as_str()])? > 0)
    }

    fn has_foreign_keys(&mut self, table: &QualifiedTable) -> Result<bool> {
        let params = vec![
            table.database.as_str(),
            table.table.as_str(),
            table.database.as_str(),
            table.table.as_str(),
        ];
        Ok(self.count(SQL_FOREIGN_KEYS, params)? > 0)
    }

    fn has_triggers(&mut self, table: &QualifiedTable) -> Result<bool> {
        Ok(self.count(SQL_TRIGGERS, vec![table.database.as_str(), table.table.as_str()])? > 0)
    }

    fn execute(&mut self, sql: &str) -> Result<()> {
        self.conn
            .query_drop(sql)
            .map_err(|e| SchemaGuardError::ddl_error(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_footprint_total() {
        let footprint = TableFootprint {
            data_length: 1024,
            index_length: 512,
        };
        assert_eq!(footprint.total_bytes(), 1536);
    }

    #[test]
    fn test_variable_name_validation() {
        assert!(checked_variable_name("log_bin").is_ok());
        assert!(checked_variable_name("version_comment").is_ok());
        assert!(checked_variable_name("log_bin'; DROP TABLE x; --").is_err());
        assert!(checked_variable_name("").is_err());
    }
}
