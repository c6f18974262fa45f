//! Read-only safety report for a batch of ALTER TABLE statements.

use crate::capacity::bytes_to_mb;
use crate::checks::{blocking_operation, PrerequisiteRegistry};
use crate::database::Database;
use crate::error::Result;
use crate::parser::{extract_table_name, QualifiedTable, SqlParser};
use crate::probe::{probe_server, Flavor};
use camino::Utf8Path;
use log::{debug, info};
use serde::Serialize;
use std::fs;

const TRANSACTIONAL_ENGINE: &str = "InnoDB";
pub const TABLE_MISSING_ERROR: &str = "Table does not exist";
pub const BINARY_LOG_DISABLED_WARNING: &str = "Binary log is not enabled";
pub const ENGINE_REASON: &str = "Storage engine is not InnoDB - Online DDL requires InnoDB";
pub const ONLINE_DDL_REASON: &str = "Operation supports Online DDL (ALGORITHM=INPLACE, LOCK=NONE); \
     the server makes the final decision when the change is executed";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationResult {
    pub flavor: Flavor,
    pub version: String,
    pub binary_log_enabled: bool,
    pub statements: Vec<StatementValidationResult>,
    pub validation_warnings: Vec<String>,
    pub validation_errors: Vec<String>,
}

impl ValidationResult {
    /// True when any statement, or the batch itself, recorded an error
    pub fn has_errors(&self) -> bool {
        !self.validation_errors.is_empty() || self.statements.iter().any(|s| !s.errors.is_empty())
    }
}

/// Per-statement report.
///
/// The `ptosc_*` fields are only filled in when online DDL is not possible.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatementValidationResult {
    pub statement: String,
    pub table_name: String,
    pub storage_engine: String,
    pub storage_engine_valid: bool,
    pub online_ddl_possible: bool,
    pub online_ddl_reason: String,
    pub ptosc_possible: bool,
    pub ptosc_reason: String,
    pub table_rows: u64,
    pub table_size_mb: f64,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

pub struct Validator {
    parser: SqlParser,
    registry: PrerequisiteRegistry,
}

impl Validator {
    pub fn new() -> Self {
        Self {
            parser: SqlParser::new(),
            registry: PrerequisiteRegistry::new(),
        }
    }

    /// Split a SQL script into statements
    pub fn statements_from_sql(&self, sql: &str) -> Result<Vec<String>> {
        self.parser.split_statements(sql)
    }

    /// Read and split a SQL file
    pub fn statements_from_file(&self, path: &Utf8Path) -> Result<Vec<String>> {
        let sql = fs::read_to_string(path)?;
        self.statements_from_sql(&sql)
    }

    /// Validate every statement against the live server.
    ///
    /// Only a failure to probe the server is returned as an error. Problems
    /// with individual statements are recorded in the report, which always
    /// holds one entry per input statement.
    pub fn validate_statements(
        &self,
        db: &mut dyn Database,
        statements: &[String],
    ) -> Result<ValidationResult> {
        let server = probe_server(db)?;

        let mut result = ValidationResult {
            flavor: server.flavor,
            version: server.version,
            binary_log_enabled: server.binary_log_enabled,
            statements: Vec::with_capacity(statements.len()),
            validation_warnings: Vec::new(),
            validation_errors: Vec::new(),
        };

        if !result.binary_log_enabled {
            result
                .validation_warnings
                .push(BINARY_LOG_DISABLED_WARNING.to_string());
        }

        for ddl in statements {
            let statement = self.validate_statement(db, ddl, &mut result.validation_errors);
            result.statements.push(statement);
        }

        info!(
            "Validated {} statement(s) against {} {}",
            result.statements.len(),
            result.flavor,
            result.version
        );

        Ok(result)
    }

    fn validate_statement(
        &self,
        db: &mut dyn Database,
        ddl: &str,
        batch_errors: &mut Vec<String>,
    ) -> StatementValidationResult {
        let mut stmt = StatementValidationResult {
            statement: ddl.trim().to_string(),
            ..Default::default()
        };

        let name = match extract_table_name(ddl) {
            Ok(name) => name,
            Err(e) => {
                stmt.errors.push(e.to_string());
                return stmt;
            }
        };
        stmt.table_name = name.to_string();

        let table = match name.resolve(|| db.current_database()) {
            Ok(table) => table,
            Err(e) => {
                stmt.errors.push(e.to_string());
                return stmt;
            }
        };
        stmt.table_name = table.to_string();

        let engine = match db.storage_engine(&table) {
            Ok(Some(engine)) => engine,
            Ok(None) => {
                stmt.errors.push(TABLE_MISSING_ERROR.to_string());
                return stmt;
            }
            Err(e) => {
                stmt.errors.push(e.to_string());
                return stmt;
            }
        };

        stmt.storage_engine_valid = engine.eq_ignore_ascii_case(TRANSACTIONAL_ENGINE);
        if !stmt.storage_engine_valid {
            stmt.warnings
                .push(format!("Storage engine is {}, not InnoDB", engine));
        }
        stmt.storage_engine = engine;

        match db.table_rows(&table) {
            Ok(rows) => stmt.table_rows = rows,
            Err(e) => {
                stmt.errors.push(format!("Could not read row count: {}", e));
                batch_errors.push(format!(
                    "Failed to validate statement '{}': {}",
                    stmt.statement, e
                ));
                return stmt;
            }
        }

        stmt.table_size_mb = match db.table_footprint(&table) {
            Ok(footprint) => bytes_to_mb(footprint.total_bytes()),
            Err(e) => {
                debug!("Size lookup for {} failed, reporting 0: {}", table, e);
                0.0
            }
        };

        self.assess_online_ddl(ddl, &mut stmt);

        if !stmt.online_ddl_possible {
            self.assess_ptosc(db, &table, &mut stmt);
        }

        stmt
    }

    fn assess_online_ddl(&self, ddl: &str, stmt: &mut StatementValidationResult) {
        if !stmt.storage_engine_valid {
            stmt.online_ddl_possible = false;
            stmt.online_ddl_reason = ENGINE_REASON.to_string();
            return;
        }

        let clause = self.parser.alter_clause(ddl);
        match blocking_operation(&clause) {
            None => {
                stmt.online_ddl_possible = true;
                stmt.online_ddl_reason = ONLINE_DDL_REASON.to_string();
            }
            Some(operation) => {
                stmt.online_ddl_possible = false;
                stmt.online_ddl_reason = format!(
                    "{} does not support Online DDL (ALGORITHM=INPLACE, LOCK=NONE) - will use table lock",
                    operation
                );
            }
        }
    }

    fn assess_ptosc(
        &self,
        db: &mut dyn Database,
        table: &QualifiedTable,
        stmt: &mut StatementValidationResult,
    ) {
        let assessment = self.registry.assess(db, table);
        stmt.ptosc_possible = assessment.possible;
        stmt.ptosc_reason = assessment.reason;
        stmt.warnings.extend(assessment.warnings);
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}
