//! Substitute database and process runner for unit tests.

use crate::database::{Database, TableFootprint};
use crate::error::{Result, SchemaGuardError};
use crate::parser::QualifiedTable;
use crate::process::{CommandOutput, CommandRunner};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

pub const MIB: u64 = 1024 * 1024;

#[derive(Debug, Clone)]
pub struct FakeTable {
    pub engine: String,
    pub rows: u64,
    pub data_length: u64,
    pub index_length: u64,
    pub primary_key: bool,
    pub unique_not_null: bool,
    pub foreign_keys: bool,
    pub triggers: bool,
}

impl FakeTable {
    pub fn innodb() -> Self {
        Self {
            engine: "InnoDB".to_string(),
            rows: 1000,
            data_length: 16 * MIB,
            index_length: MIB,
            primary_key: true,
            unique_not_null: false,
            foreign_keys: false,
            triggers: false,
        }
    }

    pub fn myisam() -> Self {
        Self {
            engine: "MyISAM".to_string(),
            ..Self::innodb()
        }
    }
}

pub struct FakeDatabase {
    pub version: String,
    pub variables: HashMap<String, String>,
    pub current_database: Option<String>,
    pub tables: HashMap<String, FakeTable>,
    pub executed: Vec<String>,
    failing: HashSet<String>,
    rejected_ddl: Vec<String>,
}

impl FakeDatabase {
    fn base(version: &str, comment: &str, log_bin: &str) -> Self {
        let mut variables = HashMap::new();
        variables.insert("version_comment".to_string(), comment.to_string());
        variables.insert("log_bin".to_string(), log_bin.to_string());
        variables.insert(
            "log_bin_basename".to_string(),
            "/var/lib/mysql/binlog".to_string(),
        );

        Self {
            version: version.to_string(),
            variables,
            current_database: Some("testdb".to_string()),
            tables: HashMap::new(),
            executed: Vec::new(),
            failing: HashSet::new(),
            rejected_ddl: Vec::new(),
        }
    }

    pub fn mysql() -> Self {
        Self::base("8.0.36", "MySQL Community Server - GPL", "1")
    }

    pub fn mariadb() -> Self {
        Self::base("10.11.6-MariaDB", "mariadb.org binary distribution", "ON")
    }

    pub fn with_table(mut self, database: &str, table: &str, fake: FakeTable) -> Self {
        self.tables.insert(format!("{}.{}", database, table), fake);
        self
    }

    pub fn set_variable(&mut self, name: &str, value: &str) {
        self.variables.insert(name.to_string(), value.to_string());
    }

    pub fn remove_variable(&mut self, name: &str) {
        self.variables.remove(name);
    }

    /// Make the named trait method return a metadata error
    pub fn fail_on(&mut self, operation: &str) {
        self.failing.insert(operation.to_string());
    }

    /// Make `execute` fail for statements containing `pattern`
    pub fn reject_ddl_containing(&mut self, pattern: &str) {
        self.rejected_ddl.push(pattern.to_string());
    }

    fn check(&self, operation: &str) -> Result<()> {
        if self.failing.contains(operation) {
            Err(SchemaGuardError::metadata_error(format!(
                "{} failed",
                operation
            )))
        } else {
            Ok(())
        }
    }

    fn table(&self, table: &QualifiedTable) -> Option<&FakeTable> {
        self.tables.get(&table.to_string())
    }

    fn require_table(&self, table: &QualifiedTable) -> Result<&FakeTable> {
        self.table(table).ok_or_else(|| {
            SchemaGuardError::metadata_error(format!("table {} not found", table))
        })
    }
}

impl Database for FakeDatabase {
    fn version(&mut self) -> Result<String> {
        self.check("version")?;
        Ok(self.version.clone())
    }

    fn system_variable(&mut self, name: &str) -> Result<Option<String>> {
        self.check("system_variable")?;
        Ok(self.variables.get(name).cloned())
    }

    fn show_variable(&mut self, name: &str) -> Result<Option<String>> {
        self.check("show_variable")?;
        Ok(self.variables.get(name).cloned())
    }

    fn current_database(&mut self) -> Result<Option<String>> {
        self.check("current_database")?;
        Ok(self.current_database.clone())
    }

    fn storage_engine(&mut self, table: &QualifiedTable) -> Result<Option<String>> {
        self.check("storage_engine")?;
        Ok(self.table(table).map(|t| t.engine.clone()))
    }

    fn table_rows(&mut self, table: &QualifiedTable) -> Result<u64> {
        self.check("table_rows")?;
        Ok(self.require_table(table)?.rows)
    }

    fn table_footprint(&mut self, table: &QualifiedTable) -> Result<TableFootprint> {
        self.check("table_footprint")?;
        let t = self.require_table(table)?;
        Ok(TableFootprint {
            data_length: t.data_length,
            index_length: t.index_length,
        })
    }

    fn schema_footprint(&mut self, database: &str) -> Result<u64> {
        self.check("schema_footprint")?;
        let prefix = format!("{}.", database);
        Ok(self
            .tables
            .iter()
            .filter(|(name, _)| name.starts_with(&prefix))
            .map(|(_, t)| t.data_length + t.index_length)
            .sum())
    }

    fn has_primary_key(&mut self, table: &QualifiedTable) -> Result<bool> {
        self.check("has_primary_key")?;
        Ok(self.require_table(table)?.primary_key)
    }

    fn has_unique_not_null_key(&mut self, table: &QualifiedTable) -> Result<bool> {
        self.check("has_unique_not_null_key")?;
        Ok(self.require_table(table)?.unique_not_null)
    }

    fn has_foreign_keys(&mut self, table: &QualifiedTable) -> Result<bool> {
        self.check("has_foreign_keys")?;
        Ok(self.require_table(table)?.foreign_keys)
    }

    fn has_triggers(&mut self, table: &QualifiedTable) -> Result<bool> {
        self.check("has_triggers")?;
        Ok(self.require_table(table)?.triggers)
    }

    fn execute(&mut self, sql: &str) -> Result<()> {
        self.check("execute")?;
        if let Some(pattern) = self.rejected_ddl.iter().find(|p| sql.contains(p.as_str())) {
            return Err(SchemaGuardError::ddl_error(format!(
                "statement rejected (matched '{}')",
                pattern
            )));
        }
        self.executed.push(sql.to_string());
        Ok(())
    }
}

/// Records every call and succeeds unless a failure rule matches the program
/// name or one of its arguments.
pub struct FakeRunner {
    calls: RefCell<Vec<(String, Vec<String>)>>,
    failures: RefCell<Vec<(String, i32, String)>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self {
            calls: RefCell::new(Vec::new()),
            failures: RefCell::new(Vec::new()),
        }
    }

    pub fn fail_when(&self, pattern: &str, exit_code: i32, output: &str) {
        self.failures
            .borrow_mut()
            .push((pattern.to_string(), exit_code, output.to_string()));
    }

    pub fn calls(&self) -> Vec<(String, Vec<String>)> {
        self.calls.borrow().clone()
    }

    /// Calls whose program or arguments contain `pattern`
    pub fn calls_matching(&self, pattern: &str) -> Vec<(String, Vec<String>)> {
        self.calls()
            .into_iter()
            .filter(|(program, args)| {
                program.contains(pattern) || args.iter().any(|a| a.contains(pattern))
            })
            .collect()
    }
}

impl CommandRunner for FakeRunner {
    fn run(&self, program: &str, args: &[String]) -> std::io::Result<CommandOutput> {
        self.calls
            .borrow_mut()
            .push((program.to_string(), args.to_vec()));

        let failures = self.failures.borrow();
        let failure = failures.iter().find(|(pattern, _, _)| {
            program.contains(pattern.as_str()) || args.iter().any(|a| a.contains(pattern.as_str()))
        });

        Ok(match failure {
            Some((_, code, output)) => CommandOutput {
                exit_code: Some(*code),
                output: output.clone(),
            },
            None => CommandOutput {
                exit_code: Some(0),
                output: "ok".to_string(),
            },
        })
    }
}
