//! Applies one schema change: optional backup, then the first execution
//! strategy that can be attempted and succeeds.

mod strategy;

pub use strategy::{
    with_online_ddl_hints, ExternalTool, LockingAlter, OnlineDdl, Strategy, StrategyContext,
    ONLINE_DDL_UNSUPPORTED_WARNING, TABLE_LOCK_WARNING,
};

use crate::backup::{perform_backup, BackupMethod, BackupRequest};
use crate::config::Config;
use crate::database::Database;
use crate::dsn::{Dsn, ToolCredentials};
use crate::error::{Result, SchemaGuardError};
use crate::parser::{extract_table_name, TableName};
use crate::process::CommandRunner;
use camino::Utf8PathBuf;
use derive_more::Display;
use log::{debug, info};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
pub enum MethodUsed {
    #[display("Online DDL")]
    OnlineDdl,
    #[display("pt-online-schema-change")]
    ExternalTool,
    #[display("regular ALTER (with table lock warning)")]
    LockingAlter,
}

#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    pub sql: String,
    /// Derived from `sql` when not given
    pub table_name: Option<TableName>,
    /// Fallback source for tool credentials
    pub dsn: Option<Dsn>,
    pub backup_method: BackupMethod,
    pub use_ptosc: bool,
    pub config: Config,
    pub debug: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExecuteResult {
    pub backup_performed: bool,
    pub backup_path: Option<Utf8PathBuf>,
    pub change_executed: bool,
    /// Set exactly once on success
    pub method_used: Option<MethodUsed>,
    pub warnings: Vec<String>,
    /// Failures that a later strategy recovered from
    pub errors: Vec<String>,
}

pub struct Executor<'a> {
    db: &'a mut dyn Database,
    runner: &'a dyn CommandRunner,
    strategies: Vec<Box<dyn Strategy>>,
}

impl<'a> Executor<'a> {
    pub fn new(db: &'a mut dyn Database, runner: &'a dyn CommandRunner) -> Self {
        Self {
            db,
            runner,
            strategies: vec![
                Box::new(OnlineDdl),
                Box::new(ExternalTool),
                Box::new(LockingAlter),
            ],
        }
    }

    /// Run the change. Any error means the call as a whole failed; a backup
    /// failure means no DDL was attempted.
    pub fn execute(&mut self, options: &ExecuteOptions) -> Result<ExecuteResult> {
        let table_name = match &options.table_name {
            Some(name) => name.clone(),
            None => extract_table_name(&options.sql)?,
        };

        let mut result = ExecuteResult::default();

        if options.backup_method != BackupMethod::None {
            let db = &mut *self.db;
            let table = table_name.resolve(|| db.current_database())?;
            let credentials = ToolCredentials::resolve(&options.config, options.dsn.as_ref());

            let request = BackupRequest {
                method: options.backup_method,
                table: &table,
                config: &options.config,
                credentials: &credentials,
                debug: options.debug,
            };
            result.backup_path = perform_backup(&mut *self.db, self.runner, &request)?;
            result.backup_performed = result.backup_path.is_some();
        }

        let mut ctx = StrategyContext {
            db: &mut *self.db,
            runner: self.runner,
            options,
            table: &table_name,
            warnings: &mut result.warnings,
            errors: &mut result.errors,
        };

        for strategy in &self.strategies {
            if !strategy.can_attempt(options) {
                continue;
            }

            match strategy.attempt(&mut ctx) {
                Ok(()) => {
                    info!("Schema change on {} applied with {}", table_name, strategy.method());
                    result.change_executed = true;
                    result.method_used = Some(strategy.method());
                    return Ok(result);
                }
                Err(e) if strategy.is_terminal() => return Err(e),
                Err(e) => {
                    debug!("{} failed, trying next strategy: {}", strategy.method(), e);
                }
            }
        }

        Err(SchemaGuardError::ddl_error(
            "no execution strategy could be attempted",
        ))
    }
}
