//! Ways of applying a schema change, tried in order by the executor.

use crate::database::Database;
use crate::dsn::ToolCredentials;
use crate::error::{Result, SchemaGuardError};
use crate::executor::{ExecuteOptions, MethodUsed};
use crate::parser::{alter_clause, TableName};
use crate::process::{CommandRunner, ToolInvocation};
use log::{debug, warn};
use regex::Regex;
use std::sync::LazyLock;

pub const ONLINE_DDL_UNSUPPORTED_WARNING: &str = "Online DDL not supported for this operation";
pub const TABLE_LOCK_WARNING: &str =
    "Executing schema change without Online DDL - table may be locked during execution";

/// Everything a strategy needs for one attempt
pub struct StrategyContext<'a> {
    pub db: &'a mut dyn Database,
    pub runner: &'a dyn CommandRunner,
    pub options: &'a ExecuteOptions,
    pub table: &'a TableName,
    pub warnings: &'a mut Vec<String>,
    pub errors: &'a mut Vec<String>,
}

pub trait Strategy {
    fn method(&self) -> MethodUsed;

    fn can_attempt(&self, options: &ExecuteOptions) -> bool;

    fn attempt(&self, ctx: &mut StrategyContext<'_>) -> Result<()>;

    /// A failure ends the chain instead of falling through to the next strategy
    fn is_terminal(&self) -> bool;
}

static ALGORITHM_HINT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bALGORITHM\s*=").expect("Invalid ALGORITHM hint regex pattern")
});

static LOCK_HINT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bLOCK\s*=").expect("Invalid LOCK hint regex pattern"));

/// `ALTER TABLE ... , ALGORITHM=INPLACE, LOCK=NONE`, keeping any hint the
/// statement already carries.
pub fn with_online_ddl_hints(sql: &str) -> String {
    let sql = sql.trim();
    let has_algorithm = ALGORITHM_HINT.is_match(sql);
    let has_lock = LOCK_HINT.is_match(sql);

    let mut statement = sql.trim_end_matches(';').trim_end().to_string();
    if !has_algorithm {
        statement.push_str(", ALGORITHM=INPLACE");
    }
    if !has_lock {
        statement.push_str(", LOCK=NONE");
    }
    statement
}

/// Native `ALGORITHM=INPLACE, LOCK=NONE` execution
pub struct OnlineDdl;

impl Strategy for OnlineDdl {
    fn method(&self) -> MethodUsed {
        MethodUsed::OnlineDdl
    }

    fn can_attempt(&self, options: &ExecuteOptions) -> bool {
        !options.use_ptosc
    }

    fn attempt(&self, ctx: &mut StrategyContext<'_>) -> Result<()> {
        let sql = with_online_ddl_hints(&ctx.options.sql);
        if ctx.options.debug {
            debug!("Executing Online DDL statement: {}", sql);
        }

        if let Err(e) = ctx.db.execute(&sql) {
            let message = e.to_string();
            if message.contains("ALGORITHM") || message.contains("LOCK=NONE") {
                ctx.warnings.push(ONLINE_DDL_UNSUPPORTED_WARNING.to_string());
            } else {
                ctx.warnings
                    .push(format!("Online DDL failed, falling back: {}", message));
            }
            ctx.errors.push(message);
            return Err(e);
        }

        Ok(())
    }

    fn is_terminal(&self) -> bool {
        false
    }
}

/// pt-online-schema-change, gated by a dry run
pub struct ExternalTool;

impl ExternalTool {
    fn arguments(
        mode: &str,
        creds: &ToolCredentials,
        database: &str,
        table: &str,
        clause: &str,
        preserve_triggers: bool,
    ) -> Vec<String> {
        let mut args = vec![
            mode.to_string(),
            format!(
                "h={},P={},u={},p={},D={},t={}",
                creds.host, creds.port, creds.user, creds.password, database, table
            ),
            format!("--alter={}", clause),
        ];
        if preserve_triggers {
            args.push("--preserve-triggers".to_string());
        }
        args
    }
}

impl Strategy for ExternalTool {
    fn method(&self) -> MethodUsed {
        MethodUsed::ExternalTool
    }

    fn can_attempt(&self, options: &ExecuteOptions) -> bool {
        options.use_ptosc
    }

    fn attempt(&self, ctx: &mut StrategyContext<'_>) -> Result<()> {
        let options = ctx.options;
        let name = ctx.table;
        let db = &mut *ctx.db;
        let table = name.resolve(|| db.current_database())?;

        let clause = alter_clause(&options.sql);
        if clause.is_empty() {
            return Err(SchemaGuardError::parse_error(
                "no ALTER specification found after the table name",
            ));
        }

        let preserve_triggers = match ctx.db.has_triggers(&table) {
            Ok(triggers) => triggers,
            Err(e) => {
                warn!("Could not check triggers on {}: {}", table, e);
                ctx.warnings
                    .push(format!("Could not verify triggers: {}", e));
                false
            }
        };

        let creds = ToolCredentials::resolve(&options.config, options.dsn.as_ref());
        let program = options.config.ptosc_path.as_str();

        ToolInvocation {
            label: "pt-online-schema-change dry-run",
            program,
            args: Self::arguments(
                "--dry-run",
                &creds,
                &table.database,
                &table.table,
                &clause,
                preserve_triggers,
            ),
            secret: &creds.password,
            debug: options.debug,
        }
        .run(ctx.runner)?;

        ToolInvocation {
            label: "pt-online-schema-change",
            program,
            args: Self::arguments(
                "--execute",
                &creds,
                &table.database,
                &table.table,
                &clause,
                preserve_triggers,
            ),
            secret: &creds.password,
            debug: options.debug,
        }
        .run(ctx.runner)?;

        Ok(())
    }

    fn is_terminal(&self) -> bool {
        true
    }
}

/// The statement exactly as written. May block readers and writers.
pub struct LockingAlter;

impl Strategy for LockingAlter {
    fn method(&self) -> MethodUsed {
        MethodUsed::LockingAlter
    }

    fn can_attempt(&self, options: &ExecuteOptions) -> bool {
        !options.use_ptosc
    }

    fn attempt(&self, ctx: &mut StrategyContext<'_>) -> Result<()> {
        ctx.warnings.push(TABLE_LOCK_WARNING.to_string());
        if ctx.options.debug {
            debug!(
                "Executing regular ALTER statement (without Online DDL): {}",
                ctx.options.sql
            );
        }
        ctx.db.execute(&ctx.options.sql)
    }

    fn is_terminal(&self) -> bool {
        true
    }
}
