//! Pre-change backups.
//!
//! A backup is always preceded by a disk space check against `backup_dir`.
//! Any failure aborts the backup, and with it the schema change.

use crate::capacity::{available_space, check_capacity, estimate_backup_mb};
use crate::config::Config;
use crate::database::Database;
use crate::dsn::ToolCredentials;
use crate::error::Result;
use crate::parser::QualifiedTable;
use crate::process::{CommandRunner, ToolInvocation};
use camino::Utf8PathBuf;
use clap::ValueEnum;
use derive_more::Display;
use log::info;
use serde::{Deserialize, Serialize};

const TIMESTAMP_FORMAT: &str = "%y%m%d%H%M%S";

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum, Display,
)]
#[serde(rename_all = "snake_case")]
pub enum BackupMethod {
    #[default]
    #[display("none")]
    #[value(name = "none")]
    None,
    /// Single-table SQL dump with mysqldump
    #[display("mysqldump")]
    #[value(name = "mysqldump", alias = "logical")]
    LogicalDump,
    /// Table subset copied and exported with xtrabackup
    #[display("xtrabackup")]
    #[value(name = "xtrabackup", alias = "physical")]
    PhysicalCopy,
}

pub struct BackupRequest<'a> {
    pub method: BackupMethod,
    pub table: &'a QualifiedTable,
    pub config: &'a Config,
    pub credentials: &'a ToolCredentials,
    pub debug: bool,
}

/// Check capacity and take the requested backup.
///
/// Returns the dump file or target directory, or `None` when no backup was
/// requested. Nothing on disk is touched for [`BackupMethod::None`].
pub fn perform_backup(
    db: &mut dyn Database,
    runner: &dyn CommandRunner,
    request: &BackupRequest<'_>,
) -> Result<Option<Utf8PathBuf>> {
    let Some(estimate_mb) = estimate_backup_mb(db, request.method, request.table)? else {
        return Ok(None);
    };

    let backup_dir = &request.config.backup_dir;
    std::fs::create_dir_all(backup_dir)?;

    let available = available_space(backup_dir)?;
    check_capacity(estimate_mb, request.config.buffer_percent(), available)?;

    let timestamp = chrono::Local::now().format(TIMESTAMP_FORMAT).to_string();
    let path = match request.method {
        BackupMethod::None => return Ok(None),
        BackupMethod::LogicalDump => logical_dump(runner, request, &timestamp)?,
        BackupMethod::PhysicalCopy => physical_copy(runner, request, &timestamp)?,
    };

    info!("Backup of {} written to {}", request.table, path);
    Ok(Some(path))
}

/// `<backup_dir>/<timestamp>_<db>_<table>.sql`
pub fn logical_dump_path(config: &Config, table: &QualifiedTable, timestamp: &str) -> Utf8PathBuf {
    config.backup_dir.join(format!(
        "{}_{}_{}.sql",
        timestamp, table.database, table.table
    ))
}

/// `<backup_dir>/<timestamp>_xtrabackup_<db>_<table>`
pub fn physical_copy_path(
    config: &Config,
    table: &QualifiedTable,
    timestamp: &str,
) -> Utf8PathBuf {
    config.backup_dir.join(format!(
        "{}_xtrabackup_{}_{}",
        timestamp, table.database, table.table
    ))
}

fn logical_dump(
    runner: &dyn CommandRunner,
    request: &BackupRequest<'_>,
    timestamp: &str,
) -> Result<Utf8PathBuf> {
    let creds = request.credentials;
    let path = logical_dump_path(request.config, request.table, timestamp);

    let mut args = vec![
        "-h".to_string(),
        creds.host.clone(),
        "-P".to_string(),
        creds.port.clone(),
        "-u".to_string(),
        creds.user.clone(),
    ];
    // A bare -p would prompt on the terminal
    if !creds.password.is_empty() {
        args.push(format!("-p{}", creds.password));
    }
    args.extend([
        request.table.database.clone(),
        request.table.table.clone(),
        "--single-transaction".to_string(),
        "--quick".to_string(),
        "--lock-tables=false".to_string(),
        "-r".to_string(),
        path.to_string(),
    ]);

    ToolInvocation {
        label: "mysqldump",
        program: &request.config.mysqldump_path,
        args,
        secret: &creds.password,
        debug: request.debug,
    }
    .run(runner)?;

    Ok(path)
}

fn physical_copy(
    runner: &dyn CommandRunner,
    request: &BackupRequest<'_>,
    timestamp: &str,
) -> Result<Utf8PathBuf> {
    let creds = request.credentials;
    let target = physical_copy_path(request.config, request.table, timestamp);

    let mut backup_args = vec![
        "--backup".to_string(),
        format!("--tables={}", request.table),
        format!("--target-dir={}", target),
        format!("--user={}", creds.user),
    ];
    if !creds.password.is_empty() {
        backup_args.push(format!("--password={}", creds.password));
    }
    backup_args.extend([
        format!("--host={}", creds.host),
        format!("--port={}", creds.port),
    ]);

    ToolInvocation {
        label: "xtrabackup backup",
        program: &request.config.xtrabackup_path,
        args: backup_args,
        secret: &creds.password,
        debug: request.debug,
    }
    .run(runner)?;

    // Export makes the tablespace importable on its own
    ToolInvocation {
        label: "xtrabackup prepare",
        program: &request.config.xtrabackup_path,
        args: vec![
            "--prepare".to_string(),
            "--export".to_string(),
            format!("--target-dir={}", target),
        ],
        secret: &creds.password,
        debug: request.debug,
    }
    .run(runner)?;

    Ok(target)
}
