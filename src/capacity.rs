//! Backup size estimation and disk space checks.
//!
//! **Limitation:** only the filesystem holding `backup_dir` itself is
//! inspected. A physical backup target directory mounted elsewhere is not
//! accounted for.

use crate::backup::BackupMethod;
use crate::database::{Database, TableFootprint};
use crate::error::{Result, SchemaGuardError};
use crate::parser::QualifiedTable;
use camino::Utf8Path;
use log::debug;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Smallest estimate returned, so empty tables still require some space
pub const MIN_ESTIMATE_MB: f64 = 0.1;

/// SQL text is roughly twice the on-disk size of the data
const LOGICAL_DUMP_FACTOR: f64 = 2.0;

/// Raw pages plus xtrabackup metadata
const PHYSICAL_COPY_FACTOR: f64 = 1.2;

pub fn bytes_to_mb(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_MB
}

pub fn mb_to_bytes(mb: f64) -> u64 {
    (mb * BYTES_PER_MB).round() as u64
}

/// Estimated mysqldump output size for one table
pub fn logical_dump_estimate_mb(footprint: TableFootprint) -> f64 {
    (bytes_to_mb(footprint.total_bytes()) * LOGICAL_DUMP_FACTOR).max(MIN_ESTIMATE_MB)
}

/// Estimated xtrabackup size for the whole schema
pub fn physical_copy_estimate_mb(schema_bytes: u64) -> f64 {
    (bytes_to_mb(schema_bytes) * PHYSICAL_COPY_FACTOR).max(MIN_ESTIMATE_MB)
}

/// Query the catalog and estimate the backup size for `method`.
/// Returns `None` for [`BackupMethod::None`].
pub fn estimate_backup_mb(
    db: &mut dyn Database,
    method: BackupMethod,
    table: &QualifiedTable,
) -> Result<Option<f64>> {
    let estimate = match method {
        BackupMethod::None => None,
        BackupMethod::LogicalDump => Some(logical_dump_estimate_mb(db.table_footprint(table)?)),
        BackupMethod::PhysicalCopy => Some(physical_copy_estimate_mb(
            db.schema_footprint(&table.database)?,
        )),
    };
    Ok(estimate)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CapacityPlan {
    pub estimated_bytes: u64,
    pub required_bytes: u64,
    pub available_bytes: u64,
    pub buffer_percent: f64,
}

/// `estimate` plus `buffer_percent` percent
pub fn required_bytes(estimate_mb: f64, buffer_percent: f64) -> u64 {
    let estimated = mb_to_bytes(estimate_mb);
    estimated.saturating_add((estimated as f64 * buffer_percent / 100.0) as u64)
}

/// Fail with `CapacityError` when `available_bytes` is below the buffered estimate.
/// Having exactly the required amount is enough.
pub fn check_capacity(
    estimate_mb: f64,
    buffer_percent: f64,
    available_bytes: u64,
) -> Result<CapacityPlan> {
    let plan = CapacityPlan {
        estimated_bytes: mb_to_bytes(estimate_mb),
        required_bytes: required_bytes(estimate_mb, buffer_percent),
        available_bytes,
        buffer_percent,
    };

    debug!(
        "Estimated backup size: {:.2} MB, required with {:.1}% buffer: {:.2} MB, available: {:.2} MB",
        estimate_mb,
        buffer_percent,
        bytes_to_mb(plan.required_bytes),
        bytes_to_mb(available_bytes)
    );

    if plan.available_bytes < plan.required_bytes {
        return Err(SchemaGuardError::CapacityError {
            required_mb: bytes_to_mb(plan.required_bytes),
            available_mb: bytes_to_mb(plan.available_bytes),
            buffer_percent,
        });
    }

    Ok(plan)
}

/// Free space available to unprivileged users on the filesystem holding `dir`
pub fn available_space(dir: &Utf8Path) -> Result<u64> {
    Ok(fs2::available_space(dir.as_std_path())?)
}
