//! pt-online-schema-change prerequisites.
//!
//! pt-osc copies rows into a shadow table and keeps it in sync with triggers,
//! so it needs the binary log and a key it can chunk on. Foreign keys and
//! existing triggers do not rule it out but need attention.

use crate::checks::PrerequisiteCheck;
use crate::database::Database;
use crate::error::Result;
use crate::finding::Finding;
use crate::parser::QualifiedTable;
use crate::probe::is_enabled;

pub const BINARY_LOG_REASON: &str = "Binary log must be enabled for pt-online-schema-change";
pub const KEY_REASON: &str = "Table must have a PRIMARY KEY or UNIQUE NOT NULL key";
pub const FOREIGN_KEY_WARNING: &str =
    "Table has foreign keys - pt-online-schema-change will require additional considerations";
pub const TRIGGER_WARNING: &str =
    "Table has triggers - pt-online-schema-change requires --preserve-triggers flag";

pub struct BinaryLogCheck;

impl PrerequisiteCheck for BinaryLogCheck {
    fn subject(&self) -> &'static str {
        "binary log"
    }

    fn check(&self, db: &mut dyn Database, _table: &QualifiedTable) -> Result<Option<Finding>> {
        let log_bin = db.show_variable("log_bin")?;
        if log_bin.as_deref().is_some_and(is_enabled) {
            return Ok(None);
        }

        // MariaDB may report log_bin=OFF on replicas that still write a binlog
        let basename = db.show_variable("log_bin_basename").unwrap_or(None);
        if basename.is_some_and(|b| !b.trim().is_empty()) {
            return Ok(None);
        }

        Ok(Some(Finding::fatal(BINARY_LOG_REASON)))
    }
}

pub struct ChunkKeyCheck;

impl PrerequisiteCheck for ChunkKeyCheck {
    fn subject(&self) -> &'static str {
        "PRIMARY KEY/UNIQUE key"
    }

    fn check(&self, db: &mut dyn Database, table: &QualifiedTable) -> Result<Option<Finding>> {
        if db.has_primary_key(table)? || db.has_unique_not_null_key(table)? {
            Ok(None)
        } else {
            Ok(Some(Finding::fatal(KEY_REASON)))
        }
    }
}

pub struct ForeignKeyCheck;

impl PrerequisiteCheck for ForeignKeyCheck {
    fn subject(&self) -> &'static str {
        "foreign keys"
    }

    fn check(&self, db: &mut dyn Database, table: &QualifiedTable) -> Result<Option<Finding>> {
        Ok(db
            .has_foreign_keys(table)?
            .then(|| Finding::warning(FOREIGN_KEY_WARNING)))
    }
}

pub struct TriggerCheck;

impl PrerequisiteCheck for TriggerCheck {
    fn subject(&self) -> &'static str {
        "triggers"
    }

    fn check(&self, db: &mut dyn Database, table: &QualifiedTable) -> Result<Option<Finding>> {
        Ok(db
            .has_triggers(table)?
            .then(|| Finding::warning(TRIGGER_WARNING)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{FakeDatabase, FakeTable};

    fn orders() -> QualifiedTable {
        QualifiedTable {
            database: "shop".to_string(),
            table: "orders".to_string(),
        }
    }

    #[test]
    fn test_binary_log_enabled() {
        let mut db = FakeDatabase::mysql();
        assert_eq!(BinaryLogCheck.check(&mut db, &orders()).unwrap(), None);
    }

    #[test]
    fn test_binary_log_basename_fallback() {
        let mut db = FakeDatabase::mariadb();
        db.set_variable("log_bin", "OFF");
        assert_eq!(BinaryLogCheck.check(&mut db, &orders()).unwrap(), None);
    }

    #[test]
    fn test_binary_log_disabled() {
        let mut db = FakeDatabase::mysql();
        db.set_variable("log_bin", "0");
        db.remove_variable("log_bin_basename");

        let finding = BinaryLogCheck.check(&mut db, &orders()).unwrap().unwrap();
        assert!(finding.is_fatal());
        assert_eq!(finding.message, BINARY_LOG_REASON);
    }

    #[test]
    fn test_unique_not_null_key_satisfies_chunk_key() {
        let table = FakeTable {
            primary_key: false,
            unique_not_null: true,
            ..FakeTable::innodb()
        };
        let mut db = FakeDatabase::mysql().with_table("shop", "orders", table);
        assert_eq!(ChunkKeyCheck.check(&mut db, &orders()).unwrap(), None);
    }

    #[test]
    fn test_missing_key() {
        let table = FakeTable {
            primary_key: false,
            unique_not_null: false,
            ..FakeTable::innodb()
        };
        let mut db = FakeDatabase::mysql().with_table("shop", "orders", table);

        let finding = ChunkKeyCheck.check(&mut db, &orders()).unwrap().unwrap();
        assert!(finding.is_fatal());
        assert!(finding.message.contains("PRIMARY KEY or UNIQUE NOT NULL key"));
    }

    #[test]
    fn test_foreign_keys_and_triggers_warn() {
        let table = FakeTable {
            foreign_keys: true,
            triggers: true,
            ..FakeTable::innodb()
        };
        let mut db = FakeDatabase::mysql().with_table("shop", "orders", table);

        let fk = ForeignKeyCheck.check(&mut db, &orders()).unwrap().unwrap();
        let trg = TriggerCheck.check(&mut db, &orders()).unwrap().unwrap();
        assert!(!fk.is_fatal());
        assert!(!trg.is_fatal());
        assert!(trg.message.contains("--preserve-triggers"));
    }
}
