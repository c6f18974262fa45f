mod external_tool;
pub mod online_ddl;

pub use external_tool::{
    BinaryLogCheck, ChunkKeyCheck, ForeignKeyCheck, TriggerCheck, BINARY_LOG_REASON,
    FOREIGN_KEY_WARNING, KEY_REASON, TRIGGER_WARNING,
};
pub use online_ddl::{blocking_operation, can_use_online_ddl};

use crate::database::Database;
use crate::error::Result;
use crate::finding::Finding;
use crate::parser::QualifiedTable;
use log::debug;

/// Trait for a single pt-online-schema-change prerequisite
pub trait PrerequisiteCheck {
    /// What the check verifies, used when the check itself cannot run
    fn subject(&self) -> &'static str;

    /// Return a finding when the prerequisite is not met
    fn check(&self, db: &mut dyn Database, table: &QualifiedTable) -> Result<Option<Finding>>;
}

/// Outcome of running every prerequisite check against one table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PtOscAssessment {
    pub possible: bool,
    pub reason: String,
    pub warnings: Vec<String>,
}

/// Registry of pt-online-schema-change prerequisite checks
pub struct PrerequisiteRegistry {
    checks: Vec<Box<dyn PrerequisiteCheck>>,
}

impl PrerequisiteRegistry {
    pub fn new() -> Self {
        Self {
            checks: vec![
                Box::new(BinaryLogCheck),
                Box::new(ChunkKeyCheck),
                Box::new(ForeignKeyCheck),
                Box::new(TriggerCheck),
            ],
        }
    }

    /// Run every check. A check that cannot run becomes a warning, never an error.
    pub fn assess(&self, db: &mut dyn Database, table: &QualifiedTable) -> PtOscAssessment {
        let mut reasons = Vec::new();
        let mut warnings = Vec::new();

        for check in &self.checks {
            match check.check(db, table) {
                Ok(Some(finding)) if finding.is_fatal() => reasons.push(finding.message),
                Ok(Some(finding)) => warnings.push(finding.message),
                Ok(None) => {}
                Err(e) => {
                    debug!("Prerequisite check '{}' failed: {}", check.subject(), e);
                    warnings.push(format!("Could not verify {}: {}", check.subject(), e));
                }
            }
        }

        let possible = reasons.is_empty();
        let reason = if possible {
            "pt-online-schema-change can be used as a fallback strategy (tool path should be configured)"
                .to_string()
        } else {
            reasons.join("; ")
        };

        PtOscAssessment {
            possible,
            reason,
            warnings,
        }
    }
}

impl Default for PrerequisiteRegistry {
    fn default() -> Self {
        Self::new()
    }
}
