//! Static online DDL eligibility.
//!
//! InnoDB can run most ALTER TABLE operations with `ALGORITHM=INPLACE,
//! LOCK=NONE`, but a handful always rebuild the table with a copy and block
//! writers. This classifier flags those by pattern.
//!
//! **Limitation:** This is a conservative textual heuristic, not a grammar.
//! Some `MODIFY` forms (e.g. changing only a default) are in-place on a real
//! server but are reported as ineligible here. The server remains the final
//! authority when the change is executed.

use regex::Regex;
use std::sync::LazyLock;

/// Operations that cannot run in place, with the label used in reasons.
static COPY_ONLY_OPERATIONS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"(?i)\bADD\s+FULLTEXT\b", "ADD FULLTEXT INDEX"),
        (r"(?i)\bADD\s+SPATIAL\b", "ADD SPATIAL INDEX"),
        (r"(?i)\bDROP\s+PRIMARY\s+KEY\b", "DROP PRIMARY KEY"),
        (r"(?i)\bMODIFY\s+COLUMN\b", "MODIFY COLUMN"),
        (r"(?i)\bMODIFY\s", "MODIFY"),
        (r"(?i)\bCHANGE\s+COLUMN\b", "CHANGE COLUMN"),
        (r"(?i)\bCHANGE\s", "CHANGE"),
    ]
    .into_iter()
    .map(|(pattern, label)| {
        (
            Regex::new(pattern).expect("Invalid online DDL regex pattern"),
            label,
        )
    })
    .collect()
});

/// The first operation in `clause` that forces a table copy, if any.
pub fn blocking_operation(clause: &str) -> Option<&'static str> {
    COPY_ONLY_OPERATIONS
        .iter()
        .find(|(pattern, _)| pattern.is_match(clause))
        .map(|(_, label)| *label)
}

/// True when the clause is provisionally eligible for `ALGORITHM=INPLACE, LOCK=NONE`.
pub fn can_use_online_ddl(clause: &str) -> bool {
    blocking_operation(clause).is_none()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_column_is_eligible() {
        assert!(can_use_online_ddl("ADD COLUMN c INT"));
        assert!(can_use_online_ddl("ADD INDEX idx_c (c)"));
        assert!(can_use_online_ddl("DROP COLUMN c"));
        assert!(can_use_online_ddl("RENAME INDEX a TO b"));
    }

    #[test]
    fn test_fulltext_and_spatial_are_ineligible() {
        assert!(!can_use_online_ddl("ADD FULLTEXT INDEX i (c)"));
        assert!(!can_use_online_ddl("add fulltext key i (c)"));
        assert!(!can_use_online_ddl("ADD SPATIAL INDEX g (geom)"));
    }

    #[test]
    fn test_drop_primary_key_is_ineligible() {
        assert_eq!(
            blocking_operation("DROP PRIMARY KEY, ADD PRIMARY KEY (id, ts)"),
            Some("DROP PRIMARY KEY")
        );
    }

    #[test]
    fn test_modify_with_and_without_column_keyword() {
        assert!(!can_use_online_ddl("MODIFY c INT"));
        assert!(!can_use_online_ddl("MODIFY COLUMN c INT"));
        assert_eq!(blocking_operation("modify column c int"), Some("MODIFY COLUMN"));
        assert_eq!(blocking_operation("modify c int"), Some("MODIFY"));
    }

    #[test]
    fn test_change_with_and_without_column_keyword() {
        assert!(!can_use_online_ddl("CHANGE COLUMN a b INT"));
        assert!(!can_use_online_ddl("CHANGE a b BIGINT"));
    }

    #[test]
    fn test_default_only_modify_stays_ineligible() {
        assert!(!can_use_online_ddl("MODIFY c INT DEFAULT 5"));
    }

    #[test]
    fn test_keywords_inside_identifiers_do_not_match() {
        assert!(can_use_online_ddl("ADD COLUMN last_modify INT"));
        assert!(can_use_online_ddl("ADD COLUMN changed_at DATETIME"));
    }
}
