//! Statement-level behavior through the public API: table name extraction,
//! online DDL classification and capacity planning.

use schema_guard::capacity::{check_capacity, logical_dump_estimate_mb, MIN_ESTIMATE_MB};
use schema_guard::checks::can_use_online_ddl;
use schema_guard::database::TableFootprint;
use schema_guard::parser::{alter_clause, SqlParser};
use schema_guard::{extract_table_name, SchemaGuardError, TableName};

const MB: u64 = 1024 * 1024;

#[test]
fn test_non_alter_statements_are_rejected() {
    let statements = [
        "",
        "SELECT * FROM users",
        "CREATE TABLE t (id INT)",
        "DROP TABLE users",
        "ALTER VIEW v AS SELECT 1",
        "ALTERTABLE users ADD c INT",
    ];

    for sql in statements {
        let result = extract_table_name(sql);
        assert!(
            matches!(result, Err(SchemaGuardError::ParseError { .. })),
            "expected a parse error for {:?}",
            sql
        );
    }
}

#[test]
fn test_quoted_and_unquoted_names_agree() {
    let plain = extract_table_name("ALTER TABLE mydb.users ADD COLUMN x INT").unwrap();
    let quoted = extract_table_name("ALTER TABLE `mydb`.`users` ADD COLUMN x INT").unwrap();

    assert_eq!(plain, quoted);
    assert_eq!(plain, TableName::new(Some("mydb"), "users"));
    assert_eq!(plain.to_string(), "mydb.users");
}

#[test]
fn test_lowercase_alter_table() {
    let name = extract_table_name("  alter table orders drop column legacy").unwrap();
    assert_eq!(name, TableName::new(None, "orders"));
}

#[test]
fn test_classifier_examples() {
    assert!(can_use_online_ddl("ADD COLUMN c INT"));
    assert!(!can_use_online_ddl("ADD FULLTEXT INDEX i (c)"));
    assert!(!can_use_online_ddl("MODIFY c INT"));
    assert!(!can_use_online_ddl("MODIFY COLUMN c INT"));
}

#[test]
fn test_classifier_on_extracted_clause() {
    let clause = alter_clause("ALTER TABLE `shop`.`orders` CHANGE COLUMN amount total DECIMAL(10,2);");
    assert_eq!(clause, "CHANGE COLUMN amount total DECIMAL(10,2)");
    assert!(!can_use_online_ddl(&clause));
}

#[test]
fn test_split_script_respects_quotes() {
    let parser = SqlParser::new();
    let statements = parser
        .split_statements(
            "-- add audit columns\n\
             ALTER TABLE shop.orders ADD COLUMN note VARCHAR(20) DEFAULT 'a;b';\n\
             ALTER TABLE shop.orders ADD INDEX idx_note (note);\n",
        )
        .unwrap();

    assert_eq!(statements.len(), 2);
    assert!(statements[0].ends_with("DEFAULT 'a;b'"));
    assert!(statements[1].starts_with("ALTER TABLE shop.orders ADD INDEX"));
}

#[test]
fn test_capacity_boundary() {
    assert!(matches!(
        check_capacity(100.0, 20.0, 119 * MB),
        Err(SchemaGuardError::CapacityError { .. })
    ));
    assert!(check_capacity(100.0, 20.0, 120 * MB).is_ok());
}

#[test]
fn test_empty_table_estimate_is_never_zero() {
    let estimate = logical_dump_estimate_mb(TableFootprint {
        data_length: 0,
        index_length: 0,
    });
    assert_eq!(estimate, MIN_ESTIMATE_MB);
}
