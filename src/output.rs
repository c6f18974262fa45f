use crate::executor::ExecuteResult;
use crate::validator::{StatementValidationResult, ValidationResult};
use colored::*;
use serde_json;

pub struct OutputFormatter;

impl OutputFormatter {
    /// Format the validation report as colored text for terminal
    pub fn format_validation(result: &ValidationResult) -> String {
        let mut output = String::new();

        output.push_str(&format!(
            "{}\n",
            "=== Phase 1 Validation Results ===".white().bold()
        ));
        output.push_str(&format!("Database Flavor: {}\n", result.flavor));
        output.push_str(&format!("Version: {}\n", result.version));
        output.push_str(&format!(
            "Binary Log Enabled: {}\n",
            Self::yes_no(result.binary_log_enabled)
        ));
        output.push_str(&format!(
            "Number of Statements: {}\n\n",
            result.statements.len()
        ));

        for (i, stmt) in result.statements.iter().enumerate() {
            output.push_str(&Self::format_statement(i + 1, stmt));
        }

        Self::push_list(
            &mut output,
            "General Warnings:".yellow().bold(),
            &result.validation_warnings,
        );
        Self::push_list(
            &mut output,
            "General Errors:".red().bold(),
            &result.validation_errors,
        );

        output
    }

    fn format_statement(number: usize, stmt: &StatementValidationResult) -> String {
        let mut output = String::new();

        output.push_str(&format!(
            "{}\n",
            format!("--- Statement {} ---", number).cyan().bold()
        ));
        output.push_str(&format!("DDL: {}\n", stmt.statement));
        output.push_str(&format!("Table: {}\n", stmt.table_name));
        output.push_str(&format!("Storage Engine: {}\n", stmt.storage_engine));
        output.push_str(&format!(
            "Storage Engine Valid (InnoDB): {}\n",
            Self::yes_no(stmt.storage_engine_valid)
        ));
        output.push_str(&format!(
            "Online DDL Possible: {}\n",
            Self::yes_no(stmt.online_ddl_possible)
        ));
        if !stmt.online_ddl_reason.is_empty() {
            output.push_str(&format!("Online DDL Reason: {}\n", stmt.online_ddl_reason));
        }

        if !stmt.online_ddl_possible && !stmt.ptosc_reason.is_empty() {
            output.push_str(&format!(
                "pt-online-schema-change Possible: {}\n",
                Self::yes_no(stmt.ptosc_possible)
            ));
            output.push_str(&format!(
                "pt-online-schema-change Reason: {}\n",
                stmt.ptosc_reason
            ));
        }

        if stmt.table_rows > 0 {
            output.push_str(&format!("Table Rows: {}\n", stmt.table_rows));
        }
        if stmt.table_size_mb > 0.0 {
            output.push_str(&format!("Table Size (MB): {:.2}\n", stmt.table_size_mb));
        }

        Self::push_list(&mut output, "Warnings:".yellow().bold(), &stmt.warnings);
        Self::push_list(&mut output, "Errors:".red().bold(), &stmt.errors);

        output.push('\n');
        output
    }

    /// Format the validation report as JSON
    pub fn format_json(result: &ValidationResult) -> String {
        serde_json::to_string_pretty(result).unwrap_or_else(|_| "{}".into())
    }

    /// Format a successful execution
    pub fn format_execution(result: &ExecuteResult) -> String {
        let mut output = String::new();

        output.push_str(&format!(
            "{}\n",
            "✅ Change executed successfully!".green().bold()
        ));
        if let Some(method) = result.method_used {
            output.push_str(&format!("Method used: {}\n", method.to_string().cyan()));
        }
        if let Some(path) = &result.backup_path {
            output.push_str(&format!("Backup created at: {}\n", path.as_str().yellow()));
        }

        Self::push_list(&mut output, "Warnings:".yellow().bold(), &result.warnings);

        output
    }

    fn push_list(output: &mut String, heading: ColoredString, items: &[String]) {
        if items.is_empty() {
            return;
        }

        output.push_str(&format!("{}\n", heading));
        for item in items {
            output.push_str(&format!("  - {}\n", item));
        }
    }

    fn yes_no(value: bool) -> ColoredString {
        if value {
            "true".green()
        } else {
            "false".red()
        }
    }
}
