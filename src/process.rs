//! External tool invocation.
//!
//! mysqldump, xtrabackup and pt-online-schema-change are run through the
//! [`CommandRunner`] trait. Command lines and tool output are redacted before
//! they are logged or returned in an error.

use crate::error::{Result, SchemaGuardError};
use log::debug;
use std::process::Command;

pub const REDACTED: &str = "***";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// `None` when the process was terminated by a signal
    pub exit_code: Option<i32>,
    /// stdout followed by stderr
    pub output: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

pub trait CommandRunner {
    /// Run `program` to completion and capture its output. Blocks without a timeout.
    fn run(&self, program: &str, args: &[String]) -> std::io::Result<CommandOutput>;
}

/// Runs real processes.
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[String]) -> std::io::Result<CommandOutput> {
        let output = Command::new(program).args(args).output()?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        Ok(CommandOutput {
            exit_code: output.status.code(),
            output: combined,
        })
    }
}

/// Mask the password in a single argument.
///
/// Handles `-pSECRET` (mysqldump), `--password=SECRET` (xtrabackup) and the
/// `p=SECRET` field of a pt-online-schema-change DSN (`h=..,P=..,u=..,p=..`).
pub fn redact_arg(arg: &str) -> String {
    if arg.starts_with("--password=") {
        return format!("--password={}", REDACTED);
    }

    if arg.starts_with("-p") && !arg.starts_with("--") && arg.len() > 2 {
        return format!("-p{}", REDACTED);
    }

    if !arg.starts_with('-') && is_key_value_dsn(arg) {
        return arg
            .split(',')
            .map(|field| {
                if field.starts_with("p=") {
                    format!("p={}", REDACTED)
                } else {
                    field.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(",");
    }

    arg.to_string()
}

fn is_key_value_dsn(arg: &str) -> bool {
    arg.split(',')
        .all(|field| matches!(field.split_once('='), Some((key, _)) if key.len() == 1))
}

pub fn redact_args(args: &[String]) -> Vec<String> {
    args.iter().map(|arg| redact_arg(arg)).collect()
}

/// Replace every occurrence of `secret` in tool output.
pub fn redact_output(output: &str, secret: &str) -> String {
    if secret.is_empty() {
        output.to_string()
    } else {
        output.replace(secret, REDACTED)
    }
}

/// One external tool call: what to run and how to report it.
pub struct ToolInvocation<'a> {
    /// Human readable phase name, e.g. "xtrabackup prepare"
    pub label: &'a str,
    pub program: &'a str,
    pub args: Vec<String>,
    /// Password to scrub from captured output
    pub secret: &'a str,
    pub debug: bool,
}

impl ToolInvocation<'_> {
    /// Run the tool; a non-zero exit becomes a `SubprocessError` carrying the
    /// redacted combined output.
    pub fn run(&self, runner: &dyn CommandRunner) -> Result<CommandOutput> {
        if self.debug {
            debug!("{} command: {}", self.label, self.program);
            debug!("{} args: {}", self.label, redact_args(&self.args).join(" "));
        }

        let result = runner.run(self.program, &self.args).map_err(|e| {
            SchemaGuardError::subprocess_error(
                self.label,
                format!("could not start {}: {}", self.program, e),
            )
        })?;

        let output = redact_output(&result.output, self.secret);
        if self.debug {
            if !output.is_empty() {
                debug!("{} output:\n{}", self.label, output);
            }
            debug!("{} exit code: {:?}", self.label, result.exit_code);
        }

        if !result.success() {
            let detail = match result.exit_code {
                Some(code) => format!("exit code {}: {}", code, output.trim()),
                None => format!("terminated by signal: {}", output.trim()),
            };
            return Err(SchemaGuardError::subprocess_error(self.label, detail));
        }

        Ok(CommandOutput {
            exit_code: result.exit_code,
            output,
        })
    }
}
