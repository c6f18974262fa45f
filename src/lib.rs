pub mod backup;
pub mod capacity;
pub mod checks;
pub mod config;
pub mod database;
pub mod dsn;
pub mod error;
pub mod executor;
pub mod finding;
pub mod output;
pub mod parser;
pub mod probe;
pub mod process;
pub mod validator;

#[cfg(test)]
mod test_utils;

pub use backup::BackupMethod;
pub use config::{Config, ConfigError};
pub use database::{Database, MySqlDatabase};
pub use dsn::Dsn;
pub use error::{Result, SchemaGuardError};
pub use executor::{ExecuteOptions, ExecuteResult, Executor, MethodUsed};
pub use parser::{extract_table_name, TableName};
pub use process::SystemRunner;
pub use validator::{StatementValidationResult, ValidationResult, Validator};
