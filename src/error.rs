use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum SchemaGuardError {
    #[error("Failed to parse DDL: {msg}")]
    #[diagnostic(
        code(schema_guard::parse_error),
        help("Only ALTER TABLE statements are supported, e.g. ALTER TABLE db.users ADD COLUMN age INT")
    )]
    ParseError { msg: String },

    #[error("Metadata query failed: {msg}")]
    #[diagnostic(
        code(schema_guard::metadata_error),
        help("Check that the monitoring user can read information_schema and server variables")
    )]
    MetadataError { msg: String },

    #[error(
        "Insufficient disk space: required {required_mb:.2} MB (with {buffer_percent:.1}% buffer), available {available_mb:.2} MB"
    )]
    #[diagnostic(
        code(schema_guard::capacity_error),
        help("Free space in the backup directory or point backup_dir at a larger filesystem")
    )]
    CapacityError {
        required_mb: f64,
        available_mb: f64,
        buffer_percent: f64,
    },

    #[error("{tool} failed: {output}")]
    #[diagnostic(
        code(schema_guard::subprocess_error),
        help("Run with --debug to see the exact command line (credentials are masked)")
    )]
    SubprocessError { tool: String, output: String },

    #[error("Schema change failed: {msg}")]
    #[diagnostic(code(schema_guard::ddl_execution_error))]
    DdlExecutionError { msg: String },

    #[error("Failed to connect to database: {msg}")]
    #[diagnostic(
        code(schema_guard::connection_error),
        help("Check MYSQL_DSN or the --dsn argument")
    )]
    ConnectionError { msg: String },

    #[error("I/O error")]
    #[diagnostic(
        code(schema_guard::io_error),
        help("Ensure the backup directory exists and is writable")
    )]
    IoError(#[from] std::io::Error),

    #[error("Configuration error")]
    #[diagnostic(
        code(schema_guard::config_error),
        help("Run 'schema-guard init' to create a valid configuration file")
    )]
    ConfigError(#[from] crate::config::ConfigError),
}

impl SchemaGuardError {
    pub fn parse_error(msg: impl Into<String>) -> Self {
        Self::ParseError { msg: msg.into() }
    }

    pub fn metadata_error(msg: impl Into<String>) -> Self {
        Self::MetadataError { msg: msg.into() }
    }

    pub fn ddl_error(msg: impl Into<String>) -> Self {
        Self::DdlExecutionError { msg: msg.into() }
    }

    pub fn subprocess_error(tool: impl Into<String>, output: impl Into<String>) -> Self {
        Self::SubprocessError {
            tool: tool.into(),
            output: output.into(),
        }
    }
}

impl From<mysql::Error> for SchemaGuardError {
    fn from(e: mysql::Error) -> Self {
        match e {
            mysql::Error::DriverError(_) | mysql::Error::UrlError(_) => Self::ConnectionError {
                msg: e.to_string(),
            },
            other => Self::metadata_error(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, SchemaGuardError>;
