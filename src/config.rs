//! Configuration file parsing and validation.
//!
//! The configuration is read from the shared agent config file
//! (`/opt/releem/releem.conf` by default). Only the keys schema-guard needs are
//! deserialized; every other agent key is ignored.

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = "/opt/releem/releem.conf";
pub const DEFAULT_BACKUP_DIR: &str = "/tmp/backups";
pub const DEFAULT_PTOSC_PATH: &str = "pt-online-schema-change";
pub const DEFAULT_MYSQLDUMP_PATH: &str = "mysqldump";
pub const DEFAULT_XTRABACKUP_PATH: &str = "xtrabackup";
pub const DEFAULT_BACKUP_SPACE_BUFFER: f64 = 20.0;
pub const DEFAULT_MYSQL_HOST: &str = "127.0.0.1";
pub const DEFAULT_MYSQL_PORT: &str = "3306";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid backup_space_buffer: {0}. Expected a non-negative percentage (e.g., 20)")]
    InvalidBufferPercent(f64),

    #[error("Invalid mysql_port: {0}. Expected a TCP port number")]
    InvalidPort(String),
}

#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Empty means "take it from the DSN"
    #[serde(default)]
    pub mysql_host: String,

    /// Kept as a string because the agent config usually stores it quoted.
    /// A bare number is accepted too.
    #[serde(default, deserialize_with = "port_from_string_or_number")]
    pub mysql_port: String,

    #[serde(default)]
    pub mysql_user: String,

    #[serde(default)]
    pub mysql_password: String,

    /// Directory receiving dump files and physical backup target directories
    #[serde(default)]
    pub backup_dir: Utf8PathBuf,

    #[serde(default)]
    pub ptosc_path: String,

    #[serde(default)]
    pub mysqldump_path: String,

    #[serde(default)]
    pub xtrabackup_path: String,

    /// Extra free space required on top of the backup estimate, in percent.
    /// Zero means "use the default" (20%).
    #[serde(default)]
    pub backup_space_buffer: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mysql_host: String::new(),
            mysql_port: String::new(),
            mysql_user: String::new(),
            mysql_password: String::new(),
            backup_dir: Utf8PathBuf::from(DEFAULT_BACKUP_DIR),
            ptosc_path: DEFAULT_PTOSC_PATH.to_string(),
            mysqldump_path: DEFAULT_MYSQLDUMP_PATH.to_string(),
            xtrabackup_path: DEFAULT_XTRABACKUP_PATH.to_string(),
            backup_space_buffer: DEFAULT_BACKUP_SPACE_BUFFER,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("mysql_host", &self.mysql_host)
            .field("mysql_port", &self.mysql_port)
            .field("mysql_user", &self.mysql_user)
            .field("mysql_password", &"***")
            .field("backup_dir", &self.backup_dir)
            .field("ptosc_path", &self.ptosc_path)
            .field("mysqldump_path", &self.mysqldump_path)
            .field("xtrabackup_path", &self.xtrabackup_path)
            .field("backup_space_buffer", &self.backup_space_buffer)
            .finish()
    }
}

impl Config {
    /// Load config from the given path.
    /// Returns default config if the file doesn't exist.
    pub fn load(path: &Utf8Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::info!("Config file {} not found, using defaults", path);
            return Ok(Self::default());
        }

        Self::load_from_path(path)
    }

    /// Like [`Config::load`], but an unreadable or invalid file is logged and
    /// replaced by the defaults.
    pub fn load_or_default(path: &Utf8Path) -> Self {
        Self::load(path).unwrap_or_else(|e| {
            log::warn!("Ignoring config file {}: {}", path, e);
            Self::default()
        })
    }

    /// Load config from specific path (useful for testing)
    pub fn load_from_path(path: &Utf8Path) -> Result<Self, ConfigError> {
        log::info!("Loading config {}", path);
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let mut config: Config = toml::from_str(contents)?;
        config.mysql_host = config.mysql_host.trim().to_string();
        config.mysql_port = config.mysql_port.trim().to_string();
        config.apply_defaults();
        config.validate()?;
        Ok(config)
    }

    /// Replace empty values with their defaults
    fn apply_defaults(&mut self) {
        fn default_if_empty(value: &mut String, default: &str) {
            if value.trim().is_empty() {
                *value = default.to_string();
            }
        }

        default_if_empty(&mut self.ptosc_path, DEFAULT_PTOSC_PATH);
        default_if_empty(&mut self.mysqldump_path, DEFAULT_MYSQLDUMP_PATH);
        default_if_empty(&mut self.xtrabackup_path, DEFAULT_XTRABACKUP_PATH);

        if self.backup_dir.as_str().trim().is_empty() {
            self.backup_dir = Utf8PathBuf::from(DEFAULT_BACKUP_DIR);
        }
    }

    /// Validate configuration values
    fn validate(&self) -> Result<(), ConfigError> {
        if self.backup_space_buffer < 0.0 || !self.backup_space_buffer.is_finite() {
            return Err(ConfigError::InvalidBufferPercent(self.backup_space_buffer));
        }

        if !self.mysql_port.is_empty() && self.mysql_port.parse::<u16>().is_err() {
            return Err(ConfigError::InvalidPort(self.mysql_port.clone()));
        }

        Ok(())
    }

    /// Effective buffer percentage; zero or unset falls back to 20%.
    pub fn buffer_percent(&self) -> f64 {
        if self.backup_space_buffer > 0.0 {
            self.backup_space_buffer
        } else {
            DEFAULT_BACKUP_SPACE_BUFFER
        }
    }
}

fn port_from_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Port {
        Text(String),
        Number(i64),
    }

    Ok(match Port::deserialize(deserializer)? {
        Port::Text(text) => text,
        Port::Number(number) => number.to_string(),
    })
}
