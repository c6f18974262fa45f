//! Server flavor, version and binary log detection.

use crate::database::Database;
use crate::error::Result;
use derive_more::Display;
use log::debug;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum Flavor {
    #[display("MySQL")]
    MySql,
    #[display("MariaDB")]
    MariaDb,
}

impl Flavor {
    /// Classify by `@@version_comment`
    pub fn from_version_comment(comment: &str) -> Self {
        if comment.to_lowercase().contains("mariadb") {
            Self::MariaDb
        } else {
            Self::MySql
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInfo {
    pub flavor: Flavor,
    pub version: String,
    pub binary_log_enabled: bool,
}

/// `log_bin` reports `1`/`0` on MySQL and `ON`/`OFF` on MariaDB
pub fn is_enabled(value: &str) -> bool {
    let value = value.trim();
    value == "1" || value.eq_ignore_ascii_case("on")
}

/// Query version, flavor and binary log status. Any failure is returned as is.
pub fn probe_server(db: &mut dyn Database) -> Result<ServerInfo> {
    let version = db.version()?;
    let comment = db.system_variable("version_comment")?.unwrap_or_default();
    let flavor = Flavor::from_version_comment(&comment);

    let log_bin = db.system_variable("log_bin")?.unwrap_or_default();
    let binary_log_enabled = is_enabled(&log_bin);

    debug!(
        "Server {} {} (binary log {})",
        flavor,
        version,
        if binary_log_enabled { "on" } else { "off" }
    );

    Ok(ServerInfo {
        flavor,
        version,
        binary_log_enabled,
    })
}
