//! Manager configuration.
//!
//! Every section and field is optional in the file; missing values take the
//! defaults below.
//!
//! # Example YAML
//!
//! ```yaml
//! database_path: Database.db
//! backup:
//!   directory: Backup Database
//!   prefix: Database-Backup
//!   keep: 0
//! sqlite:
//!   busy_timeout_ms: 5000
//! ```

use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Where and how backups are written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupConfig {
    pub directory: PathBuf,
    /// File name prefix; backups are named `<prefix>-<YYYYMMDD>-<HHMMSS>.<ext>`.
    pub prefix: String,
    /// Number of newest backups to keep after each backup (0 = keep all).
    pub keep: usize,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("Backup Database"),
            prefix: "Database-Backup".to_string(),
            keep: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SqliteConfig {
    /// How long a schema run waits for a lock held by another connection.
    pub busy_timeout_ms: u64,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            busy_timeout_ms: 5000,
        }
    }
}

impl SqliteConfig {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

/// Top-level configuration for the schema manager.
///
/// # Examples
///
/// ```
/// use vehicle_auth_db::ManagerConfig;
///
/// let config: ManagerConfig = serde_yaml::from_str("database_path: Other.db").unwrap();
/// assert_eq!(config.database_path.to_str(), Some("Other.db"));
/// assert_eq!(config.backup.prefix, "Database-Backup");
/// assert_eq!(config.sqlite.busy_timeout_ms, 5000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    pub database_path: PathBuf,
    pub backup: BackupConfig,
    pub sqlite: SqliteConfig,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("Database.db"),
            backup: BackupConfig::default(),
            sqlite: SqliteConfig::default(),
        }
    }
}

impl ManagerConfig {
    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`Io`](crate::DbError::Io) if the file cannot be read, or
    /// [`Yaml`](crate::DbError::Yaml) if parsing fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let config = serde_yaml::from_reader(reader)?;
        Ok(config)
    }

    /// Saves the configuration as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`Io`](crate::DbError::Io) if the file cannot be written, or
    /// [`Yaml`](crate::DbError::Yaml) if serialization fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }
}
