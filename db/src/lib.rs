//! Database file backups and manager configuration.
//!
//! - [`BackupService`]: timestamped, checksummed copies of the database file
//!   with directory summaries and retention.
//! - [`ManagerConfig`]: YAML configuration shared by the command-line tool.
//!
//! # Quick start
//!
//! ```no_run
//! use vehicle_auth_db::{BackupService, ManagerConfig};
//!
//! let config = ManagerConfig::load("vehicle-auth.yml").unwrap_or_default();
//! let service = BackupService::from_config(&config.backup);
//!
//! let result = service.backup(&config.database_path);
//! if result.success {
//!     service.cleanup(config.backup.keep);
//! }
//! ```

mod backup;
mod config;
mod error;

pub use backup::{
    BackupEntry, BackupInfo, BackupResult, BackupService, DEFAULT_LOCK_TIMEOUT, file_checksum,
    format_size,
};
pub use config::{BackupConfig, ManagerConfig, SqliteConfig};
pub use error::{DbError, Result};
